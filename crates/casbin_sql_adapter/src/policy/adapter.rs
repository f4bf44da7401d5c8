//! Persistence contract expected by the policy engine.

use crate::error::AdapterResult;
use crate::policy::model::Model;
use std::any::Any;

/// Storage operations the policy engine calls.
///
/// `sec` is the model section (`p` or `g`) and `ptype` the policy type the
/// rules belong to. Mutating operations are the engine's auto-save path.
pub trait PolicyAdapter {
    /// Appends every stored rule to `model`.
    fn load_policy(&mut self, model: &mut Model) -> AdapterResult<()>;

    /// Appends the stored rules selected by `filter` to `model`.
    ///
    /// `filter` must be the adapter's own filter type; anything else fails
    /// before a query runs and leaves `model` untouched.
    fn load_filtered_policy(&mut self, model: &mut Model, filter: &dyn Any) -> AdapterResult<()>;

    /// Whether a filtered load has succeeded on this adapter.
    fn is_filtered(&self) -> bool;

    /// Replaces all stored rules with the `p` and `g` sections of `model`.
    fn save_policy(&mut self, model: &Model) -> AdapterResult<()>;

    fn add_policy(&mut self, sec: &str, ptype: &str, rule: &[String]) -> AdapterResult<()>;

    fn add_policies(&mut self, sec: &str, ptype: &str, rules: &[Vec<String>])
        -> AdapterResult<()>;

    fn remove_policy(&mut self, sec: &str, ptype: &str, rule: &[String]) -> AdapterResult<()>;

    fn remove_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> AdapterResult<()>;

    /// Removes rules whose fields starting at `field_index` equal
    /// `field_values`.
    fn remove_filtered_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> AdapterResult<()>;

    fn update_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        old_rule: &[String],
        new_rule: &[String],
    ) -> AdapterResult<()>;

    fn update_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        old_rules: &[Vec<String>],
        new_rules: &[Vec<String>],
    ) -> AdapterResult<()>;

    /// Replaces the rules selected by `field_index`/`field_values` with
    /// `new_rules` and returns the replaced rules.
    fn update_filtered_policies(
        &mut self,
        sec: &str,
        ptype: &str,
        new_rules: &[Vec<String>],
        field_index: usize,
        field_values: &[String],
    ) -> AdapterResult<Vec<Vec<String>>>;
}
