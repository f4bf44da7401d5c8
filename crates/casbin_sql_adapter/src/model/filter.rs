//! Filter shapes for partial loads and partial deletes.
//!
//! Two unrelated mechanisms live here on purpose:
//! - [`Filter`] restricts columns to inclusion lists (filtered load).
//! - [`FieldFilter`] binds a contiguous run of positional fields starting at
//!   an offset (filtered delete and filtered update).

use crate::model::rule::MATCH_FIELD_COUNT;
use serde::{Deserialize, Serialize};

/// Column inclusion lists for a filtered load.
///
/// Every non-empty list becomes a `column IN (...)` predicate; predicates of
/// different columns are combined with `AND`. Empty lists impose nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub ptype: Vec<String>,
    pub v0: Vec<String>,
    pub v1: Vec<String>,
    pub v2: Vec<String>,
    pub v3: Vec<String>,
    pub v4: Vec<String>,
    pub v5: Vec<String>,
}

impl Filter {
    /// Returns the inclusion list for positional field `position` (`0..6`).
    pub fn field(&self, position: usize) -> &[String] {
        match position {
            0 => &self.v0,
            1 => &self.v1,
            2 => &self.v2,
            3 => &self.v3,
            4 => &self.v4,
            5 => &self.v5,
            _ => &[],
        }
    }
}

/// Positional field range: `field_values[i]` binds field `field_index + i`.
///
/// Only fields `0..6` can be bound; values that would land past `V5` are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFilter {
    pub field_index: usize,
    pub field_values: Vec<String>,
}

impl FieldFilter {
    pub fn new<S: AsRef<str>>(field_index: usize, field_values: &[S]) -> Self {
        Self {
            field_index,
            field_values: field_values
                .iter()
                .map(|value| value.as_ref().to_string())
                .collect(),
        }
    }

    /// Returns `(position, value)` for every field the range covers.
    pub fn bindings(&self) -> Vec<(usize, &str)> {
        (0..MATCH_FIELD_COUNT)
            .filter(|position| {
                self.field_index <= *position
                    && *position < self.field_index + self.field_values.len()
            })
            .map(|position| {
                (
                    position,
                    self.field_values[position - self.field_index].as_str(),
                )
            })
            .collect()
    }
}
