//! In-memory policy model owned by the policy engine.
//!
//! # Invariants
//! - Policy types inside a section iterate in lexical order.
//! - Rules of one policy type keep insertion order; duplicates are kept.

use std::collections::BTreeMap;

/// Section (`p`, `g`) → policy type → ordered rule tuples.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    sections: BTreeMap<String, BTreeMap<String, Vec<Vec<String>>>>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `rule` under `sec`/`ptype`, creating both levels when absent.
    pub fn add_policy(&mut self, sec: &str, ptype: &str, rule: Vec<String>) {
        self.sections
            .entry(sec.to_string())
            .or_default()
            .entry(ptype.to_string())
            .or_default()
            .push(rule);
    }

    /// Rules stored under `sec`/`ptype`; empty when either level is absent.
    pub fn policies(&self, sec: &str, ptype: &str) -> &[Vec<String>] {
        self.sections
            .get(sec)
            .and_then(|types| types.get(ptype))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_policy<S: AsRef<str>>(&self, sec: &str, ptype: &str, rule: &[S]) -> bool {
        self.policies(sec, ptype).iter().any(|stored| {
            stored.len() == rule.len()
                && stored
                    .iter()
                    .zip(rule)
                    .all(|(left, right)| left == right.as_ref())
        })
    }

    /// Iterates `(ptype, rules)` of one section.
    pub fn section<'a>(
        &'a self,
        sec: &str,
    ) -> impl Iterator<Item = (&'a str, &'a [Vec<String>])> + 'a {
        self.sections
            .get(sec)
            .into_iter()
            .flat_map(|types| types.iter())
            .map(|(ptype, rules)| (ptype.as_str(), rules.as_slice()))
    }

    /// Total number of rules across all sections.
    pub fn policy_count(&self) -> usize {
        self.sections
            .values()
            .flat_map(|types| types.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.policy_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::Model;

    fn rule(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn policies_keep_insertion_order_and_duplicates() {
        let mut model = Model::new();
        model.add_policy("p", "p", rule(&["bob", "data2", "write"]));
        model.add_policy("p", "p", rule(&["alice", "data1", "read"]));
        model.add_policy("p", "p", rule(&["bob", "data2", "write"]));

        let stored = model.policies("p", "p");
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0], rule(&["bob", "data2", "write"]));
        assert_eq!(stored[1], rule(&["alice", "data1", "read"]));
        assert_eq!(model.policy_count(), 3);
    }

    #[test]
    fn missing_section_reads_as_empty() {
        let model = Model::new();
        assert!(model.policies("g", "g").is_empty());
        assert_eq!(model.section("g").count(), 0);
        assert!(model.is_empty());
    }

    #[test]
    fn section_iterates_policy_types_lexically() {
        let mut model = Model::new();
        model.add_policy("g", "g2", rule(&["data1", "group"]));
        model.add_policy("g", "g", rule(&["alice", "admin"]));

        let types: Vec<&str> = model.section("g").map(|(ptype, _)| ptype).collect();
        assert_eq!(types, vec!["g", "g2"]);
    }

    #[test]
    fn has_policy_compares_whole_tuples() {
        let mut model = Model::new();
        model.add_policy("p", "p", rule(&["alice", "data1", "read"]));
        assert!(model.has_policy("p", "p", &["alice", "data1", "read"]));
        assert!(!model.has_policy("p", "p", &["alice", "data1"]));
        assert!(!model.has_policy("g", "p", &["alice", "data1", "read"]));
    }
}
