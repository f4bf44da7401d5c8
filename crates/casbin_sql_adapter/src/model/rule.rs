//! Rule row model.
//!
//! # Responsibility
//! - Hold one stored rule: identity, policy type and positional fields.
//! - Convert between engine tuples, engine text lines and rows.
//!
//! # Invariants
//! - Fields are normalized on construction: `Some("")` never exists.
//! - Arity is the position of the last non-empty field in `V0..V5`, plus one.
//! - Tuple elements past `V5` are not written, matching data already stored.

/// Number of positional columns in the table (`v0..v7`).
pub const FIELD_COUNT: usize = 8;

/// Number of leading positional columns that take part in matching and in
/// line reconstruction (`v0..v5`).
pub const MATCH_FIELD_COUNT: usize = 6;

/// One row of the rule table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CasbinRule {
    /// Auto-increment identity. `0` for rows not yet persisted.
    pub id: i64,
    /// Policy type tag, e.g. `p` or `g`.
    pub ptype: String,
    fields: [Option<String>; FIELD_COUNT],
}

impl CasbinRule {
    /// Builds an unpersisted row from a policy type and an engine tuple.
    pub fn from_policy<S: AsRef<str>>(ptype: &str, rule: &[S]) -> Self {
        let mut row = Self {
            id: 0,
            ptype: ptype.to_string(),
            fields: Default::default(),
        };
        for (position, value) in rule.iter().take(MATCH_FIELD_COUNT).enumerate() {
            row.set_field(position, value.as_ref());
        }
        row
    }

    /// Builds a row as scanned from storage.
    ///
    /// Missing trailing values are treated as empty.
    pub fn from_stored<S: Into<String>>(
        id: i64,
        ptype: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        let mut row = Self {
            id,
            ptype: ptype.into(),
            fields: Default::default(),
        };
        for (position, value) in values.into_iter().take(FIELD_COUNT).enumerate() {
            let value: String = value.into();
            row.set_field(position, value.as_str());
        }
        row
    }

    /// Returns the stored text of field `position`, `""` when empty.
    ///
    /// Positions outside `0..FIELD_COUNT` read as empty.
    pub fn field(&self, position: usize) -> &str {
        self.fields
            .get(position)
            .and_then(|value| value.as_deref())
            .unwrap_or("")
    }

    /// Sets field `position`; empty text clears it.
    pub fn set_field(&mut self, position: usize, value: &str) {
        if let Some(slot) = self.fields.get_mut(position) {
            *slot = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
    }

    /// Returns all eight column values in storage order.
    pub fn stored_values(&self) -> [&str; FIELD_COUNT] {
        std::array::from_fn(|position| self.field(position))
    }

    /// Number of leading `V0..V5` fields up to the last non-empty one.
    pub fn arity(&self) -> usize {
        (0..MATCH_FIELD_COUNT)
            .rev()
            .find(|position| self.fields[*position].is_some())
            .map_or(0, |position| position + 1)
    }

    /// Renders the engine line `ptype, v0, ..., vN` truncated to the arity.
    ///
    /// Returns `None` for a row that carries only its policy type.
    pub fn to_policy_line(&self) -> Option<String> {
        let arity = self.arity();
        if arity == 0 {
            return None;
        }

        let mut line = quote_token(&self.ptype);
        for position in 0..arity {
            line.push_str(", ");
            line.push_str(&quote_token(self.field(position)));
        }
        Some(line)
    }

    /// Returns the non-empty `V0..V5` values; empty fields are omitted.
    pub fn to_policy(&self) -> Vec<String> {
        self.fields[..MATCH_FIELD_COUNT]
            .iter()
            .flatten()
            .cloned()
            .collect()
    }
}

// Line tokens are trimmed unless quoted, so edge whitespace needs quotes too.
fn quote_token(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.trim() != value {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
