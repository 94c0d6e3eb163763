use crate::EventMatcher;
use serde::{Deserialize, Serialize};
use slicewatch_common::{DecodedEvent, FieldPath, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatcherId(pub u64);

impl std::fmt::Display for MatcherId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Condition on a single field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ValueRule {
    EqInt { value: i64 },
    LtInt { value: i64 },
    GtInt { value: i64 },
    EqString { value: String },
    Glob { pattern: String },
}

impl ValueRule {
    /// Integer rules accept `Int` and `Long` values, string rules accept
    /// UTF-8 `Bytes`. A value of the wrong kind never matches.
    pub fn check(&self, value: &Value) -> bool {
        match self {
            Self::EqInt { value: want } => value.as_i64() == Some(*want),
            Self::LtInt { value: bound } => value.as_i64().is_some_and(|v| v < *bound),
            Self::GtInt { value: bound } => value.as_i64().is_some_and(|v| v > *bound),
            Self::EqString { value: want } => value.as_str() == Some(want.as_str()),
            Self::Glob { pattern } => value
                .as_str()
                .is_some_and(|v| glob_match::glob_match(pattern, v)),
        }
    }
}

impl std::fmt::Display for ValueRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EqInt { value } => write!(f, "== {value}"),
            Self::LtInt { value } => write!(f, "< {value}"),
            Self::GtInt { value } => write!(f, "> {value}"),
            Self::EqString { value } => write!(f, "== \"{value}\""),
            Self::Glob { pattern } => write!(f, "~ \"{pattern}\""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValueMatcher {
    pub field: FieldPath,
    #[serde(flatten)]
    pub rule: ValueRule,
}

impl FieldValueMatcher {
    /// A missing field never matches.
    pub fn matches(&self, event: &DecodedEvent) -> bool {
        event
            .field(self.field)
            .is_some_and(|value| self.rule.check(value))
    }
}

/// Matches events of one atom whose fields satisfy every field rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomMatcher {
    pub id: MatcherId,
    pub atom_id: u32,
    pub fields: Vec<FieldValueMatcher>,
}

impl AtomMatcher {
    pub fn new(id: u64, atom_id: u32) -> Self {
        Self {
            id: MatcherId(id),
            atom_id,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<FieldPath>, rule: ValueRule) -> Self {
        self.fields.push(FieldValueMatcher {
            field: field.into(),
            rule,
        });
        self
    }
}

impl EventMatcher for AtomMatcher {
    fn id(&self) -> MatcherId {
        self.id
    }

    fn matches(&self, event: &DecodedEvent) -> bool {
        event.atom_id == self.atom_id && self.fields.iter().all(|f| f.matches(event))
    }
}

/// Matcher backed by an arbitrary predicate.
pub struct PredicateMatcher<F> {
    id: MatcherId,
    predicate: F,
}

impl<F> PredicateMatcher<F>
where
    F: Fn(&DecodedEvent) -> bool + Send,
{
    pub fn new(id: u64, predicate: F) -> Self {
        Self {
            id: MatcherId(id),
            predicate,
        }
    }
}

impl<F> EventMatcher for PredicateMatcher<F>
where
    F: Fn(&DecodedEvent) -> bool + Send,
{
    fn id(&self) -> MatcherId {
        self.id
    }

    fn matches(&self, event: &DecodedEvent) -> bool {
        (self.predicate)(event)
    }
}
