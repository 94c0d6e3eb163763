use crate::types::{FieldPath, Value};
use serde::{Deserialize, Serialize};

/// Canonical projection of an event onto a slice.
///
/// The `(field_path, value)` pairs are sorted at construction, so two keys
/// built from the same pairs in a different order are equal, hash equal,
/// and order lexicographically over the sorted pairs.
///
/// # Examples
///
/// ```
/// use slicewatch_common::{DimensionKey, FieldPath, Value, DEFAULT_KEY};
///
/// let a = DimensionKey::new([(FieldPath(2), Value::from("wl1")), (FieldPath(1), Value::Int(111))]);
/// let b = DimensionKey::new([(FieldPath(1), Value::Int(111)), (FieldPath(2), Value::from("wl1"))]);
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "1=111, 2=wl1");
/// assert!(DEFAULT_KEY.is_default());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(
    from = "Vec<(FieldPath, Value)>",
    into = "Vec<(FieldPath, Value)>"
)]
pub struct DimensionKey {
    values: Vec<(FieldPath, Value)>,
}

/// The key of an undimensioned metric: every event lands in this slice.
pub const DEFAULT_KEY: DimensionKey = DimensionKey { values: Vec::new() };

impl DimensionKey {
    pub fn new(values: impl IntoIterator<Item = (FieldPath, Value)>) -> Self {
        let mut values: Vec<_> = values.into_iter().collect();
        values.sort();
        Self { values }
    }

    pub fn is_default(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[(FieldPath, Value)] {
        &self.values
    }

    pub fn get(&self, path: FieldPath) -> Option<&Value> {
        self.values
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(FieldPath, Value)> for DimensionKey {
    fn from_iter<I: IntoIterator<Item = (FieldPath, Value)>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<Vec<(FieldPath, Value)>> for DimensionKey {
    fn from(values: Vec<(FieldPath, Value)>) -> Self {
        Self::new(values)
    }
}

impl From<DimensionKey> for Vec<(FieldPath, Value)> {
    fn from(key: DimensionKey) -> Self {
        key.values
    }
}

impl std::fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.values.is_empty() {
            return write!(f, "DEFAULT");
        }
        for (i, (path, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{path}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn uid_key(uid: i32) -> DimensionKey {
        DimensionKey::new([(FieldPath(0x0201_0101), Value::Int(uid))])
    }

    #[test]
    fn keys_order_lexicographically() {
        assert!(uid_key(111) < uid_key(222));
        assert!(DEFAULT_KEY < uid_key(i32::MIN));

        let short = DimensionKey::new([(FieldPath(1), Value::Int(5))]);
        let long = DimensionKey::new([(FieldPath(1), Value::Int(5)), (FieldPath(2), Value::Int(0))]);
        assert!(short < long);
    }

    #[test]
    fn keys_usable_as_map_keys() {
        let mut counts = HashMap::new();
        *counts.entry(uid_key(111)).or_insert(0) += 1;
        *counts.entry(uid_key(111)).or_insert(0) += 1;
        *counts.entry(uid_key(222)).or_insert(0) += 1;
        assert_eq!(counts[&uid_key(111)], 2);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn deserialized_key_is_sorted() {
        let json = r#"[[2,{"type":"int","value":1}],[1,{"type":"int","value":9}]]"#;
        let key: DimensionKey = serde_json::from_str(json).unwrap();
        assert_eq!(key.values()[0].0, FieldPath(1));
        assert_eq!(key.get(FieldPath(2)), Some(&Value::Int(1)));
        assert_eq!(key.to_string(), "1=9, 2=1");
    }

    #[test]
    fn default_key_displays_as_default() {
        assert_eq!(DEFAULT_KEY.to_string(), "DEFAULT");
        assert_eq!(DimensionKey::default(), DEFAULT_KEY);
    }
}
