use serde::{Deserialize, Serialize};
use slicewatch_common::{DecodedEvent, DimensionKey, FieldPath, DEFAULT_KEY};

/// Fields whose values form a metric's slice key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionSpec {
    fields: Vec<FieldPath>,
}

impl DimensionSpec {
    pub fn new(fields: impl IntoIterator<Item = FieldPath>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    pub fn fields(&self) -> &[FieldPath] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Projects `event` onto the configured fields. No fields yields the
    /// default key; an event missing any of the fields yields `None`.
    pub fn project(&self, event: &DecodedEvent) -> Option<DimensionKey> {
        if self.fields.is_empty() {
            return Some(DEFAULT_KEY);
        }
        self.fields
            .iter()
            .map(|path| event.field(*path).map(|value| (*path, value.clone())))
            .collect::<Option<Vec<_>>>()
            .map(DimensionKey::new)
    }
}

impl From<Vec<FieldPath>> for DimensionSpec {
    fn from(fields: Vec<FieldPath>) -> Self {
        Self { fields }
    }
}
