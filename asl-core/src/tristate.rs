use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The three states an optional path-like field (`InputPath`, `OutputPath`,
/// `ResultPath`) can be in on the wire: absent, explicitly `null`, or a
/// string value. Modeling this as `Option<String>` would collapse the gap
/// between "absent" and "explicit null", which §9 of the spec calls out
/// as observable (`null` discards, absence means identity).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TriState<T> {
    #[default]
    Unset,
    Null,
    Value(T),
}

impl<T> TriState<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, TriState::Unset)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TriState::Null)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            TriState::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn from_option_option(v: Option<Option<T>>) -> Self {
        match v {
            None => TriState::Unset,
            Some(None) => TriState::Null,
            Some(Some(value)) => TriState::Value(value),
        }
    }
}

/// Deserializes a field as `Option<Option<T>>` so serde can distinguish a
/// missing key (outer `None`) from an explicit `null` (`Some(None)`) from
/// a present value (`Some(Some(value))`). Use with
/// `#[serde(default, deserialize_with = "tristate_field")]`.
pub fn tristate_field<'de, D, T>(deserializer: D) -> Result<TriState<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(|v| TriState::from_option_option(Some(v)))
}

pub fn is_unset<T>(v: &TriState<T>) -> bool {
    v.is_unset()
}

/// Pair with [`tristate_field`] via `#[serde(serialize_with = "serialize_tristate_field")]`.
/// `Unset` fields should additionally be skipped with
/// `skip_serializing_if = "is_unset"` so they never reach this function.
pub fn serialize_tristate_field<T, S>(v: &TriState<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match v {
        TriState::Value(value) => value.serialize(serializer),
        TriState::Null | TriState::Unset => serializer.serialize_none(),
    }
}
