//! Lenient deserializers for the provisioning API's loosely typed JSON.
//!
//! The same field can come back as a bool, an integer or a string depending
//! on which endpoint you ask, and "nothing found" is sometimes `[]` where a
//! map would normally be.

use serde::de::{Deserialize, Deserializer};
use serde_derive::Deserialize;
use std::collections::BTreeMap;

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    fn into_bool(self) -> bool {
        match self {
            Scalar::Bool(b) => b,
            Scalar::Int(i) => i != 0,
            Scalar::Float(f) => f != 0.0,
            Scalar::Str(s) => matches!(s.trim(), "1" | "true" | "True"),
        }
    }

    fn into_string(self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Str(s) => s,
        }
    }

    fn into_count(self) -> u64 {
        match self {
            Scalar::Bool(b) => b as u64,
            Scalar::Int(i) => i.max(0) as u64,
            Scalar::Float(f) => f.max(0.0) as u64,
            Scalar::Str(s) => s.trim().parse().unwrap_or_default(),
        }
    }
}

/// `true`, `1` and `"1"` all mean yes. Missing or `null` means no.
pub(crate) fn bool_ish<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(de)?
        .map(Scalar::into_bool)
        .unwrap_or_default())
}

/// Accept any scalar and keep its textual form.
pub(crate) fn string_ish<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(de)?
        .map(Scalar::into_string)
        .unwrap_or_default())
}

pub(crate) fn count<'de, D>(de: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(de)?
        .map(Scalar::into_count)
        .unwrap_or_default())
}

/// Treat `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MapOrList<T> {
    Map(BTreeMap<String, T>),
    List(Vec<T>),
}

/// Read a keyed object, falling back to a list (keyed by position) because
/// LastPass answers `[]` when there is nothing to return.
pub(crate) fn map_or_list<'de, D, T>(
    de: D,
) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    match Option::<MapOrList<T>>::deserialize(de)? {
        Some(MapOrList::Map(map)) => Ok(map),
        Some(MapOrList::List(items)) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect()),
        None => Ok(BTreeMap::new()),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

/// Error messages are either a single string or a list of them.
pub(crate) fn string_or_list<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringOrList>::deserialize(de)? {
        Some(StringOrList::One(s)) if s.is_empty() => Ok(Vec::new()),
        Some(StringOrList::One(s)) => Ok(vec![s]),
        Some(StringOrList::Many(items)) => Ok(items),
        None => Ok(Vec::new()),
    }
}
