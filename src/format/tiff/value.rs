//! Loosely typed tag values.
//!
//! Callers describe metadata with plain numbers, number lists and strings;
//! the wire type comes from the catalog when the value is encoded. The same
//! representation is produced when a directory is read back.

use bytes::Bytes;
use serde::Deserialize;

/// A tag or GeoKey value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    /// A single number.
    Number(f64),

    /// A list of numbers.
    Numbers(Vec<f64>),

    /// Text, written as NUL-terminated ASCII.
    Text(String),

    /// Opaque bytes (BYTE / UNDEFINED payloads such as JPEG tables).
    #[serde(skip)]
    Bytes(Bytes),
}

impl TagValue {
    /// Number of wire elements, not counting an ASCII terminator.
    pub fn len(&self) -> usize {
        match self {
            TagValue::Number(_) => 1,
            TagValue::Numbers(values) => values.len(),
            TagValue::Text(text) => text.len(),
            TagValue::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric view of the value; `None` for text.
    pub fn to_numbers(&self) -> Option<Vec<f64>> {
        match self {
            TagValue::Number(value) => Some(vec![*value]),
            TagValue::Numbers(values) => Some(values.clone()),
            TagValue::Bytes(bytes) => Some(bytes.iter().map(|b| f64::from(*b)).collect()),
            TagValue::Text(_) => None,
        }
    }

    /// First numeric element, if any.
    pub fn first_number(&self) -> Option<f64> {
        match self {
            TagValue::Number(value) => Some(*value),
            TagValue::Numbers(values) => values.first().copied(),
            TagValue::Bytes(bytes) => bytes.first().map(|b| f64::from(*b)),
            TagValue::Text(_) => None,
        }
    }

    /// Numeric elements as unsigned integers.
    ///
    /// Returns `None` for text or when any element is negative or fractional.
    pub fn to_u64_vec(&self) -> Option<Vec<u64>> {
        self.to_numbers()?
            .into_iter()
            .map(|v| {
                if v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 {
                    Some(v as u64)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Text content with any trailing NUL removed.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(text) => Some(text.trim_end_matches('\0')),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            TagValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for TagValue {
                fn from(value: $ty) -> Self {
                    TagValue::Number(f64::from(value))
                }
            }

            impl From<Vec<$ty>> for TagValue {
                fn from(values: Vec<$ty>) -> Self {
                    TagValue::Numbers(values.into_iter().map(f64::from).collect())
                }
            }

            impl From<&[$ty]> for TagValue {
                fn from(values: &[$ty]) -> Self {
                    TagValue::Numbers(values.iter().copied().map(f64::from).collect())
                }
            }
        )*
    };
}

impl_from_number!(u16, u32, i16, i32, f32, f64);

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Text(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Text(value)
    }
}

impl From<Bytes> for TagValue {
    fn from(value: Bytes) -> Self {
        TagValue::Bytes(value)
    }
}
