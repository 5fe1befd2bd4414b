use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::{ExifError, Result};

/// The edit file: field names mapped to the values to write.
///
/// The file is YAML with a single top-level `exif` mapping. Since YAML is a
/// superset of JSON, a JSON document with the same shape also loads.
///
/// # Example
///
/// ```yaml
/// exif:
///   Make: NewCo
///   Orientation: 1
///   XResolution: [300, 1]
///   FNumber: 2.8
///   GPSLatitude: [[35, 1], [40, 1], [1234, 100]]
/// ```
///
/// ```rust,no_run
/// use bulk_exif::config::EditSet;
///
/// let edits = EditSet::load("edits.yaml".as_ref()).unwrap();
/// for (name, value) in edits.iter() {
///     println!("{name} = {value}");
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditSet {
    /// Field name → value. Names are matched exactly against the tag dictionary.
    pub exif: BTreeMap<String, EditValue>,
}

/// A dynamically typed value from the edit file, coerced to the tag's
/// type when it is applied.
///
/// Every YAML value loads. Kinds no tag type accepts (null, booleans,
/// mappings) fail per field when applied, not when the file is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EditValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<EditValue>),
    Map(BTreeMap<String, EditValue>),
}

impl fmt::Display for EditValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(fields) => {
                f.write_str("{")?;
                for (i, (key, item)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {item}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl EditSet {
    /// Load and parse an edit file. Any failure is a [`ExifError::ConfigLoad`].
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ExifError::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let edits = Self::parse(&contents).map_err(|message| ExifError::ConfigLoad {
            path: path.to_path_buf(),
            message,
        })?;

        log::info!(
            "Loaded {} field(s) from {}",
            edits.len(),
            path.display()
        );
        Ok(edits)
    }

    /// Parse edit-file contents.
    pub fn parse(contents: &str) -> std::result::Result<Self, String> {
        serde_yaml::from_str(contents).map_err(|e| e.to_string())
    }

    /// Fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EditValue)> {
        self.exif.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.exif.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exif.is_empty()
    }
}
