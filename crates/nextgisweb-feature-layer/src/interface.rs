//! Field types and resource interfaces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use nextgisweb_core::{NgwError, ValidationError};
use nextgisweb_resource::Interface;

/// Provided by resources that carry a field schema.
pub const IFEATURE_LAYER: Interface = Interface("IFeatureLayer");

/// Provided by styles of feature layers.
pub const IFEATURE_LAYER_STYLE: Interface = Interface("IFeatureLayerStyle");

/// Data type of a layer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    Integer,
    Real,
    String,
    Date,
    Time,
    Datetime,
}

impl FieldType {
    /// All field types in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Integer,
        Self::Real,
        Self::String,
        Self::Date,
        Self::Time,
        Self::Datetime,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::String => "STRING",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Datetime => "DATETIME",
        }
    }

    /// SQL check constraint restricting `column` to field type names.
    pub fn check_sql(column: &str) -> String {
        let names: Vec<String> = Self::ALL
            .iter()
            .map(|t| format!("'{}'", t.as_str()))
            .collect();
        format!("\"{column}\" IN ({})", names.join(", "))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = NgwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                ValidationError::new(format!("Unknown field datatype '{s}'."), "invalid")
                    .with_param("datatype", s)
                    .into()
            })
    }
}
