use serde::Deserialize;
use serde_json::{Map, Value};

use crate::GdbError;

/// Decoded vendor query result for one layer. Held only long enough to be
/// converted into a feature class; the raw JSON on disk is the durable copy.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FeatureCollection {
    #[serde(rename = "geometryType", default)]
    pub geometry_type: Option<String>,
    #[serde(rename = "spatialReference", default)]
    pub spatial_reference: Option<SpatialReference>,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// A payload without a `fields` array is not a feature collection; the
    /// check runs before serde so the caller gets a conversion error rather
    /// than a generic decode failure.
    pub fn decode(value: Value) -> Result<Self, GdbError> {
        if !value.is_object() {
            return Err(GdbError::MalformedCollection("payload is not an object"));
        }
        if value.get("fields").is_none() {
            return Err(GdbError::MalformedCollection("missing fields array"));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct SpatialReference {
    #[serde(default)]
    pub wkid: Option<i32>,
    #[serde(rename = "latestWkid", default)]
    pub latest_wkid: Option<i32>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub alias: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub enum FieldType {
    #[serde(rename = "esriFieldTypeOID")]
    Oid,
    #[serde(rename = "esriFieldTypeSmallInteger")]
    SmallInteger,
    #[serde(rename = "esriFieldTypeInteger")]
    Integer,
    #[serde(rename = "esriFieldTypeSingle")]
    Single,
    #[serde(rename = "esriFieldTypeDouble")]
    Double,
    #[serde(rename = "esriFieldTypeString")]
    Text,
    #[serde(rename = "esriFieldTypeDate")]
    Date,
    #[serde(rename = "esriFieldTypeGUID")]
    Guid,
    #[serde(rename = "esriFieldTypeGlobalID")]
    GlobalId,
    #[serde(other)]
    Other,
}

impl FieldType {
    /// Dates arrive as epoch milliseconds and stay integers.
    pub fn sqlite_type(self) -> &'static str {
        match self {
            Self::Oid | Self::SmallInteger | Self::Integer | Self::Date => "INTEGER",
            Self::Single | Self::Double => "REAL",
            Self::Text | Self::Guid | Self::GlobalId | Self::Other => "TEXT",
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub geometry: Option<Value>,
}
