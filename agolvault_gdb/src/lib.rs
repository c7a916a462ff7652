mod container;
mod error;
mod features;

pub use container::{FeatureClassRecord, FeatureClassSummary, Geodatabase};
pub use error::GdbError;
pub use features::{Feature, FeatureCollection, FieldDef, FieldType, SpatialReference};
