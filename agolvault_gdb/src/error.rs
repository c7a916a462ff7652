use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GdbError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("geodatabase already exists at {0}")]
    ContainerExists(PathBuf),

    #[error("no geodatabase at {0}")]
    ContainerMissing(PathBuf),

    #[error("feature class '{0}' already exists in this geodatabase")]
    DuplicateFeatureClass(String),

    #[error("invalid feature class name '{0}'")]
    InvalidFeatureClassName(String),

    #[error("invalid field name '{0}'")]
    InvalidFieldName(String),

    #[error("malformed feature collection: {0}")]
    MalformedCollection(&'static str),

    #[error("feature decoding failed: {0}")]
    Decode(#[from] serde_json::Error),
}
