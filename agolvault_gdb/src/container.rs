use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use agolvault_core::time::Timestamp;
use futures_util::TryStreamExt;
use serde_json::Value;
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
};

use crate::{
    GdbError,
    features::{FeatureCollection, FieldType},
};

const GEOMETRY_COLUMN: &str = "geometry_json";

const CREATE_CATALOG_SQL: &str = "\
CREATE TABLE IF NOT EXISTS gdb_feature_classes (
    name TEXT PRIMARY KEY,
    geometry_type TEXT,
    feature_count INTEGER NOT NULL,
    created_at_epoch_millis INTEGER NOT NULL
)";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureClassSummary {
    pub name: String,
    pub field_count: usize,
    pub feature_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, FromRow)]
pub struct FeatureClassRecord {
    pub name: String,
    pub geometry_type: Option<String>,
    pub feature_count: i64,
}

/// Single-file geodatabase container: a catalog table plus one table per
/// feature class. Creation is deliberately not idempotent; the stamped
/// session directory is what keeps paths collision-free across runs.
#[derive(Clone, Debug)]
pub struct Geodatabase {
    pool: SqlitePool,
    path: PathBuf,
}

impl Geodatabase {
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, GdbError> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            return Err(GdbError::ContainerExists(path));
        }

        let pool = connect(&path, true).await?;
        sqlx::query(CREATE_CATALOG_SQL).execute(&pool).await?;
        Ok(Self { pool, path })
    }

    pub async fn open(path: impl AsRef<Path>) -> Result<Self, GdbError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(GdbError::ContainerMissing(path));
        }

        let pool = connect(&path, false).await?;
        Ok(Self { pool, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Materialize one layer's decoded query result as a feature class:
    /// one typed column per vendor field, geometry kept as its vendor JSON,
    /// one row per feature. Zero features yields an empty class.
    pub async fn create_feature_class(
        &self,
        name: &str,
        collection: &FeatureCollection,
    ) -> Result<FeatureClassSummary, GdbError> {
        validate_class_name(name)?;
        for field in &collection.fields {
            validate_field_name(&field.name)?;
        }
        if collection.fields.is_empty() {
            return Err(GdbError::MalformedCollection("fields array is empty"));
        }
        if self.has_feature_class(name).await? {
            return Err(GdbError::DuplicateFeatureClass(name.to_owned()));
        }

        let column_defs: Vec<String> = collection
            .fields
            .iter()
            .map(|field| format!("\"{}\" {}", field.name, field.field_type.sqlite_type()))
            .collect();
        let ddl = format!(
            "CREATE TABLE \"{name}\" ({}, \"{GEOMETRY_COLUMN}\" TEXT)",
            column_defs.join(", ")
        );
        sqlx::query(&ddl).execute(&self.pool).await?;

        let column_names: Vec<String> = collection
            .fields
            .iter()
            .map(|field| format!("\"{}\"", field.name))
            .collect();
        let placeholders: Vec<String> = (1..=collection.fields.len() + 1)
            .map(|position| format!("?{position}"))
            .collect();
        let insert = format!(
            "INSERT INTO \"{name}\" ({}, \"{GEOMETRY_COLUMN}\") VALUES ({})",
            column_names.join(", "),
            placeholders.join(", ")
        );

        for feature in &collection.features {
            let mut statement = sqlx::query(&insert);
            for field in &collection.fields {
                statement = bind_attribute(
                    statement,
                    field.field_type,
                    feature.attributes.get(&field.name),
                );
            }
            statement = statement.bind(feature.geometry.as_ref().map(Value::to_string));
            statement.execute(&self.pool).await?;
        }

        sqlx::query(
            "INSERT INTO gdb_feature_classes (name, geometry_type, feature_count, created_at_epoch_millis)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(name)
        .bind(&collection.geometry_type)
        .bind(collection.features.len() as i64)
        .bind(Timestamp::now().as_epoch_millis())
        .execute(&self.pool)
        .await?;

        Ok(FeatureClassSummary {
            name: name.to_owned(),
            field_count: collection.fields.len(),
            feature_count: collection.features.len(),
        })
    }

    pub async fn feature_classes(&self) -> Result<Vec<FeatureClassRecord>, GdbError> {
        let mut rows = sqlx::query_as::<_, FeatureClassRecord>(
            "SELECT name, geometry_type, feature_count FROM gdb_feature_classes ORDER BY name",
        )
        .fetch(&self.pool);

        let mut records = Vec::new();
        while let Some(row) = rows.try_next().await? {
            records.push(row);
        }
        Ok(records)
    }

    pub async fn feature_count(&self, name: &str) -> Result<i64, GdbError> {
        validate_class_name(name)?;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{name}\""))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn column_names(&self, name: &str) -> Result<Vec<String>, GdbError> {
        validate_class_name(name)?;
        let mut rows = sqlx::query_scalar::<_, String>(
            "SELECT name FROM pragma_table_info(?1) ORDER BY cid",
        )
        .bind(name)
        .fetch(&self.pool);

        let mut names = Vec::new();
        while let Some(column) = rows.try_next().await? {
            names.push(column);
        }
        Ok(names)
    }

    async fn has_feature_class(&self, name: &str) -> Result<bool, GdbError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM gdb_feature_classes WHERE name = ?1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool, GdbError> {
    let connect_options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(connect_options)
        .await?;
    Ok(pool)
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_attribute<'q>(
    statement: SqliteQuery<'q>,
    field_type: FieldType,
    value: Option<&Value>,
) -> SqliteQuery<'q> {
    let value = match value {
        None | Some(Value::Null) => return statement.bind(None::<String>),
        Some(value) => value,
    };

    match field_type.sqlite_type() {
        "INTEGER" => statement.bind(value.as_i64()),
        "REAL" => statement.bind(value.as_f64()),
        _ => match value {
            Value::String(text) => statement.bind(text.clone()),
            other => statement.bind(other.to_string()),
        },
    }
}

fn validate_class_name(name: &str) -> Result<(), GdbError> {
    if name.is_empty() || !name.chars().all(char::is_alphanumeric) {
        return Err(GdbError::InvalidFeatureClassName(name.to_owned()));
    }
    Ok(())
}

fn validate_field_name(name: &str) -> Result<(), GdbError> {
    let well_formed =
        !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    if !well_formed || name.eq_ignore_ascii_case(GEOMETRY_COLUMN) {
        return Err(GdbError::InvalidFieldName(name.to_owned()));
    }
    Ok(())
}
