//! Directory-backed source: one `<collection>.json` array per collection

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::{AppError, AppResult, Collection};
use crate::providers::source::DataSource;

/// Accepts a bare array or an object wrapping it under `rows`
pub fn rows_from_value(collection: Collection, value: Value) -> AppResult<Vec<Value>> {
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut obj) => match obj.remove("rows") {
            Some(Value::Array(rows)) => Ok(rows),
            _ => Err(AppError::input_malformed(
                collection,
                "expected a JSON array or an object with a `rows` array",
            )),
        },
        _ => Err(AppError::input_malformed(collection, "expected a JSON array")),
    }
}

#[derive(Debug, Clone)]
pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.as_str()))
    }
}

#[async_trait]
impl DataSource for JsonFileSource {
    async fn fetch(&self, collection: Collection) -> AppResult<Vec<Value>> {
        let path = self.path_for(collection);
        debug!("Reading {}", path.display());

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            AppError::input_unavailable(collection, format!("{}: {}", path.display(), e))
        })?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::input_malformed(collection, e.to_string()))?;

        rows_from_value(collection, value)
    }

    fn describe(&self) -> String {
        format!("dir:{}", self.dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_rows_envelope() {
        let rows = rows_from_value(Collection::Cases, json!({"rows": [{"id": 1}]})).unwrap();
        assert_eq!(rows.len(), 1);
        let err = rows_from_value(Collection::Cases, json!("nope")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InputMalformed);
    }

    #[tokio::test]
    async fn test_reads_collection_file() {
        let dir = std::env::temp_dir().join(format!("netrisk-file-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("districts.json"), r#"[{"id": 1, "name": "Mysore"}]"#)
            .await
            .unwrap();

        let source = JsonFileSource::new(&dir);
        assert_eq!(source.fetch_districts().await.unwrap().len(), 1);

        let err = source.fetch_entities().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InputUnavailable);
        assert_eq!(err.collection, Some(Collection::Entities));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
