//! Data source seams
//!
//! The analyzer only sees these traits, so fixtures, files, and remote
//! services are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

use crate::models::{AnalysisBundle, AppError, AppResult, Collection, Snapshot};

/// Raw rows for the four input collections
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch raw rows for one collection
    async fn fetch(&self, collection: Collection) -> AppResult<Vec<Value>>;

    async fn fetch_entities(&self) -> AppResult<Vec<Value>> {
        self.fetch(Collection::Entities).await
    }

    async fn fetch_relationships(&self) -> AppResult<Vec<Value>> {
        self.fetch(Collection::Relationships).await
    }

    async fn fetch_cases(&self) -> AppResult<Vec<Value>> {
        self.fetch(Collection::Cases).await
    }

    async fn fetch_districts(&self) -> AppResult<Vec<Value>> {
        self.fetch(Collection::Districts).await
    }

    /// Short label for logs
    fn describe(&self) -> String;
}

/// Externally hosted computation of the same bundle contract
#[async_trait]
pub trait AuthoritativeEngine: Send + Sync {
    async fn analyze(&self, now: DateTime<Utc>) -> AppResult<AnalysisBundle>;

    fn describe(&self) -> String;
}

/// In-memory rows; a missing collection reports `INPUT_UNAVAILABLE`
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    rows: HashMap<Collection, Vec<Value>>,
}

impl StaticSource {
    /// All four collections present and empty
    pub fn new() -> Self {
        let rows = Collection::ALL.iter().map(|&c| (c, Vec::new())).collect();
        Self { rows }
    }

    /// No collection available at all
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, collection: Collection, rows: Vec<Value>) -> Self {
        self.rows.insert(collection, rows);
        self
    }

    /// Drop a collection so fetching it fails
    pub fn without(mut self, collection: Collection) -> Self {
        self.rows.remove(&collection);
        self
    }

    /// Rows from typed records
    pub fn from_snapshot(snapshot: &Snapshot) -> AppResult<Self> {
        fn rows<T: serde::Serialize>(records: &[T]) -> AppResult<Vec<Value>> {
            records
                .iter()
                .map(|r| serde_json::to_value(r).map_err(AppError::from))
                .collect()
        }

        Ok(Self::new()
            .with_rows(Collection::Entities, rows(&snapshot.entities)?)
            .with_rows(Collection::Relationships, rows(&snapshot.relationships)?)
            .with_rows(Collection::Cases, rows(&snapshot.cases)?)
            .with_rows(Collection::Districts, rows(&snapshot.districts)?))
    }
}

#[async_trait]
impl DataSource for StaticSource {
    async fn fetch(&self, collection: Collection) -> AppResult<Vec<Value>> {
        self.rows
            .get(&collection)
            .cloned()
            .ok_or_else(|| AppError::input_unavailable(collection, "collection not provided"))
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}
