// Document store - typed, timestamped CRUD over named collections.
// One SQLite table holds every collection's rows as JSON; filters are simple
// equality/membership predicates evaluated over the document JSON. Each
// operation is atomic for its single row, nothing more.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::id_generator::IdGenerator;

/// Opaque document id. Unique across all collections of one store.
pub type Id = i64;

/// Base document shape shared by every entity: id plus timestamps, with the
/// entity's own fields flattened alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doc<T> {
    #[serde(rename = "_id")]
    pub id: Id,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: T,
}

#[derive(Debug, Clone)]
enum Predicate {
    Eq(Value),
    Contains(Value),
}

/// Conjunction of field predicates, applied to the document JSON.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    predicates: Vec<(String, Predicate)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: Id) -> Self {
        Self::new().eq("_id", id)
    }

    /// Field equals value.
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.predicates.push((field.to_string(), Predicate::Eq(value.into())));
        self
    }

    /// Array-valued field contains value.
    pub fn contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.predicates
            .push((field.to_string(), Predicate::Contains(value.into())));
        self
    }

    fn matches(&self, doc: &Value) -> bool {
        self.predicates.iter().all(|(field, pred)| match pred {
            Predicate::Eq(expected) => doc.get(field) == Some(expected),
            Predicate::Contains(expected) => doc
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(expected)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Read options: a single-field ascending/descending sort.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub sort: Option<(String, SortOrder)>,
}

impl ReadOptions {
    pub fn sort(field: &str, order: SortOrder) -> Self {
        Self {
            sort: Some((field.to_string(), order)),
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        // Timestamps serialize as RFC 3339 with variable fractional-second
        // width, so they must compare chronologically, not lexically.
        (Value::String(x), Value::String(y)) => match (
            DateTime::parse_from_rfc3339(x),
            DateTime::parse_from_rfc3339(y),
        ) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Raw row as the backend stores it.
#[derive(Debug, Clone)]
pub struct RawDoc {
    pub id: Id,
    pub data: String,
}

/// Storage backend seam. The store only needs per-row insert/scan/update/
/// delete from the underlying engine; filtering and ordering live above it.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn insert(
        &self,
        collection: &str,
        id: Id,
        data: &str,
        created_ms: i64,
        updated_ms: i64,
    ) -> AppResult<()>;

    /// Every row of a collection, ordered by id ascending.
    async fn scan(&self, collection: &str) -> AppResult<Vec<RawDoc>>;

    async fn update(&self, collection: &str, id: Id, data: &str, updated_ms: i64)
        -> AppResult<bool>;

    async fn remove(&self, collection: &str, id: Id) -> AppResult<bool>;
}

/// SQLite backend over a sqlx connection pool.
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        // A single connection keeps in-memory databases coherent and is
        // plenty for SQLite's serialized writes.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY,
                collection TEXT NOT NULL,
                data TEXT NOT NULL,
                created INTEGER NOT NULL,
                updated INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for SqliteBackend {
    async fn insert(
        &self,
        collection: &str,
        id: Id,
        data: &str,
        created_ms: i64,
        updated_ms: i64,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO documents (id, collection, data, created, updated) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(collection)
        .bind(data)
        .bind(created_ms)
        .bind(updated_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn scan(&self, collection: &str) -> AppResult<Vec<RawDoc>> {
        let rows = sqlx::query("SELECT id, data FROM documents WHERE collection = ? ORDER BY id ASC")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| RawDoc {
                id: row.get::<i64, _>(0),
                data: row.get::<String, _>(1),
            })
            .collect())
    }

    async fn update(
        &self,
        collection: &str,
        id: Id,
        data: &str,
        updated_ms: i64,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE documents SET data = ?, updated = ? WHERE collection = ? AND id = ?",
        )
        .bind(data)
        .bind(updated_ms)
        .bind(collection)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, collection: &str, id: Id) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Handle to one document database. Cheap to clone; concepts derive their
/// typed collections from it at construction.
#[derive(Clone)]
pub struct DocStore {
    backend: Arc<dyn StoreBackend>,
    ids: Arc<IdGenerator>,
}

impl DocStore {
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let backend = SqliteBackend::connect(database_url).await?;
        backend.init().await?;
        Ok(Self::with_backend(Arc::new(backend)))
    }

    pub fn with_backend(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend,
            ids: Arc::new(IdGenerator::new(0)),
        }
    }

    pub fn collection<T>(&self, name: &'static str) -> DocCollection<T> {
        DocCollection {
            backend: self.backend.clone(),
            ids: self.ids.clone(),
            name,
            _marker: PhantomData,
        }
    }
}

/// Typed view over one named collection.
pub struct DocCollection<T> {
    backend: Arc<dyn StoreBackend>,
    ids: Arc<IdGenerator>,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for DocCollection<T> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            ids: self.ids.clone(),
            name: self.name,
            _marker: PhantomData,
        }
    }
}

impl<T> DocCollection<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Insert a new document, assigning id and timestamps. Returns the id.
    pub async fn create_one(&self, fields: T) -> AppResult<Id> {
        let id = self.ids.next_id();
        let now = Utc::now();
        let doc = Doc {
            id,
            created: now,
            updated: now,
            fields,
        };
        let data = serde_json::to_string(&doc).map_err(anyhow::Error::from)?;
        self.backend
            .insert(self.name, id, &data, now.timestamp_millis(), now.timestamp_millis())
            .await?;
        tracing::debug!(collection = self.name, id, "created document");
        Ok(id)
    }

    async fn scan_matching(&self, filter: &Filter) -> AppResult<Vec<Value>> {
        let rows = self.backend.scan(self.name).await?;
        let mut matches = Vec::new();
        for row in rows {
            let value: Value = serde_json::from_str(&row.data).map_err(anyhow::Error::from)?;
            if filter.matches(&value) {
                matches.push(value);
            }
        }
        Ok(matches)
    }

    /// First match in id order, or none.
    pub async fn read_one(&self, filter: Filter) -> AppResult<Option<Doc<T>>> {
        let mut matches = self.scan_matching(&filter).await?;
        if matches.is_empty() {
            return Ok(None);
        }
        let value = matches.swap_remove(0);
        let doc = serde_json::from_value(value).map_err(anyhow::Error::from)?;
        Ok(Some(doc))
    }

    pub async fn read_by_id(&self, id: Id) -> AppResult<Option<Doc<T>>> {
        self.read_one(Filter::by_id(id)).await
    }

    /// All matches, optionally sorted on a single field.
    pub async fn read_many(&self, filter: Filter, options: ReadOptions) -> AppResult<Vec<Doc<T>>> {
        let mut matches = self.scan_matching(&filter).await?;
        if let Some((field, order)) = &options.sort {
            matches.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(field).unwrap_or(&Value::Null),
                    b.get(field).unwrap_or(&Value::Null),
                );
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }
        matches
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(|e| anyhow::Error::from(e).into()))
            .collect()
    }

    pub async fn count(&self, filter: Filter) -> AppResult<usize> {
        Ok(self.scan_matching(&filter).await?.len())
    }

    /// Merge the given top-level fields into the first match and refresh its
    /// `updated` timestamp. Silent no-op when nothing matches; callers do
    /// their own existence checks. `_id`, `created` and `updated` cannot be
    /// rewritten through this path.
    pub async fn update_one(&self, filter: Filter, changes: &Map<String, Value>) -> AppResult<()> {
        let mut matches = self.scan_matching(&filter).await?;
        if matches.is_empty() {
            return Ok(());
        }
        let mut value = matches.swap_remove(0);
        let id = value
            .get("_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| AppError::Database(anyhow::anyhow!("document missing _id")))?;

        let now = Utc::now();
        let object = value
            .as_object_mut()
            .ok_or_else(|| AppError::Database(anyhow::anyhow!("document is not an object")))?;
        for (key, new_value) in changes {
            if matches!(key.as_str(), "_id" | "created" | "updated") {
                continue;
            }
            object.insert(key.clone(), new_value.clone());
        }
        object.insert(
            "updated".to_string(),
            serde_json::to_value(now).map_err(anyhow::Error::from)?,
        );

        let data = serde_json::to_string(&value).map_err(anyhow::Error::from)?;
        self.backend
            .update(self.name, id, &data, now.timestamp_millis())
            .await?;
        tracing::debug!(collection = self.name, id, "updated document");
        Ok(())
    }

    /// Remove at most one match. Returns whether a document was deleted.
    pub async fn delete_one(&self, filter: Filter) -> AppResult<bool> {
        let mut matches = self.scan_matching(&filter).await?;
        if matches.is_empty() {
            return Ok(false);
        }
        let id = matches
            .swap_remove(0)
            .get("_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| AppError::Database(anyhow::anyhow!("document missing _id")))?;
        let removed = self.backend.remove(self.name, id).await?;
        if removed {
            tracing::debug!(collection = self.name, id, "deleted document");
        }
        Ok(removed)
    }
}
