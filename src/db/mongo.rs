//! MongoDB client and typed collection wrapper
//!
//! Collections declare their own indexes via [`IntoIndexes`]; the wrapper
//! applies them on first use, stamps document [`Metadata`], and filters
//! soft-deleted documents out of every read.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{error, info};

use crate::types::{GuardianError, Result};

/// Common bookkeeping embedded in every document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    /// Soft-delete marker; reads skip documents with this set
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

/// Trait for schemas that declare their index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify the database is reachable.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Bounded server selection so an unreachable MongoDB fails fast
        let timeout_uri = if uri.contains('?') {
            format!("{uri}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000")
        } else {
            format!("{uri}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000")
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| GuardianError::Store(format!("Failed to connect to MongoDB: {e}")))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| GuardianError::Store(format!("MongoDB ping failed: {e}")))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection, applying its schema-declared indexes.
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Raw MongoDB client for operations outside the wrapper.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing and soft-delete
/// filtering
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a collection handle and apply its indexes.
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let wrapped = MongoCollection { inner: collection };
        wrapped.apply_indexes().await?;
        Ok(wrapped)
    }

    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();
        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| GuardianError::Store(format!("Failed to create indexes: {e}")))?;

        Ok(())
    }

    /// Insert a document, stamping metadata timestamps.
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| GuardianError::Store(format!("Insert failed: {e}")))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| GuardianError::Store("Failed to get inserted ID".into()))
    }

    /// Find one live document by filter.
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .find_one(full_filter)
            .await
            .map_err(|e| GuardianError::Store(format!("Find failed: {e}")))
    }

    /// Find all live documents matching the filter.
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>> {
        use futures_util::StreamExt;

        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let cursor = self
            .inner
            .find(full_filter)
            .await
            .map_err(|e| GuardianError::Store(format!("Find failed: {e}")))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Replace a live document, refreshing its updated timestamp.
    pub async fn replace_one(&self, filter: Document, mut item: T) -> Result<UpdateResult> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.updated_at = Some(DateTime::now());

        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .replace_one(full_filter, item)
            .await
            .map_err(|e| GuardianError::Store(format!("Replace failed: {e}")))
    }

    /// Apply an update document.
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| GuardianError::Store(format!("Update failed: {e}")))
    }

    /// Soft delete a document.
    pub async fn soft_delete(&self, filter: Document) -> Result<UpdateResult> {
        let update = doc! {
            "$set": {
                "metadata.is_deleted": true,
                "metadata.deleted_at": DateTime::now(),
                "metadata.updated_at": DateTime::now(),
            }
        };

        self.update_one(filter, update).await
    }

    /// Underlying collection for queries the wrapper does not model
    /// (sorted/limited finds and the like).
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}
