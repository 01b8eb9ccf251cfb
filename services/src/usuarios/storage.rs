//! Usuario storage trait and implementations.
//!
//! The module follows the repository pattern:
//! - `UsuarioStorage`: the gateway contract used by the operations layer
//! - `MongoUsuarioStorage`: the `usuarios` collection in MongoDB
//! - `MockUsuarioStorage`: in-memory implementation for tests
//!
//! Neither implementation reports "not found" as an error: replace and
//! delete return the number of matched records and leave the decision to
//! the caller.

use super::model::{StoredUsuario, Usuario};
use super::record::{self, RecordError};
use futures::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Document, doc, oid::ObjectId},
    error::{ErrorKind, WriteError, WriteFailure},
    options::IndexOptions,
};
use std::future::Future;
use std::sync::{Arc, RwLock};

/// Name of the MongoDB collection holding users.
pub const COLLECTION: &str = "usuarios";

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Error type for usuario storage operations.
#[derive(Debug, thiserror::Error)]
pub enum UsuarioStorageError {
    /// An insert hit the unique `cedula` constraint.
    #[error("Duplicate cedula: {0}")]
    DuplicateCedula(String),

    /// A stored record could not be mapped to a `Usuario`.
    #[error("Malformed record: {0}")]
    MalformedRecord(#[from] RecordError),

    /// The database failed or could not be reached.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Gateway over the collection of users.
///
/// Implementations must be safe to share across concurrent requests.
pub trait UsuarioStorage: Clone + Send + Sync + 'static {
    /// Returns whether the backing database answers.
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// Returns every stored user in storage order.
    fn find_all(
        &self,
    ) -> impl Future<Output = Result<Vec<StoredUsuario>, UsuarioStorageError>> + Send;

    /// Returns the user with the given `cedula`, if any.
    fn find_by_cedula(
        &self,
        cedula: &str,
    ) -> impl Future<Output = Result<Option<StoredUsuario>, UsuarioStorageError>> + Send;

    /// Inserts a user and returns the generated identifier as a string.
    ///
    /// Fails with `DuplicateCedula` when the store itself detects a
    /// conflicting `cedula`.
    fn insert(
        &self,
        usuario: &Usuario,
    ) -> impl Future<Output = Result<String, UsuarioStorageError>> + Send;

    /// Overwrites every field but `cedula` of the matching user.
    ///
    /// Returns the number of matched records (0 or 1).
    fn replace_by_cedula(
        &self,
        cedula: &str,
        usuario: &Usuario,
    ) -> impl Future<Output = Result<u64, UsuarioStorageError>> + Send;

    /// Deletes the matching user and returns the number removed (0 or 1).
    fn delete_by_cedula(
        &self,
        cedula: &str,
    ) -> impl Future<Output = Result<u64, UsuarioStorageError>> + Send;
}

/// In-memory mock implementation of `UsuarioStorage` for testing.
///
/// Records keep insertion order. The `cedula` check in `insert` runs under
/// the write lock, the same guarantee the unique index gives in MongoDB.
///
/// ```
/// use usuarios_services::usuarios::storage::MockUsuarioStorage;
///
/// let storage = MockUsuarioStorage::new();
/// assert!(storage.is_empty());
/// ```
#[derive(Clone, Default)]
pub struct MockUsuarioStorage {
    records: Arc<RwLock<Vec<StoredUsuario>>>,
    failing: bool,
}

impl MockUsuarioStorage {
    /// Creates a new empty `MockUsuarioStorage`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage whose every operation fails, as an unreachable
    /// database would.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Inserts a stored record as-is (builder pattern).
    pub fn with_record(self, record: StoredUsuario) -> Self {
        self.records.write().expect("lock poisoned").push(record);
        self
    }

    /// Returns the number of stored users.
    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no user is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns how many stored users carry the given `cedula`.
    pub fn count_cedula(&self, cedula: &str) -> usize {
        self.records
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|record| record.usuario.cedula == cedula)
            .count()
    }

    fn check_available(&self) -> Result<(), UsuarioStorageError> {
        if self.failing {
            return Err(UsuarioStorageError::StorageError(
                "MockUsuarioStorage: database unavailable".to_owned(),
            ));
        }
        Ok(())
    }
}

impl UsuarioStorage for MockUsuarioStorage {
    async fn is_connected(&self) -> bool {
        !self.failing
    }

    async fn find_all(&self) -> Result<Vec<StoredUsuario>, UsuarioStorageError> {
        self.check_available()?;
        Ok(self.records.read().expect("lock poisoned").clone())
    }

    async fn find_by_cedula(
        &self,
        cedula: &str,
    ) -> Result<Option<StoredUsuario>, UsuarioStorageError> {
        self.check_available()?;
        let records = self.records.read().expect("lock poisoned");
        Ok(records
            .iter()
            .find(|record| record.usuario.cedula == cedula)
            .cloned())
    }

    async fn insert(&self, usuario: &Usuario) -> Result<String, UsuarioStorageError> {
        self.check_available()?;
        let mut records = self.records.write().expect("lock poisoned");

        if records
            .iter()
            .any(|record| record.usuario.cedula == usuario.cedula)
        {
            return Err(UsuarioStorageError::DuplicateCedula(
                usuario.cedula.clone(),
            ));
        }

        let id = ObjectId::new().to_hex();
        records.push(StoredUsuario {
            id: id.clone(),
            usuario: usuario.clone(),
        });

        Ok(id)
    }

    async fn replace_by_cedula(
        &self,
        cedula: &str,
        usuario: &Usuario,
    ) -> Result<u64, UsuarioStorageError> {
        self.check_available()?;
        let mut records = self.records.write().expect("lock poisoned");

        match records
            .iter_mut()
            .find(|record| record.usuario.cedula == cedula)
        {
            Some(record) => {
                record.usuario = Usuario {
                    cedula: cedula.to_owned(),
                    ..usuario.clone()
                };
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_by_cedula(&self, cedula: &str) -> Result<u64, UsuarioStorageError> {
        self.check_available()?;
        let mut records = self.records.write().expect("lock poisoned");

        match records
            .iter()
            .position(|record| record.usuario.cedula == cedula)
        {
            Some(index) => {
                records.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

/// MongoDB implementation of `UsuarioStorage` for production use.
///
/// Works on raw documents; the mapping to `Usuario` lives in
/// [`record`](super::record). The driver's client is pooled and cheap to
/// clone, so one instance is built at startup and shared by all requests.
#[derive(Clone)]
pub struct MongoUsuarioStorage {
    database: Database,
    collection: Collection<Document>,
}

impl MongoUsuarioStorage {
    /// Creates a storage over the `usuarios` collection of `database`.
    pub fn new(database: &Database) -> Self {
        Self::with_collection(database, COLLECTION)
    }

    /// Creates a storage over an arbitrary collection of `database`.
    pub fn with_collection(database: &Database, collection: &str) -> Self {
        Self {
            database: database.clone(),
            collection: database.collection::<Document>(collection),
        }
    }

    /// Creates the unique index on `cedula`. Safe to call on every start.
    pub async fn ensure_indexes(&self) -> Result<(), UsuarioStorageError> {
        let index = IndexModel::builder()
            .keys(doc! { "cedula": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection
            .create_index(index)
            .await
            .map_err(|e| UsuarioStorageError::StorageError(e.to_string()))?;

        tracing::info!(collection = %self.collection.name(), "Unique index on cedula ensured");
        Ok(())
    }

    /// Best-effort [`ensure_indexes`](Self::ensure_indexes) for startup.
    ///
    /// A collection already holding duplicate `cedula`s cannot get the
    /// unique index. The failure is logged and the service keeps running on
    /// the create probe alone. Returns whether the index is in place.
    pub async fn try_ensure_indexes(&self) -> bool {
        match self.ensure_indexes().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "Unique index on cedula unavailable, concurrent creates may duplicate"
                );
                false
            }
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(WriteError {
            code: DUPLICATE_KEY_CODE,
            ..
        }))
    )
}

impl UsuarioStorage for MongoUsuarioStorage {
    async fn is_connected(&self) -> bool {
        self.database.run_command(doc! { "ping": 1 }).await.is_ok()
    }

    async fn find_all(&self) -> Result<Vec<StoredUsuario>, UsuarioStorageError> {
        let documents: Vec<Document> = self
            .collection
            .find(doc! {})
            .await
            .map_err(|e| UsuarioStorageError::StorageError(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| UsuarioStorageError::StorageError(e.to_string()))?;

        documents
            .iter()
            .map(|document| record::from_document(document).map_err(Into::into))
            .collect()
    }

    async fn find_by_cedula(
        &self,
        cedula: &str,
    ) -> Result<Option<StoredUsuario>, UsuarioStorageError> {
        let document = self
            .collection
            .find_one(record::cedula_filter(cedula))
            .await
            .map_err(|e| UsuarioStorageError::StorageError(e.to_string()))?;

        match document {
            Some(document) => Ok(Some(record::from_document(&document)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, usuario: &Usuario) -> Result<String, UsuarioStorageError> {
        let result = self
            .collection
            .insert_one(record::to_document(usuario))
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    UsuarioStorageError::DuplicateCedula(usuario.cedula.clone())
                } else {
                    UsuarioStorageError::StorageError(e.to_string())
                }
            })?;

        Ok(match result.inserted_id.as_object_id() {
            Some(oid) => oid.to_hex(),
            None => result.inserted_id.to_string(),
        })
    }

    async fn replace_by_cedula(
        &self,
        cedula: &str,
        usuario: &Usuario,
    ) -> Result<u64, UsuarioStorageError> {
        let result = self
            .collection
            .update_one(
                record::cedula_filter(cedula),
                doc! { "$set": record::replacement_fields(usuario) },
            )
            .await
            .map_err(|e| UsuarioStorageError::StorageError(e.to_string()))?;

        Ok(result.matched_count)
    }

    async fn delete_by_cedula(&self, cedula: &str) -> Result<u64, UsuarioStorageError> {
        let result = self
            .collection
            .delete_one(record::cedula_filter(cedula))
            .await
            .map_err(|e| UsuarioStorageError::StorageError(e.to_string()))?;

        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usuario(cedula: &str, nombre: &str) -> Usuario {
        Usuario {
            cedula: cedula.to_owned(),
            nombre: nombre.to_owned(),
            salario: 1500.5,
            fecha_nacimiento: "1992-03-14".to_owned(),
            fecha_ingreso: "2021-07-01".to_owned(),
            cargo: "Cajero".to_owned(),
            banco: Some("Banco Central".to_owned()),
        }
    }

    #[tokio::test]
    async fn test_mock_insert_and_find() {
        let storage = MockUsuarioStorage::new();

        let id = storage
            .insert(&usuario("1", "Ana"))
            .await
            .expect("should insert");

        let found = storage
            .find_by_cedula("1")
            .await
            .expect("should not error")
            .expect("should find");

        assert_eq!(found.id, id);
        assert_eq!(found.usuario.nombre, "Ana");
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_mock_insert_duplicate() {
        let storage = MockUsuarioStorage::new();

        storage
            .insert(&usuario("1", "Ana"))
            .await
            .expect("should insert");

        let result = storage.insert(&usuario("1", "Otra")).await;
        match result {
            Err(UsuarioStorageError::DuplicateCedula(cedula)) => assert_eq!(cedula, "1"),
            other => panic!("Expected DuplicateCedula, got {other:?}"),
        }
        assert_eq!(storage.count_cedula("1"), 1);
    }

    #[tokio::test]
    async fn test_mock_find_all_keeps_insertion_order() {
        let storage = MockUsuarioStorage::new();
        for (cedula, nombre) in [("3", "C"), ("1", "A"), ("2", "B")] {
            storage
                .insert(&usuario(cedula, nombre))
                .await
                .expect("should insert");
        }

        let cedulas: Vec<String> = storage
            .find_all()
            .await
            .expect("should list")
            .into_iter()
            .map(|record| record.usuario.cedula)
            .collect();

        assert_eq!(cedulas, vec!["3", "1", "2"]);
    }

    #[tokio::test]
    async fn test_mock_replace_keeps_cedula_and_id() {
        let storage = MockUsuarioStorage::new();
        let id = storage
            .insert(&usuario("1", "Ana"))
            .await
            .expect("should insert");

        let mut replacement = usuario("999", "Ana Maria");
        replacement.banco = None;

        let matched = storage
            .replace_by_cedula("1", &replacement)
            .await
            .expect("should replace");
        assert_eq!(matched, 1);

        let stored = storage
            .find_by_cedula("1")
            .await
            .expect("should not error")
            .expect("should still be found by the old cedula");
        assert_eq!(stored.id, id);
        assert_eq!(stored.usuario.nombre, "Ana Maria");
        assert_eq!(stored.usuario.banco, None);
        assert_eq!(storage.count_cedula("999"), 0);
    }

    #[tokio::test]
    async fn test_mock_replace_missing() {
        let storage = MockUsuarioStorage::new();

        let matched = storage
            .replace_by_cedula("404", &usuario("404", "Nadie"))
            .await
            .expect("should not error");

        assert_eq!(matched, 0);
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_mock_delete() {
        let storage = MockUsuarioStorage::new();
        storage
            .insert(&usuario("1", "Ana"))
            .await
            .expect("should insert");

        assert_eq!(storage.delete_by_cedula("1").await.expect("delete"), 1);
        assert_eq!(storage.delete_by_cedula("1").await.expect("delete"), 0);
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_mock_failing_storage() {
        let storage = MockUsuarioStorage::failing();

        assert!(!storage.is_connected().await);
        assert!(matches!(
            storage.find_all().await,
            Err(UsuarioStorageError::StorageError(_))
        ));
        assert!(matches!(
            storage.insert(&usuario("1", "Ana")).await,
            Err(UsuarioStorageError::StorageError(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_storage_is_clone() {
        let storage = MockUsuarioStorage::new();
        let clone = storage.clone();

        storage
            .insert(&usuario("1", "Ana"))
            .await
            .expect("should insert");

        assert_eq!(clone.len(), 1, "clones share the same records");
    }

    mod mongo {
        use super::*;
        use mongodb::Client;
        use std::env;

        // Each test gets its own collection, dropped again in `teardown`.
        async fn setup() -> MongoUsuarioStorage {
            let mongo_url = env::var("MONGO_URL").expect("MONGO_URL must be set");
            let mongo_db = env::var("MONGO_DB").expect("MONGO_DB must be set");

            let client = Client::with_uri_str(&mongo_url)
                .await
                .expect("Failed to create client.");
            let database = client.database(&mongo_db);
            let collection = format!("usuarios_test_{}", ObjectId::new().to_hex());

            let storage = MongoUsuarioStorage::with_collection(&database, &collection);
            storage
                .ensure_indexes()
                .await
                .expect("should create the cedula index");
            storage
        }

        async fn teardown(storage: &MongoUsuarioStorage) {
            storage
                .collection
                .drop()
                .await
                .expect("should drop the test collection");
        }

        #[tokio::test]
        #[ignore = "requires MONGO_URL and MONGO_DB pointing at a MongoDB server"]
        async fn test_mongo_crud_cycle() {
            let storage = setup().await;
            assert!(storage.is_connected().await);

            let id = storage
                .insert(&usuario("1", "Ana"))
                .await
                .expect("should insert");
            storage
                .insert(&usuario("2", "Luis"))
                .await
                .expect("should insert");

            let found = storage
                .find_by_cedula("1")
                .await
                .expect("should not error")
                .expect("should find");
            assert_eq!(found.id, id);
            assert_eq!(found.usuario, usuario("1", "Ana"));

            let all = storage.find_all().await.expect("should list");
            let cedulas: Vec<&str> = all.iter().map(|s| s.usuario.cedula.as_str()).collect();
            assert_eq!(cedulas, ["1", "2"]);

            let replacement = Usuario {
                cedula: "otra".to_owned(),
                banco: None,
                ..usuario("ignored", "Ana Lucia")
            };
            assert_eq!(
                storage
                    .replace_by_cedula("1", &replacement)
                    .await
                    .expect("should replace"),
                1
            );
            let replaced = storage
                .find_by_cedula("1")
                .await
                .expect("should not error")
                .expect("should keep the cedula");
            assert_eq!(replaced.id, id);
            assert_eq!(replaced.usuario.nombre, "Ana Lucia");
            assert_eq!(replaced.usuario.banco, None);
            assert_eq!(
                storage
                    .replace_by_cedula("404", &replacement)
                    .await
                    .expect("should not error"),
                0
            );

            assert_eq!(storage.delete_by_cedula("1").await.expect("delete"), 1);
            assert_eq!(storage.delete_by_cedula("1").await.expect("delete"), 0);
            assert!(
                storage
                    .find_by_cedula("1")
                    .await
                    .expect("should not error")
                    .is_none()
            );

            teardown(&storage).await;
        }

        #[tokio::test]
        #[ignore = "requires MONGO_URL and MONGO_DB pointing at a MongoDB server"]
        async fn test_mongo_duplicate_cedula_hits_unique_index() {
            let storage = setup().await;

            storage
                .insert(&usuario("1", "Ana"))
                .await
                .expect("should insert");
            let result = storage.insert(&usuario("1", "Otra")).await;

            match result {
                Err(UsuarioStorageError::DuplicateCedula(cedula)) => assert_eq!(cedula, "1"),
                other => panic!("Expected DuplicateCedula, got {other:?}"),
            }
            assert_eq!(storage.find_all().await.expect("should list").len(), 1);

            teardown(&storage).await;
        }

        #[tokio::test]
        #[ignore = "requires MONGO_URL and MONGO_DB pointing at a MongoDB server"]
        async fn test_mongo_existing_duplicates_do_not_block_startup() {
            let storage = setup().await;
            storage
                .collection
                .drop_index("cedula_1")
                .await
                .expect("should drop the cedula index");
            for nombre in ["Ana", "Ana otra vez"] {
                storage
                    .collection
                    .insert_one(record::to_document(&usuario("1", nombre)))
                    .await
                    .expect("raw insert should succeed without the index");
            }

            assert!(!storage.try_ensure_indexes().await);
            assert!(storage.ensure_indexes().await.is_err());

            assert_eq!(storage.find_all().await.expect("should list").len(), 2);
            storage
                .insert(&usuario("2", "Luis"))
                .await
                .expect("storage keeps serving writes");

            teardown(&storage).await;
        }

        #[tokio::test]
        #[ignore = "requires MONGO_URL and MONGO_DB pointing at a MongoDB server"]
        async fn test_mongo_ensure_indexes_is_idempotent() {
            let storage = setup().await;

            storage
                .ensure_indexes()
                .await
                .expect("second index creation should succeed");

            teardown(&storage).await;
        }
    }
}
