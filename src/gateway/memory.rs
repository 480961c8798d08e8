use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::gateway::{
    AuthError, AuthService, BlobStore, DocumentSnapshot, DocumentStore, Fields, GatewayError,
    Identity, SessionToken, StoredBlob, WriteOptions, WriteReceipt,
};
use crate::input::validate::is_valid_email;
use crate::models::courier::CourierId;

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    courier_id: CourierId,
    password: String,
}

/// Process-local stand-in for the managed backend. Used by the binary and
/// by the tests; `inject_failures` makes the next writes fail.
pub struct InMemoryBackend {
    accounts: DashMap<String, Account>,
    account_replays: DashMap<Uuid, CourierId>,
    sessions: DashMap<SessionToken, CourierId>,
    documents: DashMap<CourierId, DocumentSnapshot>,
    write_replays: DashMap<Uuid, u64>,
    blobs: DashMap<String, StoredBlob>,
    public_base_url: String,
    snapshots_tx: broadcast::Sender<DocumentSnapshot>,
    injected_failures: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new(public_base_url: impl Into<String>, event_buffer_size: usize) -> Self {
        let (snapshots_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            accounts: DashMap::new(),
            account_replays: DashMap::new(),
            sessions: DashMap::new(),
            documents: DashMap::new(),
            write_replays: DashMap::new(),
            blobs: DashMap::new(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            snapshots_tx,
            injected_failures: AtomicUsize::new(0),
        }
    }

    /// Makes the next `count` document writes or uploads fail as if the
    /// network dropped.
    pub fn inject_failures(&self, count: usize) {
        self.injected_failures.store(count, Ordering::SeqCst);
    }

    fn take_injected_failure(&self) -> Result<(), GatewayError> {
        let fired = self
            .injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if fired {
            Err(GatewayError::Unavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn open_session(&self, courier_id: CourierId) -> Identity {
        let token = Uuid::new_v4();
        self.sessions.insert(token, courier_id);
        Identity { courier_id, token }
    }

    fn guarded_write<F>(&self, options: WriteOptions, write: F) -> Result<WriteReceipt, GatewayError>
    where
        F: FnOnce() -> Result<DocumentSnapshot, GatewayError>,
    {
        let Some(key) = options.idempotency_key else {
            self.take_injected_failure()?;
            return Ok(self.commit(write()?));
        };

        match self.write_replays.entry(key) {
            Entry::Occupied(recorded) => {
                debug!(idempotency_key = %key, "replayed document write");
                Ok(WriteReceipt {
                    version: *recorded.get(),
                    replayed: true,
                })
            }
            Entry::Vacant(slot) => {
                self.take_injected_failure()?;
                let snapshot = write()?;
                slot.insert(snapshot.version);
                Ok(self.commit(snapshot))
            }
        }
    }

    fn commit(&self, snapshot: DocumentSnapshot) -> WriteReceipt {
        let version = snapshot.version;
        let _ = self.snapshots_tx.send(snapshot);
        WriteReceipt {
            version,
            replayed: false,
        }
    }

    fn merge(
        &self,
        id: CourierId,
        patch: Fields,
        expected_version: Option<u64>,
    ) -> Result<DocumentSnapshot, GatewayError> {
        let mut doc = self
            .documents
            .get_mut(&id)
            .ok_or(GatewayError::NotFound(id))?;
        check_version(&doc, expected_version)?;

        for (key, value) in patch {
            doc.fields.insert(key, value);
        }
        doc.version += 1;

        Ok(doc.value().clone())
    }
}

fn check_version(doc: &DocumentSnapshot, expected: Option<u64>) -> Result<(), GatewayError> {
    match expected {
        Some(expected) if expected != doc.version => Err(GatewayError::VersionConflict {
            id: doc.id,
            expected,
            actual: doc.version,
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl AuthService for InMemoryBackend {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        idempotency_key: Option<Uuid>,
    ) -> Result<Identity, AuthError> {
        if let Some(key) = idempotency_key {
            if let Some(courier_id) = self.account_replays.get(&key).map(|id| *id) {
                return Ok(self.open_session(courier_id));
            }
        }

        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }

        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Other {
                code: "auth/weak-password".to_string(),
                message: "Password should be at least 6 characters".to_string(),
            });
        }

        let courier_id = match self.accounts.entry(email.to_lowercase()) {
            Entry::Occupied(_) => return Err(AuthError::EmailAlreadyInUse),
            Entry::Vacant(slot) => {
                let courier_id = Uuid::new_v4();
                slot.insert(Account {
                    courier_id,
                    password: password.to_string(),
                });
                courier_id
            }
        };

        if let Some(key) = idempotency_key {
            self.account_replays.insert(key, courier_id);
        }

        Ok(self.open_session(courier_id))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let courier_id = self
            .accounts
            .get(&email.to_lowercase())
            .filter(|account| account.password == password)
            .map(|account| account.courier_id)
            .ok_or(AuthError::InvalidCredential)?;

        Ok(self.open_session(courier_id))
    }

    async fn current_identity(&self, token: SessionToken) -> Option<CourierId> {
        self.sessions.get(&token).map(|entry| *entry.value())
    }

    async fn sign_out(&self, token: SessionToken) {
        self.sessions.remove(&token);
    }
}

#[async_trait]
impl DocumentStore for InMemoryBackend {
    async fn create_document(
        &self,
        id: CourierId,
        fields: Fields,
        options: WriteOptions,
    ) -> Result<WriteReceipt, GatewayError> {
        self.guarded_write(options, || {
            let mut doc = self.documents.entry(id).or_insert_with(|| DocumentSnapshot {
                id,
                version: 0,
                fields: Fields::new(),
            });
            check_version(&doc, options.expected_version)?;

            doc.fields = fields;
            doc.version += 1;
            Ok(doc.value().clone())
        })
    }

    async fn read_document(&self, id: CourierId) -> Result<Option<DocumentSnapshot>, GatewayError> {
        Ok(self.documents.get(&id).map(|doc| doc.value().clone()))
    }

    async fn update_fields(
        &self,
        id: CourierId,
        patch: Fields,
        options: WriteOptions,
    ) -> Result<WriteReceipt, GatewayError> {
        self.guarded_write(options, || self.merge(id, patch, options.expected_version))
    }

    async fn overwrite_field(
        &self,
        id: CourierId,
        field: &str,
        value: Value,
        options: WriteOptions,
    ) -> Result<WriteReceipt, GatewayError> {
        let mut patch = Fields::new();
        patch.insert(field.to_string(), value);
        self.guarded_write(options, || self.merge(id, patch, options.expected_version))
    }

    fn watch(&self) -> broadcast::Receiver<DocumentSnapshot> {
        self.snapshots_tx.subscribe()
    }
}

#[async_trait]
impl BlobStore for InMemoryBackend {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), GatewayError> {
        self.take_injected_failure()?;
        self.blobs.insert(
            key.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn download_url(&self, key: &str) -> Result<String, GatewayError> {
        if !self.blobs.contains_key(key) {
            return Err(GatewayError::BlobNotFound(key.to_string()));
        }

        Ok(format!("{}/blobs/{key}", self.public_base_url))
    }

    async fn download(&self, key: &str) -> Result<StoredBlob, GatewayError> {
        self.blobs
            .get(key)
            .map(|blob| blob.value().clone())
            .ok_or_else(|| GatewayError::BlobNotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new("http://localhost:3000/", 16)
    }

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let backend = backend();
        backend
            .create_account("Ana@Example.com", "segredo1", None)
            .await
            .unwrap();

        let err = backend
            .create_account("ana@example.com", "outra123", None)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::EmailAlreadyInUse);
        assert_eq!(err.code(), "auth/email-already-in-use");
    }

    #[tokio::test]
    async fn replayed_account_creation_returns_same_courier() {
        let backend = backend();
        let key = Uuid::new_v4();

        let first = backend
            .create_account("ana@example.com", "segredo1", Some(key))
            .await
            .unwrap();
        let second = backend
            .create_account("ana@example.com", "segredo1", Some(key))
            .await
            .unwrap();

        assert_eq!(first.courier_id, second.courier_id);
    }

    #[tokio::test]
    async fn sign_in_checks_password_and_sessions_end() {
        let backend = backend();
        let created = backend
            .create_account("ana@example.com", "segredo1", None)
            .await
            .unwrap();

        assert_eq!(
            backend.sign_in("ana@example.com", "errada1").await,
            Err(AuthError::InvalidCredential)
        );

        let identity = backend.sign_in("ANA@example.com", "segredo1").await.unwrap();
        assert_eq!(identity.courier_id, created.courier_id);
        assert_eq!(
            backend.current_identity(identity.token).await,
            Some(created.courier_id)
        );

        backend.sign_out(identity.token).await;
        assert_eq!(backend.current_identity(identity.token).await, None);
    }

    #[tokio::test]
    async fn sequential_merges_preserve_siblings() {
        let backend = backend();
        let id = Uuid::new_v4();
        backend
            .create_document(id, fields(json!({ "available": false })), WriteOptions::default())
            .await
            .unwrap();

        backend
            .update_fields(
                id,
                fields(json!({ "vehicle": { "type": "moto", "model": "CG", "plate": "ABC1D23" } })),
                WriteOptions::default(),
            )
            .await
            .unwrap();
        backend
            .update_fields(
                id,
                fields(json!({ "banking": { "bank": "BB", "branch": "1234-5", "account": "12345" } })),
                WriteOptions::default(),
            )
            .await
            .unwrap();

        let doc = backend.read_document(id).await.unwrap().unwrap();
        assert_eq!(doc.version, 3);
        assert_eq!(doc.fields["available"], false);
        assert_eq!(doc.fields["vehicle"]["plate"], "ABC1D23");
        assert_eq!(doc.fields["banking"]["branch"], "1234-5");
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let backend = backend();
        let id = Uuid::new_v4();
        let receipt = backend
            .create_document(id, Fields::new(), WriteOptions::default())
            .await
            .unwrap();

        backend
            .overwrite_field(id, "photo_url", json!("a"), WriteOptions::default().expecting(receipt.version))
            .await
            .unwrap();

        let err = backend
            .overwrite_field(id, "photo_url", json!("b"), WriteOptions::default().expecting(receipt.version))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn idempotent_write_applies_once() {
        let backend = backend();
        let id = Uuid::new_v4();
        backend
            .create_document(id, Fields::new(), WriteOptions::default())
            .await
            .unwrap();

        let options = WriteOptions::idempotent(Some(Uuid::new_v4()));
        let first = backend
            .update_fields(id, fields(json!({ "available": true })), options)
            .await
            .unwrap();
        let second = backend
            .update_fields(id, fields(json!({ "available": false })), options)
            .await
            .unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.version, second.version);

        let doc = backend.read_document(id).await.unwrap().unwrap();
        assert_eq!(doc.fields["available"], true);
    }

    #[tokio::test]
    async fn injected_failure_leaves_document_untouched() {
        let backend = backend();
        let id = Uuid::new_v4();
        backend
            .create_document(id, fields(json!({ "photo_url": "old" })), WriteOptions::default())
            .await
            .unwrap();

        backend.inject_failures(1);
        assert!(backend
            .overwrite_field(id, "photo_url", json!("new"), WriteOptions::default())
            .await
            .is_err());

        let doc = backend.read_document(id).await.unwrap().unwrap();
        assert_eq!(doc.fields["photo_url"], "old");
    }

    #[tokio::test]
    async fn watchers_see_committed_snapshots() {
        let backend = backend();
        let mut rx = backend.watch();
        let id = Uuid::new_v4();

        backend
            .create_document(id, fields(json!({ "available": true })), WriteOptions::default())
            .await
            .unwrap();

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.id, id);
        assert_eq!(snapshot.version, 1);
    }

    #[tokio::test]
    async fn download_url_points_at_blob_route() {
        let backend = backend();
        assert!(backend.download_url("perfil/x.jpg").await.is_err());

        backend
            .upload("perfil/x.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();
        assert_eq!(
            backend.download_url("perfil/x.jpg").await.unwrap(),
            "http://localhost:3000/blobs/perfil/x.jpg"
        );
        assert_eq!(backend.download("perfil/x.jpg").await.unwrap().bytes, [1, 2, 3]);
    }
}
