//! Seam to the managed backend: authentication, the profile document store
//! and blob storage. Controllers only ever talk to these traits.

pub mod memory;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::courier::CourierId;

pub type Fields = Map<String, Value>;
pub type SessionToken = Uuid;

/// Partial document built from typed values.
#[derive(Debug, Clone, Default)]
pub struct Patch(Fields);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> Result<Self, GatewayError> {
        self.0.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    pub fn clear(mut self, key: &str) -> Self {
        self.0.insert(key.to_string(), Value::Null);
        self
    }

    pub fn into_fields(self) -> Fields {
        self.0
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentSnapshot {
    pub id: CourierId,
    pub version: u64,
    pub fields: Fields,
}

/// Preconditions attached to a document write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// A replayed key returns the first result instead of writing again.
    pub idempotency_key: Option<Uuid>,
    /// Compare-and-swap on the document version.
    pub expected_version: Option<u64>,
}

impl WriteOptions {
    pub fn idempotent(key: Option<Uuid>) -> Self {
        Self {
            idempotency_key: key,
            expected_version: None,
        }
    }

    pub fn expecting(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReceipt {
    pub version: u64,
    pub replayed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub courier_id: CourierId,
    pub token: SessionToken,
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("e-mail already in use")]
    EmailAlreadyInUse,

    #[error("invalid e-mail")]
    InvalidEmail,

    #[error("invalid credentials")]
    InvalidCredential,

    #[error("{message}")]
    Other { code: String, message: String },
}

impl AuthError {
    pub fn code(&self) -> &str {
        match self {
            AuthError::EmailAlreadyInUse => "auth/email-already-in-use",
            AuthError::InvalidEmail => "auth/invalid-email",
            AuthError::InvalidCredential => "auth/invalid-credential",
            AuthError::Other { code, .. } => code,
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("document {0} not found")]
    NotFound(CourierId),

    #[error("document {id} changed: expected version {expected}, found {actual}")]
    VersionConflict {
        id: CourierId,
        expected: u64,
        actual: u64,
    },

    #[error("blob {0} not found")]
    BlobNotFound(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Creates the account and signs it in.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        idempotency_key: Option<Uuid>,
    ) -> Result<Identity, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn current_identity(&self, token: SessionToken) -> Option<CourierId>;

    async fn sign_out(&self, token: SessionToken);
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates or fully replaces the courier's document.
    async fn create_document(
        &self,
        id: CourierId,
        fields: Fields,
        options: WriteOptions,
    ) -> Result<WriteReceipt, GatewayError>;

    async fn read_document(&self, id: CourierId) -> Result<Option<DocumentSnapshot>, GatewayError>;

    /// Merges top-level fields, leaving every other field as it was.
    async fn update_fields(
        &self,
        id: CourierId,
        patch: Fields,
        options: WriteOptions,
    ) -> Result<WriteReceipt, GatewayError>;

    /// Replaces one field wholesale (used for list fields).
    async fn overwrite_field(
        &self,
        id: CourierId,
        field: &str,
        value: Value,
        options: WriteOptions,
    ) -> Result<WriteReceipt, GatewayError>;

    /// Live feed of every committed document snapshot.
    fn watch(&self) -> broadcast::Receiver<DocumentSnapshot>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), GatewayError>;

    async fn download_url(&self, key: &str) -> Result<String, GatewayError>;

    async fn download(&self, key: &str) -> Result<StoredBlob, GatewayError>;
}
