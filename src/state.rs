use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tracing::warn;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::flow::lifecycle::CodePolicy;
use crate::flow::navigation::{Navigator, Screen, Transition};
use crate::gateway::memory::InMemoryBackend;
use crate::gateway::{AuthService, BlobStore, DocumentStore, GatewayError};
use crate::models::courier::{CourierId, CourierProfile};
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub auth: Arc<dyn AuthService>,
    pub documents: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub navigators: DashMap<CourierId, Navigator>,
    /// Idempotency keys whose submission has already moved the navigator.
    pub settled_keys: DashSet<Uuid>,
    pub code_policy: CodePolicy,
    pub max_photo_bytes: usize,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let (state, _backend) = Self::in_memory(config);
        state
    }

    /// State wired to a fresh in-memory backend; the backend handle is
    /// returned for inspection and fault injection.
    pub fn in_memory(config: &Config) -> (Self, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new(
            config.public_base_url.clone(),
            config.event_buffer_size,
        ));

        let state = Self::with_backend(config, backend.clone(), backend.clone(), backend.clone());
        (state, backend)
    }

    pub fn with_backend(
        config: &Config,
        auth: Arc<dyn AuthService>,
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            auth,
            documents,
            blobs,
            navigators: DashMap::new(),
            settled_keys: DashSet::new(),
            code_policy: config.code_policy,
            max_photo_bytes: config.max_photo_bytes,
            metrics: Metrics::new(),
        }
    }

    pub async fn profile_snapshot(
        &self,
        courier_id: CourierId,
    ) -> Result<(CourierProfile, u64), AppError> {
        let doc = self
            .documents
            .read_document(courier_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile {courier_id} not found")))?;

        let profile = CourierProfile::from_fields(&doc.fields).map_err(GatewayError::from)?;
        Ok((profile, doc.version))
    }

    pub fn navigator(&self, courier_id: CourierId) -> Navigator {
        self.navigators
            .get(&courier_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn check_navigation(
        &self,
        courier_id: CourierId,
        transition: Transition,
    ) -> Result<(), AppError> {
        self.navigator(courier_id).check(transition)?;
        Ok(())
    }

    pub fn navigate(&self, courier_id: CourierId, transition: Transition) -> Result<Screen, AppError> {
        let mut navigator = self.navigators.entry(courier_id).or_default();
        Ok(navigator.apply(transition)?)
    }

    /// Moves the navigator after a write has already committed. The stack may
    /// have moved since it was checked; in that case it is rebuilt from
    /// `fallback` so it agrees with the stored document.
    pub fn commit_navigation(
        &self,
        courier_id: CourierId,
        transition: Transition,
        fallback: impl FnOnce() -> Vec<Screen>,
    ) -> Screen {
        let mut navigator = self.navigators.entry(courier_id).or_default();
        match navigator.apply(transition) {
            Ok(screen) => screen,
            Err(err) => {
                warn!(
                    courier_id = %courier_id,
                    transition = %transition,
                    error = %err,
                    "navigation moved during write, rebuilding stack"
                );
                *navigator = Navigator::starting_at(fallback());
                navigator.current()
            }
        }
    }

    pub fn is_settled(&self, key: Option<Uuid>) -> bool {
        key.is_some_and(|key| self.settled_keys.contains(&key))
    }

    pub fn settle(&self, key: Option<Uuid>) {
        if let Some(key) = key {
            self.settled_keys.insert(key);
        }
    }

    pub fn restore_navigation(&self, courier_id: CourierId, stack: Vec<Screen>) -> Screen {
        let navigator = Navigator::starting_at(stack);
        let current = navigator.current();
        self.navigators.insert(courier_id, navigator);
        current
    }
}
