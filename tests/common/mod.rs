#![allow(dead_code)]

use std::{
    collections::BTreeSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use content_service::{
    AppState, create_router,
    auth::{BearerToken, TokenVerifier, VerifierState},
    identity::{IdentityError, IdentityService, IdentityState},
    models::{ContentItem, ContentKind, UserProfile},
    query::ContentQuery,
    repository::{ContentStore, MemoryContentStore, RepositoryState, StoreError},
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::util::ServiceExt;

// --- Key Fixtures ---

pub const PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/es256_private.pem");
pub const PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/es256_public.pem");
pub const OTHER_PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/other_private.pem");

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Signs arbitrary claims with the fixture ES256 key.
pub fn sign(claims: &Value) -> String {
    sign_with(PRIVATE_KEY, claims)
}

pub fn sign_with(private_pem: &[u8], claims: &Value) -> String {
    let key = EncodingKey::from_ec_pem(private_pem).unwrap();
    encode(&Header::new(Algorithm::ES256), claims, &key).unwrap()
}

/// A valid one-hour token for `user_id`.
pub fn token_for(user_id: &str) -> String {
    sign(&json!({ "user_id": user_id, "sub": user_id, "exp": now() + 3600 }))
}

/// `Authorization` header value for `user_id`.
pub fn bearer(user_id: &str) -> String {
    format!("Bearer {}", token_for(user_id))
}

pub fn verifier() -> VerifierState {
    Arc::new(TokenVerifier::from_pem(Algorithm::ES256, PUBLIC_KEY).unwrap())
}

pub fn profile(id: &str, name: &str, roles: &[&str]) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        name: name.to_string(),
        roles: roles.iter().map(|r| r.to_lowercase()).collect::<BTreeSet<_>>(),
        image: None,
    }
}

// --- Identity Mock ---

/// MockIdentity
///
/// In-memory identity service that records every call it receives.
#[derive(Default)]
pub struct MockIdentity {
    /// Directory used by `get_profile` / `get_profiles`.
    pub directory: Vec<UserProfile>,
    /// Returned by `current_profile`; `None` answers 401.
    pub caller: Option<UserProfile>,
    /// When set, every call fails as if the service were down.
    pub down: bool,
    pub batch_calls: Mutex<Vec<Vec<String>>>,
    pub single_calls: Mutex<Vec<String>>,
    pub info_calls: AtomicUsize,
}

impl MockIdentity {
    pub fn with_directory(directory: Vec<UserProfile>) -> Self {
        Self {
            directory,
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batch_calls.lock().unwrap().clone()
    }

    pub fn singles(&self) -> Vec<String> {
        self.single_calls.lock().unwrap().clone()
    }

    pub fn info_count(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    fn check_up(&self) -> Result<(), IdentityError> {
        if self.down {
            Err(IdentityError::Status(StatusCode::SERVICE_UNAVAILABLE))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityService for MockIdentity {
    async fn current_profile(&self, _token: &BearerToken) -> Result<UserProfile, IdentityError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;
        self.caller
            .clone()
            .ok_or(IdentityError::Status(StatusCode::UNAUTHORIZED))
    }

    async fn get_profile(
        &self,
        _token: &BearerToken,
        id: &str,
    ) -> Result<UserProfile, IdentityError> {
        self.single_calls.lock().unwrap().push(id.to_string());
        self.check_up()?;
        self.directory
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| IdentityError::UnknownUser(id.to_string()))
    }

    async fn get_profiles(
        &self,
        _token: &BearerToken,
        ids: &[String],
    ) -> Result<Vec<UserProfile>, IdentityError> {
        self.batch_calls.lock().unwrap().push(ids.to_vec());
        self.check_up()?;
        Ok(ids
            .iter()
            .filter_map(|id| self.directory.iter().find(|p| &p.id == id).cloned())
            .collect())
    }
}

// --- Store Wrapper ---

/// CountingStore
///
/// Delegates to a `MemoryContentStore` and counts every storage operation, so tests
/// can assert that a request never reached storage.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryContentStore,
    pub calls: AtomicUsize,
}

impl CountingStore {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentStore for CountingStore {
    async fn insert(&self, item: &ContentItem) -> Result<(), StoreError> {
        self.tick();
        self.inner.insert(item).await
    }

    async fn get_by_id(&self, kind: ContentKind, id: &str) -> Result<ContentItem, StoreError> {
        self.tick();
        self.inner.get_by_id(kind, id).await
    }

    async fn list(
        &self,
        kind: ContentKind,
        query: &ContentQuery,
    ) -> Result<Vec<ContentItem>, StoreError> {
        self.tick();
        self.inner.list(kind, query).await
    }

    async fn delete_by_id(&self, kind: ContentKind, id: &str) -> Result<(), StoreError> {
        self.tick();
        self.inner.delete_by_id(kind, id).await
    }

    async fn delete_all(&self, kind: ContentKind) -> Result<(), StoreError> {
        self.tick();
        self.inner.delete_all(kind).await
    }
}

// --- Router Helpers ---

pub fn app(repo: Arc<CountingStore>, identity: Arc<MockIdentity>) -> Router {
    let repo = repo as RepositoryState;
    let identity = identity as IdentityState;
    create_router(AppState::new(repo, identity, verifier()))
}

/// Sends one request through the router and returns status plus parsed body.
/// Non-JSON bodies come back as a JSON string, empty bodies as `null`.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}
