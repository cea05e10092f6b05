use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{StatusCode, Url, header};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{auth::BearerToken, models::UserProfile};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity service answered {0}")]
    Status(StatusCode),

    #[error("undecodable identity response: {0}")]
    Decode(String),

    #[error("no user with id {0}")]
    UnknownUser(String),

    #[error("invalid identity service url: {0}")]
    InvalidUrl(String),
}

/// IdentityService Trait
///
/// Remote source of author profiles. Every call forwards the caller's bearer token,
/// since the identity service authenticates its own callers.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Profile of the caller that owns `token`.
    async fn current_profile(&self, token: &BearerToken) -> Result<UserProfile, IdentityError>;

    /// Profile of user `id`. A user the service does not know is `UnknownUser`.
    async fn get_profile(&self, token: &BearerToken, id: &str)
    -> Result<UserProfile, IdentityError>;

    /// Profiles for `ids` in one round trip. Ids are sent as given, duplicates included;
    /// unknown ids are simply absent from the result.
    async fn get_profiles(
        &self,
        token: &BearerToken,
        ids: &[String],
    ) -> Result<Vec<UserProfile>, IdentityError>;
}

/// IdentityState
///
/// Shared handle to the identity client, built once at startup.
pub type IdentityState = Arc<dyn IdentityService>;

/// HttpIdentityClient
///
/// `IdentityService` over the identity service's REST API (`/auth/user/...`).
/// Holds a single pooled `reqwest::Client`.
#[derive(Clone)]
pub struct HttpIdentityClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpIdentityClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, IdentityError> {
        let base_url =
            Url::parse(base_url).map_err(|e| IdentityError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(IdentityError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    /// Appends path segments to the base url. Segments are percent-encoded, so an id
    /// can never escape its position in the path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, IdentityError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| IdentityError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, IdentityError> {
        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Status(status));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| IdentityError::Decode(e.to_string()))
    }
}

#[async_trait]
impl IdentityService for HttpIdentityClient {
    async fn current_profile(&self, token: &BearerToken) -> Result<UserProfile, IdentityError> {
        let url = self.endpoint(&["auth", "user", "info"])?;

        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, token.header_value())
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn get_profile(
        &self,
        token: &BearerToken,
        id: &str,
    ) -> Result<UserProfile, IdentityError> {
        let url = self.endpoint(&["auth", "user", id])?;

        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, token.header_value())
            .send()
            .await?;

        // The auth server answers an unknown id with 400; 404 means the same.
        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND {
            return Err(IdentityError::UnknownUser(id.to_string()));
        }

        Self::read_json(response).await
    }

    async fn get_profiles(
        &self,
        token: &BearerToken,
        ids: &[String],
    ) -> Result<Vec<UserProfile>, IdentityError> {
        let url = self.endpoint(&["auth", "user", "get_batch"])?;

        tracing::debug!(count = ids.len(), "fetching author profiles");

        let response = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, token.header_value())
            .json(ids)
            .send()
            .await?;

        Self::read_json(response).await
    }
}
