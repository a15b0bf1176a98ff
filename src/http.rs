//! HTTP Client Adapter
//!
//! Every request to the master API goes through `ApiClient`. Authenticated
//! requests can only be built from an `Authorized` guard, which exists only
//! while the session holds a token, so the authorization check happens once
//! per action instead of once per call site.
//!
//! Non-success responses are handed to the configured `ResponseInterceptor`
//! before the error is returned to the caller.

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::{AuthHeader, AuthState};
use crate::error::ApiError;
use crate::navigation::Navigator;

/// Query parameters as sent on the wire
pub type Query<'a> = [(&'a str, String)];

/// Hook run on every failed response
pub trait ResponseInterceptor: Send + Sync {
    fn on_error(&self, error: &ApiError);
}

/// Clears the session and redirects to the login route on HTTP 401
pub struct SessionExpiryInterceptor {
    auth: Arc<AuthState>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
}

impl SessionExpiryInterceptor {
    pub fn new(auth: Arc<AuthState>, navigator: Arc<dyn Navigator>, login_route: &str) -> Self {
        Self {
            auth,
            navigator,
            login_route: login_route.to_string(),
        }
    }
}

impl ResponseInterceptor for SessionExpiryInterceptor {
    fn on_error(&self, error: &ApiError) {
        if !error.is_unauthorized() {
            return;
        }

        // Already on the login page: a redirect would loop
        if self.navigator.current_path() == self.login_route {
            debug!("401 on login route, not redirecting");
            return;
        }

        self.auth.unset_token();
        self.navigator.push(&self.login_route);
        info!("Session expired, redirected to {}", self.login_route);
    }
}

/// Client for the master API
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Arc<AuthState>,
    interceptor: Option<Arc<dyn ResponseInterceptor>>,
}

impl ApiClient {
    pub fn new(base_url: &str, auth: Arc<AuthState>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            interceptor: None,
        }
    }

    /// Install the response interceptor
    pub fn with_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Capability to issue authenticated requests, if the session holds a token
    pub fn authorized(&self) -> Option<Authorized<'_>> {
        if !self.auth.is_authorized() {
            return None;
        }

        Some(Authorized {
            api: self,
            header: self.auth.auth_header(),
        })
    }

    /// Unauthenticated GET returning the raw body
    pub async fn get_text(&self, path: &str, query: &Query<'_>) -> Result<String, ApiError> {
        let request = self.request(Method::GET, path)?.query(query);
        let response = self.execute(request).await?;
        Ok(response.text().await?)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse(&raw).map_err(|e| ApiError::Url(format!("{}: {}", raw, e)))
    }

    /// URL of one item below `path`; `id` is percent-encoded as a single segment
    fn item_endpoint(&self, path: &str, id: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint(path)?;
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty().push(id);
            }
            Err(()) => {
                return Err(ApiError::Url(format!(
                    "{}{}: cannot hold a path",
                    self.base_url, path
                )))
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.client.request(method, self.endpoint(path)?))
    }

    /// Send a request; failures pass through the interceptor and are returned
    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let result = match request.send().await {
            Ok(response) if response.status().is_success() => Ok(response),
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::Status { status, body })
            }
            Err(e) => Err(ApiError::Transport(e)),
        };

        if let Err(ref e) = result {
            debug!("Request failed: {}", e);
            if let Some(interceptor) = &self.interceptor {
                interceptor.on_error(e);
            }
        }

        result
    }

    async fn execute_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Authenticated request builder, obtainable only while authorized
pub struct Authorized<'a> {
    api: &'a ApiClient,
    header: AuthHeader,
}

impl Authorized<'_> {
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.request_url(method, self.api.endpoint(path)?))
    }

    fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(method = %method, path = url.path(), "API request");
        self.api
            .client
            .request(method, url)
            .header(AUTHORIZATION, self.header.value())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &Query<'_>) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path)?.query(query);
        self.api.execute_json(request).await
    }

    /// POST with an empty body; the payload travels as query parameters
    pub async fn post<T: DeserializeOwned>(&self, path: &str, query: &Query<'_>) -> Result<T, ApiError> {
        let request = self.request(Method::POST, path)?.query(query);
        self.api.execute_json(request).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::PUT, path)?.json(body);
        self.api.execute_json(request).await
    }

    /// DELETE `path/{id}`
    pub async fn delete<T: DeserializeOwned>(&self, path: &str, id: &str) -> Result<T, ApiError> {
        let request = self.request_url(Method::DELETE, self.api.item_endpoint(path, id)?);
        self.api.execute_json(request).await
    }
}
