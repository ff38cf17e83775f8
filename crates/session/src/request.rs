//! Authenticated request policy
//!
//! Every protected call goes through `SessionManager::send()`:
//!
//! 1. Attempt: attach the stored token and execute
//! 2. Unauthorized (401): refresh, shared with any concurrent callers
//! 3. Retry: attach the new token and execute exactly once more
//! 4. Done: return whatever came back
//!
//! The retry's outcome is final. A second 401 is reported as
//! `Error::Unauthorized`, never answered with another refresh, so a server
//! that keeps rejecting us can't cause a loop.

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use reqwest::{Method, Request, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use token_auth::{error_message, header};

use crate::error::{Error, Result};
use crate::manager::{APPLICATION_JSON, SessionManager};

impl SessionManager {
    /// Start a request to an API path, e.g. `/employment/employment_records`.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, self.inner.endpoints.url(path))
    }

    /// Execute a request with the refresh-once-retry-once policy.
    ///
    /// Non-401 responses are returned as-is whatever their status; the caller
    /// decides what a 404 or 500 means. Bodies that can't be cloned (streams)
    /// are not retried: the session is still refreshed, but the call reports
    /// `Unauthorized`.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder
            .build()
            .map_err(|e| Error::Request(e.to_string()))?;
        let retry = request.try_clone();
        let method = request.method().clone();
        let url = request.url().to_string();

        let response = self.execute(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(%method, url = %url, "request unauthorized, refreshing session");
        self.refresh().await?;

        let Some(retry) = retry else {
            warn!(%method, url = %url, "request body can't be replayed, not retrying");
            return Err(Error::Unauthorized);
        };

        let response = self.execute(retry).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(%method, url = %url, "still unauthorized after refresh");
            return Err(Error::Unauthorized);
        }
        Ok(response)
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        self.send(self.request(Method::GET, path)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.send(self.request(Method::DELETE, path)).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    pub async fn put_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(self.request(Method::PUT, path).json(body)).await
    }

    pub async fn patch_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(self.request(Method::PATCH, path).json(body)).await
    }

    /// `GET` a path and decode a JSON body. Non-2xx becomes `Error::Rejected`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = ensure_success(self.get(path).await?).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Decode(e.to_string()))
    }

    /// Attach headers and execute one attempt.
    async fn execute(&self, mut request: Request) -> Result<Response> {
        self.authorize(&mut request);
        self.inner
            .client
            .execute(request)
            .await
            .map_err(|e| Error::Network(e.to_string()))
    }

    /// Set `Accept` (unless the caller chose one) and the current bearer token.
    ///
    /// The token only goes to the API's own origin.
    fn authorize(&self, request: &mut Request) {
        let same_origin = self.inner.endpoints.is_same_origin(request.url());
        let headers = request.headers_mut();
        headers
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static(APPLICATION_JSON));
        headers.remove(AUTHORIZATION);
        if same_origin {
            headers.extend(header::encode(self.inner.store.get().as_ref()));
        }
    }
}

/// Turn a non-2xx response into `Error::Rejected` with the API's message.
pub async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(Error::Rejected {
        status: status.as_u16(),
        message: error_message(status.as_u16(), &body),
    })
}
