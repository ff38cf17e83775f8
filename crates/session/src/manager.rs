//! Session manager: the single owner of session state
//!
//! One `SessionManager` is built per process and cloned (cheaply, it's an
//! `Arc` handle) into every caller. It owns the token store, the cookie jar,
//! the HTTP client and the in-flight refresh slot, so there is no
//! module-level mutable state anywhere in the session core.
//!
//! This file holds construction and the credential flows (sign-in, sign-up,
//! sign-out, current user). Refresh lives in `refresh.rs`, the authenticated
//! request policy in `request.rs`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::ACCEPT;
use serde::Serialize;
use tracing::{debug, info, warn};

use token_auth::{AccessToken, Endpoints, TokenStore, error_message, extract_access_token, header};

use crate::config::SessionConfig;
use crate::cookies::CookieJar;
use crate::error::{Error, Result};
use crate::refresh::RefreshSlot;

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Registration payload. The API takes it as a flat JSON object.
#[derive(Debug, Clone, Serialize)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Handle to the session state shared by all callers.
#[derive(Clone)]
pub struct SessionManager {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) endpoints: Endpoints,
    pub(crate) client: reqwest::Client,
    pub(crate) cookies: Arc<CookieJar>,
    pub(crate) store: Arc<dyn TokenStore>,
    pub(crate) refresh_timeout: Duration,
    /// At most one pending refresh, plus the session generation it belongs to.
    pub(crate) in_flight: Mutex<RefreshSlot>,
}

impl SessionManager {
    /// Build a session manager for the API at `config.base_url`.
    ///
    /// The HTTP client is created here with the cookie jar installed, so every
    /// request, refresh included, carries the refresh credential cookie.
    pub fn new(config: SessionConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let endpoints =
            Endpoints::new(&config.base_url).map_err(|e| Error::Config(e.to_string()))?;
        let cookies = Arc::new(CookieJar::new());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("building HTTP client: {e}")))?;

        info!(
            base_url = endpoints.base_url(),
            authenticated = store.get().is_some(),
            "session manager initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                endpoints,
                client,
                cookies,
                store,
                refresh_timeout: config.refresh_timeout,
                in_flight: Mutex::new(RefreshSlot::default()),
            }),
        })
    }

    /// Current access token, if any.
    pub fn token(&self) -> Option<AccessToken> {
        self.inner.store.get()
    }

    /// Whether a token is held. A 401 may still prove it invalid.
    pub fn is_authenticated(&self) -> bool {
        self.inner.store.get().is_some()
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    /// Underlying HTTP client, for building requests to pass to `send()`.
    pub fn client(&self) -> &reqwest::Client {
        &self.inner.client
    }

    /// Sign in with email and password. Stores and returns the access token.
    ///
    /// The refresh cookie set by the response lands in the cookie jar.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AccessToken> {
        let body = serde_json::json!({
            "auth": { "email": email, "password": password }
        });
        let token = self.authenticate(self.inner.endpoints.sign_in(), &body).await?;
        info!("signed in");
        Ok(token)
    }

    /// Register a new account. Stores and returns the access token.
    pub async fn sign_up(&self, account: &SignUp) -> Result<AccessToken> {
        let token = self.authenticate(self.inner.endpoints.sign_up(), account).await?;
        info!("signed up");
        Ok(token)
    }

    /// Sign out: tell the API to end the session and revoke the refresh
    /// credential, then forget both locally.
    ///
    /// Both calls are best-effort. Local state is cleared even if they fail
    /// or time out, so this never errors.
    pub async fn sign_out(&self) {
        let auth = header::encode(self.inner.store.get().as_ref());
        let calls = [
            ("sign_out", self.inner.client.delete(self.inner.endpoints.sign_out())),
            ("revoke", self.inner.client.delete(self.inner.endpoints.revoke())),
        ];

        for (call, request) in calls {
            match request
                .header(ACCEPT, APPLICATION_JSON)
                .headers(auth.clone())
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    debug!(call, "sign-out call succeeded");
                }
                Ok(response) => {
                    warn!(call, status = %response.status(), "sign-out call rejected, clearing local session anyway");
                }
                Err(e) => {
                    warn!(call, error = %e, "sign-out call failed, clearing local session anyway");
                }
            }
        }

        self.replace_session(None);
        self.inner.cookies.clear();
        info!("signed out");
    }

    /// Profile of the signed-in user (`GET /me`).
    pub async fn current_user(&self) -> Result<serde_json::Value> {
        self.get_json(token_auth::endpoints::ME_PATH).await
    }

    /// POST credentials and keep the token from the response.
    async fn authenticate<B: Serialize + ?Sized>(&self, url: String, body: &B) -> Result<AccessToken> {
        let response = self
            .inner
            .client
            .post(&url)
            .header(ACCEPT, APPLICATION_JSON)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            let message = error_message(status, &bytes);
            warn!(url = %url, status, "authentication rejected");
            return Err(Error::Rejected { status, message });
        }

        let token = extract_access_token(&headers, &bytes).ok_or_else(|| {
            warn!(url = %url, status, "authentication response carried no access token");
            Error::Rejected {
                status,
                message: "response carried no access token".into(),
            }
        })?;

        self.replace_session(Some(token.clone()));
        Ok(token)
    }
}
