//! Single-flight access token refresh
//!
//! The first caller to need a refresh spawns the exchange and parks a shared
//! handle to it in the manager's in-flight slot; every caller arriving while
//! it runs awaits that same handle instead of issuing another request. The
//! exchange runs as its own task, so it settles (and empties the slot) even if
//! every waiter goes away, and it is bounded by `refresh_timeout` so a hung
//! server can't pin the slot.
//!
//! Sign-in, sign-up and sign-out start a new session generation. A refresh
//! that settles after that belongs to a session that no longer exists: its
//! outcome is reported as `RefreshError::Superseded` and the token store is
//! left alone.

use std::sync::{Arc, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use reqwest::header::ACCEPT;
use tracing::{debug, info, warn};

use token_auth::{AccessToken, extract_access_token};

use crate::error::RefreshError;
use crate::manager::{APPLICATION_JSON, Inner, SessionManager};

/// Outcome shared by every caller joined to one refresh.
pub(crate) type RefreshOutcome = Result<AccessToken, RefreshError>;

/// Handle to a running refresh, cloned into each waiter.
pub(crate) type InFlightRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// The in-flight refresh and the session generation it was started in.
#[derive(Default)]
pub(crate) struct RefreshSlot {
    pub(crate) generation: u64,
    pub(crate) flight: Option<InFlightRefresh>,
}

impl SessionManager {
    /// Exchange the refresh cookie for a new access token.
    ///
    /// Concurrent calls share one network request and all receive the same
    /// outcome. On success the token store holds the new token; on failure it
    /// is cleared. If the user signs in or out meanwhile, the outcome is
    /// `RefreshError::Superseded` and the store keeps the newer session.
    pub async fn refresh(&self) -> RefreshOutcome {
        let flight = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match slot.flight.as_ref() {
                Some(flight) => {
                    debug!("joining in-flight session refresh");
                    metrics::counter!("session_refresh_joined_total").increment(1);
                    flight.clone()
                }
                None => {
                    let flight = start_refresh(Arc::clone(&self.inner), slot.generation);
                    slot.flight = Some(flight.clone());
                    flight
                }
            }
        };
        flight.await
    }

    /// Whether a refresh is currently running.
    pub fn refresh_in_flight(&self) -> bool {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flight
            .is_some()
    }

    /// Start a new session generation holding `token` (or nothing).
    ///
    /// Any refresh still running is detached from the slot and its outcome
    /// will not touch the store.
    pub(crate) fn replace_session(&self, token: Option<AccessToken>) {
        let mut slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        if slot.flight.take().is_some() {
            debug!("detached in-flight refresh from the previous session");
        }
        match token {
            Some(token) => self.inner.store.set(token),
            None => self.inner.store.clear(),
        }
    }
}

/// Spawn the exchange and wrap its handle for sharing.
fn start_refresh(inner: Arc<Inner>, generation: u64) -> InFlightRefresh {
    debug!(generation, "starting session refresh");
    let task = tokio::spawn(async move {
        let outcome = match tokio::time::timeout(inner.refresh_timeout, exchange(&inner)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RefreshError::Timeout(inner.refresh_timeout)),
        };
        settle(&inner, generation, outcome)
    });

    async move {
        task.await
            .unwrap_or_else(|e| Err(RefreshError::Network(format!("refresh task failed: {e}"))))
    }
    .boxed()
    .shared()
}

/// `POST /auth/refresh`, header token first, body token second.
async fn exchange(inner: &Inner) -> RefreshOutcome {
    let response = inner
        .client
        .post(inner.endpoints.refresh())
        .header(ACCEPT, APPLICATION_JSON)
        .send()
        .await
        .map_err(|e| RefreshError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RefreshError::Status(status.as_u16()));
    }

    let headers = response.headers().clone();
    let body = response
        .bytes()
        .await
        .map_err(|e| RefreshError::Network(e.to_string()))?;

    extract_access_token(&headers, &body).ok_or(RefreshError::MissingToken)
}

/// Apply the outcome to the token store and free the in-flight slot.
///
/// The slot lock is held throughout so a concurrent sign-out can't land
/// between the generation check and the store update.
fn settle(inner: &Inner, generation: u64, outcome: RefreshOutcome) -> RefreshOutcome {
    let mut slot = inner
        .in_flight
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if slot.generation != generation {
        info!(generation, current = slot.generation, "session changed during refresh, discarding outcome");
        metrics::counter!("session_refresh_total", "outcome" => "superseded").increment(1);
        return Err(RefreshError::Superseded);
    }

    match &outcome {
        Ok(token) => {
            inner.store.set(token.clone());
            info!("session refresh succeeded");
            metrics::counter!("session_refresh_total", "outcome" => "success").increment(1);
        }
        Err(e) => {
            inner.store.clear();
            warn!(error = %e, "session refresh failed, cleared access token");
            metrics::counter!("session_refresh_total", "outcome" => "failure").increment(1);
        }
    }
    slot.flight = None;
    outcome
}
