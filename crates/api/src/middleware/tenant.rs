use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tenancy_models::Hostname;
use tenancy_tenant::{Environment, RequestHost, TenancyEvent};

use crate::handlers::ErrorResponse;
use crate::AppState;

/// Build the per-request tenant environment and attach it to the request
/// extensions. Identification errors during boot end the request with 500.
pub async fn resolve_environment(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let (parts, body) = request.into_parts();
    let trust_forwarded_proto = state.tenancy.config().trust_forwarded_proto;
    let host = RequestHost::from_parts(&parts, trust_forwarded_proto);

    let environment = state.tenancy.environment(host).await.map_err(|e| {
        tracing::error!("Hostname identification failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("identification_failed", &e.to_string())),
        )
    })?;

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(Arc::new(environment));

    Ok(next.run(request).await)
}

/// What the current hostname demands before the request may proceed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostnameAction {
    Maintenance,
    Redirect(String),
    Secure(String),
}

impl HostnameAction {
    /// Checked in order: maintenance, configured redirect, https upgrade
    pub fn decide(hostname: &Hostname, request: &RequestHost, now: DateTime<Utc>) -> Option<Self> {
        if hostname.is_under_maintenance(now) {
            return Some(Self::Maintenance);
        }

        if let Some(target) = hostname.redirect_to.as_deref().filter(|t| !t.trim().is_empty()) {
            return Some(Self::Redirect(target.to_string()));
        }

        if hostname.force_https && !request.is_secure() {
            return Some(Self::Secure(format!(
                "https://{}{}",
                request.host(),
                request.path_and_query()
            )));
        }

        None
    }

    pub fn event(&self, hostname: &Hostname) -> TenancyEvent {
        let hostname = hostname.clone();
        match self {
            Self::Maintenance => TenancyEvent::UnderMaintenance { hostname },
            Self::Redirect(location) => TenancyEvent::Redirected {
                hostname,
                location: location.clone(),
            },
            Self::Secure(location) => TenancyEvent::Secured {
                hostname,
                location: location.clone(),
            },
        }
    }
}

impl IntoResponse for HostnameAction {
    fn into_response(self) -> Response {
        match self {
            Self::Maintenance => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new(
                    "under_maintenance",
                    "This site is currently under maintenance",
                )),
            )
                .into_response(),
            Self::Redirect(location) | Self::Secure(location) => Response::builder()
                .status(StatusCode::FOUND)
                .header(header::LOCATION, location)
                .body(Body::empty())
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        }
    }
}

/// Apply maintenance, redirect and https rules of the identified hostname
pub async fn hostname_actions(
    State(state): State<Arc<AppState>>,
    Extension(environment): Extension<Arc<Environment>>,
    request: Request,
    next: Next,
) -> Response {
    let hostname = match environment.hostname().await {
        Ok(Some(hostname)) => hostname,
        Ok(None) => return next.run(request).await,
        Err(e) => {
            tracing::error!("Hostname identification failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("identification_failed", &e.to_string())),
            )
                .into_response();
        }
    };

    match HostnameAction::decide(&hostname, environment.request(), Utc::now()) {
        Some(action) => {
            tracing::debug!(fqdn = %hostname.fqdn, ?action, "Hostname action applied");
            state.tenancy.dispatcher().dispatch(action.event(&hostname));
            action.into_response()
        }
        None => next.run(request).await,
    }
}
