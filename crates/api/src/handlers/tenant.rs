use axum::{http::StatusCode, Extension, Json};
use serde::Serialize;
use std::sync::Arc;
use tenancy_models::{Customer, Hostname, Website};
use tenancy_tenant::{BindingSource, Environment, TenancyError};

use super::ErrorResponse;

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub hostname: Hostname,
    pub customer: Option<Customer>,
    pub website: Option<Website>,
    pub source: Option<&'static str>,
}

fn lookup_failed(err: TenancyError) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!("Tenant lookup failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("tenant_lookup_failed", &err.to_string())),
    )
}

/// GET /api/tenant - tenant bound to the current request
pub async fn current_tenant(
    Extension(environment): Extension<Arc<Environment>>,
) -> Result<Json<TenantResponse>, (StatusCode, Json<ErrorResponse>)> {
    let hostname = environment
        .hostname()
        .await
        .map_err(lookup_failed)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(
                    "tenant_not_found",
                    &format!("No tenant is registered for {}", environment.request().host()),
                )),
            )
        })?;

    let customer = environment.customer().await.map_err(lookup_failed)?;
    let website = environment.website().await.map_err(lookup_failed)?;
    let source = environment.binding_source().await.map(|source| match source {
        BindingSource::Identified => "identified",
        BindingSource::Switched => "switched",
    });

    Ok(Json(TenantResponse {
        hostname,
        customer,
        website,
        source,
    }))
}
