use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A fully qualified domain name routed to one tenant.
///
/// `fqdn` is stored lower-cased without a trailing dot. A leading `*.` label
/// marks a wildcard record matching any single-level subdomain walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Hostname {
    pub id: Uuid,
    pub fqdn: String,
    pub redirect_to: Option<String>,
    pub force_https: bool,
    pub under_maintenance_since: Option<DateTime<Utc>>,
    pub website_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Hostname {
    pub fn new(fqdn: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            fqdn: normalize_fqdn(&fqdn.into()),
            redirect_to: None,
            force_https: false,
            under_maintenance_since: None,
            website_id: None,
            customer_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_website(mut self, website_id: Uuid) -> Self {
        self.website_id = Some(website_id);
        self
    }

    pub fn with_customer(mut self, customer_id: Uuid) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    /// Maintenance starts at `under_maintenance_since`; a future timestamp
    /// schedules it without taking the site down yet.
    pub fn is_under_maintenance(&self, now: DateTime<Utc>) -> bool {
        self.under_maintenance_since
            .map(|since| since <= now)
            .unwrap_or(false)
    }
}

/// Lower-case, strip any `:port` suffix and a trailing root dot.
pub fn normalize_fqdn(raw: &str) -> String {
    let host = raw.trim();
    let host = match host.rsplit_once(':') {
        // Leave bracketed IPv6 literals alone unless a port follows the bracket
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    host.trim_end_matches('.').to_ascii_lowercase()
}
