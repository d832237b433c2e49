use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Tenant-facing site. `uuid` is the stable identifier the rest of the
/// platform keys tenant resources on (database name, storage prefix).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Website {
    pub id: Uuid,
    pub uuid: String,
    pub customer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Website {
    pub fn new(uuid: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            uuid: uuid.into(),
            customer_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn owned_by(mut self, customer_id: Uuid) -> Self {
        self.customer_id = Some(customer_id);
        self
    }
}
