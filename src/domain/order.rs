use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::progress::{ProgressStage, StageTag};
use super::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
        })
    }
}

/// A deposit-handling workflow between an agent, a renter and a landlord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub title: String,
    pub renter_email: String,
    pub landlord_email: String,
    pub property_address: String,
    pub deposit_amount: f64,
    pub description: Option<String>,
    pub status: OrderStatus,
    pub created_by: String,
    pub progress_stages: Vec<ProgressStage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn stage(&self, tag: StageTag) -> Option<&ProgressStage> {
        self.progress_stages.iter().find(|s| s.stage == tag)
    }

    /// Whether `email` is the party this order names for `role`.
    pub fn involves(&self, email: &str, role: Role) -> bool {
        match role {
            Role::Agent => self.created_by == email,
            Role::Renter => self.renter_email == email,
            Role::Landlord => self.landlord_email == email,
        }
    }

    /// Whether `email` takes part in this order in any role.
    pub fn has_party(&self, email: &str) -> bool {
        Role::ALL.into_iter().any(|role| self.involves(email, role))
    }
}

/// Payload for creating a new order.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub title: String,
    pub renter_email: String,
    pub landlord_email: String,
    pub property_address: String,
    pub deposit_amount: f64,
    pub description: Option<String>,
    pub created_by: String,
}

/// Editable order details. Stages and status only change through approvals.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub title: Option<String>,
    pub renter_email: Option<String>,
    pub landlord_email: Option<String>,
    pub property_address: Option<String>,
    pub deposit_amount: Option<f64>,
    pub description: Option<String>,
}
