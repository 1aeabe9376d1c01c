use chrono::Utc;

use super::error::OrderError;
use crate::actor_framework::Entity;
use crate::domain::progress;
use crate::domain::{looks_like_email, Actor, Order, OrderCreate, OrderPatch, OrderStatus, Role, StageTag};

/// Custom actions for Order entities. Both return the updated order.
#[derive(Debug, Clone)]
pub enum OrderAction {
    /// A renter or landlord signs off on their review stage.
    Approve { stage: StageTag, actor: Actor },
    /// The creating agent closes the order once the deposit is held.
    Finalize { actor: Actor },
}

impl Entity for Order {
    const KIND: &'static str = "order";

    type Id = String;
    type CreateParams = OrderCreate;
    type Patch = OrderPatch;
    type Action = OrderAction;
    type ActionResult = Order;
    /// The agent asking for the delete.
    type DeleteGuard = Actor;
    type Error = OrderError;

    fn id(&self) -> String {
        self.id.clone()
    }

    /// Creates a new Order with its checklist initialized.
    ///
    /// # Notes
    /// The order starts `pending` with only `order_created` completed, attributed
    /// to `params.created_by`.
    fn from_create_params(id: String, params: OrderCreate) -> Result<Self, OrderError> {
        validate_fields(
            &params.title,
            &params.renter_email,
            &params.landlord_email,
            &params.property_address,
            params.deposit_amount,
        )?;

        let now = Utc::now();
        let mut order = Self {
            id,
            title: params.title.trim().to_string(),
            renter_email: params.renter_email,
            landlord_email: params.landlord_email,
            property_address: params.property_address.trim().to_string(),
            deposit_amount: params.deposit_amount,
            description: params.description.filter(|d| !d.trim().is_empty()),
            status: OrderStatus::Pending,
            created_by: params.created_by,
            progress_stages: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        progress::initialize_at(&mut order, now);
        Ok(order)
    }

    /// Updates the editable details. Stages and status are not reachable from here.
    fn on_update(&mut self, patch: OrderPatch) -> Result<(), OrderError> {
        let mut next = self.clone();
        if let Some(title) = patch.title {
            next.title = title.trim().to_string();
        }
        if let Some(renter_email) = patch.renter_email {
            reassign_party(&mut next, StageTag::RenterReview, renter_email)?;
        }
        if let Some(landlord_email) = patch.landlord_email {
            reassign_party(&mut next, StageTag::LandlordReview, landlord_email)?;
        }
        if let Some(address) = patch.property_address {
            next.property_address = address.trim().to_string();
        }
        if let Some(amount) = patch.deposit_amount {
            next.deposit_amount = amount;
        }
        if let Some(description) = patch.description {
            next.description = Some(description).filter(|d| !d.trim().is_empty());
        }

        validate_fields(
            &next.title,
            &next.renter_email,
            &next.landlord_email,
            &next.property_address,
            next.deposit_amount,
        )?;

        next.updated_at = Utc::now();
        *self = next;
        Ok(())
    }

    /// Only the agent who created the order may delete it.
    fn on_delete(&self, requester: &Actor) -> Result<(), OrderError> {
        if requester.role != Role::Agent {
            return Err(OrderError::NotAuthorized("only agents can delete orders".to_string()));
        }
        if requester.email != self.created_by {
            return Err(OrderError::NotAuthorized(
                "you can only delete orders you created".to_string(),
            ));
        }
        Ok(())
    }

    fn handle_action(&mut self, action: OrderAction) -> Result<Order, OrderError> {
        match action {
            OrderAction::Approve { stage, actor } => progress::approve(self, stage, &actor)?,
            OrderAction::Finalize { actor } => progress::finalize(self, &actor)?,
        }
        Ok(self.clone())
    }
}

/// A party can be swapped out only until they have signed their review.
fn reassign_party(order: &mut Order, review: StageTag, email: String) -> Result<(), OrderError> {
    let review_completed = order.stage(review).is_some_and(|s| s.completed);
    let slot = match review {
        StageTag::LandlordReview => &mut order.landlord_email,
        _ => &mut order.renter_email,
    };
    if *slot == email {
        return Ok(());
    }
    if review_completed {
        return Err(OrderError::ValidationError(format!(
            "{review} is already completed, the party who signed it cannot be replaced"
        )));
    }
    *slot = email;
    Ok(())
}

fn validate_fields(
    title: &str,
    renter_email: &str,
    landlord_email: &str,
    property_address: &str,
    deposit_amount: f64,
) -> Result<(), OrderError> {
    if title.trim().is_empty() {
        return Err(OrderError::ValidationError("title is required".to_string()));
    }
    if property_address.trim().is_empty() {
        return Err(OrderError::ValidationError("property address is required".to_string()));
    }
    if !looks_like_email(renter_email) {
        return Err(OrderError::ValidationError(format!("invalid renter email: {renter_email}")));
    }
    if !looks_like_email(landlord_email) {
        return Err(OrderError::ValidationError(format!("invalid landlord email: {landlord_email}")));
    }
    if !deposit_amount.is_finite() || deposit_amount <= 0.0 {
        return Err(OrderError::ValidationError(format!(
            "deposit amount must be positive, got {deposit_amount}"
        )));
    }
    Ok(())
}
