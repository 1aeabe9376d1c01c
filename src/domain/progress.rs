//! Order progress tracking.
//!
//! Every order carries the same five-stage checklist, in the same order:
//!
//! 1. `order_created` - completed at creation, attributed to the creating agent
//! 2. `renter_review` - approved by the order's renter
//! 3. `landlord_review` - approved by the order's landlord, only after the renter
//! 4. `deposit_held` - derived: completed by [`SYSTEM_COMPLETER`] once both reviews are in
//! 5. `completed` - set by the creating agent through [`finalize`]
//!
//! Only the `completed` / `date` / `completed_by` fields of a stage ever change,
//! and a completed stage is never reopened, so the overall status only moves
//! forward: `pending -> in_progress -> completed`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::order::{Order, OrderStatus};
use super::user::{Actor, Role};

/// Completer recorded on stages the tracker completes on its own.
pub const SYSTEM_COMPLETER: &str = "System";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageTag {
    OrderCreated,
    RenterReview,
    LandlordReview,
    DepositHeld,
    Completed,
}

impl StageTag {
    /// The fixed checklist layout shared by every order.
    pub const SEQUENCE: [StageTag; 5] = [
        StageTag::OrderCreated,
        StageTag::RenterReview,
        StageTag::LandlordReview,
        StageTag::DepositHeld,
        StageTag::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageTag::OrderCreated => "order_created",
            StageTag::RenterReview => "renter_review",
            StageTag::LandlordReview => "landlord_review",
            StageTag::DepositHeld => "deposit_held",
            StageTag::Completed => "completed",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            StageTag::OrderCreated => "Order Created",
            StageTag::RenterReview => "Renter Review",
            StageTag::LandlordReview => "Landlord Review",
            StageTag::DepositHeld => "Deposit Held",
            StageTag::Completed => "Completed",
        }
    }

    /// The role whose approval completes this stage, for the two review stages.
    pub fn approver_role(&self) -> Option<Role> {
        match self {
            StageTag::RenterReview => Some(Role::Renter),
            StageTag::LandlordReview => Some(Role::Landlord),
            _ => None,
        }
    }
}

impl fmt::Display for StageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageTag {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageTag::SEQUENCE
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| ProgressError::InvalidStage(s.to_string()))
    }
}

/// One checklist item of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressStage {
    pub stage: StageTag,
    pub title: String,
    pub completed: bool,
    pub date: Option<DateTime<Utc>>,
    pub completed_by: Option<String>,
}

impl ProgressStage {
    pub fn pending(stage: StageTag) -> Self {
        Self {
            stage,
            title: stage.title().to_string(),
            completed: false,
            date: None,
            completed_by: None,
        }
    }

    fn complete(&mut self, by: impl Into<String>, at: DateTime<Utc>) {
        self.completed = true;
        self.date = Some(at);
        self.completed_by = Some(by.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("invalid stage: {0} (only renter_review and landlord_review are approved by hand)")]
    InvalidStage(String),
    #[error("{actor} may not complete stage {stage}")]
    NotAuthorized { actor: String, stage: StageTag },
    #[error("stage {stage} requires {requires} to be completed first")]
    StageNotReady { stage: StageTag, requires: StageTag },
    #[error("stage {0} is already completed")]
    AlreadyCompleted(StageTag),
    #[error("order {order_id} has a malformed checklist ({found} stages)")]
    CorruptStages { order_id: String, found: usize },
}

/// The untouched five-stage checklist.
pub fn default_stages() -> Vec<ProgressStage> {
    StageTag::SEQUENCE.into_iter().map(ProgressStage::pending).collect()
}

/// Reset the checklist of a freshly created order and stamp `order_created`.
pub fn initialize(order: &mut Order) {
    initialize_at(order, Utc::now());
}

pub fn initialize_at(order: &mut Order, now: DateTime<Utc>) {
    let mut stages = default_stages();
    stages[0].complete(order.created_by.clone(), now);
    order.progress_stages = stages;
    order.status = OrderStatus::Pending;
}

/// Which stage, if any, a role signs off on.
pub fn approval_stage_for(role: Role) -> Option<StageTag> {
    match role {
        Role::Renter => Some(StageTag::RenterReview),
        Role::Landlord => Some(StageTag::LandlordReview),
        Role::Agent => None,
    }
}

/// Whether `identity`, acting as `role`, may approve its review stage right now.
///
/// Reviews are strictly ordered: the landlord can only approve after the renter.
pub fn can_approve(order: &Order, role: Role, identity: &str) -> bool {
    match role {
        Role::Renter => {
            order.renter_email == identity && !is_completed(order, StageTag::RenterReview)
        }
        Role::Landlord => {
            order.landlord_email == identity
                && is_completed(order, StageTag::RenterReview)
                && !is_completed(order, StageTag::LandlordReview)
        }
        Role::Agent => false,
    }
}

/// Record `actor`'s approval of `stage`, then apply the derived rules.
pub fn approve(order: &mut Order, stage: StageTag, actor: &Actor) -> Result<(), ProgressError> {
    approve_at(order, stage, actor, Utc::now())
}

pub fn approve_at(
    order: &mut Order,
    stage: StageTag,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<(), ProgressError> {
    let required = stage
        .approver_role()
        .ok_or_else(|| ProgressError::InvalidStage(stage.as_str().to_string()))?;
    check_layout(order)?;

    if actor.role != required || !can_approve(order, actor.role, &actor.email) {
        return Err(ProgressError::NotAuthorized { actor: actor.to_string(), stage });
    }

    stage_mut(order, stage).complete(actor.email.clone(), now);
    hold_deposit_if_reviewed(order, now);
    order.status = derive_status(order);
    order.updated_at = now;
    Ok(())
}

/// Completes `deposit_held` once both reviews are in.
///
/// Returns whether anything changed; calling it again is a no-op that keeps the
/// original timestamp and completer.
pub fn hold_deposit_if_reviewed(order: &mut Order, now: DateTime<Utc>) -> bool {
    let reviewed = is_completed(order, StageTag::RenterReview)
        && is_completed(order, StageTag::LandlordReview);
    if !reviewed || is_completed(order, StageTag::DepositHeld) {
        return false;
    }
    stage_mut(order, StageTag::DepositHeld).complete(SYSTEM_COMPLETER, now);
    true
}

/// The creating agent closes out an order whose deposit is held.
pub fn finalize(order: &mut Order, actor: &Actor) -> Result<(), ProgressError> {
    finalize_at(order, actor, Utc::now())
}

pub fn finalize_at(order: &mut Order, actor: &Actor, now: DateTime<Utc>) -> Result<(), ProgressError> {
    check_layout(order)?;

    if actor.role != Role::Agent || actor.email != order.created_by {
        return Err(ProgressError::NotAuthorized {
            actor: actor.to_string(),
            stage: StageTag::Completed,
        });
    }
    if is_completed(order, StageTag::Completed) {
        return Err(ProgressError::AlreadyCompleted(StageTag::Completed));
    }
    if !is_completed(order, StageTag::DepositHeld) {
        return Err(ProgressError::StageNotReady {
            stage: StageTag::Completed,
            requires: StageTag::DepositHeld,
        });
    }

    stage_mut(order, StageTag::Completed).complete(actor.email.clone(), now);
    order.status = derive_status(order);
    order.updated_at = now;
    Ok(())
}

/// `round(100 * completed / total)`.
pub fn progress_percentage(order: &Order) -> u8 {
    let total = order.progress_stages.len();
    if total == 0 {
        return 0;
    }
    let done = order.progress_stages.iter().filter(|s| s.completed).count();
    ((done as f64 / total as f64) * 100.0).round() as u8
}

/// Status implied by the checklist.
pub fn derive_status(order: &Order) -> OrderStatus {
    let stages = &order.progress_stages;
    if !stages.is_empty() && stages.iter().all(|s| s.completed) {
        OrderStatus::Completed
    } else if stages
        .iter()
        .any(|s| s.completed && s.stage != StageTag::OrderCreated)
    {
        OrderStatus::InProgress
    } else {
        OrderStatus::Pending
    }
}

/// Checks the fixed layout, for orders that come back from storage.
pub fn check_layout(order: &Order) -> Result<(), ProgressError> {
    let tags = order.progress_stages.iter().map(|s| s.stage);
    if order.progress_stages.len() != StageTag::SEQUENCE.len() || !tags.eq(StageTag::SEQUENCE) {
        return Err(ProgressError::CorruptStages {
            order_id: order.id.clone(),
            found: order.progress_stages.len(),
        });
    }
    Ok(())
}

fn is_completed(order: &Order, tag: StageTag) -> bool {
    order.stage(tag).is_some_and(|s| s.completed)
}

fn stage_mut(order: &mut Order, tag: StageTag) -> &mut ProgressStage {
    let index = StageTag::SEQUENCE
        .iter()
        .position(|t| *t == tag)
        .unwrap_or_default();
    debug_assert_eq!(order.progress_stages[index].stage, tag);
    &mut order.progress_stages[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, minute, 0).unwrap()
    }

    fn new_order() -> Order {
        let mut order = Order {
            id: "482913".to_string(),
            title: "Flat 3B deposit".to_string(),
            renter_email: "r@x.com".to_string(),
            landlord_email: "l@x.com".to_string(),
            property_address: "3B Harbour Road".to_string(),
            deposit_amount: 2500.00,
            description: None,
            status: OrderStatus::Pending,
            created_by: "agent@x.com".to_string(),
            progress_stages: Vec::new(),
            created_at: at(0),
            updated_at: at(0),
        };
        initialize_at(&mut order, at(0));
        order
    }

    fn completed_tags(order: &Order) -> Vec<StageTag> {
        order.progress_stages.iter().filter(|s| s.completed).map(|s| s.stage).collect()
    }

    #[test]
    fn test_initialize_stamps_first_stage() {
        let order = new_order();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.progress_stages.len(), 5);
        assert_eq!(completed_tags(&order), vec![StageTag::OrderCreated]);

        let first = &order.progress_stages[0];
        assert_eq!(first.completed_by.as_deref(), Some("agent@x.com"));
        assert_eq!(first.date, Some(at(0)));
        assert_eq!(first.title, "Order Created");
        assert_eq!(progress_percentage(&order), 20);
    }

    #[test]
    fn test_renter_approval_moves_to_in_progress() {
        let mut order = new_order();
        approve_at(&mut order, StageTag::RenterReview, &Actor::renter("r@x.com"), at(5)).unwrap();

        assert_eq!(order.status, OrderStatus::InProgress);
        assert_eq!(progress_percentage(&order), 40);
        let stage = order.stage(StageTag::RenterReview).unwrap();
        assert_eq!(stage.completed_by.as_deref(), Some("r@x.com"));
        assert_eq!(stage.date, Some(at(5)));
        assert_eq!(order.updated_at, at(5));
    }

    #[test]
    fn test_both_reviews_hold_the_deposit() {
        let mut order = new_order();
        approve_at(&mut order, StageTag::RenterReview, &Actor::renter("r@x.com"), at(5)).unwrap();
        approve_at(&mut order, StageTag::LandlordReview, &Actor::landlord("l@x.com"), at(9)).unwrap();

        let held = order.stage(StageTag::DepositHeld).unwrap();
        assert!(held.completed);
        assert_eq!(held.completed_by.as_deref(), Some(SYSTEM_COMPLETER));
        assert_eq!(held.date, Some(at(9)));

        assert!(!order.stage(StageTag::Completed).unwrap().completed);
        assert_eq!(order.status, OrderStatus::InProgress);
        assert_eq!(progress_percentage(&order), 80);
    }

    #[test]
    fn test_deposit_rule_is_idempotent() {
        let mut order = new_order();
        approve_at(&mut order, StageTag::RenterReview, &Actor::renter("r@x.com"), at(5)).unwrap();
        approve_at(&mut order, StageTag::LandlordReview, &Actor::landlord("l@x.com"), at(9)).unwrap();
        let before = order.stage(StageTag::DepositHeld).cloned();

        assert!(!hold_deposit_if_reviewed(&mut order, at(30)));
        assert_eq!(order.stage(StageTag::DepositHeld).cloned(), before);
    }

    #[test]
    fn test_deposit_rule_waits_for_both_reviews() {
        let mut order = new_order();
        assert!(!hold_deposit_if_reviewed(&mut order, at(1)));
        approve_at(&mut order, StageTag::RenterReview, &Actor::renter("r@x.com"), at(5)).unwrap();
        assert!(!hold_deposit_if_reviewed(&mut order, at(6)));
        assert!(!order.stage(StageTag::DepositHeld).unwrap().completed);
    }

    #[test]
    fn test_landlord_cannot_go_first() {
        let mut order = new_order();
        assert!(!can_approve(&order, Role::Landlord, "l@x.com"));

        let before = order.clone();
        let err = approve_at(&mut order, StageTag::LandlordReview, &Actor::landlord("l@x.com"), at(2))
            .unwrap_err();
        assert!(matches!(err, ProgressError::NotAuthorized { stage: StageTag::LandlordReview, .. }));
        assert_eq!(order, before);
    }

    #[test]
    fn test_can_approve_dispatch() {
        let mut order = new_order();
        assert!(can_approve(&order, Role::Renter, "r@x.com"));
        assert!(!can_approve(&order, Role::Renter, "someone@x.com"));
        assert!(!can_approve(&order, Role::Agent, "agent@x.com"));

        approve_at(&mut order, StageTag::RenterReview, &Actor::renter("r@x.com"), at(5)).unwrap();
        assert!(!can_approve(&order, Role::Renter, "r@x.com"));
        assert!(can_approve(&order, Role::Landlord, "l@x.com"));
        assert!(!can_approve(&order, Role::Landlord, "r@x.com"));
    }

    #[test]
    fn test_non_review_stages_are_rejected() {
        let mut order = new_order();
        for stage in [StageTag::OrderCreated, StageTag::DepositHeld, StageTag::Completed] {
            let err = approve_at(&mut order, stage, &Actor::renter("r@x.com"), at(1)).unwrap_err();
            assert_eq!(err, ProgressError::InvalidStage(stage.as_str().to_string()));
        }
        assert_eq!("escrow".parse::<StageTag>(), Err(ProgressError::InvalidStage("escrow".to_string())));
        assert_eq!("landlord_review".parse::<StageTag>(), Ok(StageTag::LandlordReview));
    }

    #[test]
    fn test_role_must_match_stage() {
        let mut order = new_order();
        // The renter is allowed to act, but not on the landlord's stage.
        let err = approve_at(&mut order, StageTag::LandlordReview, &Actor::renter("r@x.com"), at(1))
            .unwrap_err();
        assert!(matches!(err, ProgressError::NotAuthorized { .. }));
    }

    #[test]
    fn test_double_approval_is_rejected() {
        let mut order = new_order();
        approve_at(&mut order, StageTag::RenterReview, &Actor::renter("r@x.com"), at(5)).unwrap();
        let err = approve_at(&mut order, StageTag::RenterReview, &Actor::renter("r@x.com"), at(6))
            .unwrap_err();
        assert!(matches!(err, ProgressError::NotAuthorized { .. }));
        assert_eq!(order.stage(StageTag::RenterReview).unwrap().date, Some(at(5)));
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut order = new_order();
        let mut seen = vec![progress_percentage(&order)];

        approve_at(&mut order, StageTag::RenterReview, &Actor::renter("r@x.com"), at(1)).unwrap();
        seen.push(progress_percentage(&order));
        let _ = approve_at(&mut order, StageTag::RenterReview, &Actor::renter("r@x.com"), at(2));
        seen.push(progress_percentage(&order));
        approve_at(&mut order, StageTag::LandlordReview, &Actor::landlord("l@x.com"), at(3)).unwrap();
        seen.push(progress_percentage(&order));
        finalize_at(&mut order, &Actor::agent("agent@x.com"), at(4)).unwrap();
        seen.push(progress_percentage(&order));

        assert_eq!(seen, vec![20, 40, 40, 80, 100]);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_finalize_rules() {
        let mut order = new_order();
        let agent = Actor::agent("agent@x.com");

        let err = finalize_at(&mut order, &agent, at(1)).unwrap_err();
        assert_eq!(
            err,
            ProgressError::StageNotReady { stage: StageTag::Completed, requires: StageTag::DepositHeld }
        );

        approve_at(&mut order, StageTag::RenterReview, &Actor::renter("r@x.com"), at(2)).unwrap();
        approve_at(&mut order, StageTag::LandlordReview, &Actor::landlord("l@x.com"), at(3)).unwrap();

        let other_agent = finalize_at(&mut order, &Actor::agent("other@x.com"), at(4)).unwrap_err();
        assert!(matches!(other_agent, ProgressError::NotAuthorized { .. }));
        let renter = finalize_at(&mut order, &Actor::renter("agent@x.com"), at(4)).unwrap_err();
        assert!(matches!(renter, ProgressError::NotAuthorized { .. }));

        finalize_at(&mut order, &agent, at(5)).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(progress_percentage(&order), 100);
        assert_eq!(
            order.stage(StageTag::Completed).unwrap().completed_by.as_deref(),
            Some("agent@x.com")
        );

        let again = finalize_at(&mut order, &agent, at(6)).unwrap_err();
        assert_eq!(again, ProgressError::AlreadyCompleted(StageTag::Completed));
    }

    #[test]
    fn test_corrupt_checklist_is_reported() {
        let mut order = new_order();
        order.progress_stages.swap(1, 2);
        let err = approve_at(&mut order, StageTag::RenterReview, &Actor::renter("r@x.com"), at(1))
            .unwrap_err();
        assert_eq!(err, ProgressError::CorruptStages { order_id: "482913".to_string(), found: 5 });

        order.progress_stages.truncate(3);
        assert!(check_layout(&order).is_err());
    }

    #[test]
    fn test_derive_status() {
        let mut order = new_order();
        assert_eq!(derive_status(&order), OrderStatus::Pending);
        order.progress_stages.clear();
        assert_eq!(derive_status(&order), OrderStatus::Pending);
        assert_eq!(progress_percentage(&order), 0);
    }
}
