//! Deposit Desk: rental deposit orders tracked through a five-stage checklist.
//!
//! Each entity kind (users, orders, chat rooms) is owned by one
//! [`ResourceActor`](actor_framework::ResourceActor); typed clients in
//! [`clients`] talk to the actors over channels, and
//! [`DepositSystem`](app_system::DepositSystem) wires them together.

pub mod actor_framework;
pub mod app_system;
pub mod chat_actor;
pub mod clients;
pub mod config;
pub mod domain;
pub mod order_actor;
pub mod persistence;
pub mod user_actor;

#[cfg(test)]
mod mock_framework;
