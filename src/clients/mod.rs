//! Typed clients over the generic [`ResourceClient`](crate::actor_framework::ResourceClient).

pub mod macros;

mod chat_client;
mod order_client;
mod user_client;

pub use chat_client::*;
pub use order_client::*;
pub use user_client::*;
