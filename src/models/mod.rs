//! Data models for the garage dashboard resources.
//!
//! Field names follow the dashboard JSON contract (camelCase)
//! so the gateway can pass remote payloads through unchanged.

mod bulk;
mod campaign;
mod page;
mod role;
mod statistics;
mod user;

pub use bulk::*;
pub use campaign::*;
pub use page::*;
pub use role::*;
pub use statistics::*;
pub use user::*;
