//! Shared domain types for Courier.
//!
//! This crate contains the core domain types used across the Courier bot:
//! chat/message identifiers, the user record, the transport error taxonomy,
//! pending-flow state, and engine configuration.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod flow;
pub mod ids;
pub mod keyboard;
pub mod transport;
pub mod user;
