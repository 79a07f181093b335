//! Session & Delivery Engine for Courier.
//!
//! This crate holds the four components with real invariants -- the
//! connection supervisor, the bounded message window, the per-user flow
//! store, and the broadcast dispatcher -- plus the "ports" (the `Transport`
//! and `UserRepository` traits) that the infrastructure layer implements.
//! It depends only on `courier-types`; never on HTTP or database crates.

pub mod broadcast;
pub mod flow;
pub mod orders;
pub mod repository;
pub mod session;
pub mod transport;
pub mod window;
