//! VIP reconciliation library - shared modules for both binaries.
//!
//! The matching core (`normalize`, `scoring`, `reconcile`, `vip`) is pure and
//! synchronous; everything that touches the network or disk sits around it.

pub mod api;
pub mod client;
pub mod config;
pub mod crypto;
pub mod fetch;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod reconcile;
pub mod report;
pub mod safety;
pub mod scoring;
pub mod session;
pub mod vip;
