//! Sponsor Bridge API.
//!
//! Sponsors record sponsorships to receivers, receivers confirm delivery,
//! and both sides are kept informed through a persisted inbox with a live
//! push stream. Messaging and reports round out the service.

pub mod api;
pub mod auth;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod errors;
pub mod inbox;
pub mod messaging;
pub mod models;
pub mod profiles;
pub mod push;
pub mod registry;
pub mod reporting;
pub mod uploads;

#[cfg(test)]
mod testing;
