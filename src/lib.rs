//! Photo Analysis Engine
//!
//! Asynchronous job engine behind the meal-nutrition and body-progress photo
//! features: submitted analyses are de-duplicated against a TTL response
//! cache, run against a Workers AI vision model with bounded retries, gated
//! on confidence and exposed for polling.

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
