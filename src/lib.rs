//! `mailcast` — batch email campaign delivery.
//!
//! This crate provides the delivery pipeline: tolerant contact-table
//! ingestion, flat placeholder templates, SMTP submission with bounded
//! retry and rate limiting, and an append-only per-record run log.

pub mod campaign;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod rate_limit;
pub mod runlog;
pub mod source;
pub mod template;
pub mod transport;
pub mod validate;
