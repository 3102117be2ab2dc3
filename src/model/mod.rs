//! Core data model: contact rows, records, messages, attachments, outcomes.

pub mod address;
pub mod attachment;
pub mod message;
pub mod outcome;
pub mod record;
