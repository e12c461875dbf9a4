//! Sales-conversation training server.
//!
//! Trainees chat with AI-simulated customer personas, one [`Case`] at a time,
//! and earn a score and star rating when the persona closes the conversation.
//! Cases unlock in order as earlier ones are completed.
//!
//! [`Case`]: rehearsal_core::models::Case

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod generator;
pub mod orchestrator;
pub mod projector;
pub mod prompt;
pub mod scoring;
pub mod seed;

pub use rehearsal_core::{db, models, Database};
