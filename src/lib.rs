//! Outreach — AI-personalized email campaigns with a human approval step.

pub mod api;
pub mod attachments;
pub mod campaign;
pub mod config;
pub mod contacts;
pub mod dispatch;
pub mod error;
pub mod generation;
pub mod llm;
pub mod review;
pub mod store;
pub mod templates;
