//! Disha career-guide core: onboarding conversation and report pipeline.

pub mod auth;
pub mod callable;
pub mod config;
pub mod error;
pub mod llm;
pub mod onboarding;
pub mod pitch;
pub mod profile;
pub mod report;
pub mod server;
pub mod store;
