//! assistant-service: HTTP endpoints backed by Gemini prompt flows.
pub mod config;
pub mod dtos;
pub mod error;
pub mod flows;
pub mod handlers;
pub mod prompts;
pub mod schema;
pub mod services;
pub mod startup;
pub mod utils;
