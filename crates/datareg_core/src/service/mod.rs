//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep endpoint and browse layers decoupled from storage details.

pub mod auth_service;
pub mod catalog_service;
pub mod issue_service;
