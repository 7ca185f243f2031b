//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate codec and repository calls into use-case level APIs.
//! - Keep host layers decoupled from storage details.

pub mod rating_service;
pub mod template_service;
