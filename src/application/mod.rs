//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository calls,
//! the outbound URL checks, and lifecycle rules. Services consume repository
//! and collaborator traits and provide a clean API for HTTP handlers and the
//! admin CLI.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Vetting and short link creation
//! - [`services::validation_service::UrlValidator`] - Syntax, safety and liveness checks
//! - [`services::redirect_resolver::RedirectResolver`] - Short code resolution
//! - [`services::recheck_scheduler::RecheckScheduler`] - Deferred and manual re-checks

pub mod services;
