//! Domain layer: entities, lifecycle rules and collaborator contracts.
//!
//! Nothing here depends on the infrastructure or API layers.
//!
//! - [`entities`] - Core data structures
//! - [`lifecycle`] - Status state machine and creation-time date rules
//! - [`repositories`] - Persistence traits
//! - [`vetting`] - Safety check and liveness probe traits

pub mod entities;
pub mod lifecycle;
pub mod repositories;
pub mod vetting;
