//! Helper functions used across the application.
//!
//! - [`code_generator`] - Short code generation and shape validation
//! - [`client_info`] - Submitter IP and user agent extraction
//! - [`db_error`] - PostgreSQL error classification

pub mod client_info;
pub mod code_generator;
pub mod db_error;
