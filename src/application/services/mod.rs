//! Business logic services for the application layer.

pub mod link_service;
pub mod recheck_scheduler;
pub mod redirect_resolver;
pub mod validation_service;

pub use link_service::{CreateLinkRequest, CreatedLink, LinkService};
pub use recheck_scheduler::{CheckOutcome, RecheckScheduler};
pub use redirect_resolver::RedirectResolver;
pub use validation_service::{Submitter, UrlValidator};
