//! Core domain concepts shared across all subdomains.
//!
//! - [`member::CouncilMember`]: one backend participating in the council
//! - [`question::Question`]: a validated question to pose to the council
//! - [`ids::RequestId`] / [`ids::TicketId`]: opaque identifiers
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod ids;
pub mod member;
pub mod question;
pub mod string;
pub mod validation;
