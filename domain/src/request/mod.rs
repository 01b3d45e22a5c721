//! Request-scoped state
//!
//! - [`context::RequestContext`]: owned by exactly one request flow
//! - [`response::MemberResponse`]: at most one per (member, round)

pub mod context;
pub mod response;

pub use context::RequestContext;
pub use response::MemberResponse;
