//! Human-review escalation domain

pub mod rate_limiter;
pub mod ticket;

pub use rate_limiter::SlidingWindowRateLimiter;
pub use ticket::{EscalationTicket, TicketStatus};
