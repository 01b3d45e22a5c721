//! Prompt domain
//!
//! Templates for each stage of a council request: the initial question,
//! negotiation rounds and moderator synthesis.

mod template;

pub use template::{PromptTemplate, extract_citations};
