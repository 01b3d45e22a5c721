//! Provider adapters
//!
//! Every backend speaks the OpenAI-compatible chat completions protocol;
//! [`RoutingGateway`] picks the endpoint named by the member's `backend`.

mod openai_compat;
mod routing;

pub use openai_compat::{OpenAiCompatClient, ProviderEndpoint};
pub use routing::RoutingGateway;

use council_application::GatewayError;

/// Map a transport failure onto the gateway taxonomy
pub(crate) fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_decode() {
        GatewayError::InvalidResponse(e.to_string())
    } else {
        GatewayError::ConnectionError(e.to_string())
    }
}
