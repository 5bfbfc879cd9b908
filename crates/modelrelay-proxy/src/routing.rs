//! Per-request routing decision.

use modelrelay_core::{ModelRegistry, ProviderRoute};

use crate::framing::InboundRequest;
use crate::models::ModelSelector;

/// Path served by the models aggregator instead of any backend.
pub const MODELS_PATH: &str = "/v1/models";

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Synthesize the aggregated model listing.
    Models,
    /// Relay raw bytes to the managed backend.
    Managed,
    /// Call an external provider directly.
    External(ProviderRoute),
}

impl RoutingDecision {
    /// Short label for logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Models => "models",
            Self::Managed => "managed",
            Self::External(_) => "external",
        }
    }
}

/// Decide where `request` goes.
///
/// Anything that does not resolve to an enabled external provider, including
/// an unparsable body or a missing `model` field, falls through to the
/// managed backend.
pub fn decide(request: &InboundRequest, registry: &ModelRegistry) -> RoutingDecision {
    if request.path() == MODELS_PATH {
        return RoutingDecision::Models;
    }

    ModelSelector::model_from_body(&request.body)
        .and_then(|model| registry.route_for(&model))
        .map_or(RoutingDecision::Managed, RoutingDecision::External)
}
