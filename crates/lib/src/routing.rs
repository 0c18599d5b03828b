//! Backend routing: which outbound path handles queries for the life of the process.
//!
//! Preferred: the A2A gateway (shared with the other frontends of the backend fleet).
//! Fallback: the reasoning engine called directly.

use crate::config::Settings;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingDecision {
    A2aGateway,
    DirectEngine,
    /// Feature switched off and nothing configured: acknowledge and drop.
    Disabled,
    /// Feature switched on but no route configured: acknowledge, drop, and report through health.
    Misconfigured,
}

impl RoutingDecision {
    /// Pure function of settings; evaluated once at startup.
    pub fn resolve(settings: &Settings) -> Self {
        if settings.backend.a2a_gateway_url.is_some() {
            RoutingDecision::A2aGateway
        } else if settings.backend.has_direct_engine() {
            RoutingDecision::DirectEngine
        } else if !settings.enabled {
            RoutingDecision::Disabled
        } else {
            RoutingDecision::Misconfigured
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingDecision::A2aGateway => "a2a_gateway",
            RoutingDecision::DirectEngine => "direct_engine",
            RoutingDecision::Disabled => "disabled",
            RoutingDecision::Misconfigured => "misconfigured",
        }
    }

    /// True when requests result in an outbound backend call.
    pub fn is_routable(&self) -> bool {
        matches!(self, RoutingDecision::A2aGateway | RoutingDecision::DirectEngine)
    }
}

impl fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::collections::HashMap;

    fn decide(vars: &[(&str, &str)]) -> RoutingDecision {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        let settings =
            Settings::resolve_with(&Config::default(), |k| map.get(k).map(|v| v.to_string()))
                .unwrap();
        RoutingDecision::resolve(&settings)
    }

    const DIRECT: [(&str, &str); 3] =
        [("PROJECT_ID", "p"), ("LOCATION", "l"), ("AGENT_ENGINE_ID", "e")];

    #[test]
    fn gateway_url_takes_precedence() {
        let mut vars = DIRECT.to_vec();
        vars.push(("A2A_GATEWAY_URL", "http://a2a"));
        assert_eq!(decide(&vars), RoutingDecision::A2aGateway);
    }

    #[test]
    fn direct_engine_needs_all_three() {
        assert_eq!(decide(&DIRECT), RoutingDecision::DirectEngine);
        assert_eq!(decide(&DIRECT[..2]), RoutingDecision::Disabled);
    }

    #[test]
    fn unconfigured_is_disabled_or_misconfigured_by_flag() {
        assert_eq!(decide(&[]), RoutingDecision::Disabled);
        assert_eq!(decide(&[("SLACK_BOB_ENABLED", "true")]), RoutingDecision::Misconfigured);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(RoutingDecision::A2aGateway).unwrap(),
            serde_json::json!("a2a_gateway")
        );
        assert!(!RoutingDecision::Misconfigured.is_routable());
    }
}
