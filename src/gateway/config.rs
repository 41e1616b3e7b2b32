// SPDX-License-Identifier: MIT

//! Gateway configuration
//!
//! Read from an optional YAML file, then overridden from the environment
//! (`.env` files are honoured by the binary through `dotenv`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::sdk::error::{GatewayError, GatewayResult};

pub const ENV_VALIDATE_FLOW_MATCHING: &str = "FLOWGATE_VALIDATE_FLOW_MATCHING";
pub const ENV_INTERRUPT_IF_NO_MATCH: &str = "FLOWGATE_INTERRUPT_IF_NO_MATCH";
pub const ENV_ORGANIZATION: &str = "FLOWGATE_ORGANIZATION";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub flows: FlowsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FlowsConfig {
    /// Check on the REQUEST phase that some plan or API flow matched
    #[serde(default = "default_true")]
    pub validate_matching: bool,
    /// Answer 404 when validation finds no matching flow
    #[serde(default = "default_true")]
    pub interrupt_if_no_match: bool,
    /// Organization of APIs that do not name one
    #[serde(default = "default_organization")]
    pub default_organization: String,
}

impl Default for FlowsConfig {
    fn default() -> Self {
        Self {
            validate_matching: true,
            interrupt_if_no_match: true,
            default_organization: default_organization(),
        }
    }
}

impl GatewayConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> GatewayResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> GatewayResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `FLOWGATE_*` environment variables on top of this config
    pub fn with_env(self) -> GatewayResult<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> GatewayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_VALIDATE_FLOW_MATCHING) {
            self.flows.validate_matching = parse_bool(ENV_VALIDATE_FLOW_MATCHING, &value)?;
        }
        if let Some(value) = lookup(ENV_INTERRUPT_IF_NO_MATCH) {
            self.flows.interrupt_if_no_match = parse_bool(ENV_INTERRUPT_IF_NO_MATCH, &value)?;
        }
        if let Some(value) = lookup(ENV_ORGANIZATION) {
            if !value.trim().is_empty() {
                self.flows.default_organization = value.trim().to_string();
            }
        }
        Ok(self)
    }
}

fn parse_bool(name: &str, value: &str) -> GatewayResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(GatewayError::config(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

fn default_true() -> bool {
    true
}

fn default_organization() -> String {
    "DEFAULT".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert!(config.flows.validate_matching);
        assert!(config.flows.interrupt_if_no_match);
        assert_eq!(config.flows.default_organization, "DEFAULT");

        assert_eq!(GatewayConfig::from_yaml("{}").unwrap(), config);
    }

    #[test]
    fn test_partial_yaml() {
        let config = GatewayConfig::from_yaml("flows:\n  interrupt_if_no_match: false\n").unwrap();
        assert!(config.flows.validate_matching);
        assert!(!config.flows.interrupt_if_no_match);
    }

    #[test]
    fn test_env_overrides() {
        let config = GatewayConfig::default()
            .with_overrides(env(&[
                (ENV_VALIDATE_FLOW_MATCHING, "off"),
                (ENV_INTERRUPT_IF_NO_MATCH, "0"),
                (ENV_ORGANIZATION, " acme "),
            ]))
            .unwrap();
        assert!(!config.flows.validate_matching);
        assert!(!config.flows.interrupt_if_no_match);
        assert_eq!(config.flows.default_organization, "acme");
    }

    #[test]
    fn test_invalid_boolean() {
        let err = GatewayConfig::default()
            .with_overrides(env(&[(ENV_INTERRUPT_IF_NO_MATCH, "sometimes")]))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }
}
