// SPDX-License-Identifier: MIT

//! Definition loader - YAML file loading and parsing
//!
//! This module handles loading API and organization definitions from YAML.

use super::types::{ApiDefinition, OrganizationDefinition};
use crate::sdk::error::{DefinitionError, GatewayResult};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Loads API and organization definitions from YAML files
pub struct DefinitionLoader;

impl DefinitionLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load an API definition from a YAML file
    pub fn load_api<P: AsRef<Path>>(&self, path: P) -> GatewayResult<ApiDefinition> {
        let content = read(path.as_ref())?;
        Self::parse_api(&content)
    }

    /// Load an organization definition from a YAML file
    pub fn load_organization<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> GatewayResult<OrganizationDefinition> {
        let content = read(path.as_ref())?;
        Self::parse_organization(&content)
    }

    /// Parse an API definition from a YAML string
    pub fn parse_api(content: &str) -> GatewayResult<ApiDefinition> {
        let def: ApiDefinition = serde_yaml::from_str(content)?;

        let mut seen = HashSet::new();
        for plan in &def.plans {
            if !seen.insert(plan.id.as_str()) {
                return Err(DefinitionError::DuplicatePlan {
                    api: def.id.clone(),
                    plan: plan.id.clone(),
                }
                .into());
            }
        }
        Ok(def)
    }

    /// Parse an organization definition from a YAML string
    pub fn parse_organization(content: &str) -> GatewayResult<OrganizationDefinition> {
        let def: OrganizationDefinition = serde_yaml::from_str(content)?;
        Ok(def)
    }
}

impl Default for DefinitionLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read(path: &Path) -> GatewayResult<String> {
    if !path.exists() {
        return Err(DefinitionError::FileNotFound(path.display().to_string()).into());
    }
    Ok(fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::flow::types::{ApiType, ExecutionPhase, FlowMode};
    use crate::sdk::error::GatewayError;

    #[test]
    fn test_parse_proxy_api() {
        let yaml = r#"
id: books
name: Books API
flow_mode: BEST_MATCH
organization: acme
flows:
  - name: all-books
    selectors:
      - type: path
        path: /books
    steps:
      - policy: cache
        phase: REQUEST
plans:
  - id: gold
    name: Gold
    flows:
      - name: gold-quota
        steps:
          - policy: quota
            phase: REQUEST
"#;
        let def = DefinitionLoader::parse_api(yaml).unwrap();
        assert_eq!(def.id, "books");
        assert_eq!(def.api_type, ApiType::Proxy);
        assert_eq!(def.flow_mode, FlowMode::BestMatch);
        assert_eq!(def.organization.as_deref(), Some("acme"));
        assert_eq!(def.flows.len(), 1);
        assert_eq!(def.plans[0].flows[0].steps[0].phase, ExecutionPhase::Request);
    }

    #[test]
    fn test_parse_message_api_defaults() {
        let yaml = r#"
id: events
type: message
"#;
        let def = DefinitionLoader::parse_api(yaml).unwrap();
        assert_eq!(def.api_type, ApiType::Message);
        assert_eq!(def.flow_mode, FlowMode::All);
        assert!(def.organization.is_none());
        assert!(def.flows.is_empty());
        assert!(def.plans.is_empty());
    }

    #[test]
    fn test_duplicate_plan_rejected() {
        let yaml = r#"
id: books
plans:
  - id: gold
  - id: gold
"#;
        let err = DefinitionLoader::parse_api(yaml).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Definition(DefinitionError::DuplicatePlan { .. })
        ));
    }

    #[test]
    fn test_parse_organization() {
        let yaml = r#"
id: acme
flow_mode: BEST_MATCH
flows:
  - name: audit
    steps:
      - policy: audit
        phase: RESPONSE
"#;
        let def = DefinitionLoader::parse_organization(yaml).unwrap();
        assert_eq!(def.id, "acme");
        assert_eq!(def.flow_mode, FlowMode::BestMatch);
        assert_eq!(def.flows[0].name, "audit");
    }

    #[test]
    fn test_missing_file() {
        let err = DefinitionLoader::new()
            .load_api("/definitely/not/here.yaml")
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Definition(DefinitionError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_yaml_returns_error() {
        let yaml = r#"
id:
  - invalid structure
"#;
        assert!(DefinitionLoader::parse_api(yaml).is_err());
    }
}
