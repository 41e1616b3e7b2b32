// SPDX-License-Identifier: MIT

//! Loaded organizations and their platform flows

use dashmap::DashMap;
use std::sync::Arc;

use crate::gateway::flow::selector::PathPatterns;
use crate::gateway::flow::types::{Flow, FlowMode, OrganizationDefinition};
use crate::sdk::error::GatewayResult;

/// An organization as seen by the platform chain of every API it owns
#[derive(Debug)]
pub struct Organization {
    id: String,
    flow_mode: FlowMode,
    flows: Vec<Arc<Flow>>,
    patterns: Arc<PathPatterns>,
}

impl Organization {
    /// Keep the enabled flows and compile their path templates up front
    pub fn load(definition: OrganizationDefinition) -> GatewayResult<Self> {
        let patterns = Arc::new(PathPatterns::new());
        let flows = enabled_flows(definition.flows);
        precompile(&flows, &patterns)?;

        Ok(Self {
            id: definition.id,
            flow_mode: definition.flow_mode,
            flows,
            patterns,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn flow_mode(&self) -> FlowMode {
        self.flow_mode
    }

    pub fn flows(&self) -> &[Arc<Flow>] {
        &self.flows
    }

    pub fn patterns(&self) -> &Arc<PathPatterns> {
        &self.patterns
    }
}

/// Enabled flows in declaration order
pub(crate) fn enabled_flows(flows: Vec<Flow>) -> Vec<Arc<Flow>> {
    flows
        .into_iter()
        .filter(|f| f.enabled)
        .map(Arc::new)
        .collect()
}

pub(crate) fn precompile(flows: &[Arc<Flow>], patterns: &PathPatterns) -> GatewayResult<()> {
    for selector in flows.iter().filter_map(|f| f.path_selector()) {
        patterns.get_or_compile(&selector.path)?;
    }
    Ok(())
}

/// Organizations currently loaded on the gateway
#[derive(Debug, Default)]
pub struct OrganizationManager {
    organizations: DashMap<String, Arc<Organization>>,
}

impl OrganizationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an organization, replacing any previous version with the same id
    pub fn register(&self, definition: OrganizationDefinition) -> GatewayResult<Arc<Organization>> {
        let organization = Arc::new(Organization::load(definition)?);
        log::info!(
            "Registered organization '{}' with {} platform flow(s)",
            organization.id(),
            organization.flows().len()
        );

        if let Some(previous) = self
            .organizations
            .insert(organization.id().to_string(), Arc::clone(&organization))
        {
            previous.patterns().clear();
            log::debug!("Organization '{}' replaced", organization.id());
        }
        Ok(organization)
    }

    /// Remove an organization; its compiled path patterns go with it
    pub fn unregister(&self, id: &str) -> Option<Arc<Organization>> {
        let (_, removed) = self.organizations.remove(id)?;
        removed.patterns().clear();
        log::info!("Unregistered organization '{}'", id);
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Organization>> {
        self.organizations.get(id).map(|o| Arc::clone(o.value()))
    }

    pub fn len(&self) -> usize {
        self.organizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organizations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::flow::loader::DefinitionLoader;

    const ORG: &str = r#"
id: acme
flow_mode: BEST_MATCH
flows:
  - name: audit
    selectors:
      - type: path
        path: /
    steps: []
  - name: legacy
    enabled: false
    steps: []
  - name: books
    selectors:
      - type: path
        path: /books/:id
        operator: EQUALS
"#;

    #[test]
    fn test_load_keeps_enabled_flows_and_precompiles() {
        let definition = DefinitionLoader::parse_organization(ORG).unwrap();
        let org = Organization::load(definition).unwrap();

        assert_eq!(org.id(), "acme");
        assert_eq!(org.flow_mode(), FlowMode::BestMatch);
        let names: Vec<&str> = org.flows().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["audit", "books"]);
        assert_eq!(org.patterns().len(), 2);
    }

    #[test]
    fn test_invalid_template_rejected_at_load() {
        let yaml = r#"
id: broken
flows:
  - name: bad
    selectors:
      - type: path
        path: /books/:
"#;
        let definition = DefinitionLoader::parse_organization(yaml).unwrap();
        assert!(Organization::load(definition).is_err());
    }

    #[test]
    fn test_register_replace_unregister() {
        let manager = OrganizationManager::new();
        assert!(manager.get("acme").is_none());

        let first = manager
            .register(DefinitionLoader::parse_organization(ORG).unwrap())
            .unwrap();
        let second = manager
            .register(DefinitionLoader::parse_organization(ORG).unwrap())
            .unwrap();
        assert_eq!(manager.len(), 1);
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&manager.get("acme").unwrap(), &second));
        assert!(first.patterns().is_empty());
        assert_eq!(second.patterns().len(), 2);

        let removed = manager.unregister("acme").unwrap();
        assert!(removed.patterns().is_empty());
        assert!(manager.unregister("acme").is_none());
        assert!(manager.is_empty());
    }
}
