// SPDX-License-Identifier: MIT

//! Deployment of APIs onto the gateway

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::gateway::flow::chain::FlowChainFactory;
use crate::gateway::flow::types::ApiDefinition;
use crate::gateway::organization::OrganizationManager;
use crate::gateway::reactor::ApiReactor;
use crate::sdk::error::{DefinitionError, GatewayResult};

/// Holds one reactor per deployed API
pub struct ApiManager {
    reactors: DashMap<String, Arc<ApiReactor>>,
    factory: FlowChainFactory,
    organizations: Arc<OrganizationManager>,
}

impl ApiManager {
    pub fn new(factory: FlowChainFactory, organizations: Arc<OrganizationManager>) -> Self {
        Self {
            reactors: DashMap::new(),
            factory,
            organizations,
        }
    }

    pub fn organizations(&self) -> &Arc<OrganizationManager> {
        &self.organizations
    }

    pub fn deploy(&self, definition: &ApiDefinition) -> GatewayResult<Arc<ApiReactor>> {
        match self.reactors.entry(definition.id.clone()) {
            Entry::Occupied(_) => {
                Err(DefinitionError::AlreadyDeployed(definition.id.clone()).into())
            }
            Entry::Vacant(slot) => {
                let reactor = Arc::new(ApiReactor::new(
                    definition,
                    &self.factory,
                    &self.organizations,
                )?);
                log::info!(
                    "Deployed API '{}' ({} flow(s), {} plan(s), organization '{}')",
                    definition.id,
                    definition.flows.len(),
                    definition.plans.len(),
                    reactor.organization_id()
                );
                slot.insert(Arc::clone(&reactor));
                Ok(reactor)
            }
        }
    }

    /// Remove an API; its compiled path patterns go with it
    pub fn undeploy(&self, id: &str) -> GatewayResult<Arc<ApiReactor>> {
        let (_, reactor) = self
            .reactors
            .remove(id)
            .ok_or_else(|| DefinitionError::NotDeployed(id.to_string()))?;
        reactor.patterns().clear();
        log::info!("Undeployed API '{}'", id);
        Ok(reactor)
    }

    pub fn get(&self, id: &str) -> Option<Arc<ApiReactor>> {
        self.reactors.get(id).map(|r| Arc::clone(r.value()))
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.reactors.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.reactors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactors.is_empty()
    }
}
