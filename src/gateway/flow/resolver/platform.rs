// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::gateway::flow::types::Flow;
use crate::gateway::organization::{Organization, OrganizationManager};
use crate::sdk::context::ExecutionContext;

/// Flows of the organization owning the API, shared by all of its APIs
#[derive(Debug, Clone)]
pub struct PlatformFlowProvider {
    organizations: Arc<OrganizationManager>,
    organization_id: String,
}

impl PlatformFlowProvider {
    pub fn new(organizations: Arc<OrganizationManager>, organization_id: impl Into<String>) -> Self {
        Self {
            organizations,
            organization_id: organization_id.into(),
        }
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    /// The organization as currently loaded
    pub fn organization(&self) -> Option<Arc<Organization>> {
        self.organizations.get(&self.organization_id)
    }

    /// Empty while the organization is not loaded
    pub fn provide(&self, _ctx: &ExecutionContext) -> Vec<Arc<Flow>> {
        self.organization()
            .map(|org| org.flows().to_vec())
            .unwrap_or_default()
    }
}
