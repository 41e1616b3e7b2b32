// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::gateway::flow::types::{ApiDefinition, Flow};
use crate::gateway::organization::enabled_flows;
use crate::sdk::context::ExecutionContext;

/// Flows declared directly on an API
#[derive(Debug, Clone)]
pub struct ApiFlowProvider {
    flows: Vec<Arc<Flow>>,
}

impl ApiFlowProvider {
    pub fn new(api: &ApiDefinition) -> Self {
        Self {
            flows: enabled_flows(api.flows.clone()),
        }
    }

    pub fn provide(&self, _ctx: &ExecutionContext) -> Vec<Arc<Flow>> {
        self.flows.clone()
    }
}
