// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use crate::gateway::flow::types::{ApiDefinition, Flow};
use crate::gateway::organization::enabled_flows;
use crate::sdk::context::ExecutionContext;

/// Flows of the plan the request's subscription is bound to
#[derive(Debug, Clone)]
pub struct PlanFlowProvider {
    plans: HashMap<String, Vec<Arc<Flow>>>,
}

impl PlanFlowProvider {
    pub fn new(api: &ApiDefinition) -> Self {
        let plans = api
            .plans
            .iter()
            .map(|plan| (plan.id.clone(), enabled_flows(plan.flows.clone())))
            .collect();
        Self { plans }
    }

    /// Empty when no plan is bound or the plan is unknown to the API
    pub fn provide(&self, ctx: &ExecutionContext) -> Vec<Arc<Flow>> {
        ctx.plan_id()
            .and_then(|id| self.plans.get(id))
            .cloned()
            .unwrap_or_default()
    }
}
