// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::{ApiFlowProvider, FlowProvider, FlowResolver, PlanFlowProvider, PlatformFlowProvider};
use crate::gateway::flow::condition::ConditionEvaluator;
use crate::gateway::flow::filter::{CompositeConditionFilter, ConditionFilter};
use crate::gateway::flow::selector::{PathPatterns, SelectorMatcher};
use crate::gateway::flow::types::ApiDefinition;
use crate::gateway::organization::OrganizationManager;

/// Builds the resolver of each scope from its definition and flow mode
#[derive(Clone)]
pub struct FlowResolverFactory {
    evaluator: Arc<dyn ConditionEvaluator>,
}

impl FlowResolverFactory {
    pub fn new(evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        Self { evaluator }
    }

    pub fn api(&self, api: &ApiDefinition, patterns: &Arc<PathPatterns>) -> FlowResolver {
        let provider = FlowProvider::Api(ApiFlowProvider::new(api));
        FlowResolver::scoped(provider, self.filter(patterns))
            .with_mode(api.flow_mode, Arc::clone(patterns))
    }

    /// Plan flows follow the flow mode of their API
    pub fn plan(&self, api: &ApiDefinition, patterns: &Arc<PathPatterns>) -> FlowResolver {
        let provider = FlowProvider::Plan(PlanFlowProvider::new(api));
        FlowResolver::scoped(provider, self.filter(patterns))
            .with_mode(api.flow_mode, Arc::clone(patterns))
    }

    /// Flow mode and path cache are read from the organization on every
    /// resolution; an organization that is not loaded has no platform flows.
    pub fn platform(
        &self,
        organizations: &Arc<OrganizationManager>,
        organization_id: &str,
    ) -> FlowResolver {
        let provider = PlatformFlowProvider::new(Arc::clone(organizations), organization_id);
        FlowResolver::platform(provider, Arc::clone(&self.evaluator))
    }

    fn filter(&self, patterns: &Arc<PathPatterns>) -> Arc<dyn ConditionFilter> {
        Arc::new(CompositeConditionFilter::standard(
            SelectorMatcher::new(Arc::clone(patterns)),
            Arc::clone(&self.evaluator),
        ))
    }
}
