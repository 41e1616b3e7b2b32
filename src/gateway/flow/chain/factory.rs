// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::FlowChain;
use crate::gateway::config::FlowsConfig;
use crate::gateway::flow::condition::ConditionEvaluator;
use crate::gateway::flow::resolver::{FlowResolver, FlowResolverFactory};
use crate::gateway::flow::selector::PathPatterns;
use crate::gateway::flow::types::ApiDefinition;
use crate::gateway::organization::OrganizationManager;
use crate::sdk::hook::FlowHook;
use crate::sdk::policy::PolicyExecutor;

/// Builds the platform, plan and API chains of a deployed API.
///
/// Only the plan and API chains validate flow matching. The plan chain never
/// interrupts by itself: it records a match so the API chain, running after
/// it, can tell whether anything matched at all.
#[derive(Clone)]
pub struct FlowChainFactory {
    resolvers: FlowResolverFactory,
    evaluator: Arc<dyn ConditionEvaluator>,
    executor: Arc<dyn PolicyExecutor>,
    hooks: Vec<Arc<dyn FlowHook>>,
    config: FlowsConfig,
}

impl FlowChainFactory {
    pub fn new(
        evaluator: Arc<dyn ConditionEvaluator>,
        executor: Arc<dyn PolicyExecutor>,
        config: FlowsConfig,
    ) -> Self {
        Self {
            resolvers: FlowResolverFactory::new(Arc::clone(&evaluator)),
            evaluator,
            executor,
            hooks: Vec::new(),
            config,
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn FlowHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn config(&self) -> &FlowsConfig {
        &self.config
    }

    pub fn platform_chain(
        &self,
        organizations: &Arc<OrganizationManager>,
        organization_id: &str,
    ) -> FlowChain {
        self.chain(self.resolvers.platform(organizations, organization_id))
            .with_flow_matching(false, false)
    }

    pub fn plan_chain(&self, api: &ApiDefinition, patterns: &Arc<PathPatterns>) -> FlowChain {
        self.chain(self.resolvers.plan(api, patterns))
            .with_flow_matching(self.config.validate_matching, false)
    }

    pub fn api_chain(&self, api: &ApiDefinition, patterns: &Arc<PathPatterns>) -> FlowChain {
        self.chain(self.resolvers.api(api, patterns)).with_flow_matching(
            self.config.validate_matching,
            self.config.interrupt_if_no_match,
        )
    }

    fn chain(&self, resolver: FlowResolver) -> FlowChain {
        FlowChain::new(
            resolver,
            Arc::clone(&self.executor),
            Arc::clone(&self.evaluator),
        )
        .with_hooks(self.hooks.clone())
    }
}
