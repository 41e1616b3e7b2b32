// SPDX-License-Identifier: MIT

//! Per-API request processing
//!
//! The reactor owns the three chains of a deployed API and runs them in a
//! fixed order:
//!
//! ```text
//! platform REQUEST -> plan REQUEST -> api REQUEST
//!   (message APIs) plan/api MESSAGE_REQUEST -> plan/api MESSAGE_RESPONSE
//! plan RESPONSE -> api RESPONSE -> platform RESPONSE
//! ```
//!
//! The first chain that fails or interrupts ends the request.

use serde_json::json;
use std::sync::Arc;

use crate::gateway::flow::chain::{FlowChain, FlowChainFactory};
use crate::gateway::flow::selector::PathPatterns;
use crate::gateway::flow::types::{ApiDefinition, ApiType, ExecutionPhase, ResolutionScope};
use crate::gateway::organization::{enabled_flows, precompile, OrganizationManager};
use crate::sdk::context::{ExecutionContext, ExecutionFailure, ATTR_API};
use crate::sdk::error::{GatewayError, GatewayResult};

/// How a request left the reactor
#[derive(Debug)]
pub enum RequestOutcome {
    Completed,
    Interrupted(ExecutionFailure),
    Failed(GatewayError),
}

impl RequestOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RequestOutcome::Completed)
    }
}

pub struct ApiReactor {
    id: String,
    api_type: ApiType,
    organization_id: String,
    platform: FlowChain,
    plan: FlowChain,
    api: FlowChain,
    patterns: Arc<PathPatterns>,
}

impl ApiReactor {
    /// Build the chains of an API; every path template is compiled here so
    /// that a broken definition never gets deployed.
    pub fn new(
        definition: &ApiDefinition,
        factory: &FlowChainFactory,
        organizations: &Arc<OrganizationManager>,
    ) -> GatewayResult<Self> {
        let patterns = Arc::new(PathPatterns::new());
        precompile(&enabled_flows(definition.flows.clone()), &patterns)?;
        for plan in &definition.plans {
            precompile(&enabled_flows(plan.flows.clone()), &patterns)?;
        }

        let organization_id = definition
            .organization
            .clone()
            .unwrap_or_else(|| factory.config().default_organization.clone());

        Ok(Self {
            id: definition.id.clone(),
            api_type: definition.api_type,
            platform: factory.platform_chain(organizations, &organization_id),
            plan: factory.plan_chain(definition, &patterns),
            api: factory.api_chain(definition, &patterns),
            organization_id,
            patterns,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn api_type(&self) -> ApiType {
        self.api_type
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn patterns(&self) -> &Arc<PathPatterns> {
        &self.patterns
    }

    pub fn chain(&self, scope: ResolutionScope) -> &FlowChain {
        match scope {
            ResolutionScope::Platform => &self.platform,
            ResolutionScope::Plan => &self.plan,
            ResolutionScope::Api => &self.api,
        }
    }

    /// Chains and phases in execution order
    pub fn sequence(&self) -> Vec<(ResolutionScope, ExecutionPhase)> {
        use ExecutionPhase::*;
        use ResolutionScope::*;

        let mut sequence = vec![(Platform, Request), (Plan, Request), (Api, Request)];
        if self.api_type == ApiType::Message {
            sequence.extend([
                (Plan, MessageRequest),
                (Api, MessageRequest),
                (Plan, MessageResponse),
                (Api, MessageResponse),
            ]);
        }
        sequence.extend([(Plan, Response), (Api, Response), (Platform, Response)]);
        sequence
    }

    pub async fn handle(&self, ctx: &mut ExecutionContext) -> RequestOutcome {
        ctx.set_attribute(ATTR_API, json!(self.id));

        for (scope, phase) in self.sequence() {
            if ctx.is_cancelled() {
                log::debug!("[{}] API '{}' request cancelled", ctx.id(), self.id);
                return RequestOutcome::Failed(GatewayError::Cancelled);
            }
            if let Err(e) = self.chain(scope).execute(ctx, phase).await {
                return match e {
                    GatewayError::Interrupted(failure) => {
                        log::info!(
                            "[{}] API '{}' interrupted in {} {} after {} ms: {}",
                            ctx.id(),
                            self.id,
                            scope,
                            phase,
                            ctx.elapsed_ms(),
                            failure
                        );
                        RequestOutcome::Interrupted(failure)
                    }
                    e => {
                        log::error!(
                            "[{}] API '{}' failed in {} {}: {}",
                            ctx.id(),
                            self.id,
                            scope,
                            phase,
                            e
                        );
                        RequestOutcome::Failed(e)
                    }
                };
            }
        }

        log::debug!(
            "[{}] API '{}' handled in {} ms",
            ctx.id(),
            self.id,
            ctx.elapsed_ms()
        );
        match ctx.failure() {
            Some(failure) => RequestOutcome::Interrupted(failure.clone()),
            None => RequestOutcome::Completed,
        }
    }
}

impl std::fmt::Debug for ApiReactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiReactor")
            .field("id", &self.id)
            .field("api_type", &self.api_type)
            .field("organization_id", &self.organization_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::config::FlowsConfig;
    use crate::gateway::flow::condition::ExpressionEvaluator;
    use crate::gateway::flow::loader::DefinitionLoader;
    use crate::gateway::policies::DryRunExecutor;
    use crate::sdk::context::{HttpMethod, Request};

    fn factory() -> FlowChainFactory {
        FlowChainFactory::new(
            Arc::new(ExpressionEvaluator::new()),
            Arc::new(DryRunExecutor::new()),
            FlowsConfig::default(),
        )
    }

    #[test]
    fn test_proxy_sequence() {
        let api = DefinitionLoader::parse_api("id: a\n").unwrap();
        let reactor = ApiReactor::new(&api, &factory(), &Arc::new(OrganizationManager::new())).unwrap();

        let (platform, plan, api) = (
            ResolutionScope::Platform,
            ResolutionScope::Plan,
            ResolutionScope::Api,
        );
        let (request, response) = (ExecutionPhase::Request, ExecutionPhase::Response);
        assert_eq!(
            reactor.sequence(),
            vec![
                (platform, request),
                (plan, request),
                (api, request),
                (plan, response),
                (api, response),
                (platform, response),
            ]
        );
        assert_eq!(reactor.organization_id(), "DEFAULT");
    }

    #[test]
    fn test_message_sequence() {
        let api = DefinitionLoader::parse_api("id: a\ntype: message\norganization: acme\n").unwrap();
        let reactor = ApiReactor::new(&api, &factory(), &Arc::new(OrganizationManager::new())).unwrap();

        let sequence = reactor.sequence();
        assert_eq!(sequence.len(), 10);
        assert_eq!(
            sequence[3..7],
            [
                (ResolutionScope::Plan, ExecutionPhase::MessageRequest),
                (ResolutionScope::Api, ExecutionPhase::MessageRequest),
                (ResolutionScope::Plan, ExecutionPhase::MessageResponse),
                (ResolutionScope::Api, ExecutionPhase::MessageResponse),
            ]
        );
        assert_eq!(reactor.organization_id(), "acme");
    }

    #[test]
    fn test_invalid_template_fails_construction() {
        let api = DefinitionLoader::parse_api(
            "id: a\nplans:\n  - id: p\n    flows:\n      - name: bad\n        selectors:\n          - type: path\n            path: /x/:\n",
        )
        .unwrap();
        let err = ApiReactor::new(&api, &factory(), &Arc::new(OrganizationManager::new()))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Definition(_)));
    }

    #[tokio::test]
    async fn test_handle_sets_api_attribute_and_reports_no_match() {
        let api = DefinitionLoader::parse_api(
            "id: books\nflows:\n  - name: books\n    selectors:\n      - type: path\n        path: /books\n",
        )
        .unwrap();
        let reactor = ApiReactor::new(&api, &factory(), &Arc::new(OrganizationManager::new())).unwrap();

        let mut ctx = ExecutionContext::new(Request::new(HttpMethod::Get, "/books"));
        assert!(reactor.handle(&mut ctx).await.is_completed());
        assert_eq!(ctx.get_attribute(ATTR_API), Some(&json!("books")));

        let mut ctx = ExecutionContext::new(Request::new(HttpMethod::Get, "/authors"));
        match reactor.handle(&mut ctx).await {
            RequestOutcome::Interrupted(failure) => assert_eq!(failure.status_code, 404),
            other => panic!("Expected interruption, got {:?}", other),
        }
    }
}
