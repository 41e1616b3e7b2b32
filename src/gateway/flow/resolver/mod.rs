// SPDX-License-Identifier: MIT

//! Flow resolution
//!
//! A resolver turns all flows of a scope into the flows that apply to one
//! request. `provide` returns the raw candidates of the scope; `resolve`
//! applies the condition filter and, for best-match resolvers, keeps only the
//! most path-specific flows. Platform resolvers take their filter, flow mode
//! and path cache from the organization as loaded at resolution time.

mod api;
mod best_match;
mod factory;
mod plan;
mod platform;

pub use api::ApiFlowProvider;
pub use best_match::best_match;
pub use factory::FlowResolverFactory;
pub use plan::PlanFlowProvider;
pub use platform::PlatformFlowProvider;

use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

use super::condition::ConditionEvaluator;
use super::filter::{CompositeConditionFilter, ConditionFilter};
use super::selector::{PathPatterns, SelectorMatcher};
use super::types::{Flow, FlowMode, ResolutionScope};
use crate::sdk::context::ExecutionContext;
use crate::sdk::error::GatewayResult;

/// Source of candidate flows of a deployed API
#[derive(Debug, Clone)]
pub enum FlowProvider {
    Api(ApiFlowProvider),
    Plan(PlanFlowProvider),
}

impl FlowProvider {
    pub fn scope(&self) -> ResolutionScope {
        match self {
            FlowProvider::Api(_) => ResolutionScope::Api,
            FlowProvider::Plan(_) => ResolutionScope::Plan,
        }
    }

    /// Enabled flows of the scope in declaration order
    pub fn provide(&self, ctx: &ExecutionContext) -> Vec<Arc<Flow>> {
        match self {
            FlowProvider::Api(p) => p.provide(ctx),
            FlowProvider::Plan(p) => p.provide(ctx),
        }
    }
}

pub enum FlowResolver {
    /// Candidates of a scope narrowed by a condition filter
    Scoped {
        provider: FlowProvider,
        filter: Arc<dyn ConditionFilter>,
    },
    /// Flows of the owning organization, in the organization's flow mode
    Platform {
        provider: PlatformFlowProvider,
        evaluator: Arc<dyn ConditionEvaluator>,
    },
    /// Keeps only the most path-specific flows of the delegate's result
    BestMatch {
        delegate: Box<FlowResolver>,
        patterns: Arc<PathPatterns>,
    },
}

impl FlowResolver {
    pub fn scoped(provider: FlowProvider, filter: Arc<dyn ConditionFilter>) -> Self {
        FlowResolver::Scoped { provider, filter }
    }

    pub fn platform(provider: PlatformFlowProvider, evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        FlowResolver::Platform {
            provider,
            evaluator,
        }
    }

    pub fn best_match(delegate: FlowResolver, patterns: Arc<PathPatterns>) -> Self {
        FlowResolver::BestMatch {
            delegate: Box::new(delegate),
            patterns,
        }
    }

    /// Wrap in a best-match resolver when the mode asks for it
    pub fn with_mode(self, mode: FlowMode, patterns: Arc<PathPatterns>) -> Self {
        match mode {
            FlowMode::All => self,
            FlowMode::BestMatch => Self::best_match(self, patterns),
        }
    }

    pub fn scope(&self) -> ResolutionScope {
        match self {
            FlowResolver::Scoped { provider, .. } => provider.scope(),
            FlowResolver::Platform { .. } => ResolutionScope::Platform,
            FlowResolver::BestMatch { delegate, .. } => delegate.scope(),
        }
    }

    /// Platform resolvers answer for the organization currently loaded
    pub fn is_best_match(&self) -> bool {
        match self {
            FlowResolver::Scoped { .. } => false,
            FlowResolver::Platform { provider, .. } => provider
                .organization()
                .is_some_and(|org| org.flow_mode() == FlowMode::BestMatch),
            FlowResolver::BestMatch { .. } => true,
        }
    }

    pub fn provide(&self, ctx: &ExecutionContext) -> Vec<Arc<Flow>> {
        match self {
            FlowResolver::Scoped { provider, .. } => provider.provide(ctx),
            FlowResolver::Platform { provider, .. } => provider.provide(ctx),
            FlowResolver::BestMatch { delegate, .. } => delegate.provide(ctx),
        }
    }

    pub fn resolve<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, GatewayResult<Vec<Arc<Flow>>>> {
        async move {
            match self {
                FlowResolver::Scoped { provider, filter } => {
                    filter.filter(ctx, provider.provide(ctx)).await
                }
                FlowResolver::Platform {
                    provider,
                    evaluator,
                } => match provider.organization() {
                    None => Ok(Vec::new()),
                    Some(org) => {
                        let filter = CompositeConditionFilter::standard(
                            SelectorMatcher::new(Arc::clone(org.patterns())),
                            Arc::clone(evaluator),
                        );
                        let flows = filter.filter(ctx, org.flows().to_vec()).await?;
                        Ok(match org.flow_mode() {
                            FlowMode::All => flows,
                            FlowMode::BestMatch => {
                                best_match(flows, &ctx.request().path, org.patterns())
                            }
                        })
                    }
                },
                FlowResolver::BestMatch { delegate, patterns } => {
                    let flows = delegate.resolve(ctx).await?;
                    Ok(best_match(flows, &ctx.request().path, patterns))
                }
            }
        }
        .boxed()
    }
}

impl std::fmt::Debug for FlowResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowResolver::Scoped { provider, .. } => f
                .debug_struct("Scoped")
                .field("scope", &provider.scope())
                .finish(),
            FlowResolver::Platform { provider, .. } => f
                .debug_struct("Platform")
                .field("organization", &provider.organization_id())
                .finish(),
            FlowResolver::BestMatch { delegate, .. } => {
                f.debug_tuple("BestMatch").field(delegate).finish()
            }
        }
    }
}
