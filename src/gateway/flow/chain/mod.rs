// SPDX-License-Identifier: MIT

//! Flow chain execution
//!
//! A chain runs the flows of one scope for each phase of a request. Flows
//! are resolved on the first phase and cached in the context under
//! `flow.<chain id>`, so REQUEST and RESPONSE always see the same list.

mod factory;

pub use factory::FlowChainFactory;

use std::sync::Arc;

use super::condition::ConditionEvaluator;
use super::resolver::FlowResolver;
use super::types::{ExecutionPhase, Flow};
use crate::sdk::context::{ExecutionContext, ExecutionFailure};
use crate::sdk::error::{GatewayError, GatewayResult};
use crate::sdk::hook::FlowHook;
use crate::sdk::policy::PolicyExecutor;

/// Internal attribute naming the chain whose flow is currently executing
pub const ATTR_FLOW_STAGE: &str = "flow.stage";
/// Internal attribute set once a validating chain resolved at least one flow
pub const ATTR_FLOWS_MATCHED: &str = "flow.matched";

pub const NO_MATCHING_FLOW_KEY: &str = "GATEWAY_NO_MATCHING_FLOW";
pub const NO_MATCHING_FLOW_MESSAGE: &str = "No flow matches the incoming request";

/// The resolved flow list cached per request and chain
pub type ResolvedFlows = Arc<Vec<Arc<Flow>>>;

/// Internal attribute key under which a chain caches its resolved flows
pub fn resolved_flows_key(chain_id: &str) -> String {
    format!("flow.{}", chain_id)
}

pub fn no_matching_flow() -> ExecutionFailure {
    ExecutionFailure::new(404)
        .key(NO_MATCHING_FLOW_KEY)
        .message(NO_MATCHING_FLOW_MESSAGE)
}

pub struct FlowChain {
    id: String,
    resolver: FlowResolver,
    executor: Arc<dyn PolicyExecutor>,
    evaluator: Arc<dyn ConditionEvaluator>,
    hooks: Vec<Arc<dyn FlowHook>>,
    validate_flow_matching: bool,
    interrupt_if_no_match: bool,
}

impl FlowChain {
    /// Create a chain identified by its resolver's scope id
    pub fn new(
        resolver: FlowResolver,
        executor: Arc<dyn PolicyExecutor>,
        evaluator: Arc<dyn ConditionEvaluator>,
    ) -> Self {
        Self {
            id: resolver.scope().id().to_string(),
            resolver,
            executor,
            evaluator,
            hooks: Vec::new(),
            validate_flow_matching: false,
            interrupt_if_no_match: false,
        }
    }

    pub fn with_hooks(mut self, hooks: Vec<Arc<dyn FlowHook>>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_flow_matching(mut self, validate: bool, interrupt_if_no_match: bool) -> Self {
        self.validate_flow_matching = validate;
        self.interrupt_if_no_match = interrupt_if_no_match;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn resolver(&self) -> &FlowResolver {
        &self.resolver
    }

    /// Run the flows of this chain for one phase.
    ///
    /// Flows and their steps run strictly one after another. The first
    /// failing step ends the phase for this chain and its error is returned
    /// unchanged.
    pub async fn execute(
        &self,
        ctx: &mut ExecutionContext,
        phase: ExecutionPhase,
    ) -> GatewayResult<()> {
        if ctx.is_interrupted() {
            log::debug!(
                "[{}] {} chain skipped for {} phase, request already interrupted",
                ctx.id(),
                self.id,
                phase
            );
            return Ok(());
        }

        let flows = self.resolve(ctx).await?;

        if phase == ExecutionPhase::Request && self.validate_flow_matching {
            self.validate_matching(ctx, &flows)?;
        }

        let result = self.run_flows(ctx, phase, &flows).await;
        ctx.remove_internal_attribute(ATTR_FLOW_STAGE);
        result
    }

    /// Resolve once per request; later phases reuse the cached list
    async fn resolve(&self, ctx: &mut ExecutionContext) -> GatewayResult<ResolvedFlows> {
        let key = resolved_flows_key(&self.id);
        if let Some(flows) = ctx.get_internal_attribute::<ResolvedFlows>(&key) {
            return Ok(Arc::clone(flows));
        }

        let flows: ResolvedFlows = Arc::new(self.resolver.resolve(ctx).await?);
        log::debug!(
            "[{}] {} chain resolved {} flow(s)",
            ctx.id(),
            self.id,
            flows.len()
        );
        ctx.set_internal_attribute(key, Arc::clone(&flows));
        Ok(flows)
    }

    fn validate_matching(&self, ctx: &mut ExecutionContext, flows: &[Arc<Flow>]) -> GatewayResult<()> {
        if !flows.is_empty() {
            ctx.set_internal_attribute(ATTR_FLOWS_MATCHED, true);
            return Ok(());
        }

        let matched = ctx
            .get_internal_attribute::<bool>(ATTR_FLOWS_MATCHED)
            .copied()
            .unwrap_or(false);

        if !matched && self.interrupt_if_no_match {
            log::info!(
                "[{}] No flow matches {} {}",
                ctx.id(),
                ctx.request().method,
                ctx.request().path
            );
            return Err(ctx.interrupt_with(no_matching_flow()));
        }
        Ok(())
    }

    async fn run_flows(
        &self,
        ctx: &mut ExecutionContext,
        phase: ExecutionPhase,
        flows: &[Arc<Flow>],
    ) -> GatewayResult<()> {
        for flow in flows {
            if ctx.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }

            ctx.set_internal_attribute(ATTR_FLOW_STAGE, self.id.clone());
            self.notify(ctx, &flow.name, |hook, ctx| hook.pre(&flow.name, ctx, phase));

            match self.run_steps(ctx, phase, flow).await {
                Ok(()) => {
                    self.notify(ctx, &flow.name, |hook, ctx| hook.post(&flow.name, ctx, phase));
                }
                Err(e) => {
                    if e.is_interruption() {
                        log::debug!("[{}] flow '{}' stopped: {}", ctx.id(), flow.name, e);
                    } else {
                        log::warn!(
                            "[{}] flow '{}' of {} chain failed during {} phase: {}",
                            ctx.id(),
                            flow.name,
                            self.id,
                            phase,
                            e
                        );
                    }
                    self.notify(ctx, &flow.name, |hook, ctx| {
                        hook.error(&flow.name, ctx, phase, &e)
                    });
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    async fn run_steps(
        &self,
        ctx: &mut ExecutionContext,
        phase: ExecutionPhase,
        flow: &Flow,
    ) -> GatewayResult<()> {
        for step in flow.steps_for(phase) {
            if ctx.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }

            if let Some(condition) = step.condition.as_deref() {
                if !self.evaluator.evaluate(condition, ctx).await? {
                    log::debug!(
                        "[{}] step '{}' ({}) skipped by condition",
                        ctx.id(),
                        step.name,
                        step.policy
                    );
                    continue;
                }
            }

            let result = self.executor.execute(step, ctx, phase).await;

            // Whatever the step produced is dropped once the request is cancelled
            if ctx.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }
            result?;

            if let Some(failure) = ctx.failure() {
                return Err(GatewayError::Interrupted(failure.clone()));
            }
        }
        Ok(())
    }

    /// Hook failures are logged and never reach the chain
    fn notify<F>(&self, ctx: &ExecutionContext, flow: &str, call: F)
    where
        F: Fn(&dyn FlowHook, &ExecutionContext) -> GatewayResult<()>,
    {
        for hook in &self.hooks {
            if let Err(e) = call(hook.as_ref(), ctx) {
                log::warn!(
                    "[{}] hook '{}' failed on flow '{}': {}",
                    ctx.id(),
                    hook.id(),
                    flow,
                    e
                );
            }
        }
    }
}

impl std::fmt::Debug for FlowChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowChain")
            .field("id", &self.id)
            .field("resolver", &self.resolver)
            .field("hooks", &self.hooks.len())
            .field("validate_flow_matching", &self.validate_flow_matching)
            .field("interrupt_if_no_match", &self.interrupt_if_no_match)
            .finish()
    }
}
