// SPDX-License-Identifier: MIT

//! Flow hooks
//!
//! Hooks observe flow execution; they never influence it. A failing hook is
//! logged by the chain and otherwise ignored.

use super::context::ExecutionContext;
use super::error::{GatewayError, GatewayResult};
use crate::gateway::flow::types::ExecutionPhase;

/// Observer notified around each flow's step execution
pub trait FlowHook: Send + Sync {
    fn id(&self) -> &str;

    /// Called right before the flow's steps for `phase` run
    fn pre(&self, flow: &str, ctx: &ExecutionContext, phase: ExecutionPhase) -> GatewayResult<()>;

    /// Called once the flow's steps completed successfully
    fn post(&self, flow: &str, ctx: &ExecutionContext, phase: ExecutionPhase) -> GatewayResult<()>;

    /// Called when one of the flow's steps failed or interrupted the request
    fn error(
        &self,
        _flow: &str,
        _ctx: &ExecutionContext,
        _phase: ExecutionPhase,
        _error: &GatewayError,
    ) -> GatewayResult<()> {
        Ok(())
    }
}

/// Hook that logs flow boundaries at debug level
pub struct LoggingFlowHook {
    id: String,
}

impl LoggingFlowHook {
    pub fn new() -> Self {
        Self {
            id: "logging".to_string(),
        }
    }
}

impl Default for LoggingFlowHook {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowHook for LoggingFlowHook {
    fn id(&self) -> &str {
        &self.id
    }

    fn pre(&self, flow: &str, ctx: &ExecutionContext, phase: ExecutionPhase) -> GatewayResult<()> {
        log::debug!("[{}] flow '{}' starting {} phase", ctx.id(), flow, phase);
        Ok(())
    }

    fn post(&self, flow: &str, ctx: &ExecutionContext, phase: ExecutionPhase) -> GatewayResult<()> {
        log::debug!("[{}] flow '{}' completed {} phase", ctx.id(), flow, phase);
        Ok(())
    }

    fn error(
        &self,
        flow: &str,
        ctx: &ExecutionContext,
        phase: ExecutionPhase,
        error: &GatewayError,
    ) -> GatewayResult<()> {
        log::debug!(
            "[{}] flow '{}' stopped during {} phase: {}",
            ctx.id(),
            flow,
            phase,
            error
        );
        Ok(())
    }
}
