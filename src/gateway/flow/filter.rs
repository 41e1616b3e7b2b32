// SPDX-License-Identifier: MIT

//! Condition filters narrowing candidate flows to the applicable ones
//!
//! Filters only read the context, so the outcome for one flow can never
//! depend on the flows evaluated before it.

use async_trait::async_trait;
use std::sync::Arc;

use super::condition::ConditionEvaluator;
use super::selector::SelectorMatcher;
use super::types::Flow;
use crate::sdk::context::ExecutionContext;
use crate::sdk::error::GatewayResult;

#[async_trait]
pub trait ConditionFilter: Send + Sync {
    /// Whether the flow applies to the request
    async fn accepts(&self, ctx: &ExecutionContext, flow: &Flow) -> GatewayResult<bool>;

    /// Keep the accepted flows, preserving order
    async fn filter(
        &self,
        ctx: &ExecutionContext,
        candidates: Vec<Arc<Flow>>,
    ) -> GatewayResult<Vec<Arc<Flow>>> {
        let mut accepted = Vec::with_capacity(candidates.len());
        for flow in candidates {
            if self.accepts(ctx, &flow).await? {
                accepted.push(flow);
            }
        }
        Ok(accepted)
    }
}

/// Drops flows whose path, method or channel selectors fail
pub struct SelectorConditionFilter {
    matcher: SelectorMatcher,
}

impl SelectorConditionFilter {
    pub fn new(matcher: SelectorMatcher) -> Self {
        Self { matcher }
    }
}

#[async_trait]
impl ConditionFilter for SelectorConditionFilter {
    async fn accepts(&self, ctx: &ExecutionContext, flow: &Flow) -> GatewayResult<bool> {
        self.matcher.matches(ctx, flow)
    }
}

/// Drops flows whose `condition` expression evaluates to false
pub struct ExpressionConditionFilter {
    evaluator: Arc<dyn ConditionEvaluator>,
}

impl ExpressionConditionFilter {
    pub fn new(evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        Self { evaluator }
    }
}

#[async_trait]
impl ConditionFilter for ExpressionConditionFilter {
    async fn accepts(&self, ctx: &ExecutionContext, flow: &Flow) -> GatewayResult<bool> {
        match flow.condition.as_deref() {
            Some(expression) if !expression.trim().is_empty() => {
                Ok(self.evaluator.evaluate(expression, ctx).await?)
            }
            _ => Ok(true),
        }
    }
}

/// Applies filters in order; the first rejection wins
pub struct CompositeConditionFilter {
    filters: Vec<Arc<dyn ConditionFilter>>,
}

impl CompositeConditionFilter {
    pub fn new(filters: Vec<Arc<dyn ConditionFilter>>) -> Self {
        Self { filters }
    }

    /// Selector matching followed by expression evaluation
    pub fn standard(matcher: SelectorMatcher, evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        Self::new(vec![
            Arc::new(SelectorConditionFilter::new(matcher)),
            Arc::new(ExpressionConditionFilter::new(evaluator)),
        ])
    }
}

#[async_trait]
impl ConditionFilter for CompositeConditionFilter {
    async fn accepts(&self, ctx: &ExecutionContext, flow: &Flow) -> GatewayResult<bool> {
        for filter in &self.filters {
            if !filter.accepts(ctx, flow).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
