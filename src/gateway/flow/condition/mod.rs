// SPDX-License-Identifier: MIT

//! Condition evaluation for flows and steps
//!
//! This module provides parsing and evaluation of flow conditions.
//! Conditions are gateway expressions like:
//! - `{#request.method == 'GET'}`
//! - `{#request.headers['x-tier'] == 'gold' && #request.params.page > 1}`
//! - `{#context.attributes.plan matches 'gold|platinum'}`

mod ast;
mod evaluator;
mod parser;

pub use ast::{CompareOp, Condition, Lookup, Operand, Pattern, RequestField};
pub use evaluator::evaluate;
pub use parser::parse;

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::sdk::context::ExecutionContext;
use crate::sdk::error::ConditionError;

/// The expression engine seen by flow filters and the flow chain.
///
/// Implementations may suspend (remote evaluation, lazy attribute loading)
/// and may fail; a failure ends the current phase of the chain.
#[async_trait]
pub trait ConditionEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        expression: &str,
        ctx: &ExecutionContext,
    ) -> Result<bool, ConditionError>;
}

/// Default expression engine; parsed expressions are memoised per string
#[derive(Default)]
pub struct ExpressionEvaluator {
    compiled: DashMap<String, Arc<Condition>>,
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an expression once; concurrent first uses converge on one entry
    pub fn compile(&self, expression: &str) -> Result<Arc<Condition>, ConditionError> {
        if let Some(expr) = self.compiled.get(expression) {
            return Ok(Arc::clone(expr.value()));
        }

        let parsed = Arc::new(parse(expression)?);
        let entry = self
            .compiled
            .entry(expression.to_string())
            .or_insert(parsed);
        Ok(Arc::clone(entry.value()))
    }

    pub fn cached(&self) -> usize {
        self.compiled.len()
    }
}

#[async_trait]
impl ConditionEvaluator for ExpressionEvaluator {
    async fn evaluate(
        &self,
        expression: &str,
        ctx: &ExecutionContext,
    ) -> Result<bool, ConditionError> {
        if expression.trim().is_empty() {
            return Ok(true);
        }
        let expr = self.compile(expression)?;
        Ok(evaluate(&expr, ctx))
    }
}
