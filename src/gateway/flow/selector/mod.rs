// SPDX-License-Identifier: MIT

//! Selector matching
//!
//! A flow's selectors are ANDed together; a flow without selectors matches
//! every request.

pub mod path;

pub use path::{PathPattern, PathPatterns};

use std::sync::Arc;

use crate::gateway::flow::types::{ChannelSelector, Flow, MethodSelector, PathSelector, Selector};
use crate::sdk::context::ExecutionContext;
use crate::sdk::error::GatewayResult;

/// Evaluates flow selectors against a request.
///
/// Holds the path memo of the definition the flows belong to.
#[derive(Debug, Clone)]
pub struct SelectorMatcher {
    patterns: Arc<PathPatterns>,
}

impl SelectorMatcher {
    pub fn new(patterns: Arc<PathPatterns>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &Arc<PathPatterns> {
        &self.patterns
    }

    pub fn matches(&self, ctx: &ExecutionContext, flow: &Flow) -> GatewayResult<bool> {
        for selector in &flow.selectors {
            let passed = match selector {
                Selector::Path(path) => self.matches_path(ctx, path)?,
                Selector::Method(method) => matches_method(ctx, method),
                Selector::Channel(channel) => matches_channel(ctx, channel),
            };
            if !passed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn matches_path(&self, ctx: &ExecutionContext, selector: &PathSelector) -> GatewayResult<bool> {
        let pattern = self.patterns.get_or_compile(&selector.path)?;
        Ok(pattern.matches(&ctx.request().path, selector.operator))
    }

    /// Segment count of a flow's path template, `None` for pathless flows
    pub fn pieces(&self, flow: &Flow) -> GatewayResult<Option<usize>> {
        match flow.path_selector() {
            Some(selector) => Ok(Some(self.patterns.get_or_compile(&selector.path)?.pieces())),
            None => Ok(None),
        }
    }
}

pub fn matches_method(ctx: &ExecutionContext, selector: &MethodSelector) -> bool {
    selector.methods.is_empty() || selector.methods.contains(&ctx.request().method)
}

pub fn matches_channel(ctx: &ExecutionContext, selector: &ChannelSelector) -> bool {
    let request = ctx.request();

    let entrypoint_ok = selector.entrypoints.is_empty()
        || request
            .entrypoint
            .as_ref()
            .map(|e| selector.entrypoints.contains(e))
            .unwrap_or(false);

    let operation_ok = selector.operations.is_empty()
        || request
            .operation
            .map(|o| selector.operations.contains(&o))
            .unwrap_or(false);

    entrypoint_ok && operation_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::flow::types::PathOperator;
    use crate::sdk::context::{HttpMethod, Operation, Request};
    use std::collections::HashSet;

    fn flow(selectors: Vec<Selector>) -> Flow {
        Flow {
            name: "test".to_string(),
            enabled: true,
            selectors,
            condition: None,
            steps: vec![],
        }
    }

    fn path(template: &str, operator: PathOperator) -> Selector {
        Selector::Path(PathSelector {
            path: template.to_string(),
            operator,
        })
    }

    fn methods(methods: &[HttpMethod]) -> Selector {
        Selector::Method(MethodSelector {
            methods: methods.iter().copied().collect(),
        })
    }

    fn channel(entrypoints: &[&str], operations: &[Operation]) -> Selector {
        Selector::Channel(ChannelSelector {
            entrypoints: entrypoints.iter().map(|e| e.to_string()).collect(),
            operations: operations.iter().copied().collect(),
        })
    }

    fn matcher() -> SelectorMatcher {
        SelectorMatcher::new(Arc::new(PathPatterns::new()))
    }

    fn ctx(method: HttpMethod, p: &str) -> ExecutionContext {
        ExecutionContext::new(Request::new(method, p))
    }

    #[test]
    fn test_no_selectors_matches_everything() {
        let ctx = ctx(HttpMethod::Delete, "/anything");
        assert!(matcher().matches(&ctx, &flow(vec![])).unwrap());
    }

    #[test]
    fn test_path_and_method_are_anded() {
        let m = matcher();
        let f = flow(vec![
            path("/books/:id", PathOperator::Equals),
            methods(&[HttpMethod::Get]),
        ]);

        assert!(m.matches(&ctx(HttpMethod::Get, "/books/1"), &f).unwrap());
        assert!(!m.matches(&ctx(HttpMethod::Post, "/books/1"), &f).unwrap());
        assert!(!m.matches(&ctx(HttpMethod::Get, "/books"), &f).unwrap());
    }

    #[test]
    fn test_empty_method_set_matches_any_method() {
        let f = flow(vec![Selector::Method(MethodSelector {
            methods: HashSet::new(),
        })]);
        assert!(matcher().matches(&ctx(HttpMethod::Patch, "/"), &f).unwrap());
    }

    #[test]
    fn test_method_selector_ignores_path() {
        let f = flow(vec![methods(&[HttpMethod::Put])]);
        let m = matcher();
        assert!(m.matches(&ctx(HttpMethod::Put, "/a"), &f).unwrap());
        assert!(m.matches(&ctx(HttpMethod::Put, "/b/c"), &f).unwrap());
    }

    #[test]
    fn test_channel_selector() {
        let m = matcher();
        let f = flow(vec![channel(&["websocket"], &[Operation::Subscribe])]);

        let request = Request::new(HttpMethod::Get, "/stream")
            .with_entrypoint("websocket", Operation::Subscribe);
        assert!(m.matches(&ExecutionContext::new(request), &f).unwrap());

        let request = Request::new(HttpMethod::Get, "/stream")
            .with_entrypoint("websocket", Operation::Publish);
        assert!(!m.matches(&ExecutionContext::new(request), &f).unwrap());

        let request = Request::new(HttpMethod::Get, "/stream")
            .with_entrypoint("sse", Operation::Subscribe);
        assert!(!m.matches(&ExecutionContext::new(request), &f).unwrap());

        // No entrypoint on the request cannot satisfy a restricted selector
        assert!(!m.matches(&ctx(HttpMethod::Get, "/stream"), &f).unwrap());
    }

    #[test]
    fn test_channel_selector_ignores_path_and_method() {
        let m = matcher();
        let f = flow(vec![channel(&["websocket"], &[Operation::Subscribe])]);

        for (method, p) in [
            (HttpMethod::Delete, "/x/y"),
            (HttpMethod::Get, "/"),
            (HttpMethod::Post, "/events/42/replay"),
        ] {
            let request = Request::new(method, p).with_entrypoint("websocket", Operation::Subscribe);
            assert!(m.matches(&ExecutionContext::new(request), &f).unwrap());

            let request = Request::new(method, p).with_entrypoint("websocket", Operation::Publish);
            assert!(!m.matches(&ExecutionContext::new(request), &f).unwrap());
        }
    }

    #[test]
    fn test_empty_channel_selector_matches_any() {
        let f = flow(vec![channel(&[], &[])]);
        assert!(matcher().matches(&ctx(HttpMethod::Get, "/"), &f).unwrap());

        let f = flow(vec![channel(&[], &[Operation::Publish])]);
        let request =
            Request::new(HttpMethod::Post, "/").with_entrypoint("http-post", Operation::Publish);
        assert!(matcher()
            .matches(&ExecutionContext::new(request), &f)
            .unwrap());
    }

    #[test]
    fn test_patterns_memoised_by_template() {
        let m = matcher();
        let f = flow(vec![path("/books", PathOperator::StartsWith)]);
        let g = flow(vec![path("/books", PathOperator::Equals)]);

        m.matches(&ctx(HttpMethod::Get, "/books/1"), &f).unwrap();
        m.matches(&ctx(HttpMethod::Get, "/books/1"), &g).unwrap();
        assert_eq!(m.patterns().len(), 1);
    }

    #[test]
    fn test_invalid_template_is_an_error() {
        let f = flow(vec![path("/books/:", PathOperator::Equals)]);
        assert!(matcher().matches(&ctx(HttpMethod::Get, "/books/1"), &f).is_err());
    }

    #[test]
    fn test_pieces() {
        let m = matcher();
        assert_eq!(m.pieces(&flow(vec![])).unwrap(), None);
        assert_eq!(
            m.pieces(&flow(vec![path("/book/:id", PathOperator::StartsWith)]))
                .unwrap(),
            Some(2)
        );
    }
}
