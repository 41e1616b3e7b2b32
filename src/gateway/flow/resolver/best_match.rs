// SPDX-License-Identifier: MIT

//! Path specificity narrowing
//!
//! The most specific path template is the one with the most segments. A
//! request to `/book/99/chapter/888` matches `/book`, `/book/:id` and
//! `/book/:id/chapter/:c`; only the last one is kept. Flows without a path
//! selector are not ranked and always stay.

use std::sync::Arc;

use crate::gateway::flow::selector::PathPatterns;
use crate::gateway::flow::types::Flow;

enum Rank {
    Pathless,
    Matched(usize),
    Unmatched,
}

/// Keep pathless flows and the matching flows with the most segments.
///
/// Ties are all kept; relative input order is preserved.
pub fn best_match(flows: Vec<Arc<Flow>>, path: &str, patterns: &PathPatterns) -> Vec<Arc<Flow>> {
    let ranked: Vec<(Arc<Flow>, Rank)> = flows
        .into_iter()
        .map(|flow| {
            let rank = rank(&flow, path, patterns);
            (flow, rank)
        })
        .collect();

    let best = ranked
        .iter()
        .filter_map(|(_, rank)| match rank {
            Rank::Matched(pieces) => Some(*pieces),
            _ => None,
        })
        .max();

    ranked
        .into_iter()
        .filter(|(_, rank)| match rank {
            Rank::Pathless => true,
            Rank::Matched(pieces) => Some(*pieces) == best,
            Rank::Unmatched => false,
        })
        .map(|(flow, _)| flow)
        .collect()
}

fn rank(flow: &Flow, path: &str, patterns: &PathPatterns) -> Rank {
    let selector = match flow.path_selector() {
        Some(selector) => selector,
        None => return Rank::Pathless,
    };

    match patterns.get_or_compile(&selector.path) {
        Ok(pattern) if pattern.matches(path, selector.operator) => Rank::Matched(pattern.pieces()),
        Ok(_) => Rank::Unmatched,
        Err(e) => {
            log::warn!("Flow '{}' ignored for best match: {}", flow.name, e);
            Rank::Unmatched
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::flow::types::{PathOperator, PathSelector, Selector};

    fn flow(name: &str, path: Option<&str>) -> Arc<Flow> {
        Arc::new(Flow {
            name: name.to_string(),
            enabled: true,
            selectors: path
                .map(|p| {
                    vec![Selector::Path(PathSelector {
                        path: p.to_string(),
                        operator: PathOperator::StartsWith,
                    })]
                })
                .unwrap_or_default(),
            condition: None,
            steps: vec![],
        })
    }

    fn names(flows: &[Arc<Flow>]) -> Vec<&str> {
        flows.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_most_specific_wins() {
        let flows = vec![
            flow("book", Some("/book")),
            flow("book-id", Some("/book/:id")),
            flow("chapter", Some("/book/:id/chapter/:c")),
        ];
        let patterns = PathPatterns::new();

        let result = best_match(flows.clone(), "/book/99/chapter/888/extra", &patterns);
        assert_eq!(names(&result), vec!["chapter"]);

        let result = best_match(flows.clone(), "/book/99", &patterns);
        assert_eq!(names(&result), vec!["book-id"]);

        let result = best_match(flows, "/book", &patterns);
        assert_eq!(names(&result), vec!["book"]);
    }

    #[test]
    fn test_ties_kept_in_input_order() {
        let flows = vec![
            flow("by-name", Some("/book/:name")),
            flow("root", Some("/book")),
            flow("by-id", Some("/book/:id")),
        ];
        let result = best_match(flows, "/book/42", &PathPatterns::new());
        assert_eq!(names(&result), vec!["by-name", "by-id"]);
    }

    #[test]
    fn test_pathless_flows_always_kept() {
        let flows = vec![
            flow("any-1", None),
            flow("book", Some("/book")),
            flow("book-id", Some("/book/:id")),
            flow("any-2", None),
        ];
        let result = best_match(flows, "/book/1", &PathPatterns::new());
        assert_eq!(names(&result), vec!["any-1", "book-id", "any-2"]);
    }

    #[test]
    fn test_nothing_matches() {
        let flows = vec![flow("book", Some("/book")), flow("author", Some("/author"))];
        assert!(best_match(flows, "/orders", &PathPatterns::new()).is_empty());
        assert!(best_match(vec![], "/orders", &PathPatterns::new()).is_empty());
    }

    #[test]
    fn test_invalid_template_is_skipped() {
        let flows = vec![flow("bad", Some("/book/:")), flow("book", Some("/book"))];
        let result = best_match(flows, "/book/1", &PathPatterns::new());
        assert_eq!(names(&result), vec!["book"]);
    }
}
