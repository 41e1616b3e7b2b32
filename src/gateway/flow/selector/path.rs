// SPDX-License-Identifier: MIT

//! Compiled path templates
//!
//! A template such as `/books/:id/chapters/:chapter` compiles into a regex
//! anchored at the start of the request path. The operator is applied on
//! what remains after the match, so one compiled pattern serves both
//! `EQUALS` and `STARTS_WITH` selectors using the same template.

use dashmap::DashMap;
use regex::Regex;
use std::sync::Arc;

use crate::gateway::flow::types::PathOperator;
use crate::sdk::error::DefinitionError;

/// Characters legal in a single URI path segment (RFC 3986 pchar)
const PARAM_CHARS: &str = r"[a-zA-Z0-9\-._~%!$&'()*+,;=:@]+";

fn is_param_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[derive(Debug)]
pub struct PathPattern {
    template: String,
    regex: Regex,
    pieces: usize,
}

impl PathPattern {
    pub fn compile(template: &str) -> Result<Self, DefinitionError> {
        let segments: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();

        let mut source = String::from("^");
        for segment in &segments {
            source.push('/');
            if let Some(name) = segment.strip_prefix(':') {
                if !is_param_name(name) {
                    return Err(DefinitionError::InvalidPath {
                        template: template.to_string(),
                        reason: format!("invalid parameter segment '{}'", segment),
                    });
                }
                source.push_str(PARAM_CHARS);
            } else {
                source.push_str(&regex::escape(segment));
            }
        }

        let regex = Regex::new(&source).map_err(|e| DefinitionError::InvalidPath {
            template: template.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            template: template.to_string(),
            regex,
            pieces: segments.len(),
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Number of non-empty segments in the template
    pub fn pieces(&self) -> usize {
        self.pieces
    }

    /// Match a request path; the match is case-sensitive and always ends on
    /// a segment boundary, a trailing `/` being optional.
    pub fn matches(&self, path: &str, operator: PathOperator) -> bool {
        let rest = match self.regex.find(path) {
            Some(m) => &path[m.end()..],
            None => return false,
        };

        match operator {
            PathOperator::Equals => rest.is_empty() || rest == "/",
            PathOperator::StartsWith => rest.is_empty() || rest.starts_with('/'),
        }
    }
}

/// Memo of compiled templates, owned by one deployed definition.
///
/// Reads go through the concurrent map without a global lock; two requests
/// compiling the same template at once both compile, and the first insert
/// wins so every caller ends up with the same `Arc`.
#[derive(Debug, Default)]
pub struct PathPatterns {
    patterns: DashMap<String, Arc<PathPattern>>,
}

impl PathPatterns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(&self, template: &str) -> Result<Arc<PathPattern>, DefinitionError> {
        if let Some(pattern) = self.patterns.get(template) {
            return Ok(Arc::clone(pattern.value()));
        }

        let compiled = Arc::new(PathPattern::compile(template)?);
        let entry = self
            .patterns
            .entry(template.to_string())
            .or_insert(compiled);
        Ok(Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn clear(&self) {
        self.patterns.clear();
    }
}
