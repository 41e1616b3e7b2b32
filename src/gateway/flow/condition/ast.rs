// SPDX-License-Identifier: MIT

//! Parsed form of flow conditions
//!
//! Every reference into the request context is resolved to a [`Lookup`] at
//! parse time, so an expression naming an unknown root never compiles.

use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Const(bool),
    Compare {
        lookup: Lookup,
        op: CompareOp,
        operand: Operand,
    },
    /// A bare lookup holds when its value is truthy
    Present(Lookup),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

/// A value read from the request context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Request(RequestField),
    /// Lower-cased header name
    Header(String),
    Param(String),
    /// Dotted path into the public attributes
    Attribute(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestField {
    Id,
    Path,
    Method,
    Entrypoint,
    Operation,
    Headers,
    Params,
}

impl Lookup {
    /// Resolve a normalised reference such as `request.headers.x-tier` or
    /// `context.attributes.user.tier`
    pub fn from_dotted(reference: &str) -> Option<Self> {
        if let Some(rest) = reference.strip_prefix("request.") {
            let field = match rest {
                "id" => RequestField::Id,
                "path" | "pathInfo" => RequestField::Path,
                "method" => RequestField::Method,
                "entrypoint" => RequestField::Entrypoint,
                "operation" => RequestField::Operation,
                "headers" => RequestField::Headers,
                "params" => RequestField::Params,
                _ => {
                    if let Some(name) = rest.strip_prefix("headers.") {
                        return non_empty(name).map(|n| Lookup::Header(n.to_ascii_lowercase()));
                    }
                    return rest
                        .strip_prefix("params.")
                        .and_then(non_empty)
                        .map(|n| Lookup::Param(n.to_string()));
                }
            };
            return Some(Lookup::Request(field));
        }

        reference
            .strip_prefix("context.attributes.")
            .or_else(|| reference.strip_prefix("attributes."))
            .and_then(non_empty)
            .map(|path| Lookup::Attribute(path.to_string()))
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Substring, array element or object key
    Contains,
    /// Whole-value regular expression
    Matches,
}

impl CompareOp {
    /// Operator tokens; two-character tokens come before their one-character
    /// prefixes so `>=` is never read as `>`
    pub const TOKENS: [(&'static str, CompareOp); 8] = [
        ("!=", CompareOp::NotEq),
        (">=", CompareOp::Gte),
        ("<=", CompareOp::Lte),
        ("==", CompareOp::Eq),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
        (" contains ", CompareOp::Contains),
        (" matches ", CompareOp::Matches),
    ];
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Pattern(Pattern),
}

/// A compiled, fully anchored regular expression
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{})$", source)).map(Pattern)
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_lookups() {
        assert_eq!(
            Lookup::from_dotted("request.method"),
            Some(Lookup::Request(RequestField::Method))
        );
        assert_eq!(
            Lookup::from_dotted("request.pathInfo"),
            Some(Lookup::Request(RequestField::Path))
        );
        assert_eq!(
            Lookup::from_dotted("request.headers.X-Tier"),
            Some(Lookup::Header("x-tier".to_string()))
        );
        assert_eq!(
            Lookup::from_dotted("request.params.page"),
            Some(Lookup::Param("page".to_string()))
        );
        assert_eq!(Lookup::from_dotted("request.unknown"), None);
        assert_eq!(Lookup::from_dotted("request.headers."), None);
    }

    #[test]
    fn test_attribute_lookups() {
        let expected = Some(Lookup::Attribute("user.tier".to_string()));
        assert_eq!(Lookup::from_dotted("context.attributes.user.tier"), expected);
        assert_eq!(Lookup::from_dotted("attributes.user.tier"), expected);
        assert_eq!(Lookup::from_dotted("attributes."), None);
        assert_eq!(Lookup::from_dotted("somewhere.else"), None);
    }

    #[test]
    fn test_longer_tokens_first() {
        for (i, (token, _)) in CompareOp::TOKENS.iter().enumerate() {
            for (later, _) in &CompareOp::TOKENS[i + 1..] {
                assert!(!later.starts_with(token), "{} shadows {}", token, later);
            }
        }
    }

    #[test]
    fn test_pattern_is_anchored() {
        let pattern = Pattern::new("/books/[0-9]+").unwrap();
        assert!(pattern.is_match("/books/42"));
        assert!(!pattern.is_match("/books/42/chapters"));
        assert!(!pattern.is_match("/v1/books/42"));
    }

    #[test]
    fn test_pattern_equality_by_source() {
        assert_eq!(Pattern::new("a+").unwrap(), Pattern::new("a+").unwrap());
        assert_ne!(Pattern::new("a+").unwrap(), Pattern::new("b+").unwrap());
    }
}
