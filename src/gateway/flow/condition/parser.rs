// SPDX-License-Identifier: MIT

//! Condition expression parser
//!
//! Parses gateway expressions like:
//! - `{#request.method == 'GET'}`
//! - `#request.headers['x-tier'] == 'gold' && #request.params.page > 1`
//! - `not (request.path matches '/internal/.*') or attributes.trusted`

use super::ast::{CompareOp, Condition, Lookup, Operand, Pattern};
use crate::sdk::error::ConditionError;

/// Parse a condition expression string
pub fn parse(input: &str) -> Result<Condition, ConditionError> {
    let body = unwrap_template(input.trim());
    parse_expr(body, input)
}

/// Strip the `{# ... }` template wrapper expressions are usually stored in
fn unwrap_template(input: &str) -> &str {
    if input.starts_with('{') && input.ends_with('}') && input.len() >= 2 {
        input[1..input.len() - 1].trim()
    } else {
        input
    }
}

fn parse_expr(input: &str, source: &str) -> Result<Condition, ConditionError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(parse_error(source, "empty expression"));
    }

    match input {
        "true" => return Ok(Condition::Const(true)),
        "false" => return Ok(Condition::Const(false)),
        _ => {}
    }

    // Lowest precedence first so `a && b || c` groups as `(a && b) || c`
    if let Some((pos, len)) = find_top_level(input, &["||", " or "]) {
        let left = parse_expr(&input[..pos], source)?;
        let right = parse_expr(&input[pos + len..], source)?;
        return Ok(Condition::Or(Box::new(left), Box::new(right)));
    }

    if let Some((pos, len)) = find_top_level(input, &["&&", " and "]) {
        let left = parse_expr(&input[..pos], source)?;
        let right = parse_expr(&input[pos + len..], source)?;
        return Ok(Condition::And(Box::new(left), Box::new(right)));
    }

    if let Some(rest) = strip_not(input) {
        let inner = parse_expr(rest, source)?;
        return Ok(Condition::Not(Box::new(inner)));
    }

    if is_wrapped(input) {
        return parse_expr(&input[1..input.len() - 1], source);
    }

    parse_comparison(input, source)
}

fn parse_comparison(input: &str, source: &str) -> Result<Condition, ConditionError> {
    for (token, op) in CompareOp::TOKENS {
        if let Some((pos, len)) = find_top_level(input, &[token]) {
            let lookup = parse_lookup(&input[..pos], source)?;
            let operand = match (op, parse_operand(&input[pos + len..], source)?) {
                (CompareOp::Matches, Operand::Text(s)) => Operand::Pattern(
                    Pattern::new(&s).map_err(|_| ConditionError::InvalidPattern(s.clone()))?,
                ),
                (CompareOp::Matches, _) => {
                    return Err(parse_error(source, "matches expects a string pattern"))
                }
                (_, operand) => operand,
            };
            return Ok(Condition::Compare {
                lookup,
                op,
                operand,
            });
        }
    }

    parse_lookup(input, source).map(Condition::Present)
}

/// Find the first occurrence of one of `tokens` outside quotes and parentheses
fn find_top_level(input: &str, tokens: &[&str]) -> Option<(usize, usize)> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;

    for (i, c) in input.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => depth -= 1,
                _ if depth == 0 => {
                    if let Some(token) = tokens.iter().find(|t| input[i..].starts_with(**t)) {
                        return Some((i, token.len()));
                    }
                }
                _ => {}
            },
        }
    }
    None
}

fn strip_not(input: &str) -> Option<&str> {
    if input.starts_with('!') && !input.starts_with("!=") {
        return Some(&input[1..]);
    }
    input.strip_prefix("not ")
}

/// Whether the whole input is enclosed in one pair of parentheses
fn is_wrapped(input: &str) -> bool {
    if !(input.starts_with('(') && input.ends_with(')')) {
        return false;
    }
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let last = input.len() - 1;
    for (i, c) in input.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 && i != last {
                        return false;
                    }
                }
                _ => {}
            },
        }
    }
    depth == 0
}

fn parse_lookup(raw: &str, source: &str) -> Result<Lookup, ConditionError> {
    let dotted = normalize_reference(raw)
        .ok_or_else(|| parse_error(source, &format!("invalid reference '{}'", raw.trim())))?;
    Lookup::from_dotted(&dotted)
        .ok_or_else(|| parse_error(source, &format!("unknown reference '{}'", dotted)))
}

/// Turn `#request.headers['x-tier']` into `request.headers.x-tier`
fn normalize_reference(raw: &str) -> Option<String> {
    let raw = raw.trim().trim_start_matches('#');
    if raw.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let close = rest[open..].find(']')? + open;
        let key = rest[open + 1..close].trim().trim_matches(|c| c == '\'' || c == '"');
        if key.is_empty() {
            return None;
        }
        out.push('.');
        out.push_str(key);
        rest = &rest[close + 1..];
    }
    out.push_str(rest);

    let valid = out
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid && !out.starts_with('.') {
        Some(out)
    } else {
        None
    }
}

fn parse_operand(input: &str, source: &str) -> Result<Operand, ConditionError> {
    let input = input.trim();

    match input {
        "null" => return Ok(Operand::Null),
        "true" => return Ok(Operand::Bool(true)),
        "false" => return Ok(Operand::Bool(false)),
        _ => {}
    }

    let quoted = input.len() >= 2
        && ((input.starts_with('\'') && input.ends_with('\''))
            || (input.starts_with('"') && input.ends_with('"')));
    if quoted {
        return Ok(Operand::Text(input[1..input.len() - 1].to_string()));
    }

    input
        .parse::<f64>()
        .map(Operand::Number)
        .map_err(|_| parse_error(source, &format!("could not parse operand '{}'", input)))
}

fn parse_error(source: &str, reason: &str) -> ConditionError {
    ConditionError::Parse {
        expression: source.to_string(),
        reason: reason.to_string(),
    }
}
