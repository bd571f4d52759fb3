//! Method signatures used as merge identity

use serde::{Deserialize, Serialize};
use std::fmt;

const PARAMETER_MODIFIERS: &[&str] = &[
    "ref", "out", "in", "params", "this", "final", "scoped", "readonly",
];

/// `name(paramType,...)`: two definitions with equal signatures are the same method
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    /// Method name
    pub name: String,
    /// Parameter types in order, whitespace removed
    pub param_types: Vec<String>,
}

impl MethodSignature {
    /// Build from a name and the raw text between the parentheses
    #[must_use]
    pub fn parse(name: &str, params: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            param_types: split_top_level(params)
                .into_iter()
                .filter_map(parameter_type)
                .collect(),
        }
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.param_types.join(","))
    }
}

/// Split on commas that are not nested in `<>`, `()` or `[]`
fn split_top_level(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in params.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&params[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&params[start..]);
    parts
}

/// Type of one parameter declaration, whitespace removed
fn parameter_type(param: &str) -> Option<String> {
    let mut param = param.trim();
    // Drop attributes `[FromBody]` and annotations `@NotNull`.
    loop {
        if let Some(rest) = param.strip_prefix('[') {
            param = rest.find(']').map_or("", |end| rest[end + 1..].trim_start());
        } else if param.starts_with('@') {
            let end = param.find(char::is_whitespace).unwrap_or(param.len());
            param = param[end..].trim_start();
        } else {
            break;
        }
    }
    let declaration = param.split('=').next().unwrap_or_default().trim();
    if declaration.is_empty() {
        return None;
    }

    let tokens: Vec<&str> = declaration
        .split_whitespace()
        .filter(|t| !PARAMETER_MODIFIERS.contains(t))
        .collect();
    let type_tokens = match tokens.len() {
        0 => return None,
        1 => &tokens[..],
        n => {
            // The last token is the name, unless it still belongs to a generic type.
            let open = tokens[..n - 1].iter().map(|t| t.matches('<').count()).sum::<usize>();
            let close = tokens[..n - 1].iter().map(|t| t.matches('>').count()).sum::<usize>();
            if open > close {
                &tokens[..]
            } else {
                &tokens[..n - 1]
            }
        }
    };
    Some(type_tokens.concat())
}
