//! Structural tokenizer
//!
//! Turns generated C#/Java-like source into a flat stream of
//! [`StructuralEvent`]s. It is not a parser: it recognizes just enough
//! shape (namespace and import lines, type bodies, members) to merge
//! independently generated fragments. Anything it cannot classify is
//! reported as [`StructuralEvent::Residual`] so no text is lost.
//!
//! Scanning runs over a masked copy of the input (see
//! [`mask_non_code`](crate::lexer::mask_non_code)); event text is always
//! sliced from the original.

use crate::lexer::{mask_non_code, matching_brace};
use crate::signature::MethodSignature;
use mig_artifact::TypeKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NAMESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^namespace\s+([A-Za-z_][\w.]*)\s*$").expect("valid regex"));
static PACKAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^package\s+([A-Za-z_][\w.]*)\s*$").expect("valid regex"));
static USING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:global\s+)?using\s+(?:static\s+)?(?:[A-Za-z_]\w*\s*=\s*)?[A-Za-z_][\w.<>,\s]*$")
        .expect("valid regex")
});
static IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^import\s+(?:static\s+)?[\w.]+(?:\.\*)?\s*$").expect("valid regex"));
static TYPE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(class|interface|enum|struct|record)\s+(?:(?:class|struct)\s+)?([A-Za-z_]\w*)")
        .expect("valid regex")
});
static METHOD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_]\w*)\s*(?:<[^()]*>)?\s*\(").expect("valid regex"));
static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[\w<>\[\],.?*]+\s+)+([A-Za-z_]\w*)\s*$").expect("valid regex")
});
static CONSTANT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bconst\b|\bstatic\s+final\b|\bfinal\s+static\b").expect("valid regex"));

/// Words that make a parenthesized header a statement, not a method
const CONTROL_WORDS: &[&str] = &[
    "if", "for", "foreach", "while", "switch", "catch", "using", "lock", "fixed", "return",
    "new", "else", "do", "try", "synchronized", "typeof", "sizeof", "nameof", "default", "when",
    "throw", "await", "yield", "case", "goto", "var", "break", "continue", "base", "this",
];

/// One structural element of a translated fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StructuralEvent {
    /// `namespace X;`, `namespace X { ... }` or `package x;`
    Namespace { name: String, text: String },
    /// `using X;` or `import x.y;`, whitespace normalized
    Import { text: String },
    /// Constant declaration; `owner` is the enclosing type
    Constant {
        owner: Option<String>,
        name: String,
        text: String,
    },
    /// Field or property declaration
    Field {
        owner: Option<String>,
        name: String,
        text: String,
    },
    /// Start of a top-level type body; `header` runs up to the opening brace
    TypeOpen {
        name: String,
        kind: TypeKind,
        header: String,
    },
    /// Method, constructor or free-standing function, body included
    Method {
        owner: Option<String>,
        signature: MethodSignature,
        text: String,
    },
    /// End of the type body opened by the matching [`StructuralEvent::TypeOpen`]
    TypeClose { name: String },
    /// Text that matched no structural pattern
    Residual { owner: Option<String>, text: String },
}

/// Tokenize translated source text
#[must_use]
pub fn tokenize(text: &str) -> Vec<StructuralEvent> {
    let mask = mask_non_code(text);
    let mut tokenizer = Tokenizer {
        src: text,
        mask: mask.as_bytes(),
        events: Vec::new(),
    };
    tokenizer.scan(0, text.len(), None);
    tokenizer.events
}

enum Terminator {
    Semicolon(usize),
    Block(usize),
    Closer(usize),
    Unterminated,
}

struct Tokenizer<'a> {
    src: &'a str,
    mask: &'a [u8],
    events: Vec<StructuralEvent>,
}

impl<'a> Tokenizer<'a> {
    fn scan(&mut self, start: usize, end: usize, owner: Option<&str>) {
        let mut pos = start;
        while pos < end {
            let head = self.skip_ws(pos, end);
            if head >= end {
                self.residual(owner, pos, end);
                return;
            }
            if self.mask[head] == b'}' {
                self.residual(owner, pos, head + 1);
                pos = head + 1;
                continue;
            }
            match self.terminator(head, end) {
                Terminator::Semicolon(at) => {
                    self.statement(owner, pos, head, at);
                    pos = at + 1;
                }
                Terminator::Block(open) => pos = self.block(owner, pos, head, open, end),
                Terminator::Closer(at) => {
                    self.residual(owner, pos, at);
                    pos = at;
                }
                Terminator::Unterminated => {
                    self.residual(owner, pos, end);
                    return;
                }
            }
        }
    }

    fn skip_ws(&self, from: usize, end: usize) -> usize {
        (from..end)
            .find(|&i| !self.mask[i].is_ascii_whitespace())
            .unwrap_or(end)
    }

    /// Where the item starting at `head` ends
    fn terminator(&self, head: usize, end: usize) -> Terminator {
        let mut parens = 0i32;
        let mut brackets = 0i32;
        let mut expression = false;
        let mut i = head;
        while i < end {
            match self.mask[i] {
                b'(' => parens += 1,
                b')' => parens -= 1,
                b'[' => brackets += 1,
                b']' => brackets -= 1,
                b'=' if parens <= 0 && brackets <= 0 => expression = true,
                b';' if parens <= 0 => return Terminator::Semicolon(i),
                b'{' if parens <= 0 && brackets <= 0 => {
                    if !expression {
                        return Terminator::Block(i);
                    }
                    // Initializer or lambda body inside an expression.
                    match matching_brace(&self.mask[..end], i) {
                        Some(close) => i = close,
                        None => return Terminator::Unterminated,
                    }
                }
                b'}' if parens <= 0 => return Terminator::Closer(i),
                _ => {}
            }
            i += 1;
        }
        Terminator::Unterminated
    }

    /// Start of the first line holding non-whitespace text in `lead..head`
    fn text_start(&self, lead: usize, head: usize) -> usize {
        let window = &self.src[lead..head];
        let first = window
            .find(|c: char| !c.is_whitespace())
            .map_or(head, |off| lead + off);
        self.src[lead..first]
            .rfind('\n')
            .map_or(lead, |nl| lead + nl + 1)
    }

    fn header(&self, head: usize, end: usize) -> &'a str {
        std::str::from_utf8(&self.mask[head..end]).unwrap_or_default()
    }

    fn statement(&mut self, owner: Option<&str>, lead: usize, head: usize, semi: usize) {
        let header = strip_leading_attributes(self.header(head, semi)).trim();
        let start = self.text_start(lead, head);
        let text = self.src[start..=semi].trim_end().to_string();
        let owner_name = owner.map(str::to_string);

        if owner.is_none() {
            if USING.is_match(header) || IMPORT.is_match(header) {
                let normalized = self.src[head..semi].split_whitespace().collect::<Vec<_>>();
                self.events.push(StructuralEvent::Import {
                    text: format!("{};", normalized.join(" ")),
                });
                return;
            }
            if let Some(caps) = NAMESPACE.captures(header) {
                let name = caps[1].to_string();
                let text = format!("namespace {name};");
                self.events.push(StructuralEvent::Namespace { name, text });
                return;
            }
            if let Some(caps) = PACKAGE.captures(header) {
                let name = caps[1].to_string();
                let text = format!("package {name};");
                self.events.push(StructuralEvent::Namespace { name, text });
                return;
            }
        }

        if let Some(signature) = self.method_signature(header, owner.is_some()) {
            self.events.push(StructuralEvent::Method {
                owner: owner_name,
                signature,
                text,
            });
            return;
        }

        let declaration = header.split('=').next().unwrap_or_default();
        if let Some(name) = declared_name(declaration) {
            let event = if CONSTANT.is_match(declaration) {
                StructuralEvent::Constant {
                    owner: owner_name,
                    name,
                    text,
                }
            } else {
                StructuralEvent::Field {
                    owner: owner_name,
                    name,
                    text,
                }
            };
            self.events.push(event);
            return;
        }

        self.events.push(StructuralEvent::Residual {
            owner: owner_name,
            text,
        });
    }

    /// Returns the position after the block
    fn block(
        &mut self,
        owner: Option<&str>,
        lead: usize,
        head: usize,
        open: usize,
        end: usize,
    ) -> usize {
        let header = strip_leading_attributes(self.header(head, open)).trim();
        let start = self.text_start(lead, head);
        let close = matching_brace(&self.mask[..end], open);
        let inner_end = close.unwrap_or(end);
        let mut after = close.map_or(end, |c| c + 1);

        if owner.is_none() {
            if let Some(caps) = NAMESPACE.captures(header) {
                let name = caps[1].to_string();
                let text = format!("namespace {name};");
                self.events.push(StructuralEvent::Namespace { name, text });
                self.scan(open + 1, inner_end, None);
                return after;
            }
        }

        if let Some((kind, name)) = type_declaration(header) {
            if owner.is_none() {
                self.events.push(StructuralEvent::TypeOpen {
                    name: name.clone(),
                    kind,
                    header: self.src[start..open].trim_end().to_string(),
                });
                self.scan(open + 1, inner_end, Some(&name));
                self.events.push(StructuralEvent::TypeClose { name });
            } else {
                // Nested types stay whole inside their owner.
                self.residual(owner, lead, after);
            }
            return after;
        }

        if let Some(signature) = self.method_signature(header, owner.is_some()) {
            self.events.push(StructuralEvent::Method {
                owner: owner.map(str::to_string),
                signature,
                text: self.src[start..after].trim_end().to_string(),
            });
            return after;
        }

        if owner.is_some() && !header.contains('(') {
            if let Some(name) = declared_name(header) {
                // Property, possibly with an initializer after the accessor block.
                let next = self.skip_ws(after, end);
                if next < end && self.mask[next] == b'=' {
                    if let Terminator::Semicolon(semi) = self.terminator(next + 1, end) {
                        after = semi + 1;
                    }
                }
                self.events.push(StructuralEvent::Field {
                    owner: owner.map(str::to_string),
                    name,
                    text: self.src[start..after].trim_end().to_string(),
                });
                return after;
            }
        }

        self.residual(owner, lead, after);
        after
    }

    fn method_signature(&self, header: &str, in_type: bool) -> Option<MethodSignature> {
        let caps = METHOD_NAME.captures(header)?;
        let whole = caps.get(0)?;
        let name = caps.get(1)?.as_str();
        if CONTROL_WORDS.contains(&name) {
            return None;
        }
        let prefix = header[..whole.start()].trim();
        if prefix.is_empty() && !in_type {
            return None;
        }
        if prefix.ends_with('.')
            || prefix.contains(['=', '(', ')', ';', '"'])
            || prefix
                .split_whitespace()
                .next()
                .is_some_and(|w| CONTROL_WORDS.contains(&w))
        {
            return None;
        }

        // Parameters are read from the mask so literal defaults cannot confuse the split.
        let open = whole.end() - 1;
        let params = balanced_parens(&header[open..])?;
        Some(MethodSignature::parse(name, params))
    }

    fn residual(&mut self, owner: Option<&str>, lead: usize, end: usize) {
        let text = &self.src[lead..end];
        if text.trim().is_empty() {
            return;
        }
        let start = self.text_start(lead, end);
        self.events.push(StructuralEvent::Residual {
            owner: owner.map(str::to_string),
            text: self.src[start..end].trim_end().to_string(),
        });
    }
}

/// Text between the parentheses starting at `s[0]`
fn balanced_parens(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Kind and name of a type declaration header, if it is one
fn type_declaration(header: &str) -> Option<(TypeKind, String)> {
    let caps = TYPE_DECL.captures(header)?;
    let keyword = caps.get(1)?;
    if header.find('(').is_some_and(|paren| paren < keyword.start()) {
        return None;
    }
    Some((TypeKind::from_keyword(keyword.as_str()), caps[2].to_string()))
}

/// Declared identifier of `modifiers type name`, if the text has that shape
fn declared_name(declaration: &str) -> Option<String> {
    if declaration.contains('(') {
        return None;
    }
    let first = declaration.split_whitespace().next()?;
    if CONTROL_WORDS.contains(&first) {
        return None;
    }
    DECLARATION
        .captures(declaration.trim())
        .map(|caps| caps[1].to_string())
}

/// Drop `[Attribute]`, `@Annotation(...)` and `#directive` lines ahead of a header
fn strip_leading_attributes(header: &str) -> &str {
    let mut rest = header.trim_start();
    loop {
        if rest.starts_with('[') {
            match close_of(rest, '[', ']') {
                Some(end) => rest = rest[end + 1..].trim_start(),
                None => return rest,
            }
        } else if rest.starts_with('@') && !rest.starts_with("@interface") {
            let name_end = rest[1..]
                .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
                .map_or(rest.len(), |i| i + 1);
            rest = rest[name_end..].trim_start();
            if rest.starts_with('(') {
                match close_of(rest, '(', ')') {
                    Some(end) => rest = rest[end + 1..].trim_start(),
                    None => return rest,
                }
            }
        } else if rest.starts_with('#') {
            rest = rest.find('\n').map_or("", |nl| rest[nl + 1..].trim_start());
        } else {
            return rest;
        }
    }
}

fn close_of(s: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}
