//! Literal and comment masking
//!
//! Structural scanning must not be fooled by braces or semicolons inside
//! string literals, character literals or comments. [`mask_non_code`]
//! blanks those regions out while keeping every byte offset and newline in
//! place, so positions found in the mask index straight into the original.

/// Copy of `text` with comment bodies and literal contents replaced by spaces
///
/// Quote characters are kept; comment markers are blanked with the comment.
/// The result has the same byte length as `text` and the same line breaks.
#[must_use]
pub fn mask_non_code(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut state = State::Code;
    let mut chars = text.char_indices();

    while let Some((i, c)) = chars.next() {
        let next = bytes.get(i + 1).copied();
        match state {
            State::Code => match c {
                '/' if next == Some(b'/') => {
                    state = State::LineComment;
                    out.push(' ');
                }
                '/' if next == Some(b'*') => {
                    state = State::BlockComment;
                    out.push(' ');
                    chars.next();
                    out.push(' ');
                }
                '"' => {
                    let verbatim = i > 0 && matches!(bytes[..i].last(), Some(b'@'))
                        || i > 1 && &bytes[i - 2..i] == b"@$";
                    if text[i..].starts_with("\"\"\"") {
                        state = State::RawString;
                        out.push_str("\"\"\"");
                        chars.next();
                        chars.next();
                    } else {
                        state = if verbatim { State::VerbatimString } else { State::String };
                        out.push('"');
                    }
                }
                '\'' => {
                    state = State::Char;
                    out.push('\'');
                }
                _ => out.push(c),
            },
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                    out.push('\n');
                } else {
                    blank(&mut out, c);
                }
            }
            State::BlockComment => {
                if c == '*' && next == Some(b'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else {
                    blank(&mut out, c);
                }
            }
            State::String | State::Char => {
                let quote = if state == State::String { '"' } else { '\'' };
                if c == '\\' {
                    out.push(' ');
                    if let Some((_, escaped)) = chars.next() {
                        blank(&mut out, escaped);
                    }
                } else if c == quote {
                    out.push(quote);
                    state = State::Code;
                } else if c == '\n' {
                    // Unterminated literal; resync at the line break.
                    out.push('\n');
                    state = State::Code;
                } else {
                    blank(&mut out, c);
                }
            }
            State::VerbatimString => {
                if c == '"' && next == Some(b'"') {
                    chars.next();
                    out.push_str("  ");
                } else if c == '"' {
                    out.push('"');
                    state = State::Code;
                } else {
                    blank(&mut out, c);
                }
            }
            State::RawString => {
                if text[i..].starts_with("\"\"\"") {
                    chars.next();
                    chars.next();
                    out.push_str("\"\"\"");
                    state = State::Code;
                } else {
                    blank(&mut out, c);
                }
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    String,
    VerbatimString,
    RawString,
    Char,
}

fn blank(out: &mut String, c: char) {
    if c == '\n' {
        out.push('\n');
    } else {
        for _ in 0..c.len_utf8() {
            out.push(' ');
        }
    }
}

/// Brace accounting over code (literals and comments excluded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DelimiterBalance {
    /// `{` still open at the end of the text
    pub unclosed: usize,
    /// `}` that had no matching opener
    pub unmatched_closers: usize,
}

impl DelimiterBalance {
    /// Measure `text`
    #[must_use]
    pub fn of(text: &str) -> Self {
        let mask = mask_non_code(text);
        let mut depth = 0usize;
        let mut stray = 0usize;
        for b in mask.bytes() {
            match b {
                b'{' => depth += 1,
                b'}' if depth > 0 => depth -= 1,
                b'}' => stray += 1,
                _ => {}
            }
        }
        Self {
            unclosed: depth,
            unmatched_closers: stray,
        }
    }

    /// True when every opener is closed and no closer is stray
    #[inline]
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.unclosed == 0 && self.unmatched_closers == 0
    }
}

/// Offset of the `}` closing the `{` at `open`, searching a masked text
///
/// Returns `None` when the block is never closed.
#[must_use]
pub fn matching_brace(mask: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, b) in mask.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}
