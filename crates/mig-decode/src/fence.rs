//! Fenced code block extraction
//!
//! Uses pulldown-cmark so fences are recognized the way a Markdown renderer
//! would: info strings, tildes, indentation and unterminated trailing fences.

use pulldown_cmark::{CodeBlockKind, Event, Parser as MdParser, Tag, TagEnd};

/// A fenced block and its info string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    /// Info string (`json`, `csharp`, ...), if any
    pub language: Option<String>,
    /// Block body
    pub code: String,
}

/// All fenced blocks of `text`, in order of appearance
#[must_use]
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<FencedBlock> = None;

    for event in MdParser::new(text) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                let language = info.split_whitespace().next().map(str::to_ascii_lowercase);
                current = Some(FencedBlock {
                    language,
                    code: String::new(),
                });
            }
            Event::Text(chunk) => {
                if let Some(block) = current.as_mut() {
                    block.code.push_str(&chunk);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
            }
            _ => {}
        }
    }
    blocks
}

/// Body of the first block tagged `language`, else of the first block
#[must_use]
pub fn preferred_block(text: &str, language: &str) -> Option<String> {
    let blocks = fenced_blocks(text);
    blocks
        .iter()
        .find(|b| b.language.as_deref() == Some(language))
        .or_else(|| blocks.first())
        .map(|b| b.code.trim_end().to_string())
}
