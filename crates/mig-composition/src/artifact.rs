//! Merged artifact model and rendering

use indexmap::IndexMap;
use mig_artifact::{TargetLanguage, TypeKind};
use mig_symbol::MethodSignature;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const INDENT: &str = "    ";

/// Section header ahead of import statements
pub const IMPORTS_HEADER: &str = "// Imports";
/// Section header ahead of constants
pub const CONSTANTS_HEADER: &str = "// Constants";
/// Section header ahead of top-level fields
pub const FIELDS_HEADER: &str = "// Fields";
/// Section header ahead of free-standing functions
pub const FUNCTIONS_HEADER: &str = "// Functions";
/// Separator ahead of text that matched no structure
pub const RESIDUAL_HEADER: &str = "// ----- Unclassified content (kept verbatim) -----";

/// Single artifact assembled from every fragment
///
/// Sets are sorted, types keep first-seen order, so rendering is
/// deterministic for a given input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MergedArtifact {
    /// Target language, drives brace placement
    pub target: TargetLanguage,
    /// `namespace X;` or `package x;`
    pub namespace: Option<String>,
    /// Import/using statements
    pub imports: BTreeSet<String>,
    /// Top-level constant declarations
    pub constants: BTreeSet<String>,
    /// Top-level field declarations
    pub fields: BTreeSet<String>,
    /// Types by name, first-seen order
    pub types: IndexMap<String, TypeBody>,
    /// Functions outside any type
    pub functions: Vec<String>,
    /// Unclassified text, in fragment order
    pub residual: Vec<String>,
}

impl MergedArtifact {
    /// Empty artifact for `target`
    #[must_use]
    pub fn new(target: TargetLanguage) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// Number of methods across all types
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.types
            .values()
            .map(|t| {
                t.members
                    .iter()
                    .filter(|m| matches!(m, Member::Method { .. }))
                    .count()
            })
            .sum()
    }

    /// Render in the fixed order: namespace, imports, constants, fields,
    /// types, functions, residual
    #[must_use]
    pub fn render(&self) -> String {
        let mut sections: Vec<String> = Vec::new();

        if let Some(namespace) = &self.namespace {
            sections.push(namespace.clone());
        }
        for (header, set) in [
            (IMPORTS_HEADER, &self.imports),
            (CONSTANTS_HEADER, &self.constants),
            (FIELDS_HEADER, &self.fields),
        ] {
            if !set.is_empty() {
                let mut lines = vec![header.to_string()];
                lines.extend(set.iter().cloned());
                sections.push(lines.join("\n"));
            }
        }
        for body in self.types.values() {
            sections.push(body.render(&self.target));
        }
        if !self.functions.is_empty() {
            sections.push(format!(
                "{FUNCTIONS_HEADER}\n{}",
                self.functions.join("\n\n")
            ));
        }
        if !self.residual.is_empty() {
            sections.push(format!("{RESIDUAL_HEADER}\n{}", self.residual.join("\n\n")));
        }

        let mut out = sections.join("\n\n");
        out.push('\n');
        out
    }
}

/// Accumulated body of one type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeBody {
    /// Type name
    pub name: String,
    /// Declared kind
    pub kind: TypeKind,
    /// Declaration up to the opening brace
    pub header: String,
    /// Members in fragment order, deduplicated
    pub members: Vec<Member>,
}

impl TypeBody {
    /// Empty body with the given header
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TypeKind, header: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            header: header.into(),
            members: Vec::new(),
        }
    }

    /// Method member with `signature`, if present
    #[must_use]
    pub fn method(&self, signature: &MethodSignature) -> Option<&str> {
        self.members.iter().find_map(|m| match m {
            Member::Method { signature: s, text } if s == signature => Some(text.as_str()),
            _ => None,
        })
    }

    fn render(&self, target: &TargetLanguage) -> String {
        let open = match target {
            TargetLanguage::CSharp => format!("{}\n{{", self.header),
            _ => format!("{} {{", self.header),
        };
        let members: Vec<String> = self
            .members
            .iter()
            .map(|m| indent(m.text(), INDENT))
            .collect();
        if members.is_empty() {
            format!("{open}\n}}")
        } else {
            format!("{open}\n{}\n}}", members.join("\n\n"))
        }
    }
}

/// One member of a type body; text is stored without outer indentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "member", rename_all = "snake_case")]
pub enum Member {
    /// Constant declaration
    Constant { name: String, text: String },
    /// Field or property
    Field { name: String, text: String },
    /// Method or constructor
    Method {
        signature: MethodSignature,
        text: String,
    },
    /// Anything else inside the body
    Residual { text: String },
}

impl Member {
    /// Member text
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Constant { text, .. }
            | Self::Field { text, .. }
            | Self::Method { text, .. }
            | Self::Residual { text } => text,
        }
    }
}

/// Remove the common leading whitespace of all non-blank lines
#[must_use]
pub fn dedent(text: &str) -> String {
    let width = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    text.lines()
        .map(|l| l.get(width..).unwrap_or_else(|| l.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                format!("{prefix}{l}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
