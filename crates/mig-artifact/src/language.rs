//! Source and target language descriptors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language of the legacy document being modernized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    /// COBOL: divisions, sections and paragraph labels delimit units
    #[default]
    Cobol,
    /// Anything else: blank lines delimit units
    Generic,
}

impl SourceLanguage {
    /// Guess the language from the document text
    #[must_use]
    pub fn detect(text: &str) -> Self {
        let upper = text.to_ascii_uppercase();
        if upper.contains("IDENTIFICATION DIVISION")
            || upper.contains("PROCEDURE DIVISION")
            || upper.contains("PROGRAM-ID")
        {
            Self::Cobol
        } else {
            Self::Generic
        }
    }
}

/// Language the transformation service is asked to produce
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    /// C# / .NET
    #[default]
    CSharp,
    /// Java
    Java,
    /// Any other target; merged by concatenation
    Other(String),
}

impl TargetLanguage {
    /// Whether the structural merge applies (namespaces, types, members)
    #[inline]
    #[must_use]
    pub fn is_object_oriented(&self) -> bool {
        matches!(self, Self::CSharp | Self::Java)
    }

    /// Info string used on fenced code blocks
    #[must_use]
    pub fn fence_tag(&self) -> &str {
        match self {
            Self::CSharp => "csharp",
            Self::Java => "java",
            Self::Other(name) => name,
        }
    }

    /// Namespace/package declaration for the given artifact name
    #[must_use]
    pub fn namespace_declaration(&self, name: &str) -> String {
        match self {
            Self::Java => format!("package {};", name.to_ascii_lowercase()),
            _ => format!("namespace {name};"),
        }
    }

    /// Minimal diagnostic statement for an otherwise empty error handler
    ///
    /// `binding` is the caught exception variable, when the handler names one.
    #[must_use]
    pub fn error_log_statement(&self, binding: Option<&str>) -> String {
        match (self, binding) {
            (Self::Java, Some(var)) => {
                format!("System.err.println(\"Error: \" + {var}.getMessage());")
            }
            (Self::Java, None) => "System.err.println(\"Error: unhandled exception\");".to_string(),
            (_, Some(var)) => format!("Console.Error.WriteLine(\"Error: \" + {var}.Message);"),
            (_, None) => "Console.Error.WriteLine(\"Error: unhandled exception\");".to_string(),
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CSharp => f.write_str("C#"),
            Self::Java => f.write_str("Java"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cobol() {
        let text = "       IDENTIFICATION DIVISION.\n       PROGRAM-ID. PAYROLL.\n";
        assert_eq!(SourceLanguage::detect(text), SourceLanguage::Cobol);
        assert_eq!(SourceLanguage::detect("def main():\n    pass\n"), SourceLanguage::Generic);
    }

    #[test]
    fn namespace_declarations() {
        assert_eq!(TargetLanguage::CSharp.namespace_declaration("Payroll"), "namespace Payroll;");
        assert_eq!(TargetLanguage::Java.namespace_declaration("Payroll"), "package payroll;");
    }

    #[test]
    fn log_statement_uses_binding() {
        let stmt = TargetLanguage::CSharp.error_log_statement(Some("ex"));
        assert!(stmt.contains("ex.Message"));
        let stmt = TargetLanguage::Java.error_log_statement(Some("e"));
        assert!(stmt.contains("e.getMessage()"));
    }

    #[test]
    fn only_csharp_and_java_are_structural() {
        assert!(TargetLanguage::CSharp.is_object_oriented());
        assert!(!TargetLanguage::Other("python".into()).is_object_oriented());
    }
}
