//! Testing utilities for MIG workspace
//!
//! Shared fixtures and a scripted transformation service.

#![allow(missing_docs)]

use async_trait::async_trait;
use mig_artifact::{MethodDescriptor, StructuralDescriptor, TypeDescriptor, TypeKind};
use mig_backend::{RequestKind, ServiceError, TransformRequest, TransformationService};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::json;
use std::time::Duration;

static PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^ {7}([A-Z0-9][A-Z0-9-]*)\.\s*$").expect("valid regex"));
static PROGRAM_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"PROGRAM-ID\.\s*([A-Z0-9-]+)").expect("valid regex"));
static METHOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"public void (\w+)\(").expect("valid regex"));

/// What the scripted service does with one request
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Error(ServiceError),
    /// Never answers; the caller's timeout fires
    Hang,
    /// `reply`, after a pause
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn error(error: ServiceError) -> Self {
        Self::Error(error)
    }

    pub fn hang() -> Self {
        Self::Hang
    }

    pub fn after(delay: Duration, reply: Reply) -> Self {
        Self::Delayed(delay, Box::new(reply))
    }
}

type Script = Box<dyn Fn(&TransformRequest) -> Reply + Send + Sync>;

/// Transformation service answering from a closure and recording every request
pub struct ScriptedService {
    script: Script,
    requests: Mutex<Vec<TransformRequest>>,
}

impl std::fmt::Debug for ScriptedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedService")
            .field("requests", &self.requests.lock().len())
            .finish_non_exhaustive()
    }
}

impl ScriptedService {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&TransformRequest) -> Reply + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Well-behaved service: COBOL paragraphs become C# methods
    pub fn converter() -> Self {
        Self::new(|request| Reply::text(convert(request)))
    }

    /// Like [`ScriptedService::converter`], but `override_reply` decides first
    pub fn converter_with<F>(override_reply: F) -> Self
    where
        F: Fn(&TransformRequest) -> Option<Reply> + Send + Sync + 'static,
    {
        Self::new(move |request| {
            override_reply(request).unwrap_or_else(|| Reply::text(convert(request)))
        })
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<TransformRequest> {
        self.requests.lock().clone()
    }

    /// Requests whose kind has `label`
    pub fn count(&self, label: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.kind.label() == label)
            .count()
    }

    /// Indices of translation requests, in arrival order
    pub fn translated_fragments(&self) -> Vec<usize> {
        self.requests
            .lock()
            .iter()
            .filter_map(|r| match r.kind {
                RequestKind::Translate { fragment_index, .. } => Some(fragment_index),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl TransformationService for ScriptedService {
    async fn transform(&self, request: &TransformRequest) -> mig_backend::Result<String> {
        self.requests.lock().push(request.clone());
        let mut reply = (self.script)(request);
        loop {
            match reply {
                Reply::Text(text) => return Ok(text),
                Reply::Error(e) => return Err(e),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3_600)).await;
                    return Err(ServiceError::Timeout(Duration::from_secs(3_600)));
                }
                Reply::Delayed(delay, next) => {
                    tokio::time::sleep(delay).await;
                    reply = *next;
                }
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Converter behavior of [`ScriptedService::converter`]
pub fn convert(request: &TransformRequest) -> String {
    match request.kind {
        RequestKind::Translate { fragment_index, .. } => {
            let class = request
                .descriptor
                .as_ref()
                .map_or_else(|| "Program".to_string(), |d| pascal_case(&d.artifact_name));
            let mut methods: Vec<String> = paragraphs(&request.text)
                .iter()
                .map(|p| pascal_case(p))
                .collect();
            if methods.is_empty() {
                methods.push(format!("Fragment{}", fragment_index + 1));
            }
            translation_reply(&csharp_class(&class, &methods))
        }
        RequestKind::DescribeStructure => {
            let name = program_id(&request.text).unwrap_or_else(|| "Program".to_string());
            let descriptor = StructuralDescriptor::empty(name.clone())
                .with_namespace(pascal_case(&name))
                .with_type(TypeDescriptor::named(pascal_case(&name), TypeKind::Class));
            descriptor_reply(&descriptor)
        }
        RequestKind::UpdateStructure { .. } => {
            let current = request.descriptor.clone().unwrap_or_default();
            let class = current
                .types
                .iter()
                .next()
                .map_or_else(|| pascal_case(&current.artifact_name), |t| t.name.clone());
            let mut ty = TypeDescriptor::named(class, TypeKind::Class);
            for method in METHOD.captures_iter(&request.text) {
                ty = ty.with_method(MethodDescriptor::new(&method[1], "void"));
            }
            descriptor_reply(&StructuralDescriptor::empty(current.artifact_name).with_type(ty))
        }
        RequestKind::FinalizeStructure => {
            descriptor_reply(&request.descriptor.clone().unwrap_or_default())
        }
        RequestKind::Normalize => format!(
            "```{}\n{}\n```",
            request.target_language.fence_tag(),
            request.text.trim_end()
        ),
    }
}

/// Translation payload around `code`
pub fn translation_reply(code: &str) -> String {
    json!({
        "convertedCode": code,
        "conversionNotes": "",
        "potentialIssues": [],
        "databaseUsed": false,
    })
    .to_string()
}

/// Descriptor reply as the service would send it
pub fn descriptor_reply(descriptor: &StructuralDescriptor) -> String {
    serde_json::to_string(descriptor).unwrap_or_default()
}

/// C# class with one empty-bodied method per name
pub fn csharp_class(class: &str, methods: &[String]) -> String {
    let mut code = format!("public class {class}\n{{\n");
    for method in methods {
        code.push_str(&format!(
            "    public void {method}()\n    {{\n        Console.WriteLine(\"{method}\");\n    }}\n"
        ));
    }
    code.push_str("}\n");
    code
}

/// `MAIN-PARA` -> `MainPara`
pub fn pascal_case(name: &str) -> String {
    name.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let lower = part.to_ascii_lowercase();
            let mut chars = lower.chars();
            chars
                .next()
                .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
                .unwrap_or_default()
        })
        .collect()
}

/// Paragraph labels in COBOL text, in order
pub fn paragraphs(text: &str) -> Vec<String> {
    PARAGRAPH
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

/// `PROGRAM-ID` of COBOL text
pub fn program_id(text: &str) -> Option<String> {
    PROGRAM_ID.captures(text).map(|c| c[1].to_string())
}

/// Small COBOL program with `paragraphs` paragraphs named `PARA-nnnn`
pub fn cobol_program(name: &str, paragraphs: usize) -> String {
    let mut lines = vec![
        "       IDENTIFICATION DIVISION.".to_string(),
        format!("       PROGRAM-ID. {name}."),
        "       DATA DIVISION.".to_string(),
        "       WORKING-STORAGE SECTION.".to_string(),
        "       01 WS-TOTAL PIC 9(7)V99 VALUE ZERO.".to_string(),
        "       PROCEDURE DIVISION.".to_string(),
    ];
    for p in 0..paragraphs {
        lines.push(format!("       PARA-{p:04}."));
        for s in 0..8 {
            lines.push(format!("           ADD {s} TO WS-TOTAL"));
        }
        lines.push(format!("           DISPLAY 'PARA-{p:04} DONE'."));
    }
    lines.push("           STOP RUN.".to_string());
    lines.join("\n")
}

/// COBOL program of at least `lines` lines
pub fn large_cobol_document(lines: usize) -> String {
    cobol_program("BIGPROG", lines / 10 + 1)
}

/// Log to the test harness, filtered by `RUST_LOG`
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
