//! Structural merge for object-oriented targets
//!
//! Every fragment is tokenized into [`StructuralEvent`]s and the events are
//! folded into one [`MergedArtifact`]:
//!
//! - first namespace declaration wins, the descriptor supplies one otherwise
//! - imports, constants and fields are collected into sorted sets
//! - bodies of a type repeated across fragments are concatenated in
//!   fragment order
//! - methods sharing a signature collapse to the longer definition
//! - everything unclassified is kept, in order, at the end

use crate::artifact::{dedent, Member, MergedArtifact, TypeBody};
use crate::strategy::{check_inputs, merge_notes, MergeError, MergeOutcome, MergeStrategy};
use mig_artifact::{FragmentResult, Issue, IssueKind, StructuralDescriptor, TargetLanguage};
use mig_symbol::{mask_non_code, tokenize, MethodSignature, StructuralEvent};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Merge by structure, deduplicating methods by signature
#[derive(Debug, Clone, Default)]
pub struct StructuralMerge {
    target: TargetLanguage,
}

impl StructuralMerge {
    /// Structural merge emitting `target` syntax
    #[must_use]
    pub fn new(target: TargetLanguage) -> Self {
        Self { target }
    }

    /// Fold `results` into a [`MergedArtifact`], reporting collisions
    #[must_use]
    pub fn build(
        &self,
        results: &[FragmentResult],
        descriptor: &StructuralDescriptor,
    ) -> (MergedArtifact, Vec<Issue>) {
        let mut folder = Folder::new(self.target.clone());
        for result in results {
            folder.fragment(result);
        }
        folder.finish(descriptor)
    }
}

impl MergeStrategy for StructuralMerge {
    fn merge(
        &self,
        results: &[FragmentResult],
        descriptor: &StructuralDescriptor,
    ) -> Result<MergeOutcome, MergeError> {
        check_inputs(results)?;
        let (artifact, issues) = self.build(results, descriptor);
        let text = artifact.render();
        info!(
            "merged {} fragments into {} types, {} methods, {} residual blocks ({} chars)",
            results.len(),
            artifact.types.len(),
            artifact.method_count(),
            artifact.residual.len(),
            text.len()
        );
        Ok(MergeOutcome {
            text,
            artifact: Some(artifact),
            issues,
            notes: merge_notes(results),
            uses_storage: results.iter().any(|r| r.uses_storage),
        })
    }

    fn name(&self) -> &'static str {
        "structural"
    }
}

/// Accumulates events across fragments
struct Folder {
    artifact: MergedArtifact,
    field_names: BTreeSet<String>,
    constants: Vec<(String, String)>,
    functions: Vec<(MethodSignature, String)>,
    stray_closers: usize,
    issues: Vec<Issue>,
}

impl Folder {
    fn new(target: TargetLanguage) -> Self {
        Self {
            artifact: MergedArtifact::new(target),
            field_names: BTreeSet::new(),
            constants: Vec::new(),
            functions: Vec::new(),
            stray_closers: 0,
            issues: Vec::new(),
        }
    }

    fn fragment(&mut self, result: &FragmentResult) {
        let index = result.fragment_index;
        let events = tokenize(&result.translated_text);
        debug!("fragment {}: {} structural events", index + 1, events.len());

        for event in events {
            match event {
                StructuralEvent::Namespace { text, .. } => {
                    if self.artifact.namespace.is_none() {
                        self.artifact.namespace = Some(text);
                    }
                }
                StructuralEvent::Import { text } => {
                    self.artifact.imports.insert(text);
                }
                StructuralEvent::Constant { owner, name, text } => match owner {
                    Some(owner) => self.member(index, &owner, Member::Constant { name, text: dedent(&text) }),
                    None => self.constants.push((name, dedent(&text))),
                },
                StructuralEvent::Field { owner, name, text } => match owner {
                    Some(owner) => self.member(index, &owner, Member::Field { name, text: dedent(&text) }),
                    None => {
                        self.field_names.insert(name);
                        self.artifact.fields.insert(dedent(&text));
                    }
                },
                StructuralEvent::TypeOpen { name, kind, header } => {
                    let header = dedent(&header);
                    match self.artifact.types.get_mut(&name) {
                        // A later fragment may declare base types the first one omitted.
                        Some(body) if header.len() > body.header.len() => body.header = header,
                        Some(_) => {}
                        None => {
                            self.artifact
                                .types
                                .insert(name.clone(), TypeBody::new(name, kind, header));
                        }
                    }
                }
                StructuralEvent::TypeClose { .. } => {}
                StructuralEvent::Method { owner, signature, text } => {
                    let text = dedent(&text);
                    match owner {
                        Some(owner) => self.member(index, &owner, Member::Method { signature, text }),
                        None => self.function(index, signature, text),
                    }
                }
                StructuralEvent::Residual { owner, text } => {
                    let text = dedent(&text);
                    if is_only_closers(&text) {
                        self.stray_closers += 1;
                        continue;
                    }
                    match owner {
                        Some(owner) => self.member(index, &owner, Member::Residual { text }),
                        None => {
                            if !self.artifact.residual.contains(&text) {
                                self.artifact.residual.push(text);
                            }
                        }
                    }
                }
            }
        }
    }

    fn member(&mut self, fragment: usize, owner: &str, member: Member) {
        let Some(body) = self.artifact.types.get_mut(owner) else {
            return;
        };
        let existing = body.members.iter_mut().find(|m| same_member(m, &member));
        match existing {
            None => body.members.push(member),
            Some(kept) => {
                let (old_len, new_len) = (kept.text().len(), member.text().len());
                if old_len == new_len && kept.text() == member.text() {
                    return;
                }
                let label = member_label(&member);
                let detail = if new_len > old_len {
                    *kept = member;
                    format!("{owner}.{label}: kept later definition ({new_len} chars over {old_len})")
                } else {
                    format!("{owner}.{label}: kept earlier definition ({old_len} chars over {new_len})")
                };
                debug!("collision {detail}");
                self.issues
                    .push(Issue::for_fragment(IssueKind::MergeCollision, fragment, detail));
            }
        }
    }

    fn function(&mut self, fragment: usize, signature: MethodSignature, text: String) {
        match self.functions.iter_mut().find(|(s, _)| *s == signature) {
            None => self.functions.push((signature, text)),
            Some((_, kept)) if *kept == text => {}
            Some((_, kept)) => {
                let (old_len, new_len) = (kept.len(), text.len());
                let detail = if new_len > old_len {
                    *kept = text;
                    format!("{signature}: kept later definition ({new_len} chars over {old_len})")
                } else {
                    format!("{signature}: kept earlier definition ({old_len} chars over {new_len})")
                };
                self.issues
                    .push(Issue::for_fragment(IssueKind::MergeCollision, fragment, detail));
            }
        }
    }

    fn finish(mut self, descriptor: &StructuralDescriptor) -> (MergedArtifact, Vec<Issue>) {
        if self.artifact.namespace.is_none() {
            let name = descriptor
                .namespaces
                .iter()
                .next()
                .cloned()
                .unwrap_or_else(|| descriptor.artifact_name.clone());
            self.artifact.namespace = Some(self.artifact.target.namespace_declaration(&name));
        }

        // A name already classified as a plain field is not also a constant.
        for (name, text) in self.constants {
            if !self.field_names.contains(&name) {
                self.artifact.constants.insert(text);
            }
        }
        self.artifact.functions = self.functions.into_iter().map(|(_, text)| text).collect();

        if self.stray_closers > 0 {
            self.issues.push(Issue::new(
                IssueKind::MergeCollision,
                format!(
                    "dropped {} closing-brace blocks left over from fragment boundaries",
                    self.stray_closers
                ),
            ));
        }
        (self.artifact, self.issues)
    }
}

fn same_member(a: &Member, b: &Member) -> bool {
    match (a, b) {
        (Member::Method { signature: x, .. }, Member::Method { signature: y, .. }) => x == y,
        (Member::Field { name: x, .. }, Member::Field { name: y, .. })
        | (Member::Constant { name: x, .. }, Member::Constant { name: y, .. }) => x == y,
        (Member::Residual { text: x }, Member::Residual { text: y }) => x == y,
        _ => false,
    }
}

fn member_label(member: &Member) -> String {
    match member {
        Member::Method { signature, .. } => signature.to_string(),
        Member::Field { name, .. } | Member::Constant { name, .. } => name.clone(),
        Member::Residual { .. } => "block".to_string(),
    }
}

/// Text that is nothing but `}` (and comments or whitespace)
fn is_only_closers(text: &str) -> bool {
    let mask = mask_non_code(text);
    let mut code = mask.bytes().filter(|b| !b.is_ascii_whitespace()).peekable();
    code.peek().is_some() && code.all(|b| b == b'}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn merge(texts: &[&str]) -> MergeOutcome {
        let results: Vec<FragmentResult> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| FragmentResult::translated(i, *t))
            .collect();
        StructuralMerge::new(TargetLanguage::CSharp)
            .merge(&results, &StructuralDescriptor::empty("Payroll"))
            .unwrap()
    }

    #[test]
    fn repeated_type_bodies_are_concatenated() {
        let outcome = merge(&[
            "namespace Payroll;\nusing System;\npublic class Employee\n{\n    public void Hire() { }\n}\n",
            "using System.Linq;\npublic class Employee\n{\n    public void Fire() { }\n}\n",
        ]);
        let artifact = outcome.artifact.unwrap();
        assert_eq!(artifact.types.len(), 1);
        assert_eq!(artifact.method_count(), 2);
        assert_eq!(artifact.imports.len(), 2);
        let hire = outcome.text.find("Hire").unwrap();
        let fire = outcome.text.find("Fire").unwrap();
        assert!(hire < fire);
        assert_eq!(outcome.text.matches("public class Employee").count(), 1);
    }

    #[test]
    fn longer_method_wins() {
        let short = "public class Calc\n{\n    public int Foo(int a) { }\n}";
        let body = "x".repeat(150);
        let long = format!(
            "public class Calc\n{{\n    public int Foo(int value)\n    {{\n        // {body}\n        return value;\n    }}\n}}"
        );
        let outcome = merge(&[short, &long]);
        assert!(outcome.text.contains(&body));
        assert_eq!(outcome.text.matches("Foo(").count(), 1);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].kind, IssueKind::MergeCollision);
        assert_eq!(outcome.issues[0].fragment, Some(1));
    }

    #[test]
    fn earlier_longer_method_is_kept() {
        let outcome = merge(&[
            "class A\n{\n    void Run(string s) { Console.WriteLine(s); }\n}",
            "class A\n{\n    void Run(string t) { }\n}",
        ]);
        assert!(outcome.text.contains("Console.WriteLine(s)"));
        assert_eq!(outcome.text.matches("Run(").count(), 1);
    }

    #[test]
    fn overloads_are_distinct() {
        let outcome = merge(&["class A\n{\n    void F(int a) { }\n    void F(string a) { }\n}"]);
        assert_eq!(outcome.artifact.unwrap().method_count(), 2);
    }

    #[test]
    fn first_namespace_wins_and_descriptor_fills_gaps() {
        let outcome = merge(&["namespace First;\nclass A { }", "namespace Second;\nclass B { }"]);
        assert!(outcome.text.starts_with("namespace First;\n"));
        assert!(!outcome.text.contains("Second"));

        let fallback = merge(&["class A { }"]);
        assert!(fallback.text.starts_with("namespace Payroll;\n"));
    }

    #[test]
    fn constants_and_fields_are_sorted_sets() {
        let outcome = merge(&[
            "const int MAX_RATE = 9;\nstatic int total = 0;\n",
            "static int total = 0;\nconst int MIN_RATE = 1;\n",
        ]);
        let artifact = outcome.artifact.unwrap();
        assert_eq!(
            artifact.constants.iter().cloned().collect::<Vec<_>>(),
            vec!["const int MAX_RATE = 9;".to_string(), "const int MIN_RATE = 1;".to_string()]
        );
        assert_eq!(artifact.fields.len(), 1);
    }

    #[test]
    fn residual_text_is_kept_at_the_end() {
        let outcome = merge(&[
            "class A { }\nConsole.WriteLine(\"orphan\");\n",
            "// [fragment 2 could not be converted: timeout]",
        ]);
        let residual = outcome.text.find("Unclassified").unwrap();
        assert!(outcome.text[residual..].contains("orphan"));
        assert!(outcome.text[residual..].contains("fragment 2 could not be converted"));
    }

    #[test]
    fn free_functions_follow_types() {
        let outcome = merge(&[
            "class A { }\npublic static int Helper(int x) { return x; }\n",
        ]);
        let ty = outcome.text.find("class A").unwrap();
        let func = outcome.text.find("Helper").unwrap();
        assert!(ty < func);
        assert!(outcome.text.contains("// Functions"));
    }

    #[test]
    fn dangling_closer_from_split_class_is_dropped() {
        let outcome = merge(&[
            "public class Report\n{\n    public void Head() { }\n",
            "    public void Tail() { }\n}\n",
        ]);
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.detail.contains("closing-brace")));
        assert!(mig_symbol::DelimiterBalance::of(&outcome.text).is_balanced());
    }

    #[test]
    fn storage_flag_and_notes_are_combined() {
        let results = vec![
            FragmentResult::translated(0, "class A { }").with_notes("n1"),
            FragmentResult::translated(1, "class B { }").with_storage(true),
        ];
        let outcome = StructuralMerge::new(TargetLanguage::CSharp)
            .merge(&results, &StructuralDescriptor::default())
            .unwrap();
        assert!(outcome.uses_storage);
        assert!(outcome.notes.contains("Fragment 1: n1"));
    }
}
