//! Property tests for the structural merge

use mig_artifact::{FragmentResult, StructuralDescriptor, TargetLanguage};
use mig_composition::{MergeStrategy, StructuralMerge};
use proptest::prelude::*;

fn method(name: &str, param: &str, body_len: usize) -> String {
    format!(
        "    public void {name}({param} v)\n    {{\n        // {}\n    }}\n",
        "b".repeat(body_len)
    )
}

fn fragment_strategy() -> impl Strategy<Value = String> {
    let names = prop::sample::select(vec!["Open", "Close", "Post", "Audit"]);
    let params = prop::sample::select(vec!["int", "string", "decimal"]);
    let classes = prop::sample::select(vec!["Account", "Ledger", "Batch"]);
    let imports = prop::sample::subsequence(
        vec!["using System;", "using System.IO;", "using System.Linq;"],
        0..=3,
    );
    (
        classes,
        prop::collection::vec((names, params, 0usize..40), 1..4),
        imports,
    )
        .prop_map(|(class, methods, imports)| {
            let mut text = imports.join("\n");
            text.push_str(&format!("\npublic class {class}\n{{\n"));
            for (name, param, len) in methods {
                text.push_str(&method(name, param, len));
            }
            text.push_str("}\n");
            text
        })
}

fn results(texts: &[String]) -> Vec<FragmentResult> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| FragmentResult::translated(i, t.clone()))
        .collect()
}

proptest! {
    #[test]
    fn merge_is_deterministic(texts in prop::collection::vec(fragment_strategy(), 1..5)) {
        let merge = StructuralMerge::new(TargetLanguage::CSharp);
        let descriptor = StructuralDescriptor::default();
        let first = merge.merge(&results(&texts), &descriptor).unwrap();
        let second = merge.merge(&results(&texts), &descriptor).unwrap();
        prop_assert_eq!(first.text, second.text);
    }

    #[test]
    fn each_signature_appears_once_per_type(texts in prop::collection::vec(fragment_strategy(), 1..5)) {
        let outcome = StructuralMerge::new(TargetLanguage::CSharp)
            .merge(&results(&texts), &StructuralDescriptor::default())
            .unwrap();
        let artifact = outcome.artifact.unwrap();
        for body in artifact.types.values() {
            let mut seen = std::collections::BTreeSet::new();
            for member in &body.members {
                if let mig_composition::Member::Method { signature, .. } = member {
                    prop_assert!(seen.insert(signature.to_string()), "duplicate {}", signature);
                }
            }
        }
    }

    #[test]
    fn imports_render_sorted(texts in prop::collection::vec(fragment_strategy(), 1..5)) {
        let outcome = StructuralMerge::new(TargetLanguage::CSharp)
            .merge(&results(&texts), &StructuralDescriptor::default())
            .unwrap();
        let imports: Vec<&str> = outcome.text.lines().filter(|l| l.starts_with("using ")).collect();
        let mut sorted = imports.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(imports, sorted);
    }
}

#[test]
fn two_hundred_char_definition_survives_once() {
    let short = "public class Calc\n{\n    int Foo(int a) { }\n}\n".to_string();
    let long_body = format!("    int Foo(int a)\n    {{\n        return a * {};\n    }}\n", "7".repeat(150));
    assert!(long_body.trim().len() >= 150);
    let long = format!("public class Calc\n{{\n{long_body}}}\n");

    for order in [vec![short.clone(), long.clone()], vec![long.clone(), short.clone()]] {
        let outcome = StructuralMerge::new(TargetLanguage::CSharp)
            .merge(&results(&order), &StructuralDescriptor::default())
            .unwrap();
        assert_eq!(outcome.text.matches("int Foo(int a)").count(), 1);
        assert!(outcome.text.contains(&"7".repeat(150)));
    }
}
