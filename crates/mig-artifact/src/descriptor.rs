//! Structural descriptor of the emerging target architecture
//!
//! The descriptor is a versioned value. Every update produces a new version
//! through [`StructuralDescriptor::absorb`], which only ever adds:
//! - namespaces are a set
//! - types are unique by name; repeated types merge their members
//! - methods are unique by `name(paramType,...)`, fields by name
//! - patterns keep first-seen order
//!
//! Deserialization accepts the blueprint vocabulary the transformation
//! service speaks (`project_name`, `classes`, `access_modifier`,
//! `database_access`, ...), so a service reply can be read directly.

use im::{OrdSet, Vector};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Artifact name used until the service proposes a better one
pub const DEFAULT_ARTIFACT_NAME: &str = "ConvertedProject";

/// Versioned description of namespaces, types and members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralDescriptor {
    /// Incremented on every absorb
    #[serde(default)]
    pub version: u64,
    /// Name of the produced artifact (project)
    #[serde(
        default = "default_artifact_name",
        alias = "project_name",
        alias = "projectName",
        deserialize_with = "lenient::string"
    )]
    pub artifact_name: String,
    /// Namespace names
    #[serde(default, deserialize_with = "lenient::string_set")]
    pub namespaces: OrdSet<String>,
    /// Types in first-recorded order, unique by name
    #[serde(default, alias = "classes")]
    pub types: Vector<TypeDescriptor>,
    /// Whether the converted code talks to persistent storage
    #[serde(
        default,
        alias = "database_access",
        alias = "databaseUsed",
        deserialize_with = "lenient::flag"
    )]
    pub uses_storage: bool,
    /// Recognized design patterns
    #[serde(default, deserialize_with = "lenient::string_vector")]
    pub patterns: Vector<String>,
    /// Free-text error-handling approach
    #[serde(default, alias = "exceptionStrategy", deserialize_with = "lenient::opt_string")]
    pub exception_strategy: Option<String>,
}

fn default_artifact_name() -> String {
    DEFAULT_ARTIFACT_NAME.to_string()
}

impl Default for StructuralDescriptor {
    fn default() -> Self {
        Self::empty(DEFAULT_ARTIFACT_NAME)
    }
}

impl StructuralDescriptor {
    /// Version-0 descriptor with nothing recorded
    #[must_use]
    pub fn empty(artifact_name: impl Into<String>) -> Self {
        Self {
            version: 0,
            artifact_name: artifact_name.into(),
            namespaces: OrdSet::new(),
            types: Vector::new(),
            uses_storage: false,
            patterns: Vector::new(),
            exception_strategy: None,
        }
    }

    /// Set the storage flag
    #[inline]
    #[must_use]
    pub fn with_storage(mut self, uses_storage: bool) -> Self {
        self.uses_storage = uses_storage;
        self
    }

    /// Add a type (merging if already present)
    #[must_use]
    pub fn with_type(mut self, ty: TypeDescriptor) -> Self {
        self.upsert_type(&ty);
        self
    }

    /// Add a namespace
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespaces.insert(namespace.into());
        self
    }

    /// Merge `incoming` into a new version of this descriptor
    ///
    /// The result is always a superset of `self`: nothing recorded is
    /// removed or overwritten, and absorbing the same content twice adds
    /// nothing the second time.
    #[must_use]
    pub fn absorb(&self, incoming: &StructuralDescriptor) -> StructuralDescriptor {
        let mut next = self.clone();
        next.version = self.version + 1;

        let current = next.artifact_name.trim();
        let proposed = incoming.artifact_name.trim();
        if (current.is_empty() || current == DEFAULT_ARTIFACT_NAME)
            && !proposed.is_empty()
            && proposed != DEFAULT_ARTIFACT_NAME
        {
            next.artifact_name = proposed.to_string();
        }

        for ns in &incoming.namespaces {
            if !ns.trim().is_empty() {
                next.namespaces.insert(ns.trim().to_string());
            }
        }
        for ty in &incoming.types {
            next.upsert_type(ty);
        }
        next.uses_storage |= incoming.uses_storage;
        for pattern in &incoming.patterns {
            if !next.patterns.contains(pattern) {
                next.patterns.push_back(pattern.clone());
            }
        }
        if next.exception_strategy.is_none() {
            next.exception_strategy.clone_from(&incoming.exception_strategy);
        }
        next
    }

    fn upsert_type(&mut self, ty: &TypeDescriptor) {
        let name = ty.name.trim();
        if name.is_empty() {
            return;
        }
        match self.types.iter().position(|t| t.name == name) {
            Some(idx) => {
                let merged = self.types[idx].merged_with(ty);
                self.types.set(idx, merged);
            }
            None => {
                let fresh = TypeDescriptor {
                    name: name.to_string(),
                    kind: ty.kind,
                    visibility: ty.visibility.clone(),
                    base_types: Vec::new(),
                    contracts: Vec::new(),
                    methods: Vec::new(),
                    fields: Vec::new(),
                }
                .merged_with(ty);
                self.types.push_back(fresh);
            }
        }
    }

    /// Look up a type by name
    #[must_use]
    pub fn find_type(&self, name: &str) -> Option<&TypeDescriptor> {
        let name = name.trim();
        self.types.iter().find(|t| t.name == name)
    }

    /// Names of all recorded types
    #[must_use]
    pub fn type_names(&self) -> BTreeSet<String> {
        self.types.iter().map(|t| t.name.clone()).collect()
    }

    /// Names of all recorded methods and fields, across types
    #[must_use]
    pub fn member_names(&self) -> BTreeSet<String> {
        self.types
            .iter()
            .flat_map(|t| {
                t.methods
                    .iter()
                    .map(|m| m.name.clone())
                    .chain(t.fields.iter().map(|f| f.name.clone()))
            })
            .filter(|n| !n.is_empty())
            .collect()
    }

    /// Type and member names together
    #[must_use]
    pub fn recorded_names(&self) -> BTreeSet<String> {
        let mut names = self.type_names();
        names.extend(self.member_names());
        names
    }

    /// True when everything recorded in `other` is also recorded here
    #[must_use]
    pub fn is_superset_of(&self, other: &StructuralDescriptor) -> bool {
        // Compared the way `absorb` records them: trimmed, blanks ignored.
        let namespaces_kept = other
            .namespaces
            .iter()
            .map(|ns| ns.trim())
            .filter(|ns| !ns.is_empty())
            .all(|ns| self.namespaces.iter().any(|ours| ours == ns));
        if !namespaces_kept {
            return false;
        }
        if other.uses_storage && !self.uses_storage {
            return false;
        }
        if !other.patterns.iter().all(|p| self.patterns.contains(p)) {
            return false;
        }
        other
            .types
            .iter()
            .filter(|theirs| !theirs.name.trim().is_empty())
            .all(|theirs| {
                self.find_type(&theirs.name).is_some_and(|ours| {
                    theirs
                        .methods
                        .iter()
                        .filter(|m| !m.name.is_empty())
                        .all(|m| ours.methods.iter().any(|o| o.key() == m.key()))
                        && theirs
                            .fields
                            .iter()
                            .filter(|f| !f.name.is_empty())
                            .all(|f| ours.fields.iter().any(|o| o.name == f.name))
                })
            })
    }

    /// Pretty JSON rendering, as sent to the transformation service
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Kind of a recorded type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// Class (also used for unrecognized kinds)
    #[default]
    Class,
    /// Interface / contract
    Interface,
    /// Enumeration
    Enum,
    /// Value type
    Struct,
    /// Record type
    Record,
}

impl TypeKind {
    /// Parse a keyword, case-insensitively; unknown keywords are classes
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "interface" => Self::Interface,
            "enum" => Self::Enum,
            "struct" => Self::Struct,
            "record" => Self::Record,
            _ => Self::Class,
        }
    }
}

impl<'de> Deserialize<'de> for TypeKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = lenient::string(deserializer)?;
        Ok(Self::from_keyword(&raw))
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Struct => "struct",
            Self::Record => "record",
        };
        f.write_str(word)
    }
}

/// A recorded type and its members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, alias = "type")]
    pub kind: TypeKind,
    #[serde(default, alias = "access_modifier", deserialize_with = "lenient::string")]
    pub visibility: String,
    #[serde(default, alias = "inherits", deserialize_with = "lenient::string_list")]
    pub base_types: Vec<String>,
    #[serde(default, alias = "implements", deserialize_with = "lenient::string_list")]
    pub contracts: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Public type with no members
    #[must_use]
    pub fn named(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            visibility: "public".to_string(),
            base_types: Vec::new(),
            contracts: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Add a method
    #[inline]
    #[must_use]
    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a field
    #[inline]
    #[must_use]
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Union of two descriptions of the same type; `self` wins on scalars
    #[must_use]
    pub fn merged_with(&self, other: &TypeDescriptor) -> TypeDescriptor {
        let mut out = self.clone();
        if out.visibility.trim().is_empty() {
            out.visibility.clone_from(&other.visibility);
        }
        push_unique(&mut out.base_types, &other.base_types);
        push_unique(&mut out.contracts, &other.contracts);
        for method in &other.methods {
            if !method.name.is_empty() && !out.methods.iter().any(|m| m.key() == method.key()) {
                out.methods.push(method.clone());
            }
        }
        for field in &other.fields {
            if !field.name.is_empty() && !out.fields.iter().any(|f| f.name == field.name) {
                out.fields.push(field.clone());
            }
        }
        out
    }
}

fn push_unique(into: &mut Vec<String>, from: &[String]) {
    for item in from {
        let item = item.trim();
        if !item.is_empty() && !into.iter().any(|x| x == item) {
            into.push(item.to_string());
        }
    }
}

/// A recorded method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, alias = "returnType", deserialize_with = "lenient::string")]
    pub return_type: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    #[serde(default, alias = "access_modifier", deserialize_with = "lenient::string")]
    pub visibility: String,
}

impl MethodDescriptor {
    /// Public method
    #[must_use]
    pub fn new(name: impl Into<String>, return_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_type: return_type.into(),
            parameters: Vec::new(),
            visibility: "public".to_string(),
        }
    }

    /// Add a parameter
    #[inline]
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.parameters.push(ParameterDescriptor {
            name: name.into(),
            ty: ty.into(),
        });
        self
    }

    /// Identity of the method: `name(paramType,...)`
    #[must_use]
    pub fn key(&self) -> String {
        let types: Vec<&str> = self.parameters.iter().map(|p| p.ty.trim()).collect();
        format!("{}({})", self.name, types.join(","))
    }
}

/// A method parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, rename = "type", deserialize_with = "lenient::string")]
    pub ty: String,
}

/// A recorded field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, rename = "type", deserialize_with = "lenient::string")]
    pub ty: String,
    #[serde(default, alias = "access_modifier", deserialize_with = "lenient::string")]
    pub visibility: String,
}

impl FieldDescriptor {
    /// Private field
    #[must_use]
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            visibility: "private".to_string(),
        }
    }
}

/// Tolerant readers for service-produced JSON (nulls, scalars for lists)
mod lenient {
    use im::{OrdSet, Vector};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn flatten(value: Value) -> Vec<String> {
        match value {
            Value::Null => Vec::new(),
            Value::String(s) => vec![s],
            Value::Array(items) => items.into_iter().flat_map(flatten).collect(),
            Value::Object(map) => map
                .get("name")
                .and_then(Value::as_str)
                .map(|s| vec![s.to_string()])
                .unwrap_or_default(),
            other => vec![other.to_string()],
        }
    }

    pub(super) fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    pub(super) fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let s = string(d)?;
        Ok((!s.trim().is_empty()).then_some(s))
    }

    pub(super) fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => b,
            Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
            Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
            _ => false,
        })
    }

    pub(super) fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(flatten(Value::deserialize(d)?)
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    pub(super) fn string_vector<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Vector<String>, D::Error> {
        let mut out = Vector::new();
        for item in string_list(d)? {
            if !out.contains(&item) {
                out.push_back(item);
            }
        }
        Ok(out)
    }

    pub(super) fn string_set<'de, D: Deserializer<'de>>(d: D) -> Result<OrdSet<String>, D::Error> {
        Ok(string_list(d)?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn customer() -> TypeDescriptor {
        TypeDescriptor::named("Customer", TypeKind::Class)
            .with_method(MethodDescriptor::new("Load", "void").with_parameter("id", "int"))
            .with_field(FieldDescriptor::new("_name", "string"))
    }

    #[test]
    fn absorb_adds_and_bumps_version() {
        let base = StructuralDescriptor::empty("Payroll").with_type(customer());
        let incoming = StructuralDescriptor::empty("Payroll")
            .with_namespace("Payroll.Domain")
            .with_type(
                TypeDescriptor::named("Customer", TypeKind::Class)
                    .with_method(MethodDescriptor::new("Save", "void")),
            );
        let next = base.absorb(&incoming);
        assert_eq!(next.version, 1);
        assert!(next.is_superset_of(&base));
        assert!(next.is_superset_of(&incoming));
        let ty = next.find_type("Customer").unwrap();
        assert_eq!(ty.methods.len(), 2);
    }

    #[test]
    fn padded_names_are_recorded_and_still_covered() {
        let incoming = StructuralDescriptor::empty("Payroll")
            .with_namespace(" Payroll.Core ")
            .with_type(
                TypeDescriptor::named(" Ledger ", TypeKind::Class)
                    .with_method(MethodDescriptor::new("Post", "void")),
            );
        let next = StructuralDescriptor::empty("Payroll").absorb(&incoming);
        assert_eq!(next.type_names().into_iter().collect::<Vec<_>>(), vec!["Ledger"]);
        assert!(next.find_type(" Ledger ").is_some());
        assert!(next.is_superset_of(&incoming));
    }

    #[test]
    fn absorb_is_idempotent_for_recorded_members() {
        let base = StructuralDescriptor::empty("Payroll").with_type(customer());
        let once = base.absorb(&base);
        assert_eq!(once.types, base.types);
        assert_eq!(once.find_type("Customer").unwrap().methods.len(), 1);
    }

    #[test]
    fn absorb_never_overwrites_name() {
        let base = StructuralDescriptor::empty("Payroll");
        let next = base.absorb(&StructuralDescriptor::empty("Other"));
        assert_eq!(next.artifact_name, "Payroll");

        let unnamed = StructuralDescriptor::default();
        let named = unnamed.absorb(&StructuralDescriptor::empty("Ledger"));
        assert_eq!(named.artifact_name, "Ledger");
    }

    #[test]
    fn reads_blueprint_vocabulary() {
        let json = r#"{
            "project_name": "AccountSystem",
            "namespaces": ["AccountSystem.Models", null],
            "classes": [{
                "name": "Account",
                "access_modifier": "public",
                "type": "Class",
                "inherits": "EntityBase",
                "implements": ["IAuditable"],
                "methods": [{"name": "Post", "return_type": "void",
                             "parameters": [{"name": "amount", "type": "decimal"}],
                             "access_modifier": "public"}],
                "fields": [{"name": "_balance", "type": "decimal", "access_modifier": "private"}]
            }],
            "database_access": true,
            "patterns": ["Repository"],
            "exception_strategy": null
        }"#;
        let d: StructuralDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d.artifact_name, "AccountSystem");
        assert_eq!(d.namespaces.len(), 1);
        assert!(d.uses_storage);
        let account = d.find_type("Account").unwrap();
        assert_eq!(account.base_types, vec!["EntityBase".to_string()]);
        assert_eq!(account.methods[0].key(), "Post(decimal)");
        assert_eq!(d.exception_strategy, None);
    }

    #[test]
    fn recorded_names_cover_types_and_members() {
        let d = StructuralDescriptor::empty("P").with_type(customer());
        let names = d.recorded_names();
        assert!(names.contains("Customer"));
        assert!(names.contains("Load"));
        assert!(names.contains("_name"));
    }

    fn arb_type() -> impl Strategy<Value = TypeDescriptor> {
        (
            prop::sample::select(vec!["Account", "Ledger", "Customer", "Report"]),
            prop::collection::vec(prop::sample::select(vec!["Open", "Close", "Post"]), 0..3),
            prop::collection::vec(prop::sample::select(vec!["_id", "_total"]), 0..2),
        )
            .prop_map(|(name, methods, fields)| {
                let mut ty = TypeDescriptor::named(name, TypeKind::Class);
                for m in methods {
                    ty = ty.with_method(MethodDescriptor::new(m, "void"));
                }
                for f in fields {
                    ty = ty.with_field(FieldDescriptor::new(f, "int"));
                }
                ty
            })
    }

    fn arb_descriptor() -> impl Strategy<Value = StructuralDescriptor> {
        (
            prop::collection::vec(arb_type(), 0..4),
            prop::collection::vec(prop::sample::select(vec!["App", "App.Data"]), 0..2),
            any::<bool>(),
        )
            .prop_map(|(types, namespaces, storage)| {
                let mut d = StructuralDescriptor::empty("App").with_storage(storage);
                for ns in namespaces {
                    d = d.with_namespace(ns);
                }
                for ty in types {
                    d = d.with_type(ty);
                }
                d
            })
    }

    proptest! {
        #[test]
        fn absorb_is_monotonic(steps in prop::collection::vec(arb_descriptor(), 1..6)) {
            let mut current = StructuralDescriptor::empty("App");
            for step in &steps {
                let next = current.absorb(step);
                prop_assert!(next.is_superset_of(&current));
                prop_assert!(next.version > current.version);
                let names = next.type_names();
                prop_assert_eq!(names.len(), next.types.len());
                current = next;
            }
        }
    }
}
