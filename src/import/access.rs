//! Member keys and cross-reference records.
//!
//! Records only carry names and keys, never references to constructed units,
//! so a reference can be recorded before its target exists.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a member of a unit, disambiguating overloads by descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberKey {
    /// Fully qualified name of the declaring unit.
    pub owner: String,
    /// Member name (`<init>` for constructors, `<clinit>` for static initializers).
    pub name: String,
    /// JVM-style member descriptor.
    pub descriptor: String,
}

impl MemberKey {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Whether this key names a constructor.
    pub fn is_constructor(&self) -> bool {
        self.name == super::CONSTRUCTOR_NAME
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.owner, self.name, self.descriptor)
    }
}

/// Whether a field access reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldAccessType {
    Get,
    Set,
    #[default]
    Unknown,
}

impl fmt::Display for FieldAccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldAccessType::Get => write!(f, "get"),
            FieldAccessType::Set => write!(f, "set"),
            FieldAccessType::Unknown => write!(f, "access"),
        }
    }
}

/// The five storage categories for cross-references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessCategory {
    FieldAccess,
    MethodCall,
    ConstructorCall,
    MethodReference,
    ConstructorReference,
}

impl AccessCategory {
    pub const ALL: [AccessCategory; 5] = [
        AccessCategory::FieldAccess,
        AccessCategory::MethodCall,
        AccessCategory::ConstructorCall,
        AccessCategory::MethodReference,
        AccessCategory::ConstructorReference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessCategory::FieldAccess => "field_access",
            AccessCategory::MethodCall => "method_call",
            AccessCategory::ConstructorCall => "constructor_call",
            AccessCategory::MethodReference => "method_reference",
            AccessCategory::ConstructorReference => "constructor_reference",
        }
    }
}

impl fmt::Display for AccessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of a cross-reference; field accesses also carry their access type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    FieldAccess(FieldAccessType),
    MethodCall,
    ConstructorCall,
    MethodReference,
    ConstructorReference,
}

impl AccessKind {
    /// Build a kind from its category, using `access_type` for field accesses.
    pub fn from_category(category: AccessCategory, access_type: FieldAccessType) -> Self {
        match category {
            AccessCategory::FieldAccess => AccessKind::FieldAccess(access_type),
            AccessCategory::MethodCall => AccessKind::MethodCall,
            AccessCategory::ConstructorCall => AccessKind::ConstructorCall,
            AccessCategory::MethodReference => AccessKind::MethodReference,
            AccessCategory::ConstructorReference => AccessKind::ConstructorReference,
        }
    }

    pub fn category(&self) -> AccessCategory {
        match self {
            AccessKind::FieldAccess(_) => AccessCategory::FieldAccess,
            AccessKind::MethodCall => AccessCategory::MethodCall,
            AccessKind::ConstructorCall => AccessCategory::ConstructorCall,
            AccessKind::MethodReference => AccessCategory::MethodReference,
            AccessKind::ConstructorReference => AccessCategory::ConstructorReference,
        }
    }

    /// Verb used when describing the access in messages.
    pub fn verb(&self) -> &'static str {
        match self {
            AccessKind::FieldAccess(FieldAccessType::Get) => "gets",
            AccessKind::FieldAccess(FieldAccessType::Set) => "sets",
            AccessKind::FieldAccess(FieldAccessType::Unknown) => "accesses",
            AccessKind::MethodCall | AccessKind::ConstructorCall => "calls",
            AccessKind::MethodReference | AccessKind::ConstructorReference => "references",
        }
    }
}

/// Origin and target of a single cross-reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessRecord {
    /// The code unit the reference is made from.
    pub origin: MemberKey,
    /// The member being referenced.
    pub target: MemberKey,
    pub line_number: u32,
}

impl AccessRecord {
    pub fn new(origin: MemberKey, target: MemberKey, line_number: u32) -> Self {
        Self {
            origin,
            target,
            line_number,
        }
    }
}

/// A cross-reference of a specific kind, as stored by the fact store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CrossReference {
    pub kind: AccessKind,
    pub record: AccessRecord,
}

impl CrossReference {
    pub fn new(kind: AccessKind, record: AccessRecord) -> Self {
        Self { kind, record }
    }

    /// Human readable description, e.g. `<a.B.run:()V> calls <c.D.go:()V> in line 12`.
    pub fn description(&self) -> String {
        format!(
            "<{}> {} <{}> in line {}",
            self.record.origin,
            self.kind.verb(),
            self.record.target,
            self.record.line_number
        )
    }
}
