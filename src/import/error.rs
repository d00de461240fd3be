//! Errors raised while accumulating facts.

use std::path::PathBuf;
use thiserror::Error;

use super::MemberKey;

/// Errors that can occur during an import session.
///
/// The first four variants signal a broken internal invariant (most likely a
/// decoder bug) and abort the session.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("attempted to add {attempted} as a second superclass to {owner} (already {existing}), this is most likely a bug")]
    DuplicateSuperclass {
        owner: String,
        existing: String,
        attempted: String,
    },
    #[error("tried to add a second static initializer to {owner}, this is most likely a bug")]
    DuplicateStaticInitializer { owner: String },
    #[error("can't register {attempted} as enclosing unit of {inner}, already enclosed by {existing}")]
    ConflictingEnclosingUnit {
        inner: String,
        existing: String,
        attempted: String,
    },
    #[error("can't register {attempted} as enclosing member of {inner}, already enclosed by {existing}")]
    ConflictingEnclosingMember {
        inner: String,
        existing: MemberKey,
        attempted: MemberKey,
    },
    #[error("invalid descriptor for {member}")]
    InvalidDescriptor { member: MemberKey },
    #[error("invalid fact manifest {}: {message}", .path.display())]
    Manifest { path: PathBuf, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    /// Whether this error reports a violated single-value invariant.
    pub fn is_internal_consistency(&self) -> bool {
        matches!(
            self,
            ImportError::DuplicateSuperclass { .. }
                | ImportError::DuplicateStaticInitializer { .. }
                | ImportError::ConflictingEnclosingUnit { .. }
                | ImportError::ConflictingEnclosingMember { .. }
        )
    }
}
