//! Import of decoded units into a name-keyed model.
//!
//! An import session accumulates facts in an `ImportRecord`, resolves every
//! referenced unit name through a `DependencyResolutionProcess`, then freezes
//! the record for assembly.

mod access;
mod builders;
pub mod descriptor;
mod error;
pub mod manifest;
mod record;
mod registry;
mod resolution;
mod session;

pub use access::{
    AccessCategory, AccessKind, AccessRecord, CrossReference, FieldAccessType, MemberKey,
};
pub use builders::{
    AnnotationBuilder, AnnotationValue, ConstructorBuilder, FieldBuilder, MemberBuilder,
    MethodBuilder, Modifier, ParameterizedTypeBuilder, StaticInitializerBuilder, TypeArgument,
    TypeParameterBuilder, TypeParametersBuilder, UnitHeader, UnitKind, UnitOrigin,
    CONSTRUCTOR_NAME, NO_TYPE_PARAMETERS, STATIC_INITIALIZER_DESCRIPTOR, STATIC_INITIALIZER_NAME,
};
pub use error::ImportError;
pub use manifest::{record_unit_facts, FactManifest, UnitFacts};
pub use record::{FrozenRecord, ImportRecord};
pub use registry::{ClasspathIndex, NoSource, UnitMaterializer, UnitSource};
pub use resolution::{
    DependencyCategory, DependencyResolutionProcess, Presence, ResolutionLimits, ResolutionRun,
    ResolutionSummary, UnitRegistry,
};
pub use session::ImportSession;
