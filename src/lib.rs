//! Archgraph - static model of compiled class units.
//!
//! Archgraph builds a graph of class-like units from the facts a class-file
//! decoder extracts (supertypes, members, annotations, cross-references) and
//! checks dependency constraints against it.
//!
//! # Architecture
//!
//! Import is split in two phases so cyclic class graphs never need direct
//! object links while facts accumulate:
//!
//! - `import`: name-keyed fact store, dependency resolution and the import session
//! - `graph`: assembly of the frozen facts into an arena indexed by `UnitId`
//! - `lang`: condition events and forbidden-dependency constraints
//! - `config`: YAML config schema definitions
//! - `report`: Output formatting (pretty, JSON)

pub mod cli;
pub mod config;
pub mod graph;
pub mod import;
pub mod lang;
pub mod report;

pub use config::Config;
pub use graph::{assemble, Unit, UnitGraph, UnitId};
pub use import::{
    DependencyResolutionProcess, FrozenRecord, ImportError, ImportRecord, ImportSession,
    ResolutionLimits, UnitRegistry,
};
pub use lang::{ConditionEvents, ForbiddenDependency};
