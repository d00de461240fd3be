//! Rule evaluation over an assembled unit graph.

pub mod constraints;
pub mod events;

pub use constraints::{evaluate, ConstraintResult, ForbiddenDependency};
pub use events::{
    ConditionEvent, ConditionEvents, EventObject, FailureMessages, ObjectKind, ViolationHandler,
};
