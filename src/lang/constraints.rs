//! Forbidden-dependency constraints.
//!
//! A constraint forbids scanned units whose name matches `from` to depend on
//! units whose name matches `to`. Patterns are globs over fully qualified
//! names, so `com.example.domain.*` covers the package and its subpackages.

use globset::{Glob, GlobMatcher};
use serde::Serialize;
use tracing::debug;

use super::events::{ConditionEvent, ConditionEvents, EventObject};
use crate::config::ConstraintConfig;
use crate::graph::{Dependency, DependencyKind, UnitGraph};
use crate::import::UnitOrigin;

#[derive(Debug, Clone)]
pub struct ForbiddenDependency {
    pub name: String,
    pub from: String,
    pub to: String,
    pub description: Option<String>,
    origins: GlobMatcher,
    targets: GlobMatcher,
}

impl ForbiddenDependency {
    pub fn new(name: impl Into<String>, from: &str, to: &str) -> Result<Self, globset::Error> {
        Ok(Self {
            name: name.into(),
            from: from.to_string(),
            to: to.to_string(),
            description: None,
            origins: Glob::new(from)?.compile_matcher(),
            targets: Glob::new(to)?.compile_matcher(),
        })
    }

    pub fn from_config(config: &ConstraintConfig) -> Result<Self, globset::Error> {
        let mut constraint = Self::new(&config.name, &config.from, &config.to)?;
        constraint.description = config.description.clone();
        Ok(constraint)
    }

    pub fn applies_to(&self, name: &str) -> bool {
        self.origins.is_match(name)
    }

    pub fn forbids(&self, name: &str) -> bool {
        self.targets.is_match(name)
    }
}

/// Events of one evaluated constraint.
#[derive(Debug, Clone, Serialize)]
pub struct ConstraintResult {
    pub name: String,
    pub description: Option<String>,
    pub events: ConditionEvents,
}

impl ConstraintResult {
    pub fn is_violated(&self) -> bool {
        self.events.contain_violation()
    }
}

fn event_objects(dependency: &Dependency, origin_name: &str) -> Vec<EventObject> {
    match (&dependency.kind, &dependency.member, &dependency.target_member) {
        (DependencyKind::Access(_), Some(origin), Some(target)) => vec![EventObject::Access {
            origin: origin.clone(),
            target: target.clone(),
            line_number: dependency.line_number.unwrap_or(0),
        }],
        (_, Some(member), _) => vec![EventObject::Member {
            key: member.clone(),
        }],
        _ => vec![EventObject::unit(origin_name)],
    }
}

/// Check every scanned unit against every constraint.
pub fn evaluate(graph: &UnitGraph, constraints: &[ForbiddenDependency]) -> Vec<ConstraintResult> {
    constraints
        .iter()
        .map(|constraint| evaluate_one(graph, constraint))
        .collect()
}

fn evaluate_one(graph: &UnitGraph, constraint: &ForbiddenDependency) -> ConstraintResult {
    let mut events = ConditionEvents::new();
    let mut violations = 0usize;

    for unit in graph.units_by_origin(UnitOrigin::Scanned) {
        if !constraint.applies_to(&unit.name) {
            continue;
        }
        let mut violated = false;
        for dependency in graph.dependencies_from(unit.id) {
            if !constraint.forbids(graph.name_of(dependency.target)) {
                continue;
            }
            violated = true;
            violations += 1;
            events.add(ConditionEvent::violated(
                event_objects(&dependency, &unit.name),
                dependency.description.clone(),
            ));
        }
        if !violated {
            events.add(ConditionEvent::satisfied(
                vec![EventObject::unit(&unit.name)],
                format!("Class <{}> does not depend on {}", unit.name, constraint.to),
            ));
        }
    }

    if violations > 0 {
        let noun = if violations == 1 { "time" } else { "times" };
        events.set_information_about_number_of_violations(format!("{} {}", violations, noun));
    }
    debug!(constraint = %constraint.name, violations, "evaluated constraint");

    ConstraintResult {
        name: constraint.name.clone(),
        description: constraint.description.clone(),
        events,
    }
}
