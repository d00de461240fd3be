//! Output formatting for archgraph results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::graph::UnitGraph;
use crate::import::{AccessCategory, ResolutionSummary, UnitOrigin};
use crate::lang::{ConstraintResult, EventObject, ObjectKind, ViolationHandler};

/// Shape of an imported model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub manifests: usize,
    pub units: usize,
    pub units_by_origin: BTreeMap<&'static str, usize>,
    pub resolution_passes: u32,
    pub materialized: usize,
    pub cross_references: BTreeMap<&'static str, usize>,
}

impl ModelSummary {
    pub fn new(graph: &UnitGraph, resolution: &ResolutionSummary, manifests: usize) -> Self {
        let units_by_origin = UnitOrigin::ALL
            .iter()
            .map(|origin| (origin.as_str(), graph.units_by_origin(*origin).count()))
            .collect();
        let mut cross_references: BTreeMap<&'static str, usize> = AccessCategory::ALL
            .iter()
            .map(|category| (category.as_str(), 0))
            .collect();
        for access in graph.accesses() {
            *cross_references.entry(access.kind.category().as_str()).or_default() += 1;
        }
        Self {
            manifests,
            units: graph.len(),
            units_by_origin,
            resolution_passes: resolution.passes,
            materialized: resolution.materialized.len(),
            cross_references,
        }
    }
}

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub version: String,
    pub path: String,
    pub config: String,
    pub passed: bool,
    pub summary: &'a ModelSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<JsonConstraint>,
}

#[derive(Serialize)]
pub struct JsonConstraint {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub passed: bool,
    pub checked: usize,
    pub violations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub information: Option<String>,
    pub messages: Vec<String>,
}

fn constraint_to_json(result: &ConstraintResult) -> JsonConstraint {
    let failures = result.events.failure_messages();
    JsonConstraint {
        name: result.name.clone(),
        description: result.description.clone(),
        passed: !result.is_violated(),
        checked: result.events.iter().count(),
        violations: result.events.violating().count(),
        information: failures.information_about_number_of_violations,
        messages: failures.messages,
    }
}

/// Write results in JSON format.
pub fn write_json(
    path: &str,
    config_path: &str,
    summary: &ModelSummary,
    results: &[ConstraintResult],
) -> anyhow::Result<()> {
    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        config: config_path.to_string(),
        passed: results.iter().all(|r| !r.is_violated()),
        summary,
        constraints: results.iter().map(constraint_to_json).collect(),
    };

    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Counts violations whose objects are all of one kind.
struct KindTally {
    kind: ObjectKind,
    count: usize,
}

impl ViolationHandler for KindTally {
    fn accepted_kind(&self) -> Option<ObjectKind> {
        Some(self.kind)
    }

    fn handle(&mut self, _objects: &[EventObject], _message: &str) {
        self.count += 1;
    }
}

fn tally_by_kind(result: &ConstraintResult) -> Vec<(ObjectKind, usize)> {
    [ObjectKind::Unit, ObjectKind::Member, ObjectKind::Access]
        .into_iter()
        .map(|kind| {
            let mut tally = KindTally { kind, count: 0 };
            result.events.handle_violations(&mut tally);
            (kind, tally.count)
        })
        .filter(|(_, count)| *count > 0)
        .collect()
}

/// Write results in pretty (human-readable) format.
///
/// `results` is `None` for a plain import, where no constraints are checked.
pub fn write_pretty(
    path: &str,
    config_path: &str,
    summary: &ModelSummary,
    results: Option<&[ConstraintResult]>,
) {
    // Header
    println!();
    print!("  ");
    print!("{}", "archgraph".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Importing: ".dimmed());
    println!("{}", path);
    print!("  {}", "Config:    ".dimmed());
    println!("{}", config_path);
    println!();

    write_model_summary(summary);
    println!();

    if let Some(results) = results {
        write_constraints(results);
        println!();
        write_final_status(results);
        println!();
    }
}

fn write_model_summary(summary: &ModelSummary) {
    println!(
        "  {} ({} units from {} manifests):",
        "Model".bold(),
        summary.units,
        summary.manifests
    );
    for (origin, count) in &summary.units_by_origin {
        if *count > 0 {
            println!("    {:<14} {:>6}", origin, count);
        }
    }
    println!();

    println!(
        "  {} {} passes, {} units materialized",
        "Resolution:".bold(),
        summary.resolution_passes,
        summary.materialized
    );
    println!();

    let total: usize = summary.cross_references.values().sum();
    println!("  {} ({}):", "Cross-references".bold(), total);
    for (category, count) in &summary.cross_references {
        println!("    {:<22} {:>6}", category, count);
    }
}

fn write_constraints(results: &[ConstraintResult]) {
    println!("  {} ({}):", "Constraints".bold(), results.len());
    println!();

    for result in results {
        if result.is_violated() {
            print!("    {} ", "FAIL".red());
        } else {
            print!("    {} ", "PASS".green());
        }
        print!("{}", result.name);

        let failures = result.events.failure_messages();
        if let Some(information) = &failures.information_about_number_of_violations {
            print!(" {}", format!("(violated {})", information).dimmed());
        }
        println!();

        if let Some(description) = &result.description {
            println!("            {}", description.dimmed());
        }
        if !failures.is_empty() {
            let kinds: Vec<String> = tally_by_kind(result)
                .into_iter()
                .map(|(kind, count)| format!("{} {}", count, kind))
                .collect();
            if !kinds.is_empty() {
                println!("            {}", format!("by object: {}", kinds.join(", ")).dimmed());
            }
        }
        for message in failures.iter() {
            println!("            {}", message);
        }
        println!();
    }
}

fn write_final_status(results: &[ConstraintResult]) {
    let violated = results.iter().filter(|r| r.is_violated()).count();
    print!(
        "  {}",
        format!("{} of {} constraints violated", violated, results.len()).dimmed()
    );
    print!("  ");
    if violated == 0 {
        print!("{}", "PASSED".green());
    } else {
        print!("{}", "FAILED".red());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::{ConditionEvent, ConditionEvents};
    use crate::import::MemberKey;

    #[test]
    fn test_tally_by_kind() {
        let mut events = ConditionEvents::new();
        events.add(ConditionEvent::violated(vec![EventObject::unit("a.A")], "a"));
        events.add(ConditionEvent::violated(vec![EventObject::unit("a.B")], "b"));
        events.add(ConditionEvent::violated(
            vec![EventObject::Member {
                key: MemberKey::new("a.A", "f", "I"),
            }],
            "c",
        ));
        let result = ConstraintResult {
            name: "rule".to_string(),
            description: None,
            events,
        };
        assert_eq!(
            tally_by_kind(&result),
            vec![(ObjectKind::Unit, 2), (ObjectKind::Member, 1)]
        );

        let json = constraint_to_json(&result);
        assert!(!json.passed);
        assert_eq!(json.violations, 3);
        assert_eq!(json.messages, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_summary_of_empty_graph() {
        let summary = ModelSummary::new(&UnitGraph::default(), &ResolutionSummary::default(), 0);
        assert_eq!(summary.units, 0);
        assert_eq!(summary.units_by_origin.len(), UnitOrigin::ALL.len());
        assert_eq!(summary.cross_references.len(), AccessCategory::ALL.len());
        assert!(summary.cross_references.values().all(|c| *c == 0));
    }
}
