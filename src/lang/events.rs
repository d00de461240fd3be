//! Bookkeeping of rule evaluation outcomes.

use serde::Serialize;
use std::fmt;

use crate::import::MemberKey;

/// Object an event was raised for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EventObject {
    Unit {
        name: String,
    },
    Member {
        key: MemberKey,
    },
    Access {
        origin: MemberKey,
        target: MemberKey,
        line_number: u32,
    },
}

impl EventObject {
    pub fn unit(name: impl Into<String>) -> Self {
        EventObject::Unit { name: name.into() }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            EventObject::Unit { .. } => ObjectKind::Unit,
            EventObject::Member { .. } => ObjectKind::Member,
            EventObject::Access { .. } => ObjectKind::Access,
        }
    }
}

/// Tag used to route violations to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Unit,
    Member,
    Access,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Unit => "unit",
            ObjectKind::Member => "member",
            ObjectKind::Access => "access",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of checking a condition against one set of objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionEvent {
    violation: bool,
    objects: Vec<EventObject>,
    message: String,
}

impl ConditionEvent {
    pub fn violated(objects: Vec<EventObject>, message: impl Into<String>) -> Self {
        Self {
            violation: true,
            objects,
            message: message.into(),
        }
    }

    pub fn satisfied(objects: Vec<EventObject>, message: impl Into<String>) -> Self {
        Self {
            violation: false,
            objects,
            message: message.into(),
        }
    }

    pub fn is_violation(&self) -> bool {
        self.violation
    }

    pub fn corresponding_objects(&self) -> &[EventObject] {
        &self.objects
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn description_lines(&self) -> impl Iterator<Item = &str> {
        self.message.lines()
    }
}

/// Receives violations whose objects all have the accepted kind.
pub trait ViolationHandler {
    /// Kind of object this handler understands. `None` accepts everything.
    fn accepted_kind(&self) -> Option<ObjectKind>;

    fn handle(&mut self, objects: &[EventObject], message: &str);
}

/// Sorted failure lines of a set of events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailureMessages {
    pub messages: Vec<String>,
    pub information_about_number_of_violations: Option<String>,
}

impl FailureMessages {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }
}

impl fmt::Display for FailureMessages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(information) = &self.information_about_number_of_violations {
            writeln!(f, "({})", information)?;
        }
        for message in &self.messages {
            writeln!(f, "{}", message)?;
        }
        Ok(())
    }
}

/// Events collected while evaluating a rule.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConditionEvents {
    events: Vec<ConditionEvent>,
    information_about_number_of_violations: Option<String>,
}

impl ConditionEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, event: ConditionEvent) {
        self.events.push(event);
    }

    pub fn set_information_about_number_of_violations(&mut self, information: impl Into<String>) {
        self.information_about_number_of_violations = Some(information.into());
    }

    pub fn violating(&self) -> impl Iterator<Item = &ConditionEvent> {
        self.events.iter().filter(|e| e.violation)
    }

    pub fn allowed(&self) -> impl Iterator<Item = &ConditionEvent> {
        self.events.iter().filter(|e| !e.violation)
    }

    pub fn contain_violation(&self) -> bool {
        self.events.iter().any(|e| e.violation)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &ConditionEvent> {
        self.events.iter()
    }

    pub fn failure_messages(&self) -> FailureMessages {
        let mut messages: Vec<String> = self
            .violating()
            .flat_map(|e| e.description_lines())
            .map(str::to_string)
            .collect();
        messages.sort();
        FailureMessages {
            messages,
            information_about_number_of_violations: self
                .information_about_number_of_violations
                .clone(),
        }
    }

    /// Pass every violation the handler accepts to it.
    pub fn handle_violations<H: ViolationHandler + ?Sized>(&self, handler: &mut H) {
        let accepted = handler.accepted_kind();
        for event in self.violating() {
            let matches = match accepted {
                Some(kind) => event.objects.iter().all(|o| o.kind() == kind),
                None => true,
            };
            if matches {
                handler.handle(&event.objects, &event.message);
            }
        }
    }
}

impl<'a> IntoIterator for &'a ConditionEvents {
    type Item = &'a ConditionEvent;
    type IntoIter = std::slice::Iter<'a, ConditionEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
