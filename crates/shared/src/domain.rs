use std::fmt;

use serde::{Deserialize, Serialize};

/// The five stages of an interaction's lifecycle.
///
/// `ShowEnable` is a side channel: it may fire in any phase and never becomes
/// the current phase of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepName {
    ShowEnable,
    Start,
    Processing,
    End,
    Rollback,
}

impl StepName {
    pub const ALL: [StepName; 5] = [
        StepName::ShowEnable,
        StepName::Start,
        StepName::Processing,
        StepName::End,
        StepName::Rollback,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StepName::ShowEnable => "showEnable",
            StepName::Start => "start",
            StepName::Processing => "processing",
            StepName::End => "end",
            StepName::Rollback => "rollback",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.as_str() == raw)
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a trigger's listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerTarget {
    /// The event source the interaction is bound to.
    Source,
    /// The host-wide window target (`window:` prefix).
    Window,
    /// The host-wide document target (`document:` prefix).
    Document,
}

/// Splits a trigger such as `window:mouseup` into its target and the event
/// name to subscribe to. Triggers with any other prefix are subscribed on the
/// source under their full name.
pub fn parse_trigger(trigger: &str) -> (TriggerTarget, &str) {
    let mut parts = trigger.split(':');
    let target = match parts.next() {
        Some("window") => TriggerTarget::Window,
        Some("document") => TriggerTarget::Document,
        _ => return (TriggerTarget::Source, trigger),
    };
    (target, parts.next().unwrap_or_default())
}

/// Splits an action reference `name:method` into its two halves.
///
/// Segments after the second `:` are ignored. A reference without `:` yields
/// an empty method name, which no action answers to.
pub fn split_action_reference(reference: &str) -> (&str, &str) {
    let mut parts = reference.split(':');
    let name = parts.next().unwrap_or_default();
    let method = parts.next().unwrap_or_default();
    (name, method)
}
