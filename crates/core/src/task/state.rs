//! Task processor lifecycle states.

use std::fmt;

/// Lifecycle of a task processor.
///
/// Transitions only move forward: `Created -> Running -> Draining -> Stopped`.
/// A processor that was never started may go straight to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcessorState {
    /// Constructed, not yet consuming.
    Created,
    /// Claiming and executing tasks.
    Running,
    /// No longer claiming; waiting for in-flight tasks.
    Draining,
    /// Terminal.
    Stopped,
}

impl ProcessorState {
    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Running | Self::Stopped)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Stopped)
        )
    }

    /// Whether the processor may still claim new tasks.
    #[must_use]
    pub const fn accepts_work(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
