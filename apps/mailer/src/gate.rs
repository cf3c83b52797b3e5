//! At most one in-flight request per operation kind.
//!
//! Kinds are gated independently: an outstanding generate does not block send.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Generate,
    Send,
    Regenerate,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [
        OperationKind::Generate,
        OperationKind::Send,
        OperationKind::Regenerate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Generate => "generate",
            OperationKind::Send => "send",
            OperationKind::Regenerate => "regenerate",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperationStatus {
    #[default]
    Idle,
    InFlight,
}

#[derive(Debug, Clone)]
pub struct OperationGate {
    status: HashMap<OperationKind, OperationStatus>,
}

impl Default for OperationGate {
    fn default() -> Self {
        Self {
            status: OperationKind::ALL
                .into_iter()
                .map(|kind| (kind, OperationStatus::Idle))
                .collect(),
        }
    }
}

impl OperationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `kind` in flight. Returns false if it already was.
    pub fn try_acquire(&mut self, kind: OperationKind) -> bool {
        let status = self.status.entry(kind).or_default();
        if *status == OperationStatus::InFlight {
            debug!(operation = %kind, "Gate denied: operation already in flight");
            return false;
        }
        *status = OperationStatus::InFlight;
        debug!(operation = %kind, "Gate acquired");
        true
    }

    /// Returns `kind` to idle whatever its current state.
    pub fn release(&mut self, kind: OperationKind) {
        self.status.insert(kind, OperationStatus::Idle);
        debug!(operation = %kind, "Gate released");
    }

    pub fn status(&self, kind: OperationKind) -> OperationStatus {
        self.status.get(&kind).copied().unwrap_or_default()
    }

    pub fn is_in_flight(&self, kind: OperationKind) -> bool {
        self.status(kind) == OperationStatus::InFlight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_kinds_start_idle() {
        let gate = OperationGate::new();
        for kind in OperationKind::ALL {
            assert_eq!(gate.status(kind), OperationStatus::Idle);
        }
    }

    #[test]
    fn test_second_acquire_of_same_kind_is_denied() {
        let mut gate = OperationGate::new();
        assert!(gate.try_acquire(OperationKind::Generate));
        assert!(!gate.try_acquire(OperationKind::Generate));
        assert!(gate.is_in_flight(OperationKind::Generate));
    }

    #[test]
    fn test_kinds_are_gated_independently() {
        let mut gate = OperationGate::new();
        assert!(gate.try_acquire(OperationKind::Generate));
        assert!(gate.try_acquire(OperationKind::Send));
        assert!(gate.try_acquire(OperationKind::Regenerate));
    }

    #[test]
    fn test_release_allows_reacquire() {
        let mut gate = OperationGate::new();
        assert!(gate.try_acquire(OperationKind::Send));
        gate.release(OperationKind::Send);
        assert_eq!(gate.status(OperationKind::Send), OperationStatus::Idle);
        assert!(gate.try_acquire(OperationKind::Send));
    }

    #[test]
    fn test_release_of_idle_kind_is_harmless() {
        let mut gate = OperationGate::new();
        gate.release(OperationKind::Regenerate);
        assert_eq!(gate.status(OperationKind::Regenerate), OperationStatus::Idle);
    }
}
