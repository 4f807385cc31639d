// Execution status shown next to the editor

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Nothing scheduled yet (startup, after reset)
    #[default]
    Ready,
    /// An edit is waiting for the quiet period to elapse
    Pending,
    /// Last run completed and the script was saved
    Succeeded,
    /// Last run failed to compile or raised an error
    Failed,
}

impl ExecutionStatus {
    /// Any state moves to Pending on a new edit
    pub fn on_mutation(self) -> Self {
        ExecutionStatus::Pending
    }

    pub fn on_success(self) -> Self {
        ExecutionStatus::Succeeded
    }

    pub fn on_failure(self) -> Self {
        ExecutionStatus::Failed
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ExecutionStatus::Pending)
    }

    /// Short label for the status indicator
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionStatus::Ready => "Ready",
            ExecutionStatus::Pending => "Saving",
            ExecutionStatus::Succeeded => "Saved",
            ExecutionStatus::Failed => "Error",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let s = ExecutionStatus::default();
        assert_eq!(s, ExecutionStatus::Ready);
        let s = s.on_mutation();
        assert!(s.is_pending());
        assert_eq!(s.on_success(), ExecutionStatus::Succeeded);
        assert_eq!(s.on_failure(), ExecutionStatus::Failed);
        assert_eq!(ExecutionStatus::Failed.on_mutation(), ExecutionStatus::Pending);
        assert_eq!(ExecutionStatus::Succeeded.on_mutation(), ExecutionStatus::Pending);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ExecutionStatus::Pending.to_string(), "Saving");
        assert_eq!(ExecutionStatus::Failed.label(), "Error");
    }
}
