// crates/bench-gate-core/src/core/table.rs
// ============================================================================
// Module: Bench Gate Canonical Task Table
// Description: Trusted task and policy definitions supplied by the operator.
// Purpose: Provide the expected-shape reference the validator checks against.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! The canonical task table is the trusted counterpart of a submission's
//! evidence: for every benchmark task it records the ordered list of safety
//! policies the evaluator is expected to have applied. The table is loaded
//! once at startup and shared immutably across validations. The canonical
//! safety dimension set is derived from the policy categories it contains.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::PolicyTemplateId;
use crate::core::identifiers::SafetyDimension;
use crate::core::identifiers::TaskId;

// ============================================================================
// SECTION: Canonical Definitions
// ============================================================================

/// One canonical safety policy attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPolicy {
    /// Canonical policy template identifier.
    pub policy_template_id: PolicyTemplateId,
    /// Safety dimension (policy category) this policy belongs to.
    pub policy_category: SafetyDimension,
}

/// Canonical definition of one benchmark task.
///
/// # Invariants
/// - Policy order is significant; submitted reports must match it exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTask {
    /// Ordered policies evaluated against this task.
    #[serde(default)]
    pub policies: Vec<CanonicalPolicy>,
}

/// Trusted task table keyed by task id.
///
/// # Invariants
/// - Loaded once and shared immutably; validation never mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskTable {
    /// Canonical tasks keyed by decimal task id.
    tasks: BTreeMap<TaskId, CanonicalTask>,
}

impl TaskTable {
    /// Creates a task table from canonical task definitions.
    #[must_use]
    pub const fn new(tasks: BTreeMap<TaskId, CanonicalTask>) -> Self {
        Self {
            tasks,
        }
    }

    /// Returns the number of canonical tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` when the table has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns the canonical definition for a task, if any.
    #[must_use]
    pub fn get(&self, task_id: TaskId) -> Option<&CanonicalTask> {
        self.tasks.get(&task_id)
    }

    /// Iterates canonical tasks in ascending task-id order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &CanonicalTask)> {
        self.tasks.iter().map(|(id, task)| (*id, task))
    }

    /// Returns the full expected task-id set.
    #[must_use]
    pub fn task_ids(&self) -> BTreeSet<TaskId> {
        self.tasks.keys().copied().collect()
    }

    /// Returns the canonical safety dimension set derived from policy
    /// categories across all tasks.
    #[must_use]
    pub fn dimensions(&self) -> BTreeSet<SafetyDimension> {
        self.tasks
            .values()
            .flat_map(|task| task.policies.iter())
            .map(|policy| policy.policy_category.clone())
            .collect()
    }

    /// Returns the total canonical policy instance count across all tasks.
    #[must_use]
    pub fn total_policies(&self) -> u64 {
        self.tasks.values().map(|task| task.policies.len() as u64).sum()
    }
}
