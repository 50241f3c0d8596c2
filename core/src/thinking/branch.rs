//! Reasoning branches: named, append-only step lists and their merge rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAIN_BRANCH;

/// One entry in a reasoning branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub branch: String,
}

impl ReasoningStep {
    #[must_use]
    pub fn new(content: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: Utc::now(),
            branch: branch.into(),
        }
    }
}

/// The reasoning tree: branch name to its append-only step list.
#[derive(Debug, Clone, Default)]
pub struct BranchTree {
    branches: std::collections::HashMap<String, Vec<ReasoningStep>>,
}

impl BranchTree {
    /// A tree with only the `"main"` branch, empty.
    #[must_use]
    pub fn new() -> Self {
        let mut branches = std::collections::HashMap::new();
        branches.insert(MAIN_BRANCH.to_string(), Vec::new());
        Self { branches }
    }

    #[must_use]
    pub fn steps(&self, branch: &str) -> &[ReasoningStep] {
        self.branches.get(branch).map_or(&[], Vec::as_slice)
    }

    pub fn append(&mut self, branch: &str, content: impl Into<String>) {
        self.branches
            .entry(branch.to_string())
            .or_default()
            .push(ReasoningStep::new(content, branch));
    }

    #[must_use]
    pub fn exists(&self, branch: &str) -> bool {
        self.branches.contains_key(branch)
    }

    /// Copies `base`'s steps into a new branch `name`. No-op if `base`
    /// doesn't exist.
    pub fn branch_from(&mut self, name: &str, base: &str) {
        let base_steps = self.branches.get(base).cloned().unwrap_or_default();
        self.branches.insert(name.to_string(), base_steps);
    }

    /// Appends every step of `src` not already present in `dst` by content
    /// equality, then a synthetic `"merged"` marker step. Idempotent:
    /// merging twice leaves `dst` unchanged after the first merge.
    ///
    /// Returns `false` if either branch doesn't exist.
    pub fn merge(&mut self, src: &str, dst: &str) -> bool {
        if !self.exists(src) || !self.exists(dst) {
            return false;
        }
        let marker = format!("merged branch '{src}' into '{dst}'");
        let mut candidates: Vec<String> = self.branches[src].iter().map(|s| s.content.clone()).collect();
        candidates.push(marker);

        let dst_contents: std::collections::HashSet<String> = self.branches[dst]
            .iter()
            .map(|s| s.content.clone())
            .collect();
        let to_append: Vec<String> = candidates
            .into_iter()
            .filter(|content| !dst_contents.contains(content))
            .collect();

        let dst_steps = self.branches.get_mut(dst).unwrap();
        for content in to_append {
            dst_steps.push(ReasoningStep::new(content, dst));
        }
        true
    }
}
