//! Whole-build validation on top of the resolver
//!
//! The resolver runs once with an effectively unlimited budget to sort the
//! selected nodes' problems into hard (structural) and soft ones, then the
//! confirmed set is checked against the level's real ability point cap.

use serde::Serialize;

use crate::atree::builder::AbilityTree;
use crate::atree::resolver::{ActivationFailure, Resolver};
use crate::atree::state::ActivationState;
use crate::core::config::PlannerConfig;
use crate::core::types::AbilityId;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Structural violation or overspent points; derived values must not be shown
    pub hard_error: bool,
    /// Messages in display order
    pub errors: Vec<String>,
    pub failures: Vec<ActivationFailure>,
    /// Selected nodes that resolved, in confirmation order
    pub confirmed: Vec<AbilityId>,
    pub points_spent: u32,
    pub ap_cap: u32,
    /// Unselected nodes that could be taken with the points left
    pub reachable_hints: Vec<AbilityId>,
}

impl ValidationReport {
    pub fn is_confirmed(&self, id: AbilityId) -> bool {
        self.confirmed.contains(&id)
    }

    pub fn points_left(&self) -> i64 {
        i64::from(self.ap_cap) - i64::from(self.points_spent)
    }

    /// Error lines for display, collapsing anything past `limit`
    pub fn error_lines(&self, limit: usize) -> Vec<String> {
        let mut lines: Vec<String> = self.errors.iter().take(limit).cloned().collect();
        if self.errors.len() > limit {
            lines.push(format!("... {} errors not shown", self.errors.len() - limit));
        }
        lines
    }
}

/// Validate the selected nodes of `tree` for a character of `level`
///
/// `level` is the raw user-entered string; see [`PlannerConfig::ap_cap`].
pub fn validate(tree: &AbilityTree, state: &ActivationState, level: &str, config: &PlannerConfig) -> ValidationReport {
    if tree.is_empty() {
        return ValidationReport {
            errors: vec!["no atree data".to_string()],
            ..Default::default()
        };
    }

    let resolver = Resolver::new(tree, state);
    let resolution = resolver.resolve(config.unlimited_budget);
    let ap_cap = config.ap_cap(level);

    let overspent = resolution.points_spent > ap_cap;
    // an overspent build has no points left, not even for free nodes
    let reachable_hints: Vec<AbilityId> = if overspent {
        Vec::new()
    } else {
        tree.iter()
            .filter(|node| !state.is_active(node.id()))
            .filter(|node| resolver.check(node, &resolution, ap_cap).is_ok())
            .map(|node| node.id())
            .collect()
    };

    let mut errors = Vec::new();
    if overspent {
        errors.push(format!(
            "too many ability points assigned! ({} > {})",
            resolution.points_spent, ap_cap
        ));
    }
    errors.extend(resolution.failures.iter().map(ToString::to_string));
    let hard_error = overspent || resolution.has_hard_failure();

    tracing::debug!(
        spent = resolution.points_spent,
        cap = ap_cap,
        errors = errors.len(),
        hard_error,
        "validated ability tree"
    );

    ValidationReport {
        hard_error,
        errors,
        failures: resolution.failures,
        confirmed: resolution.confirmed,
        points_spent: resolution.points_spent,
        ap_cap,
        reachable_hints,
    }
}
