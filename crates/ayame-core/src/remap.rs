//! Remap rule storage and per-press resolution.
//!
//! Resolution is side-effect-free and re-runs on every press edge with a
//! fresh visited set, so it is safe to call from either producer. A chain
//! that revisits a code or outruns the depth bound rejects the whole
//! resolution; no partial remap is ever applied.

use crate::key_map;
use crate::types::{KeyCode, INVALID_KEY};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_MAX_CHAIN_LENGTH: usize = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemapError {
    #[error("remap chain for {source_key} revisits {offender}")]
    CycleDetected { source_key: String, offender: String },
    #[error("remap chain for {source_key} exceeds maximum depth {max}")]
    DepthExceeded { source_key: String, max: usize },
}

/// Rule set keyed by upper-cased source name. Target lists keep their
/// configured order; press order = list order, release order = reverse.
#[derive(Debug, Clone, Default)]
pub struct RemapRules {
    rules: HashMap<String, Vec<String>>,
}

impl RemapRules {
    pub fn from_config(raw: &HashMap<String, Vec<String>>) -> Self {
        let rules = raw
            .iter()
            .map(|(from, to)| (from.trim().to_ascii_uppercase(), to.clone()))
            .collect();
        Self { rules }
    }

    pub fn targets_for(&self, name: &str) -> Option<&[String]> {
        self.rules
            .get(&name.trim().to_ascii_uppercase())
            .map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.rules
            .iter()
            .map(|(from, to)| (from.as_str(), to.as_slice()))
    }

    /// True when the rule for `code` lists the key itself as a target.
    /// For a lock key this re-enables reporting of the raw key.
    pub fn rule_targets_self(&self, code: KeyCode) -> bool {
        let Some(name) = key_map::name_for_code(code) else {
            return false;
        };
        self.targets_for(name)
            .map(|targets| targets.iter().any(|t| key_map::code_for_name(t) == code))
            .unwrap_or(false)
    }
}

/// Expand `source` into its ordered list of target codes.
///
/// An empty result means the key has no active remap for this press; the
/// caller decides pass-through. Target names without a valid code are
/// dropped silently.
pub fn resolve(
    rules: &RemapRules,
    source: KeyCode,
    max_chain: usize,
) -> Result<Vec<KeyCode>, RemapError> {
    let Some(name) = key_map::name_for_code(source) else {
        return Ok(Vec::new());
    };
    if rules.targets_for(name).is_none() {
        return Ok(Vec::new());
    }

    let mut visited = HashSet::from([source]);
    let mut out = Vec::new();
    expand(rules, name, name, 0, max_chain, &mut visited, &mut out)?;
    Ok(out)
}

fn expand(
    rules: &RemapRules,
    name: &str,
    root: &str,
    depth: usize,
    max_chain: usize,
    visited: &mut HashSet<KeyCode>,
    out: &mut Vec<KeyCode>,
) -> Result<(), RemapError> {
    if depth >= max_chain {
        return Err(RemapError::DepthExceeded {
            source_key: root.to_string(),
            max: max_chain,
        });
    }

    let Some(targets) = rules.targets_for(name) else {
        return Ok(());
    };

    for target in targets {
        let code = key_map::code_for_name(target);
        if code == INVALID_KEY {
            debug!(target = %target, "dropping unknown remap target");
            continue;
        }
        if !visited.insert(code) {
            return Err(RemapError::CycleDetected {
                source_key: root.to_string(),
                offender: target.clone(),
            });
        }
        out.push(code);
        if let Some(canonical) = key_map::name_for_code(code) {
            if rules.targets_for(canonical).is_some() {
                expand(rules, canonical, root, depth + 1, max_chain, visited, out)?;
            }
        }
    }

    Ok(())
}

/// Ahead-of-time diagnosis of a rule set. Issues are advisory: per-press
/// resolution independently rejects bad chains, so a noisy rule set is
/// accepted with warnings rather than refused outright.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleIssue {
    #[error("unknown source key {0:?}")]
    UnknownSource(String),
    #[error("rule for {source_key:?} names unknown target {target:?}")]
    UnknownTarget { source_key: String, target: String },
    #[error("key {0:?} remaps to itself")]
    SelfReference(String),
    #[error("rule for {source_key:?} forms a cycle through {offender:?}")]
    Cycle { source_key: String, offender: String },
    #[error("rule chain for {source_key:?} exceeds maximum depth {max}")]
    ChainTooLong { source_key: String, max: usize },
}

pub fn validate_rules(rules: &RemapRules, max_chain: usize) -> Vec<RuleIssue> {
    let mut issues = Vec::new();

    for (from, to) in rules.iter() {
        let source_code = key_map::code_for_name(from);
        if source_code == INVALID_KEY {
            issues.push(RuleIssue::UnknownSource(from.to_string()));
            continue;
        }
        for target in to {
            if !key_map::is_valid_name(target) {
                issues.push(RuleIssue::UnknownTarget {
                    source_key: from.to_string(),
                    target: target.clone(),
                });
            }
        }
        if to.iter().any(|t| key_map::code_for_name(t) == source_code) {
            issues.push(RuleIssue::SelfReference(from.to_string()));
        }

        match resolve(rules, source_code, max_chain) {
            Ok(_) => {}
            Err(RemapError::CycleDetected { source_key, offender }) => {
                issues.push(RuleIssue::Cycle { source_key, offender });
            }
            Err(RemapError::DepthExceeded { source_key, max }) => {
                issues.push(RuleIssue::ChainTooLong { source_key, max });
            }
        }
    }

    issues
}
