//! Validation System - Rule/Policy Separation
//!
//! Rules produce structured violations against an icon set configuration.
//! Any error-level violation makes the configuration unusable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::registry::IconSetsConfig;

/// Largest icon edge accepted at 1x.
pub const MAX_ICON_SIZE: u32 = 2048;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub set: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
    pub icon_count: usize,
}

impl ValidationResult {
    pub fn has_warnings(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Warning)
    }
}

pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, config: &IconSetsConfig) -> Vec<ValidationViolation>;
}

fn violation(
    rule: &dyn ValidationRule,
    severity: ViolationSeverity,
    message: String,
    set: &str,
    icon: Option<&str>,
) -> ValidationViolation {
    ValidationViolation {
        rule: rule.name().to_string(),
        severity,
        message,
        set: Some(set.to_string()),
        icon: icon.map(str::to_string),
    }
}

// --- Concrete Rules ---

pub struct SizeRule;

impl ValidationRule for SizeRule {
    fn name(&self) -> &'static str { "size" }

    fn validate(&self, config: &IconSetsConfig) -> Vec<ValidationViolation> {
        config
            .sets
            .iter()
            .filter(|(_, s)| s.size == 0 || s.size > MAX_ICON_SIZE)
            .map(|(set, s)| {
                violation(
                    self,
                    ViolationSeverity::Error,
                    format!("Set '{}' has size {}, expected 1..={}", set, s.size, MAX_ICON_SIZE),
                    set,
                    None,
                )
            })
            .collect()
    }
}

pub struct NameRule;

/// Names become path segments of `<set>/<icon>`, so they must stay inside it.
fn is_valid_segment(name: &str) -> bool {
    !(name.trim().is_empty() || name.contains('/') || name == "." || name == "..")
}

impl ValidationRule for NameRule {
    fn name(&self) -> &'static str { "name" }

    fn validate(&self, config: &IconSetsConfig) -> Vec<ValidationViolation> {
        let mut violations = vec![];

        for (set, s) in &config.sets {
            if !is_valid_segment(set) {
                violations.push(violation(
                    self,
                    ViolationSeverity::Error,
                    format!("Invalid set name '{}'", set),
                    set,
                    None,
                ));
            }
            for name in &s.names {
                if !is_valid_segment(name) {
                    violations.push(violation(
                        self,
                        ViolationSeverity::Error,
                        format!("Invalid icon name '{}' in set '{}'", name, set),
                        set,
                        Some(name),
                    ));
                }
            }
        }
        violations
    }
}

/// Icon names are atlas index keys, so they must be unique across sets.
pub struct DuplicateNameRule;

impl ValidationRule for DuplicateNameRule {
    fn name(&self) -> &'static str { "duplicate_name" }

    fn validate(&self, config: &IconSetsConfig) -> Vec<ValidationViolation> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        let mut violations = vec![];

        for (set, s) in &config.sets {
            for name in &s.names {
                if let Some(first) = seen.insert(name, set) {
                    violations.push(violation(
                        self,
                        ViolationSeverity::Error,
                        format!("Icon '{}' in set '{}' already defined in set '{}'", name, set, first),
                        set,
                        Some(name),
                    ));
                }
            }
        }
        violations
    }
}

pub struct EmptySetRule;

impl ValidationRule for EmptySetRule {
    fn name(&self) -> &'static str { "empty_set" }

    fn validate(&self, config: &IconSetsConfig) -> Vec<ValidationViolation> {
        config
            .sets
            .iter()
            .filter(|(_, s)| s.names.is_empty())
            .map(|(set, _)| {
                violation(
                    self,
                    ViolationSeverity::Warning,
                    format!("Set '{}' has no icons", set),
                    set,
                    None,
                )
            })
            .collect()
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(SizeRule),
                Box::new(NameRule),
                Box::new(DuplicateNameRule),
                Box::new(EmptySetRule),
            ],
        }
    }

    pub fn validate(&self, config: &IconSetsConfig) -> ValidationResult {
        let violations: Vec<_> = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(config))
            .collect();

        // Warnings never block
        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);

        ValidationResult {
            valid,
            violations,
            icon_count: config.icon_count(),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
