//! Validation System - Rule/Policy Separation
//!
//! Rules inspect a grammar before it is expanded and produce structured
//! violations. Policy decides whether errors block generation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::grammar::{predicted_length, Grammar, Limits};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
    pub preset_id: String,
}

impl ValidationResult {
    pub fn success(preset_id: &str) -> Self {
        Self {
            valid: true,
            violations: vec![],
            preset_id: preset_id.to_string(),
        }
    }

    pub fn failure(preset_id: &str, violations: Vec<ValidationViolation>) -> Self {
        Self {
            valid: false,
            violations,
            preset_id: preset_id.to_string(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Errors reject the grammar; warnings are dropped from the result.
    #[default]
    Block,
    /// Never reject; every violation is logged at `warn`.
    Warn,
    /// Never reject; violations are only recorded.
    Log,
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, grammar: &Grammar, limits: &Limits) -> Vec<ValidationViolation>;
}

/// Symbols present in the fully expanded string, found by iterating the
/// symbol sets instead of the strings.
fn surviving_symbols(grammar: &Grammar) -> BTreeSet<char> {
    let mut current: BTreeSet<char> = grammar.axiom.chars().collect();
    for _ in 0..grammar.iterations {
        let next: BTreeSet<char> = current
            .iter()
            .flat_map(|c| match grammar.rules.get(c) {
                Some(body) => body.chars().collect::<Vec<_>>(),
                None => vec![*c],
            })
            .collect();
        if next == current {
            break;
        }
        current = next;
    }
    current
}

// --- Concrete Rules ---

pub struct AlphabetRule;

impl ValidationRule for AlphabetRule {
    fn name(&self) -> &'static str { "alphabet" }

    fn validate(&self, grammar: &Grammar, _limits: &Limits) -> Vec<ValidationViolation> {
        let surviving = surviving_symbols(grammar);
        let mut violations = vec![];

        let unknown: String = surviving
            .iter()
            .filter(|c| !grammar.alphabet.contains(**c))
            .collect();
        if !unknown.is_empty() {
            violations.push(ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Expanded string contains symbols with no turtle command".to_string(),
                expected: Some(grammar.alphabet.symbols().map(|(s, _)| s).collect()),
                actual: Some(unknown),
                remediation: vec![
                    "Add a production that rewrites the symbol away".to_string(),
                    "Map the symbol in the grammar alphabet".to_string(),
                ],
            });
        }

        let transient: String = grammar
            .axiom
            .chars()
            .chain(grammar.rules.values().flat_map(|b| b.chars()))
            .collect::<BTreeSet<char>>()
            .into_iter()
            .filter(|c| !grammar.alphabet.contains(*c) && !surviving.contains(c))
            .collect();
        if !transient.is_empty() {
            violations.push(ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Info,
                message: "Unmapped symbols are rewritten away before interpretation".to_string(),
                expected: None,
                actual: Some(transient),
                remediation: vec![],
            });
        }

        violations
    }
}

pub struct BranchBalanceRule;

impl BranchBalanceRule {
    /// Returns (closes without open, opens left unclosed).
    fn scan(s: &str, grammar: &Grammar) -> (usize, usize) {
        use crate::turtle::Command;
        let mut depth = 0usize;
        let mut stray = 0usize;
        for c in s.chars() {
            match grammar.alphabet.command(c) {
                Some(Command::Push) => depth += 1,
                Some(Command::Pop) if depth == 0 => stray += 1,
                Some(Command::Pop) => depth -= 1,
                _ => {}
            }
        }
        (stray, depth)
    }
}

impl ValidationRule for BranchBalanceRule {
    fn name(&self) -> &'static str { "branch_balance" }

    fn validate(&self, grammar: &Grammar, _limits: &Limits) -> Vec<ValidationViolation> {
        let sources = std::iter::once(("axiom".to_string(), grammar.axiom.as_str())).chain(
            grammar
                .rules
                .iter()
                .map(|(k, body)| (format!("rule '{k}'"), body.as_str())),
        );

        let mut violations = vec![];
        for (label, s) in sources {
            let (stray, open) = Self::scan(s, grammar);
            if stray > 0 {
                violations.push(ValidationViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Error,
                    message: format!("Branch closed without an open branch in {label}"),
                    expected: Some("every pop preceded by a push".to_string()),
                    actual: Some(format!("{stray} unmatched pop(s)")),
                    remediation: vec!["Remove the stray ']' or add the matching '['".to_string()],
                });
            }
            if open > 0 {
                violations.push(ValidationViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Warning,
                    message: format!("Unclosed branch in {label}"),
                    expected: Some("every push matched by a pop".to_string()),
                    actual: Some(format!("{open} unclosed push(es)")),
                    remediation: vec!["Balance '[' and ']' within each production".to_string()],
                });
            }
        }
        violations
    }
}

pub struct ExpansionSizeRule;

impl ValidationRule for ExpansionSizeRule {
    fn name(&self) -> &'static str { "expansion_size" }

    fn validate(&self, grammar: &Grammar, limits: &Limits) -> Vec<ValidationViolation> {
        let mut violations = vec![];

        if grammar.iterations > limits.max_iterations {
            violations.push(ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Too many iterations".to_string(),
                expected: Some(format!("{} maximum", limits.max_iterations)),
                actual: Some(grammar.iterations.to_string()),
                remediation: vec!["Lower the iteration count".to_string()],
            });
            return violations;
        }

        let predicted = predicted_length(&grammar.axiom, &grammar.rules, grammar.iterations);
        if predicted > limits.max_symbols {
            violations.push(ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Expanded string would exceed the symbol limit".to_string(),
                expected: Some(format!("{} symbols maximum", limits.max_symbols)),
                actual: Some(format!("{predicted} symbols")),
                remediation: vec![
                    "Lower the iteration count".to_string(),
                    "Raise max_symbols".to_string(),
                ],
            });
        }
        violations
    }
}

pub struct AngleRule;

impl ValidationRule for AngleRule {
    fn name(&self) -> &'static str { "angle" }

    fn validate(&self, grammar: &Grammar, _limits: &Limits) -> Vec<ValidationViolation> {
        if !grammar.angle.is_finite() {
            return vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Angle is not a finite number".to_string(),
                expected: Some("finite degrees".to_string()),
                actual: Some(grammar.angle.to_string()),
                remediation: vec!["Provide the angle in degrees".to_string()],
            }];
        }
        if grammar.angle % 360.0 == 0.0 {
            return vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: "Turns have no effect at this angle".to_string(),
                expected: None,
                actual: Some(format!("{}°", grammar.angle)),
                remediation: vec![],
            }];
        }
        vec![]
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
                Box::new(AlphabetRule),
                Box::new(BranchBalanceRule),
                Box::new(ExpansionSizeRule),
                Box::new(AngleRule),
            ],
        }
    }

    pub fn validate(
        &self,
        preset_id: &str,
        grammar: &Grammar,
        limits: &Limits,
        policy: ValidationPolicy,
    ) -> ValidationResult {
        let mut all_violations = vec![];

        for rule in &self.rules {
            all_violations.extend(rule.validate(grammar, limits));
        }

        match policy {
            ValidationPolicy::Block => {
                let errors: Vec<_> = all_violations
                    .into_iter()
                    .filter(|v| v.severity == ViolationSeverity::Error)
                    .collect();
                if errors.is_empty() {
                    ValidationResult::success(preset_id)
                } else {
                    ValidationResult::failure(preset_id, errors)
                }
            }
            ValidationPolicy::Warn | ValidationPolicy::Log => {
                for v in &all_violations {
                    if policy == ValidationPolicy::Warn {
                        warn!(preset = preset_id, rule = %v.rule, "{}", v.message);
                    } else {
                        info!(preset = preset_id, rule = %v.rule, "{}", v.message);
                    }
                }
                ValidationResult {
                    valid: true,
                    violations: all_violations,
                    preset_id: preset_id.to_string(),
                }
            }
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
