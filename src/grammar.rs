//! Grammar Engine - Parallel Rewriting
//!
//! Every symbol is rewritten simultaneously on each iteration. Symbols
//! without a production rewrite to themselves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::turtle::Alphabet;

pub type Rules = BTreeMap<char, String>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("Resource limit exceeded: {resource} would reach {requested}, limit is {limit}")]
    ResourceLimitExceeded {
        resource: &'static str,
        limit: u64,
        requested: u64,
    },
}

/// Caller-supplied ceiling on how much work a single expansion may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_max_symbols")]
    pub max_symbols: u64,
}

fn default_max_iterations() -> u32 { 16 }
fn default_max_symbols() -> u64 { 4_000_000 }

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_symbols: default_max_symbols(),
        }
    }
}

/// An L-system: axiom, productions, turning angle (degrees) and depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    pub axiom: String,
    #[serde(default)]
    pub rules: Rules,
    pub angle: f64,
    pub iterations: u32,
    #[serde(default)]
    pub alphabet: Alphabet,
}

impl Grammar {
    pub fn new(axiom: impl Into<String>, angle: f64, iterations: u32) -> Self {
        Self {
            axiom: axiom.into(),
            rules: Rules::new(),
            angle,
            iterations,
            alphabet: Alphabet::default(),
        }
    }

    pub fn with_rule(mut self, symbol: char, replacement: impl Into<String>) -> Self {
        self.rules.insert(symbol, replacement.into());
        self
    }

    pub fn with_alphabet(mut self, alphabet: Alphabet) -> Self {
        self.alphabet = alphabet;
        self
    }

    /// Expand the axiom `iterations` times.
    pub fn expand(&self) -> String {
        expand(&self.axiom, &self.rules, self.iterations)
    }

    pub fn expand_bounded(&self, limits: &Limits) -> Result<String, GrammarError> {
        expand_bounded(&self.axiom, &self.rules, self.iterations, limits)
    }

    /// Symbol count after `iterations`, without expanding.
    pub fn predicted_length(&self) -> u64 {
        predicted_length(&self.axiom, &self.rules, self.iterations)
    }
}

/// One parallel rewrite step.
pub fn rewrite(s: &str, rules: &Rules) -> String {
    let (_, bytes) = next_size(s, rules);
    rewrite_sized(s, rules, bytes)
}

fn rewrite_sized(s: &str, rules: &Rules, bytes: usize) -> String {
    let mut out = String::with_capacity(bytes);
    for c in s.chars() {
        match rules.get(&c) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    out
}

/// Symbol and byte length of `rewrite(s, rules)`.
fn next_size(s: &str, rules: &Rules) -> (u64, usize) {
    let mut symbols = 0u64;
    let mut bytes = 0usize;
    for c in s.chars() {
        match rules.get(&c) {
            Some(replacement) => {
                symbols = symbols.saturating_add(replacement.chars().count() as u64);
                bytes = bytes.saturating_add(replacement.len());
            }
            None => {
                symbols = symbols.saturating_add(1);
                bytes = bytes.saturating_add(c.len_utf8());
            }
        }
    }
    (symbols, bytes)
}

pub fn expand(axiom: &str, rules: &Rules, iterations: u32) -> String {
    let mut s = axiom.to_string();
    for _ in 0..iterations {
        s = rewrite(&s, rules);
    }
    s
}

/// Like [`expand`], but refuses to allocate past `limits`.
///
/// The size of each generation is computed before its buffer is allocated,
/// so an oversized request fails without touching the allocator.
pub fn expand_bounded(
    axiom: &str,
    rules: &Rules,
    iterations: u32,
    limits: &Limits,
) -> Result<String, GrammarError> {
    if iterations > limits.max_iterations {
        return Err(GrammarError::ResourceLimitExceeded {
            resource: "iterations",
            limit: u64::from(limits.max_iterations),
            requested: u64::from(iterations),
        });
    }
    let axiom_len = axiom.chars().count() as u64;
    if axiom_len > limits.max_symbols {
        return Err(GrammarError::ResourceLimitExceeded {
            resource: "symbols",
            limit: limits.max_symbols,
            requested: axiom_len,
        });
    }

    let mut s = axiom.to_string();
    for _ in 0..iterations {
        let (symbols, bytes) = next_size(&s, rules);
        if symbols > limits.max_symbols {
            return Err(GrammarError::ResourceLimitExceeded {
                resource: "symbols",
                limit: limits.max_symbols,
                requested: symbols,
            });
        }
        s = rewrite_sized(&s, rules, bytes);
    }
    Ok(s)
}

/// Exact expansion length via the per-symbol length recurrence
/// `len_n(c) = sum(len_{n-1}(d) for d in rule(c))`. Saturates at `u64::MAX`.
pub fn predicted_length(axiom: &str, rules: &Rules, iterations: u32) -> u64 {
    let mut lengths: BTreeMap<char, u64> = BTreeMap::new();
    for c in axiom.chars() {
        lengths.insert(c, 1);
    }
    for (k, body) in rules {
        lengths.insert(*k, 1);
        for c in body.chars() {
            lengths.insert(c, 1);
        }
    }

    for _ in 0..iterations {
        let mut next = lengths.clone();
        for (k, body) in rules {
            let total = body
                .chars()
                .map(|c| lengths.get(&c).copied().unwrap_or(1))
                .fold(0u64, u64::saturating_add);
            next.insert(*k, total);
        }
        if next == lengths {
            break;
        }
        lengths = next;
    }

    axiom
        .chars()
        .map(|c| lengths.get(&c).copied().unwrap_or(1))
        .fold(0u64, u64::saturating_add)
}
