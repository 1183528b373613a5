//! Directive extraction, assembly and expansion
//!
//! Directives are structured comments embedded in the source document.
//! The extractor turns physical lines into [`Directive`] values; the
//! validator expands them into [`Task`]s carrying a concrete file
//! binding.

pub mod extract;
pub mod validate;

use std::collections::BTreeMap;

pub use extract::{extract_directives, DirectiveScanner};
pub use validate::{expand_directives, RESERVED_PARAMETERS};

/// Parameter map attached to a directive, string-keyed, values free-form
pub type ParameterMap = BTreeMap<String, serde_yaml::Value>;

/// Conditional policy attached to a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalKind {
    /// No conditional: the command pass runs exactly once
    None,
    /// Evaluate once before the pass; never loops
    If,
    /// Like `If`, negated
    Unless,
    /// Evaluate before the first pass and after each pass
    While,
    /// Always run the first pass; loop until the expression turns true
    Until,
}

/// A parsed conditional clause
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub kind: ConditionalKind,
    pub expression: String,
}

impl Conditional {
    /// The default conditional: none
    pub fn none() -> Self {
        Conditional {
            kind: ConditionalKind::None,
            expression: String::new(),
        }
    }
}

impl Default for Conditional {
    fn default() -> Self {
        Conditional::none()
    }
}

/// A directive assembled from one or more physical lines
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// The rule identifier the directive names
    pub identifier: String,

    /// The parameter block, empty when none was given
    pub parameters: ParameterMap,

    /// The conditional clause, `none` when absent
    pub conditional: Conditional,

    /// Every physical line (1-based) that contributed to this directive
    pub lines: Vec<usize>,
}

/// One directive materialized against a concrete file.
///
/// The parameter map carries `file` (the name as written) and `reference`
/// (the canonicalized path); `files` has been expanded away.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub identifier: String,
    pub parameters: ParameterMap,
    pub conditional: Conditional,
    pub lines: Vec<usize>,
}
