//! Category table mapping file extensions to destination folders.
//!
//! The table is built once from the configured rules and shared read-only by
//! the bootstrapper and every sweep. Each rule carries a pre-compiled glob
//! pattern so a sweep never re-parses patterns.
//!
//! # Examples
//!
//! ```
//! use watchdawg::config::CategoryRule;
//! use watchdawg::file_category::CategoryTable;
//!
//! let table = CategoryTable::new(&[
//!     CategoryRule::new("PDF", ".pdf", "Documents"),
//!     CategoryRule::new("Text", ".txt", "Documents"),
//! ])
//! .unwrap();
//! assert_eq!(table.categories(), vec!["Documents"]);
//! assert!(table.rules()[0].pattern().matches("report.pdf"));
//! ```

use crate::config::{CategoryRule, ConfigError};
use glob::Pattern;
use std::collections::HashSet;

/// A category rule with its compiled `*<extension>` pattern.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: CategoryRule,
    pattern: Pattern,
}

impl CompiledRule {
    /// Compiles a rule into a single-segment glob.
    ///
    /// The extension is escaped, so characters like `[` in it match literally.
    pub fn new(rule: CategoryRule) -> Result<Self, ConfigError> {
        let raw = format!("*{}", Pattern::escape(&rule.extension));
        let pattern = Pattern::new(&raw).map_err(|e| ConfigError::InvalidGlobPattern {
            pattern: raw.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { rule, pattern })
    }

    pub fn rule(&self) -> &CategoryRule {
        &self.rule
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn category(&self) -> &str {
        &self.rule.category
    }

    pub fn extension(&self) -> &str {
        &self.rule.extension
    }
}

/// Immutable set of compiled rules in configuration order.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    rules: Vec<CompiledRule>,
}

impl CategoryTable {
    /// Compiles every rule, failing on the first invalid one.
    pub fn new(rules: &[CategoryRule]) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .cloned()
            .map(CompiledRule::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Rules in insertion order.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Distinct category names, in the order they first appear.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rules
            .iter()
            .map(CompiledRule::category)
            .filter(|category| seen.insert(*category))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
