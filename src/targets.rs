//! Target identifiers and the ordered batch list.
//!
//! A [`Target`] is a normalized destination identifier: digits only, with a
//! default country code prepended when the bare number is short enough to
//! need one. [`TargetList`] is the ordered batch plus the cursor pointing
//! at the current target.
//!
//! Invariant: `0 <= cursor <= len`. List contents are immutable while a
//! sequence is running; only the cursor moves.
//!
//! # Example
//! ```
//! use batchpilot::{Target, TargetList};
//!
//! let t = Target::normalize("(555) 010-2345", "1").unwrap();
//! assert_eq!(t.as_str(), "15550102345");
//!
//! let mut list = TargetList::parse("111\n\n 222 \nabc\n", "");
//! assert_eq!(list.len(), 2);
//! assert_eq!(list.current().unwrap().as_str(), "111");
//! ```

use std::fmt;
use std::sync::Arc;

/// Maximum digit count at which a bare number gets the default country
/// code prepended.
const BARE_NUMBER_MAX_DIGITS: usize = 10;

/// A normalized destination identifier. Immutable once in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target(Arc<str>);

impl Target {
    /// Normalizes raw input into a target: strips non-digits, then prepends
    /// `default_cc` when the remainder has at most ten digits.
    ///
    /// Returns `None` when nothing is left after stripping.
    pub fn normalize(raw: &str, default_cc: &str) -> Option<Target> {
        let digits = digits_only(raw);
        if digits.is_empty() {
            return None;
        }
        let cc = digits_only(default_cc);
        if !cc.is_empty() && digits.len() <= BARE_NUMBER_MAX_DIGITS {
            Some(Target(format!("{cc}{digits}").into()))
        } else {
            Some(Target(digits.into()))
        }
    }

    /// Wraps an already-normalized identifier without touching it.
    pub fn raw(id: impl Into<Arc<str>>) -> Target {
        Target(id.into())
    }

    /// Returns the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strips every non-ASCII-digit character.
fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Ordered sequence of targets plus the cursor.
#[derive(Debug, Clone, Default)]
pub struct TargetList {
    targets: Vec<Target>,
    cursor: usize,
}

impl TargetList {
    /// Creates a list from already-normalized targets, cursor at zero.
    pub fn new(targets: Vec<Target>) -> Self {
        Self { targets, cursor: 0 }
    }

    /// Parses one-target-per-line text: trims, drops blanks, normalizes
    /// each entry and discards anything that normalizes to nothing.
    pub fn parse(text: &str, default_cc: &str) -> Self {
        let targets = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| Target::normalize(line, default_cc))
            .collect();
        Self::new(targets)
    }

    /// Number of targets in the batch.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// True when the batch holds no targets.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Current cursor position (`0..=len`).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The target under the cursor, or `None` once the list is exhausted.
    pub fn current(&self) -> Option<&Target> {
        self.targets.get(self.cursor)
    }

    /// Moves the cursor forward by one, saturating at `len`.
    ///
    /// Returns the new cursor position.
    pub fn advance(&mut self) -> usize {
        self.cursor = (self.cursor + 1).min(self.targets.len());
        self.cursor
    }

    /// True once the cursor has moved past the last target.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.targets.len()
    }

    /// Returns the cursor to the first target.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_non_digits() {
        let t = Target::normalize("+1 (555) 010-2345", "").unwrap();
        assert_eq!(t.as_str(), "15550102345");
    }

    #[test]
    fn test_normalize_prepends_country_code_for_short_numbers() {
        // Ten digits or fewer gets the default country code.
        let t = Target::normalize("5550102345", "49").unwrap();
        assert_eq!(t.as_str(), "495550102345");
        // Eleven digits is assumed to already carry one.
        let t = Target::normalize("15550102345", "49").unwrap();
        assert_eq!(t.as_str(), "15550102345");
    }

    #[test]
    fn test_normalize_rejects_digitless_input() {
        assert!(Target::normalize("call me maybe", "49").is_none());
        assert!(Target::normalize("", "").is_none());
    }

    #[test]
    fn test_parse_drops_blank_and_invalid_lines() {
        let list = TargetList::parse("111\n\n   \nnope\n 222 \n", "");
        assert_eq!(list.len(), 2);
        assert_eq!(list.current().unwrap().as_str(), "111");
    }

    #[test]
    fn test_cursor_saturates_at_len() {
        let mut list = TargetList::parse("111\n222", "");
        assert_eq!(list.advance(), 1);
        assert!(!list.is_exhausted());
        assert_eq!(list.advance(), 2);
        assert!(list.is_exhausted());
        assert!(list.current().is_none());
        // Saturates rather than running past the end.
        assert_eq!(list.advance(), 2);
        list.reset();
        assert_eq!(list.cursor(), 0);
    }
}
