//! Negative-indicator selection.
//!
//! Some indicators are "lower is better"; their values are sign-inverted
//! before growth computation so that higher always reads as improvement.
//! Which indicators those are is a per-run human decision, so the choice is
//! behind a capability trait: batch runs supply a fixed list, the CLI can
//! supply an interactive picker.

use anyhow::Result;
use std::collections::BTreeSet;

/// Chooses which of the discovered indicator names are negative.
///
/// The returned set is the selection: a set rather than a list, so repeated
/// picks of the same name collapse and can never double-invert.
pub trait NegativeIndicatorSelector {
    fn select(&mut self, indicators: &[String]) -> Result<BTreeSet<String>>;
}

/// Non-interactive selection from a predetermined list of names.
#[derive(Debug, Clone, Default)]
pub struct FixedSelection {
    names: BTreeSet<String>,
}

impl FixedSelection {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }
}

impl NegativeIndicatorSelector for FixedSelection {
    fn select(&mut self, _indicators: &[String]) -> Result<BTreeSet<String>> {
        Ok(self.names.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_selection_deduplicates() {
        let mut selector = FixedSelection::new(vec![
            "成本".to_string(),
            "成本".to_string(),
            "投诉率".to_string(),
        ]);

        let selected = selector.select(&[]).unwrap();
        assert_eq!(selected.len(), 2);
        assert!(selected.contains("成本"));
    }
}
