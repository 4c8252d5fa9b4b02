//! Non-fatal numeric warnings collected during a computation.

use std::collections::BTreeSet;

use serde::Serialize;

pub const WARN_ZERO_GDP: &str = "zero_gdp";
pub const WARN_ZERO_BASELINE_AMOUNT: &str = "zero_baseline_amount";
pub const WARN_ZERO_TARGET: &str = "zero_target";
pub const WARN_EMPTY_LEVER_IMPACT: &str = "empty_lever_impact";
pub const WARN_UNMAPPED_CONTRIBUTION: &str = "unmapped_mass_contribution";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct EngineWarning {
    pub code: &'static str,
    pub message: String,
}

/// Accumulates warnings; output is sorted and deduplicated so that the
/// order in which stages report them never shows.
#[derive(Debug, Default)]
pub struct Warnings {
    items: BTreeSet<EngineWarning>,
}

impl Warnings {
    pub fn push(&mut self, code: &'static str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(code, %message, "Engine warning");
        self.items.insert(EngineWarning { code, message });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<EngineWarning> {
        self.items.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_and_deduplicated() {
        let mut w = Warnings::default();
        w.push(WARN_ZERO_TARGET, "mass B");
        w.push(WARN_ZERO_GDP, "year 2027");
        w.push(WARN_ZERO_TARGET, "mass B");
        let v = w.into_vec();
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].code, WARN_ZERO_GDP);
        assert_eq!(v[1].code, WARN_ZERO_TARGET);
    }
}
