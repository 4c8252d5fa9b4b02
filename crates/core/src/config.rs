//! Engine configuration: macro feedback parameters and rule thresholds.
//!
//! Every value here can be replaced per run by passing a different
//! [`EngineConfig`]; nothing is read from the environment by this crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{CoreError, Violation};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Employment-index response per percentage point of GDP.
pub const DEFAULT_OKUN_ELASTICITY: f64 = 0.5;
/// Share of a GDP change that flows back into the budget balance.
pub const DEFAULT_REVENUE_ELASTICITY: f64 = 0.5;
/// Reference growth rate for net primary expenditure.
pub const DEFAULT_NET_EXPENDITURE_REFERENCE_RATE: f64 = 0.015;
/// Absolute tolerance, in euros, for balance checks.
pub const DEFAULT_BALANCE_TOLERANCE_EUR: f64 = 1.0;
/// EU deficit threshold as a share of GDP.
pub const DEFAULT_EU_DEFICIT_THRESHOLD: f64 = 0.03;
/// EU debt threshold as a share of GDP.
pub const DEFAULT_EU_DEBT_THRESHOLD: f64 = 0.60;

/// Category key used for revenue-side shocks without a COFOG mapping.
pub const TAX_CATEGORY: &str = "tax";

/// A default impulse-response definition.
pub struct DefaultIrf {
    pub category: &'static str,
    pub irf_gdp: &'static [f64],
}

/// Built-in GDP impulse responses (percent of GDP per percent-of-GDP shock).
pub const DEFAULT_IRFS: &[DefaultIrf] = &[
    DefaultIrf {
        category: "01",
        irf_gdp: &[0.4, 0.3, 0.2, 0.1, 0.05],
    },
    DefaultIrf {
        category: "02",
        irf_gdp: &[0.5, 0.3, 0.15, 0.05],
    },
    DefaultIrf {
        category: "04",
        irf_gdp: &[0.6, 0.5, 0.35, 0.2, 0.1],
    },
    DefaultIrf {
        category: "07",
        irf_gdp: &[0.7, 0.5, 0.3, 0.15, 0.05],
    },
    DefaultIrf {
        category: "09",
        irf_gdp: &[0.6, 0.5, 0.4, 0.3, 0.2],
    },
    DefaultIrf {
        category: "10",
        irf_gdp: &[0.8, 0.5, 0.25, 0.1],
    },
    DefaultIrf {
        category: TAX_CATEGORY,
        irf_gdp: &[0.3, 0.4, 0.3, 0.2, 0.1],
    },
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MacroParams {
    #[serde(default = "default_okun")]
    #[validate(range(min = 0.0, max = 5.0))]
    pub okun_elasticity: f64,
    #[serde(default = "default_revenue_elasticity")]
    #[validate(range(min = 0.0, max = 2.0))]
    pub revenue_elasticity: f64,
    /// Category -> response coefficients for h = 0, 1, ...
    #[serde(default = "default_irfs")]
    pub irf_gdp: BTreeMap<String, Vec<f64>>,
}

impl Default for MacroParams {
    fn default() -> Self {
        Self {
            okun_elasticity: DEFAULT_OKUN_ELASTICITY,
            revenue_elasticity: DEFAULT_REVENUE_ELASTICITY,
            irf_gdp: default_irfs(),
        }
    }
}

impl MacroParams {
    /// Parse and validate a JSON override.
    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        let params: Self = serde_json::from_str(text)
            .map_err(|e| CoreError::validation("macro_params", e.to_string()))?;
        params.check()?;
        Ok(params)
    }

    pub fn check(&self) -> Result<(), CoreError> {
        let mut violations: Vec<Violation> = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .field_errors()
                .into_iter()
                .map(|(field, errs)| {
                    let codes: Vec<String> = errs.iter().map(|e| e.code.to_string()).collect();
                    Violation::new(
                        format!("macro_params.{field}"),
                        format!("failed {} check", codes.join(", ")),
                    )
                })
                .collect(),
        };
        for (category, coefficients) in &self.irf_gdp {
            if coefficients.iter().any(|c| !c.is_finite()) {
                violations.push(Violation::new(
                    format!("macro_params.irf_gdp.{category}"),
                    "coefficients must be finite",
                ));
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            violations.sort_by(|a, b| a.path.cmp(&b.path));
            Err(CoreError::Validation { violations })
        }
    }
}

fn default_okun() -> f64 {
    DEFAULT_OKUN_ELASTICITY
}

fn default_revenue_elasticity() -> f64 {
    DEFAULT_REVENUE_ELASTICITY
}

fn default_irfs() -> BTreeMap<String, Vec<f64>> {
    DEFAULT_IRFS
        .iter()
        .map(|d| (d.category.to_string(), d.irf_gdp.to_vec()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub macro_params: MacroParams,
    #[serde(default = "default_reference_rate")]
    pub net_expenditure_reference_rate: f64,
    #[serde(default = "default_tolerance")]
    pub balance_tolerance_eur: f64,
    #[serde(default = "default_deficit_threshold")]
    pub eu_deficit_threshold: f64,
    #[serde(default = "default_debt_threshold")]
    pub eu_debt_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            macro_params: MacroParams::default(),
            net_expenditure_reference_rate: DEFAULT_NET_EXPENDITURE_REFERENCE_RATE,
            balance_tolerance_eur: DEFAULT_BALANCE_TOLERANCE_EUR,
            eu_deficit_threshold: DEFAULT_EU_DEFICIT_THRESHOLD,
            eu_debt_threshold: DEFAULT_EU_DEBT_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Same thresholds, macro feedback switched off.
    pub fn without_macro_feedback() -> Self {
        Self {
            macro_params: MacroParams {
                irf_gdp: BTreeMap::new(),
                ..MacroParams::default()
            },
            ..Self::default()
        }
    }
}

fn default_reference_rate() -> f64 {
    DEFAULT_NET_EXPENDITURE_REFERENCE_RATE
}

fn default_tolerance() -> f64 {
    DEFAULT_BALANCE_TOLERANCE_EUR
}

fn default_deficit_threshold() -> f64 {
    DEFAULT_EU_DEFICIT_THRESHOLD
}

fn default_debt_threshold() -> f64 {
    DEFAULT_EU_DEBT_THRESHOLD
}
