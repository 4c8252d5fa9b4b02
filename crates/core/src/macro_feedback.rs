//! Macro feedback kernel: causal convolution of percent-of-GDP shocks with
//! per-category impulse responses.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::MacroParams;
use crate::snapshot::cofog_major;
use crate::types::Eur;

/// Feedback paths aligned with the horizon.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MacroOutcome {
    /// GDP change in euros.
    pub delta_gdp: Vec<Eur>,
    /// GDP change in percent of baseline GDP.
    pub delta_gdp_pct: Vec<f64>,
    /// Employment index change.
    pub delta_employment: Vec<f64>,
    /// Deficit change in euros; negative when growth improves the balance.
    pub delta_deficit: Vec<Eur>,
}

impl MacroOutcome {
    pub fn zero(horizon: usize) -> Self {
        Self {
            delta_gdp: vec![0.0; horizon],
            delta_gdp_pct: vec![0.0; horizon],
            delta_employment: vec![0.0; horizon],
            delta_deficit: vec![0.0; horizon],
        }
    }
}

/// Impulse response for a category: exact code first, then its major
/// COFOG function.
pub fn irf_for<'a>(params: &'a MacroParams, category: &str) -> Option<&'a [f64]> {
    params
        .irf_gdp
        .get(category)
        .or_else(|| params.irf_gdp.get(cofog_major(category)))
        .map(Vec::as_slice)
}

/// `out[t] = sum_{h=0..=t} irf[h] * shock[t-h]`; coefficients past the end
/// of `irf` are zero.
pub fn convolve(irf: &[f64], shock: &[f64]) -> Vec<f64> {
    (0..shock.len())
        .map(|t| {
            irf.iter()
                .take(t + 1)
                .enumerate()
                .map(|(h, coefficient)| coefficient * shock[t - h])
                .sum()
        })
        .collect()
}

/// Run every category shock through its IRF and derive GDP, employment and
/// deficit feedback. `gdp` is the baseline GDP path.
pub fn compute_feedback(
    shocks: &BTreeMap<String, Vec<f64>>,
    gdp: &[Eur],
    params: &MacroParams,
) -> MacroOutcome {
    let horizon = gdp.len();
    let mut outcome = MacroOutcome::zero(horizon);

    for (category, shock) in shocks {
        let Some(irf) = irf_for(params, category) else {
            tracing::debug!(category, "No impulse response configured; shock ignored");
            continue;
        };
        for (total, response) in outcome.delta_gdp_pct.iter_mut().zip(convolve(irf, shock)) {
            *total += response;
        }
    }

    for t in 0..horizon {
        let pct = outcome.delta_gdp_pct[t];
        let gdp_eur = pct / 100.0 * gdp[t];
        outcome.delta_gdp[t] = gdp_eur;
        outcome.delta_employment[t] = params.okun_elasticity * pct;
        outcome.delta_deficit[t] = -params.revenue_elasticity * gdp_eur;
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(irfs: &[(&str, &[f64])]) -> MacroParams {
        MacroParams {
            okun_elasticity: 0.5,
            revenue_elasticity: 0.4,
            irf_gdp: irfs
                .iter()
                .map(|(c, irf)| (c.to_string(), irf.to_vec()))
                .collect(),
        }
    }

    #[test]
    fn convolution_is_causal() {
        let out = convolve(&[1.0, 0.5, 0.25], &[0.0, 2.0, 0.0, 0.0]);
        assert_eq!(out, vec![0.0, 2.0, 1.0, 0.5]);
    }

    #[test]
    fn short_irf_stops_responding() {
        let out = convolve(&[1.0], &[1.0, 1.0, 1.0]);
        assert_eq!(out, vec![1.0, 1.0, 1.0]);
        assert_eq!(convolve(&[], &[1.0, 2.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn irf_lookup_falls_back_to_major_code() {
        let p = params(&[("07", &[0.5]), ("07.3", &[0.9])]);
        assert_eq!(irf_for(&p, "07.3"), Some(&[0.9][..]));
        assert_eq!(irf_for(&p, "07.1"), Some(&[0.5][..]));
        assert_eq!(irf_for(&p, "09"), None);
    }

    #[test]
    fn feedback_converts_to_euros_and_deficit() {
        let p = params(&[("07", &[1.0, 0.5])]);
        let mut shocks = BTreeMap::new();
        shocks.insert("07".to_string(), vec![1.0, 0.0]);
        let out = compute_feedback(&shocks, &[1_000.0, 2_000.0], &p);
        assert_eq!(out.delta_gdp_pct, vec![1.0, 0.5]);
        assert_eq!(out.delta_gdp, vec![10.0, 10.0]);
        assert_eq!(out.delta_employment, vec![0.5, 0.25]);
        assert_eq!(out.delta_deficit, vec![-4.0, -4.0]);
    }

    #[test]
    fn unknown_categories_contribute_zero() {
        let p = params(&[]);
        let mut shocks = BTreeMap::new();
        shocks.insert("03".to_string(), vec![5.0]);
        assert_eq!(compute_feedback(&shocks, &[100.0], &p), MacroOutcome::zero(1));
    }
}
