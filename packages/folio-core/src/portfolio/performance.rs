//! Return and drawdown helpers over value series.

/// Simple period-over-period returns.
///
/// Produces `values.len() - 1` entries; a step from a zero value has no
/// defined return and is skipped.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Percent change of every value relative to the first one.
pub fn cumulative_returns(values: &[f64]) -> Vec<f64> {
    let Some(&base) = values.first() else {
        return Vec::new();
    };
    if base == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v / base - 1.0) * 100.0).collect()
}

/// Running peak and percent drawdown from it for each value.
///
/// Drawdown is `(value / peak - 1) * 100`, so it is never positive and is
/// exactly zero wherever the value sets a new peak.
pub fn running_drawdown(values: &[f64]) -> Vec<(f64, f64)> {
    let mut peak = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&value| {
            if value > peak {
                peak = value;
            }
            let drawdown = if peak > 0.0 {
                (value / peak - 1.0) * 100.0
            } else {
                0.0
            };
            (peak, drawdown)
        })
        .collect()
}

/// Calculate holding period return in percent.
pub fn holding_period_return(initial_value: f64, final_value: f64) -> f64 {
    if initial_value <= 0.0 {
        return 0.0;
    }
    ((final_value - initial_value) / initial_value) * 100.0
}

/// Annualize a percent return earned over `periods`, given the number of
/// periods per year (365 for calendar days).
///
/// Returns `None` when no time has elapsed or the compounded value
/// overflows (a large gain over a few days).
pub fn annualize_return(return_pct: f64, periods: i64, periods_per_year: u32) -> Option<f64> {
    if periods <= 0 {
        return None;
    }

    let years = periods as f64 / periods_per_year as f64;
    let total_return = 1.0 + (return_pct / 100.0);

    let annualized = (total_return.powf(1.0 / years) - 1.0) * 100.0;
    annualized.is_finite().then_some(annualized)
}
