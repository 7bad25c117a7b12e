//! Seasonal ARIMA with exogenous regressors
//!
//! A deterministic, moment-based estimator: exogenous effects are
//! regressed out by ordinary least squares, the residual series is
//! seasonally and regularly differenced, first-order AR terms come
//! from lag autocorrelations (Yule-Walker for the first-order case)
//! and MA terms from residual autocorrelations. Forecasts run the
//! recursion on the differenced series and re-integrate.
//!
//! Enrollment series are short; coefficients the differenced series
//! cannot support default to zero instead of failing. A fit
//! only fails when differencing consumes the entire series, the
//! exogenous design is singular, or values stop being finite.

use crate::error::{ForecastError, Result};
use crate::models::ModelSpec;

const COEFF_LIMIT: f64 = 0.98;
const PIVOT_EPSILON: f64 = 1e-10;
const VARIANCE_EPSILON: f64 = 1e-12;

/// Untrained model: an order specification waiting for data
#[derive(Debug, Clone)]
pub struct Sarimax {
    spec: ModelSpec,
}

/// Fitted model holding everything `forecast` needs
#[derive(Debug, Clone)]
pub struct FittedSarimax {
    spec: ModelSpec,
    /// Intercept followed by coefficients for `used_cols`
    beta: Vec<f64>,
    /// Non-constant exogenous columns that entered the regression
    used_cols: Vec<usize>,
    has_exog: bool,
    /// Differencing pipeline: `stages[0]` is the (exogenous-adjusted)
    /// series, each later stage differenced at `lags[i]`
    stages: Vec<Vec<f64>>,
    lags: Vec<usize>,
    /// Mean of the fully differenced series (drift term)
    w_mean: f64,
    phi: f64,
    sphi: f64,
    theta: f64,
    stheta: f64,
    /// Residuals aligned with the deepest stage
    residuals: Vec<f64>,
}

impl Sarimax {
    pub fn new(spec: ModelSpec) -> Self {
        Self { spec }
    }

    pub fn fit(&self, y: &[f64], exog: Option<&[Vec<f64>]>) -> Result<FittedSarimax> {
        if y.len() < 2 {
            return Err(ForecastError::Fit(
                "need at least 2 observations".to_string(),
            ));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Fit("series contains non-finite values".to_string()));
        }

        let (beta, used_cols, adjusted, has_exog) = match exog {
            Some(rows) => {
                if rows.len() != y.len() {
                    return Err(ForecastError::Fit(format!(
                        "exogenous rows ({}) do not match series length ({})",
                        rows.len(),
                        y.len()
                    )));
                }
                let (beta, used_cols) = regress_exogenous(y, rows)?;
                let adjusted: Vec<f64> = y
                    .iter()
                    .zip(rows.iter())
                    .map(|(&value, row)| value - exog_effect(&beta, &used_cols, row))
                    .collect();
                (beta, used_cols, adjusted, true)
            }
            None => (Vec::new(), Vec::new(), y.to_vec(), false),
        };

        let mut stages = vec![adjusted];
        let mut lags = Vec::new();
        if let Some(seasonal) = self.spec.seasonal {
            for _ in 0..seasonal.d {
                apply_difference(&mut stages, &mut lags, seasonal.period)?;
            }
        }
        for _ in 0..self.spec.order.d {
            apply_difference(&mut stages, &mut lags, 1)?;
        }

        let w = &stages[stages.len() - 1];
        let w_mean = w.iter().sum::<f64>() / w.len() as f64;
        let centered: Vec<f64> = w.iter().map(|v| v - w_mean).collect();

        let period = self.spec.seasonal.map(|s| s.period).unwrap_or(0);
        let phi = if self.spec.order.p > 0 {
            clamp_coeff(autocorrelation(&centered, 1))
        } else {
            0.0
        };
        let sphi = match self.spec.seasonal {
            Some(s) if s.p > 0 => clamp_coeff(autocorrelation(&centered, s.period)),
            _ => 0.0,
        };

        let residuals = ar_residuals(&centered, phi, sphi, period);
        let theta = if self.spec.order.q > 0 {
            clamp_coeff(0.5 * autocorrelation(&residuals, 1))
        } else {
            0.0
        };
        let stheta = match self.spec.seasonal {
            Some(s) if s.q > 0 => clamp_coeff(0.5 * autocorrelation(&residuals, s.period)),
            _ => 0.0,
        };

        if !w_mean.is_finite() || stages.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ForecastError::Fit("fit produced non-finite values".to_string()));
        }

        Ok(FittedSarimax {
            spec: self.spec,
            beta,
            used_cols,
            has_exog,
            stages,
            lags,
            w_mean,
            phi,
            sphi,
            theta,
            stheta,
            residuals,
        })
    }
}

impl FittedSarimax {
    /// Forecast `steps` periods ahead. Exogenous fits require one
    /// future feature row per step.
    pub fn forecast(&self, steps: usize, future_exog: Option<&[Vec<f64>]>) -> Result<Vec<f64>> {
        let future_rows = if self.has_exog {
            let rows = future_exog.ok_or_else(|| {
                ForecastError::Fit("exogenous model requires future feature rows".to_string())
            })?;
            if rows.len() < steps {
                return Err(ForecastError::Fit(format!(
                    "need {} future feature rows, got {}",
                    steps,
                    rows.len()
                )));
            }
            Some(rows)
        } else {
            None
        };

        let mut stages = self.stages.clone();
        let mut residuals = self.residuals.clone();
        let deepest = stages.len() - 1;
        let seasonal = self.spec.seasonal;
        let period = seasonal.map(|s| s.period).unwrap_or(0);

        let mut out = Vec::with_capacity(steps);
        for step in 0..steps {
            let v = {
                let w = &stages[deepest];
                let n = w.len();
                let mut dev = 0.0;
                if self.spec.order.p > 0 && n >= 1 {
                    dev += self.phi * (w[n - 1] - self.w_mean);
                }
                if let Some(s) = seasonal {
                    if s.p > 0 && n >= period {
                        dev += self.sphi * (w[n - period] - self.w_mean);
                        if self.spec.order.p > 0 && n >= period + 1 {
                            dev -= self.phi * self.sphi * (w[n - period - 1] - self.w_mean);
                        }
                    }
                }
                if self.spec.order.q > 0 && !residuals.is_empty() {
                    dev += self.theta * residuals[residuals.len() - 1];
                }
                if let Some(s) = seasonal {
                    if s.q > 0 && residuals.len() >= period {
                        dev += self.stheta * residuals[residuals.len() - period];
                    }
                }
                self.w_mean + dev
            };

            stages[deepest].push(v);
            residuals.push(0.0);

            // Re-integrate through the differencing pipeline.
            let mut val = v;
            for i in (0..self.lags.len()).rev() {
                let lag = self.lags[i];
                let base = stages[i][stages[i].len() - lag];
                val += base;
                stages[i].push(val);
            }

            let forecast = match future_rows {
                Some(rows) => val + exog_effect(&self.beta, &self.used_cols, &rows[step]),
                None => val,
            };
            out.push(forecast);
        }

        Ok(out)
    }
}

fn apply_difference(stages: &mut Vec<Vec<f64>>, lags: &mut Vec<usize>, lag: usize) -> Result<()> {
    let current = &stages[stages.len() - 1];
    if current.len() <= lag {
        return Err(ForecastError::Fit(format!(
            "series too short to difference at lag {lag}"
        )));
    }
    let next: Vec<f64> = (lag..current.len())
        .map(|i| current[i] - current[i - lag])
        .collect();
    stages.push(next);
    lags.push(lag);
    Ok(())
}

/// Sample autocorrelation at `lag`, zero when not estimable
fn autocorrelation(series: &[f64], lag: usize) -> f64 {
    let n = series.len();
    if lag == 0 || n <= lag {
        return 0.0;
    }
    let mean = series.iter().sum::<f64>() / n as f64;
    let denom: f64 = series.iter().map(|v| (v - mean).powi(2)).sum();
    if denom < VARIANCE_EPSILON {
        return 0.0;
    }
    let num: f64 = (lag..n)
        .map(|t| (series[t] - mean) * (series[t - lag] - mean))
        .sum();
    num / denom
}

fn clamp_coeff(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-COEFF_LIMIT, COEFF_LIMIT)
    } else {
        0.0
    }
}

/// Residuals of the (multiplicative) AR part on the centered series
fn ar_residuals(centered: &[f64], phi: f64, sphi: f64, period: usize) -> Vec<f64> {
    (0..centered.len())
        .map(|i| {
            let mut predicted = 0.0;
            if i >= 1 {
                predicted += phi * centered[i - 1];
            }
            if period > 0 && i >= period {
                predicted += sphi * centered[i - period];
            }
            if period > 0 && i >= period + 1 {
                predicted -= phi * sphi * centered[i - period - 1];
            }
            centered[i] - predicted
        })
        .collect()
}

/// OLS of the series on an intercept plus the non-constant exogenous
/// columns. Returns the coefficient vector (intercept first) and the
/// column indices that entered.
fn regress_exogenous(y: &[f64], rows: &[Vec<f64>]) -> Result<(Vec<f64>, Vec<usize>)> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if rows.iter().any(|row| row.len() != width) {
        return Err(ForecastError::Fit("ragged exogenous matrix".to_string()));
    }

    // Constant columns (including all-zero columns from empty
    // prerequisite slots) carry no signal and would make the normal
    // equations singular.
    let n = rows.len();
    let mut used_cols = Vec::new();
    for col in 0..width {
        let mean = rows.iter().map(|row| row[col]).sum::<f64>() / n as f64;
        let variance = rows.iter().map(|row| (row[col] - mean).powi(2)).sum::<f64>();
        if variance > VARIANCE_EPSILON {
            used_cols.push(col);
        }
    }

    let k = used_cols.len() + 1;
    let design_value = |row: &Vec<f64>, j: usize| -> f64 {
        if j == 0 {
            1.0
        } else {
            row[used_cols[j - 1]]
        }
    };

    // Normal equations X'X beta = X'y.
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &value) in rows.iter().zip(y.iter()) {
        for a in 0..k {
            let xa = design_value(row, a);
            xty[a] += xa * value;
            for b in 0..k {
                xtx[a][b] += xa * design_value(row, b);
            }
        }
    }

    let beta = solve_linear_system(xtx, xty)?;
    if beta.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::Fit(
            "exogenous regression produced non-finite coefficients".to_string(),
        ));
    }
    Ok((beta, used_cols))
}

fn exog_effect(beta: &[f64], used_cols: &[usize], row: &[f64]) -> f64 {
    if beta.is_empty() {
        return 0.0;
    }
    let mut effect = beta[0];
    for (j, &col) in used_cols.iter().enumerate() {
        effect += beta[j + 1] * row[col];
    }
    effect
}

/// Gaussian elimination with partial pivoting
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let k = b.len();
    for col in 0..k {
        let mut pivot_row = col;
        for row in col + 1..k {
            if a[row][col].abs() > a[pivot_row][col].abs() {
                pivot_row = row;
            }
        }
        if a[pivot_row][col].abs() < PIVOT_EPSILON {
            return Err(ForecastError::Fit(
                "singular exogenous design matrix".to_string(),
            ));
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in col + 1..k {
            let factor = a[row][col] / a[col][col];
            for c in col..k {
                a[row][c] -= factor * a[col][c];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; k];
    for row in (0..k).rev() {
        let mut sum = b[row];
        for col in row + 1..k {
            sum -= a[row][col] * x[col];
        }
        x[row] = sum / a[row][row];
    }
    Ok(x)
}
