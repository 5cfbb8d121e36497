//! Statistics used to check that draws follow the stored weights.
//!
//! These are analysis helpers for long draw sequences; the tree never calls
//! them itself.

/// Outcome of a chi-squared goodness-of-fit test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChiSquaredResult {
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    /// Probability of a statistic at least this large under the null hypothesis.
    pub p_value: f64,
}

impl ChiSquaredResult {
    /// Whether the fit is rejected at significance level `alpha`.
    #[must_use]
    pub fn rejects(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Pearson correlation coefficient of two equally long samples.
///
/// Returns `None` when the lengths differ, fewer than two points are given,
/// or either sample has zero variance.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some(covariance / (var_x * var_y).sqrt())
}

/// Chi-squared goodness of fit of observed counts against expected weights.
///
/// `weights` need not be normalized. Categories with zero weight are skipped;
/// if any of them were observed the fit is rejected outright (`p_value` 0).
/// Returns `None` if fewer than two categories carry weight or nothing was
/// observed.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn chi_squared_from_counts(observed: &[u64], weights: &[f64]) -> Option<ChiSquaredResult> {
    if observed.len() != weights.len() {
        return None;
    }
    let total_count: u64 = observed.iter().sum();
    let total_weight: f64 = weights.iter().sum();
    if total_count == 0 || total_weight <= 0.0 {
        return None;
    }

    let mut statistic = 0.0;
    let mut categories = 0_usize;
    let mut impossible = false;
    for (&count, &weight) in observed.iter().zip(weights) {
        if weight <= 0.0 {
            impossible |= count > 0;
            continue;
        }
        let expected = total_count as f64 * weight / total_weight;
        let diff = count as f64 - expected;
        statistic += diff * diff / expected;
        categories += 1;
    }
    if categories < 2 {
        return None;
    }

    let degrees_of_freedom = categories - 1;
    let p_value = if impossible {
        0.0
    } else {
        chi_squared_sf(statistic, degrees_of_freedom)
    };
    Some(ChiSquaredResult {
        statistic,
        degrees_of_freedom,
        p_value,
    })
}

/// Survival function `P(X >= x)` of the chi-squared distribution.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn chi_squared_sf(x: f64, degrees_of_freedom: usize) -> f64 {
    if x <= 0.0 || degrees_of_freedom == 0 {
        return 1.0;
    }
    regularized_gamma_q(degrees_of_freedom as f64 / 2.0, x / 2.0)
}

const GAMMA_EPSILON: f64 = 1e-14;
const GAMMA_MAX_ITERATIONS: usize = 1000;

/// Upper regularized incomplete gamma function `Q(a, x)`.
///
/// Series expansion below `a + 1`, Lentz continued fraction above.
fn regularized_gamma_q(a: f64, x: f64) -> f64 {
    if x < a + 1.0 {
        1.0 - gamma_p_series(a, x)
    } else {
        gamma_q_continued_fraction(a, x)
    }
}

fn gamma_p_series(a: f64, x: f64) -> f64 {
    let mut term = 1.0 / a;
    let mut sum = term;
    let mut denominator = a;
    for _ in 0..GAMMA_MAX_ITERATIONS {
        denominator += 1.0;
        term *= x / denominator;
        sum += term;
        if term.abs() < sum.abs() * GAMMA_EPSILON {
            break;
        }
    }
    (sum.ln() - x + a * x.ln() - ln_gamma(a)).exp()
}

#[allow(clippy::cast_precision_loss)]
fn gamma_q_continued_fraction(a: f64, x: f64) -> f64 {
    let tiny = f64::MIN_POSITIVE / GAMMA_EPSILON;
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / tiny;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..=GAMMA_MAX_ITERATIONS {
        let i = i as f64;
        let an = -i * (i - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < tiny {
            d = tiny;
        }
        c = b + an / c;
        if c.abs() < tiny {
            c = tiny;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < GAMMA_EPSILON {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

/// Natural log of the gamma function (Lanczos approximation, g = 7).
fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // Reflection formula
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut sum = COEFFICIENTS[0];
    for (i, &coefficient) in COEFFICIENTS.iter().enumerate().skip(1) {
        #[allow(clippy::cast_precision_loss)]
        let offset = i as f64;
        sum += coefficient / (x + offset);
    }
    let t = x + 7.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}
