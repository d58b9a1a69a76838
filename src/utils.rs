//! Numeric helpers shared by the planner: stable logs, softmax, normalisation
//! and categorical sampling.

use rand::{Rng, distr::StandardUniform};

/// Floor applied before taking logarithms of probabilities.
pub const LOG_EPS: f64 = 1e-16;

/// Natural log with a small floor so that zero probabilities stay finite.
///
/// ```
/// use inductive_aif::utils::log_stable;
///
/// assert!(log_stable(0.0).is_finite());
/// assert_eq!(log_stable(1.0), (1.0f64 + 1e-16).ln());
/// ```
pub fn log_stable(value: f64) -> f64 {
    (value + LOG_EPS).ln()
}

/// Numerically stable softmax: subtracts the maximum before exponentiating.
///
/// Returns an empty vector for empty input. Entries at `+inf` share all the
/// mass; when every entry is `-inf` the result is uniform.
///
/// ```
/// use inductive_aif::utils::softmax;
///
/// let p = softmax(&[1.0, 1.0]);
/// assert_eq!(p, vec![0.5, 0.5]);
/// ```
pub fn softmax(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::INFINITY {
        let winners = values.iter().filter(|&&v| v == f64::INFINITY).count() as f64;
        return values
            .iter()
            .map(|&v| if v == f64::INFINITY { 1.0 / winners } else { 0.0 })
            .collect();
    }
    if !max.is_finite() {
        return uniform(values.len());
    }
    let exps: Vec<f64> = values.iter().map(|&v| (v - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Uniform distribution over `len` categories.
pub fn uniform(len: usize) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }
    vec![1.0 / len as f64; len]
}

/// Index of the largest entry; the first index wins ties. `None` for empty input.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Dot product of two equally long slices.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Calculate Shannon entropy from a probability distribution.
///
/// The Shannon entropy is calculated as: H = -Σ(p * ln(p)) for p > 0
///
/// ```
/// use inductive_aif::utils::shannon_entropy;
///
/// let entropy = shannon_entropy(vec![0.5, 0.5]);
/// assert!((entropy - std::f64::consts::LN_2).abs() < 0.001);
/// ```
pub fn shannon_entropy<I>(probabilities: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    probabilities
        .into_iter()
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.ln())
        .sum()
}

/// Normalise every factor of a belief, falling back to uniform for factors
/// with no usable mass.
pub fn normalize_beliefs(qs: &[Vec<f64>]) -> Vec<Vec<f64>> {
    qs.iter()
        .map(|q| {
            let total: f64 = q.iter().sum();
            if total.is_finite() && total > 0.0 {
                q.iter().map(|&p| p / total).collect()
            } else {
                uniform(q.len())
            }
        })
        .collect()
}

/// Draw an index from a categorical distribution given by (unnormalised) weights.
///
/// Falls back to a uniform draw when all weights are zero. Returns `None` for
/// empty input.
///
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use inductive_aif::utils::sample_categorical;
///
/// let mut rng = StdRng::seed_from_u64(42);
/// assert_eq!(sample_categorical(&mut rng, &[0.0, 1.0, 0.0]), Some(1));
/// ```
pub fn sample_categorical<R: Rng>(rng: &mut R, weights: &[f64]) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }

    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if !total.is_finite() || total <= 0.0 {
        return Some(rng.random_range(0..weights.len()));
    }

    let mut threshold = rng.sample::<f64, _>(StandardUniform) * total;
    for (idx, &weight) in weights.iter().enumerate() {
        let w = weight.max(0.0);
        if threshold < w {
            return Some(idx);
        }
        threshold -= w;
    }

    // Rounding can leave a sliver of mass at the end.
    weights.iter().rposition(|&w| w > 0.0)
}
