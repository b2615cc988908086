//! NaN-skipping row kernels
//!
//! Missing values are `NaN` and are left out of every statistic, so a row
//! from an outer join is reduced over the runs that logged the step.

/// Welford accumulator for numerically stable mean/variance
#[derive(Debug, Clone, Copy, Default)]
pub struct Welford {
    mean: f64,
    m2: f64,
    count: u32,
}

impl Welford {
    /// Accumulate every non-missing value of `xs`.
    #[must_use]
    pub fn from_row(xs: &[f64]) -> Self {
        let mut acc = Self::default();
        for &x in present(xs) {
            acc.update(x);
        }
        acc
    }

    /// Update with one sample in O(1)
    pub fn update(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / f64::from(self.count);
        self.m2 += delta * (x - self.mean);
    }

    /// Number of samples seen
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Sample variance (ddof = 1), `NaN` below two samples
    #[must_use]
    pub fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            f64::NAN
        } else {
            self.m2 / f64::from(self.count - 1)
        }
    }
}

fn present(xs: &[f64]) -> impl Iterator<Item = &f64> {
    xs.iter().filter(|x| !x.is_nan())
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn count(xs: &[f64]) -> f64 {
    present(xs).count() as f64
}

pub(crate) fn sum(xs: &[f64]) -> f64 {
    present(xs).sum()
}

pub(crate) fn prod(xs: &[f64]) -> f64 {
    present(xs).product()
}

pub(crate) fn mean(xs: &[f64]) -> f64 {
    let (total, n) = present(xs).fold((0.0, 0u32), |(total, n), x| (total + x, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        total / f64::from(n)
    }
}

pub(crate) fn var(xs: &[f64]) -> f64 {
    Welford::from_row(xs).sample_variance()
}

pub(crate) fn std(xs: &[f64]) -> f64 {
    var(xs).sqrt()
}

pub(crate) fn sem(xs: &[f64]) -> f64 {
    let acc = Welford::from_row(xs);
    (acc.sample_variance() / f64::from(acc.count())).sqrt()
}

pub(crate) fn min(xs: &[f64]) -> f64 {
    present(xs).copied().reduce(f64::min).unwrap_or(f64::NAN)
}

pub(crate) fn max(xs: &[f64]) -> f64 {
    present(xs).copied().reduce(f64::max).unwrap_or(f64::NAN)
}

pub(crate) fn median(xs: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = present(xs).copied().collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
