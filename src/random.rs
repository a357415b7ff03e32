//! Seeded random streams.
//!
//! Every stream owns its own [`Pcg64`] generator, so independent streams are
//! obtained by seeding with caller-chosen offsets and an identical seed always
//! reproduces an identical sequence. Draws that feed a logarithm or a
//! division are taken from the open interval (0, 1), so no stream can ever
//! produce a zero, an infinity, or a NaN.

use rand::{Rng, SeedableRng};
use rand_distr::Open01;
use rand_pcg::Pcg64;

fn seeded_rng(seed: i64) -> Pcg64 {
    Pcg64::seed_from_u64(seed as u64)
}

/// Exponentially distributed interarrival or service times with the given
/// rate, sampled by inversion of an open uniform draw.
#[derive(Debug, Clone)]
pub struct ExponentialStream {
    rate: f64,
    rng: Pcg64,
}

impl ExponentialStream {
    pub fn new(rate: f64, seed: i64) -> Self {
        Self {
            rate,
            rng: seeded_rng(seed),
        }
    }

    /// The next sample. Strictly positive.
    pub fn sample(&mut self) -> f64 {
        let draw: f64 = self.rng.sample(Open01);
        draw.ln() / -self.rate
    }
}

/// Uniform draws from the open interval (0, 1).
#[derive(Debug, Clone)]
pub struct UniformStream {
    rng: Pcg64,
}

impl UniformStream {
    pub fn new(seed: i64) -> Self {
        Self {
            rng: seeded_rng(seed),
        }
    }

    /// The next sample, never exactly 0.0 or 1.0.
    pub fn sample(&mut self) -> f64 {
        self.rng.sample(Open01)
    }
}

/// Bounded Pareto draws on (lower, upper) with shape `alpha`, by inverse CDF.
#[derive(Debug, Clone)]
pub struct BoundedParetoStream {
    lower: f64,
    upper: f64,
    alpha: f64,
    rng: Pcg64,
}

impl BoundedParetoStream {
    pub fn new(lower: f64, upper: f64, alpha: f64, seed: i64) -> Self {
        Self {
            lower,
            upper,
            alpha,
            rng: seeded_rng(seed),
        }
    }

    /// The next sample.
    pub fn sample(&mut self) -> f64 {
        let draw: f64 = self.rng.sample(Open01);
        self.value_at(draw)
    }

    /// The value below which the given fraction of the distribution's mass
    /// lies. Monotonically non-decreasing in `percentile`;
    /// `percentile_to_value(0.0)` is the lower bound and
    /// `percentile_to_value(1.0)` the upper.
    pub fn percentile_to_value(&self, percentile: f64) -> f64 {
        self.value_at(percentile.clamp(0.0, 1.0))
    }

    fn value_at(&self, fraction: f64) -> f64 {
        let lower_mass = (1.0 - fraction) * self.lower.powf(-self.alpha);
        let upper_mass = fraction * self.upper.powf(-self.alpha);
        (lower_mass + upper_mass).powf(-1.0 / self.alpha)
    }
}

/// Uniformly distributed integer priority classes in `[min, max]`.
#[derive(Debug, Clone)]
pub struct UniformPriorityStream {
    min: u32,
    max: u32,
    draws: UniformStream,
}

impl UniformPriorityStream {
    pub fn new(min: u32, max: u32, seed: i64) -> Self {
        Self {
            min,
            max,
            draws: UniformStream::new(seed),
        }
    }

    pub fn sample(&mut self) -> u32 {
        let zero_to_one = self.draws.sample();
        let spread = f64::from(self.max - self.min + 1);
        let priority = (spread * zero_to_one) as u32 + self.min;
        // a draw at the top of the interval would otherwise round past max
        priority.min(self.max)
    }
}

/// The service-time distribution a queue stamps onto admitted customers.
///
/// A closed set of variants rather than a boxed closure: the experiments in
/// this crate use exactly these shapes, and exhaustive matching keeps a new
/// distribution from sneaking in without its wiring.
#[derive(Debug, Clone)]
pub enum ServiceSampler {
    Exponential(ExponentialStream),
    BoundedPareto(BoundedParetoStream),
    /// Fixed service demand; used by tests that need scripted timings.
    Constant(f64),
}

impl ServiceSampler {
    pub fn sample(&mut self) -> f64 {
        match self {
            Self::Exponential(stream) => stream.sample(),
            Self::BoundedPareto(stream) => stream.sample(),
            Self::Constant(value) => *value,
        }
    }
}

/// The priority class assigned to newly created customers.
#[derive(Debug, Clone)]
pub enum PrioritySampler {
    Constant(u32),
    Uniform(UniformPriorityStream),
}

impl PrioritySampler {
    pub fn sample(&mut self) -> u32 {
        match self {
            Self::Constant(priority) => *priority,
            Self::Uniform(stream) => stream.sample(),
        }
    }
}

impl Default for PrioritySampler {
    /// Priority 0: the sentinel for "no priority classes in use".
    fn default() -> Self {
        Self::Constant(0)
    }
}
