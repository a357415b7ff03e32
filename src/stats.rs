use crate::spy::QueuePriorityStats;

/// The measurements one finished replicate hands back to its driver.
///
/// Everything is plain data copied off the spy at the end of the run, so
/// replicates can be compared (the determinism tests do) and aggregated into
/// confidence intervals without keeping the simulation alive.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRunStats {
    customer_loss_rates: QueuePriorityStats,
    average_waiting_times: QueuePriorityStats,
    average_system_time: f64,
    average_service_time: f64,
    /// Mean slowdown per service-time percentile; empty when the run's
    /// service distribution has no percentile mapping.
    average_slowdown_percentiles: Vec<f64>,
    simulation_end_time: f64,
}

impl SimulationRunStats {
    pub fn new(
        customer_loss_rates: QueuePriorityStats,
        average_waiting_times: QueuePriorityStats,
        average_system_time: f64,
        average_service_time: f64,
        average_slowdown_percentiles: Vec<f64>,
        simulation_end_time: f64,
    ) -> Self {
        Self {
            customer_loss_rates,
            average_waiting_times,
            average_system_time,
            average_service_time,
            average_slowdown_percentiles,
            simulation_end_time,
        }
    }

    pub fn customer_loss_rates(&self) -> &QueuePriorityStats {
        &self.customer_loss_rates
    }

    pub fn average_waiting_times(&self) -> &QueuePriorityStats {
        &self.average_waiting_times
    }

    pub fn average_system_time(&self) -> f64 {
        self.average_system_time
    }

    pub fn average_service_time(&self) -> f64 {
        self.average_service_time
    }

    pub fn average_slowdown_percentiles(&self) -> &[f64] {
        &self.average_slowdown_percentiles
    }

    /// The virtual clock value when the run's termination condition was met.
    pub fn simulation_end_time(&self) -> f64 {
        self.simulation_end_time
    }
}

/// Sample statistics over replicate scalars.
pub mod statistics {
    const Z_FOR_95_PERCENT_CONFIDENCE: f64 = 1.960;

    pub fn sample_mean(items: &[f64]) -> f64 {
        items.iter().sum::<f64>() / items.len() as f64
    }

    /// Bessel-corrected sample variance.
    pub fn sample_variance(items: &[f64], mean: f64) -> f64 {
        let sum_of_squared_differences: f64 = items
            .iter()
            .map(|item| {
                let difference = item - mean;
                difference * difference
            })
            .sum();
        sum_of_squared_differences / (items.len() - 1) as f64
    }

    /// Render `"mean ± half-width"` with a 95% confidence half-width of
    /// `1.960 * sqrt(variance) / sqrt(n)`. A single replicate has no spread
    /// and renders a half-width of 0.
    pub fn confidence_interval_string(items: &[f64]) -> String {
        let mean = sample_mean(items);
        let offset = if items.len() < 2 {
            0.0
        } else {
            let variance = sample_variance(items, mean);
            Z_FOR_95_PERCENT_CONFIDENCE * variance.sqrt() / (items.len() as f64).sqrt()
        };
        format!("{} ± {}", mean, offset)
    }
}
