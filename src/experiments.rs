//! Experiment drivers: wire a topology, run replicates, print confidence
//! intervals.
//!
//! Each driver builds its network from the same parts - arrival source,
//! queues, servers, spy - runs until the configured number of customers has
//! been serviced, and copies the spy's derived statistics into a
//! [`SimulationRunStats`]. The `run_*` entry points repeat that for a batch
//! of replicates with shifted seeds and print 95% confidence intervals;
//! `do_one_run` stays print-free so tests can compare replicates directly.

pub mod mgk;
pub mod mm1k;
pub mod web;

use crate::network::Network;
use crate::spy::ALL_PRIORITIES;
use crate::stats::{statistics, SimulationRunStats};
use crate::{Result, Simulation};
use std::collections::BTreeMap;

/// Shifts every stream seed between replicates so they are independent.
pub const SEED_OFFSET: i64 = 1_000_000;

/// Replicates per study, each contributing one scalar to every interval.
pub const REPLICATES: usize = 30;

/// Exited customers to discard as warm-up in the replicate studies.
pub const TRANSIENT_PERIOD: u32 = 1000;

/// Per-replicate scalars, keyed the way the spy keys its derived statistics.
#[derive(Debug, Default)]
pub(crate) struct ReplicateSeries {
    customer_loss_rates: BTreeMap<String, BTreeMap<u32, Vec<f64>>>,
    average_waiting_times: BTreeMap<String, BTreeMap<u32, Vec<f64>>>,
    system_times: Vec<f64>,
    service_times: Vec<f64>,
    end_times: Vec<f64>,
    slowdown_percentiles: Vec<Vec<f64>>,
}

impl ReplicateSeries {
    pub fn push(&mut self, stats: &SimulationRunStats) {
        for (name, by_priority) in stats.customer_loss_rates() {
            for (priority, rate) in by_priority {
                self.customer_loss_rates
                    .entry(name.clone())
                    .or_default()
                    .entry(*priority)
                    .or_default()
                    .push(*rate);
            }
        }
        for (name, by_priority) in stats.average_waiting_times() {
            for (priority, time) in by_priority {
                self.average_waiting_times
                    .entry(name.clone())
                    .or_default()
                    .entry(*priority)
                    .or_default()
                    .push(*time);
            }
        }
        self.system_times.push(stats.average_system_time());
        self.service_times.push(stats.average_service_time());
        self.end_times.push(stats.simulation_end_time());
        self.slowdown_percentiles
            .push(stats.average_slowdown_percentiles().to_vec());
    }

    pub fn system_times(&self) -> &[f64] {
        &self.system_times
    }

    pub fn service_times(&self) -> &[f64] {
        &self.service_times
    }

    pub fn end_times(&self) -> &[f64] {
        &self.end_times
    }

    /// One replicate scalar per run for the given queue/priority cell.
    pub fn waiting_time_series(&self, queue: &str, priority: u32) -> Option<&Vec<f64>> {
        self.average_waiting_times
            .get(queue)
            .and_then(|by_priority| by_priority.get(&priority))
    }

    /// One replicate scalar per run for the given slowdown percentile bin.
    pub fn slowdown_series(&self, bin: usize) -> Vec<f64> {
        self.slowdown_percentiles
            .iter()
            .filter_map(|bins| bins.get(bin).copied())
            .collect()
    }

    pub fn print_loss_rates(&self) {
        println!();
        println!("Customer Loss Rates:");
        for (name, by_priority) in &self.customer_loss_rates {
            println!("{}:", name);
            for (priority, rates) in by_priority {
                println!(
                    "    Priority_{}: CLR: {}",
                    priority_label(*priority),
                    statistics::confidence_interval_string(rates)
                );
            }
        }
        println!();
    }

    pub fn print_waiting_times(&self) {
        println!();
        println!("Waiting Times:");
        for (name, by_priority) in &self.average_waiting_times {
            println!("{}:", name);
            for (priority, times) in by_priority {
                println!(
                    "    Priority_{}: Waiting Time: {}",
                    priority_label(*priority),
                    statistics::confidence_interval_string(times)
                );
            }
        }
        println!();
    }
}

/// Start a wired network, run it to its serviced target, and copy the spy's
/// derived statistics out, together with any additional-stat snapshot lines.
pub(crate) fn run_to_stats(network: Network) -> Result<(SimulationRunStats, Vec<String>)> {
    let mut simulation = Simulation::new(network);
    {
        let (network, scheduler) = simulation.parts_mut();
        network.start(scheduler)?;
    }
    simulation.run()?;

    let end_time = simulation.scheduler().time();
    let spy = simulation.world().spy();
    let stats = SimulationRunStats::new(
        spy.customer_loss_rates(),
        spy.average_waiting_times(),
        spy.average_system_time(),
        spy.average_service_time(),
        spy.average_slowdown_percentiles(),
        end_time,
    );
    Ok((stats, spy.additional_stats().to_vec()))
}

fn priority_label(priority: u32) -> String {
    if priority == ALL_PRIORITIES {
        "AVERAGE".to_string()
    } else {
        priority.to_string()
    }
}

/// Deterministic replay check behind the binary's `--test` flag: the same
/// seeds and parameters must reproduce the same statistics bit for bit.
pub fn self_check() -> bool {
    let first = mm1k::do_one_run(1.0, 20, 500, 100);
    let second = mm1k::do_one_run(1.0, 20, 500, 100);
    match (first, second) {
        (Ok(first), Ok(second)) => first == second,
        _ => false,
    }
}
