//! The M/G/k study: one unbounded queue (FCFS or shortest-job-first) feeding
//! one or three servers, with exponential or bounded-Pareto service demands.
//! The Pareto modes wire the distribution's percentile map into the spy so
//! slowdowns are reported by service-time percentile. Thirty replicates with
//! shifted seeds, reported as confidence intervals.

use super::{run_to_stats, ReplicateSeries, REPLICATES, SEED_OFFSET, TRANSIENT_PERIOD};
use crate::arrivals::ArrivalSource;
use crate::network::{Network, Sink};
use crate::queue::{Discipline, Queue};
use crate::random::{BoundedParetoStream, ExponentialStream, PrioritySampler, ServiceSampler};
use crate::server::Server;
use crate::spy::{SimulationSpy, ALL_PRIORITIES, ALL_QUEUES};
use crate::stats::{statistics, SimulationRunStats};
use crate::Result;

/// Which service distribution and how many servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Exponential service, three servers.
    Mm3,
    /// Bounded-Pareto service, three servers.
    Mg3,
    /// Bounded-Pareto service, one server.
    Mg1,
}

const MU: f64 = 1.0 / 3000.0;
const PARETO_LOWER: f64 = 332.0;
const PARETO_UPPER: f64 = 1e10;
const PARETO_ALPHA: f64 = 1.1;
const QUEUE_NAME: &str = "QUEUE";

/// Run the full replicate study and print the report.
pub fn run(lambda: f64, customers_to_serve: u32, discipline: Discipline, mode: Mode) -> Result {
    let mut series = ReplicateSeries::default();
    for replicate in 0..REPLICATES {
        let stats = do_one_run(
            lambda,
            customers_to_serve,
            discipline,
            mode,
            replicate as i64 * SEED_OFFSET,
        )?;
        series.push(&stats);
    }

    println!("Lambda: {}", lambda);
    println!("C: {}", customers_to_serve);
    println!(
        "Master Clock Value: {}",
        statistics::confidence_interval_string(series.end_times())
    );
    if let Some(waits) = series.waiting_time_series(ALL_QUEUES, ALL_PRIORITIES) {
        println!(
            "Waiting Time: {}",
            statistics::confidence_interval_string(waits)
        );
    }
    println!(
        "Service Time {}",
        statistics::confidence_interval_string(series.service_times())
    );
    println!(
        "System Time {}",
        statistics::confidence_interval_string(series.system_times())
    );

    if mode != Mode::Mm3 {
        println!();
        println!("Slowdown by Service-Time Percentile:");
        for bin in (9..100).step_by(10) {
            println!(
                "    P{}: {}",
                bin + 1,
                statistics::confidence_interval_string(&series.slowdown_series(bin))
            );
        }
    }
    Ok(())
}

/// One replicate of the study.
pub fn do_one_run(
    lambda: f64,
    customers_to_serve: u32,
    discipline: Discipline,
    mode: Mode,
    seed_offset: i64,
) -> Result<SimulationRunStats> {
    let arrival_seed = 1111 + seed_offset;
    let service_seed = 2222 + seed_offset;

    let service_times = match mode {
        Mode::Mm3 => ServiceSampler::Exponential(ExponentialStream::new(MU, service_seed)),
        Mode::Mg3 | Mode::Mg1 => ServiceSampler::BoundedPareto(BoundedParetoStream::new(
            PARETO_LOWER,
            PARETO_UPPER,
            PARETO_ALPHA,
            service_seed,
        )),
    };

    let mut spy = SimulationSpy::new(0, &[QUEUE_NAME], TRANSIENT_PERIOD);
    if mode != Mode::Mm3 {
        let percentiles =
            BoundedParetoStream::new(PARETO_LOWER, PARETO_UPPER, PARETO_ALPHA, service_seed);
        spy.set_percentile_mapping(Box::new(move |percentile| {
            percentiles.percentile_to_value(percentile)
        }));
    }

    let mut network = Network::new(spy);
    let queue = network.add_queue(Queue::new(
        QUEUE_NAME,
        usize::MAX,
        discipline,
        service_times,
        Sink::Exit,
    )?);

    let server_names: &[&str] = match mode {
        Mode::Mm3 | Mode::Mg3 => &["server1", "server2", "server3"],
        Mode::Mg1 => &["server"],
    };
    for name in server_names {
        network.add_server(Server::new(name, queue, Sink::Exit));
    }

    let source = network.add_source(ArrivalSource::new(
        ExponentialStream::new(lambda, arrival_seed),
        PrioritySampler::default(),
    ));
    network.source_mut(source).register_destination(Sink::Queue(queue));
    network.set_serviced_target(customers_to_serve);

    run_to_stats(network).map(|(stats, _)| stats)
}
