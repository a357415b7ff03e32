//! The M/M/1/K study: one exponential arrival source, one bounded FCFS
//! queue, one server. A single run with no warm-up discard, reporting loss
//! rate, mean service and waiting time, and the snapshot statistics around
//! the configured customer id.

use super::run_to_stats;
use crate::arrivals::ArrivalSource;
use crate::network::{Network, Sink};
use crate::queue::{Discipline, Queue};
use crate::random::{ExponentialStream, PrioritySampler, ServiceSampler};
use crate::server::Server;
use crate::spy::{SimulationSpy, ALL_PRIORITIES, ALL_QUEUES};
use crate::stats::SimulationRunStats;
use crate::Result;

const MU: f64 = 1.0;
const SERVICE_SEED: i64 = 1234;
const ARRIVAL_SEED: i64 = 4321;
const QUEUE_NAME: &str = "Queue";

/// One complete M/M/1/K run. `snapshot_base` is the L parameter: the ids
/// around which the spy records in-system snapshots.
pub fn do_one_run(
    lambda: f64,
    max_queue_customers: usize,
    customers_to_serve: u32,
    snapshot_base: u32,
) -> Result<(SimulationRunStats, Vec<String>)> {
    let spy = SimulationSpy::new(snapshot_base, &[QUEUE_NAME], 0);
    let mut network = Network::new(spy);

    let queue = network.add_queue(Queue::new(
        QUEUE_NAME,
        max_queue_customers,
        Discipline::Fcfs,
        ServiceSampler::Exponential(ExponentialStream::new(MU, SERVICE_SEED)),
        Sink::Exit,
    )?);
    network.add_server(Server::new("Server", queue, Sink::Exit));
    let source = network.add_source(ArrivalSource::new(
        ExponentialStream::new(lambda, ARRIVAL_SEED),
        PrioritySampler::default(),
    ));
    network.source_mut(source).register_destination(Sink::Queue(queue));
    network.set_serviced_target(customers_to_serve);

    run_to_stats(network)
}

/// Run the study and print the report.
pub fn run(
    lambda: f64,
    max_queue_customers: usize,
    customers_to_serve: u32,
    snapshot_base: u32,
) -> Result {
    let (stats, additional_stats) =
        do_one_run(lambda, max_queue_customers, customers_to_serve, snapshot_base)?;

    let overall = |table: &crate::spy::QueuePriorityStats| {
        table
            .get(ALL_QUEUES)
            .and_then(|block| block.get(&ALL_PRIORITIES))
            .copied()
            .unwrap_or(0.0)
    };

    println!("Lambda: {}", lambda);
    println!("K: {}", max_queue_customers);
    println!("C: {}", customers_to_serve);
    println!("Master Clock Value: {}", stats.simulation_end_time());
    println!("CLR = {}", overall(stats.customer_loss_rates()));
    println!("Average Service Time = {}", stats.average_service_time());
    println!("Average Waiting Time = {}", overall(stats.average_waiting_times()));
    for line in additional_stats {
        println!("{}", line);
    }
    Ok(())
}
