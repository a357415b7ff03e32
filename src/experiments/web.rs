//! The web-server study: either a single M/M/1/K queue under a chosen
//! service discipline (with uniform priority classes 1..4 for the priority
//! disciplines), or a CPU queue whose server routes through a random load
//! balancer into three IO queue/server loops that feed back into the CPU
//! queue. Thirty replicates with shifted seeds, reported as confidence
//! intervals.

use super::{run_to_stats, ReplicateSeries, REPLICATES, SEED_OFFSET, TRANSIENT_PERIOD};
use crate::arrivals::ArrivalSource;
use crate::balancer::RandomLoadBalancer;
use crate::network::{Network, Sink};
use crate::queue::{Discipline, Queue};
use crate::random::{
    ExponentialStream, PrioritySampler, ServiceSampler, UniformPriorityStream, UniformStream,
};
use crate::server::Server;
use crate::spy::SimulationSpy;
use crate::stats::{statistics, SimulationRunStats};
use crate::Result;

/// Which topology the study runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Single bounded queue, single server.
    Mm1,
    /// CPU queue + balancer + three IO loops.
    Cpu,
}

const MIN_PRIORITY: u32 = 1;
const MAX_PRIORITY: u32 = 4;

/// Run the full replicate study and print the report.
pub fn run(
    lambda: f64,
    max_cpu_queue_customers: usize,
    max_io_queue_customers: usize,
    customers_to_serve: u32,
    mode: Mode,
    discipline: Discipline,
) -> Result {
    let mut series = ReplicateSeries::default();
    for replicate in 0..REPLICATES {
        let stats = do_one_run(
            lambda,
            max_cpu_queue_customers,
            max_io_queue_customers,
            customers_to_serve,
            mode,
            discipline,
            replicate as i64 * SEED_OFFSET,
        )?;
        series.push(&stats);
    }

    series.print_loss_rates();
    series.print_waiting_times();
    println!(
        "System Time {}",
        statistics::confidence_interval_string(series.system_times())
    );
    Ok(())
}

/// One replicate of the study.
pub fn do_one_run(
    lambda: f64,
    max_cpu_queue_customers: usize,
    max_io_queue_customers: usize,
    customers_to_serve: u32,
    mode: Mode,
    discipline: Discipline,
    seed_offset: i64,
) -> Result<SimulationRunStats> {
    match mode {
        Mode::Mm1 => do_mm1k(
            lambda,
            max_cpu_queue_customers,
            customers_to_serve,
            discipline,
            seed_offset,
        ),
        Mode::Cpu => do_web_server(
            lambda,
            max_cpu_queue_customers,
            max_io_queue_customers,
            customers_to_serve,
            seed_offset,
        ),
    }
}

fn do_mm1k(
    lambda: f64,
    max_queue_customers: usize,
    customers_to_serve: u32,
    discipline: Discipline,
    seed_offset: i64,
) -> Result<SimulationRunStats> {
    const MU: f64 = 1.0;
    let service_seed = 1111 + seed_offset;
    let arrival_seed = 2222 + seed_offset;
    let priority_seed = 3333 + seed_offset;
    const QUEUE_NAME: &str = "Queue";

    let (priorities, min_priority, max_priority) = match discipline {
        Discipline::Fcfs | Discipline::LcfsNp | Discipline::SjfNp => {
            (PrioritySampler::default(), 0, 0)
        }
        Discipline::PrioNp | Discipline::PrioP => (
            PrioritySampler::Uniform(UniformPriorityStream::new(
                MIN_PRIORITY,
                MAX_PRIORITY,
                priority_seed,
            )),
            MIN_PRIORITY,
            MAX_PRIORITY,
        ),
    };

    let spy = SimulationSpy::new(0, &[QUEUE_NAME], TRANSIENT_PERIOD);
    let mut network = Network::new(spy);

    let queue = network.add_queue(Queue::with_priorities(
        QUEUE_NAME,
        max_queue_customers,
        discipline,
        ServiceSampler::Exponential(ExponentialStream::new(MU, service_seed)),
        Sink::Exit,
        min_priority,
        max_priority,
    )?);
    let server = network.add_server(Server::new("Server", queue, Sink::Exit));
    if discipline == Discipline::PrioP {
        network.register_for_preempts(queue, server);
    }
    let source = network.add_source(ArrivalSource::new(
        ExponentialStream::new(lambda, arrival_seed),
        priorities,
    ));
    network.source_mut(source).register_destination(Sink::Queue(queue));
    network.set_serviced_target(customers_to_serve);

    run_to_stats(network).map(|(stats, _)| stats)
}

fn do_web_server(
    lambda: f64,
    max_cpu_queue_customers: usize,
    max_io_queue_customers: usize,
    customers_to_serve: u32,
    seed_offset: i64,
) -> Result<SimulationRunStats> {
    const CPU_MU: f64 = 1.0;
    const IO_MU: f64 = 0.5;
    let arrival_seed = 1111 + seed_offset;
    let cpu_service_seed = 2222 + seed_offset;
    let io_service_seeds = [3333 + seed_offset, 4444 + seed_offset, 5555 + seed_offset];
    let load_balancer_seed = 6666 + seed_offset;

    const CPU_QUEUE_NAME: &str = "CPU_QUEUE";
    const IO_QUEUE_NAMES: [&str; 3] = ["IO_QUEUE1", "IO_QUEUE2", "IO_QUEUE3"];
    const IO_UPPER_PROBABILITIES: [f64; 3] = [0.1, 0.2, 0.3];

    let spy = SimulationSpy::new(
        0,
        &[
            CPU_QUEUE_NAME,
            IO_QUEUE_NAMES[0],
            IO_QUEUE_NAMES[1],
            IO_QUEUE_NAMES[2],
        ],
        TRANSIENT_PERIOD,
    );
    let mut network = Network::new(spy);

    let cpu_queue = network.add_queue(Queue::new(
        CPU_QUEUE_NAME,
        max_cpu_queue_customers,
        Discipline::Fcfs,
        ServiceSampler::Exponential(ExponentialStream::new(CPU_MU, cpu_service_seed)),
        Sink::Exit,
    )?);

    let mut io_queues = Vec::with_capacity(3);
    for (name, seed) in IO_QUEUE_NAMES.iter().zip(io_service_seeds) {
        io_queues.push(network.add_queue(Queue::new(
            name,
            max_io_queue_customers,
            Discipline::Fcfs,
            ServiceSampler::Exponential(ExponentialStream::new(IO_MU, seed)),
            Sink::Exit,
        )?));
    }

    let mut targets: Vec<(Sink, f64)> = io_queues
        .iter()
        .zip(IO_UPPER_PROBABILITIES)
        .map(|(queue, upper)| (Sink::Queue(*queue), upper))
        .collect();
    targets.push((Sink::Exit, 1.0));
    let balancer = network.add_balancer(RandomLoadBalancer::new(
        targets,
        UniformStream::new(load_balancer_seed),
    )?);

    network.add_server(Server::new("CPU_SERVER", cpu_queue, Sink::Balancer(balancer)));
    for (index, io_queue) in io_queues.iter().enumerate() {
        network.add_server(Server::new(
            &format!("IO_SERVER_{}", index + 1),
            *io_queue,
            Sink::Queue(cpu_queue),
        ));
    }

    let source = network.add_source(ArrivalSource::new(
        ExponentialStream::new(lambda, arrival_seed),
        PrioritySampler::default(),
    ));
    network
        .source_mut(source)
        .register_destination(Sink::Queue(cpu_queue));
    network.set_serviced_target(customers_to_serve);

    run_to_stats(network).map(|(stats, _)| stats)
}
