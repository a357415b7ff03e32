//! Scripted preemption scenarios against a preemptive-priority station:
//! one PRIO_P queue with constant service demands, one server, customers
//! injected at chosen instants.

mod util;

use qnsim::network::{Network, QueueId, ServerId, Sink};
use qnsim::queue::{Discipline, Queue};
use qnsim::random::ServiceSampler;
use qnsim::scheduler::{Event, Scheduler};
use qnsim::server::Server;
use qnsim::spy::{SimulationSpy, ALL_PRIORITIES, ALL_QUEUES};

/// Delivers a fresh customer of the given class to the queue when it fires.
#[derive(Debug)]
struct Inject {
    priority: u32,
    queue: QueueId,
}

impl Event<Network> for Inject {
    fn execute(
        &mut self,
        network: &mut Network,
        scheduler: &mut Scheduler<Network>,
    ) -> qnsim::Result {
        network.inject_customer(scheduler, self.priority, Sink::Queue(self.queue))?;
        Ok(())
    }
}

fn preemptive_station(service_demand: f64) -> (Network, Scheduler<Network>, QueueId, ServerId) {
    let spy = SimulationSpy::new(1000, &["q"], 0);
    let mut network = Network::new(spy);
    let queue = network.add_queue(
        Queue::with_priorities(
            "q",
            12,
            Discipline::PrioP,
            ServiceSampler::Constant(service_demand),
            Sink::Exit,
            1,
            4,
        )
        .unwrap(),
    );
    let server = network.add_server(Server::new("Server", queue, Sink::Exit));
    network.register_for_preempts(queue, server);

    let mut scheduler = Scheduler::new();
    network.start(&mut scheduler).unwrap();
    (network, scheduler, queue, server)
}

#[test]
fn higher_priority_arrival_preempts_and_preserves_residual_work() {
    let (mut network, mut scheduler, queue, server) = preemptive_station(10.0);

    // A (class 2) goes straight into service at t=0, to depart at t=10
    let a = network
        .inject_customer(&mut scheduler, 2, Sink::Queue(queue))
        .unwrap();
    assert_eq!(network.server(server).current_customer(), Some(a));
    let b = a + 1;
    let c = a + 2;

    // B (class 1) arrives at t=6 and displaces A; C (class 2) arrives in the
    // same instant and queues behind A
    scheduler
        .register_job(6.0, Inject { priority: 1, queue })
        .unwrap();
    scheduler
        .register_job(6.0, Inject { priority: 2, queue })
        .unwrap();
    scheduler.advance_time(&mut network).unwrap();

    assert_eq!(scheduler.time(), 6.0);
    assert_eq!(
        network.server(server).current_customer(),
        Some(b),
        "the class-1 arrival took the slot"
    );
    assert_eq!(
        network.customer(a).unwrap().service_time(),
        4.0,
        "the displaced customer keeps its residual demand"
    );
    assert_eq!(network.queue(queue).size(), 2, "A and C are waiting");

    // B holds the server for its full demand; A then resumes head-of-line
    scheduler.advance_time(&mut network).unwrap();
    assert_eq!(scheduler.time(), 16.0);
    assert_eq!(
        network.server(server).current_customer(),
        Some(a),
        "the displaced customer restarts before the later arrival"
    );

    // A's two service segments sum to its originally sampled demand
    scheduler.advance_time(&mut network).unwrap();
    assert_eq!(scheduler.time(), 20.0, "6 + 4 residual after the 10 for B");
    assert_eq!(network.server(server).current_customer(), Some(c));

    scheduler.advance_time(&mut network).unwrap();
    assert_eq!(scheduler.time(), 30.0);

    let spy = network.spy();
    assert_eq!(spy.total_serviced(), 3);

    // A waited 16 (6 preempted-in-service + 10 queued), B waited 0, C 14
    let waits = spy.average_waiting_times();
    assert_close!(
        waits[ALL_QUEUES][&ALL_PRIORITIES],
        10.0,
        "mean total wait per customer"
    );
    assert_close!(waits["q"][&1], 0.0, "the preemptor never waited");
    assert_close!(waits["q"][&2], 15.0, "A and C carried all the waiting");

    // conservation: system = waiting + service for every class
    assert_close!(
        spy.average_system_time(),
        (20.0 + 10.0 + 24.0) / 3.0,
        "mean sojourn"
    );
    assert_close!(
        spy.average_service_time(),
        (4.0 + 10.0 + 10.0) / 3.0,
        "final service fields hold the last residual"
    );
}

#[test]
fn equal_priority_arrival_does_not_preempt() {
    let (mut network, mut scheduler, queue, server) = preemptive_station(10.0);

    let a = network
        .inject_customer(&mut scheduler, 2, Sink::Queue(queue))
        .unwrap();

    scheduler
        .register_job(3.0, Inject { priority: 2, queue })
        .unwrap();
    scheduler.advance_time(&mut network).unwrap();

    assert_eq!(
        network.server(server).current_customer(),
        Some(a),
        "a tie leaves the slot alone"
    );
    assert_eq!(
        network.customer(a).unwrap().service_time(),
        10.0,
        "no residual was computed"
    );
    assert_eq!(network.queue(queue).size(), 1, "the arrival queued normally");

    // the original departure still stands
    scheduler.advance_time(&mut network).unwrap();
    assert_eq!(scheduler.time(), 10.0);
}

#[test]
fn lower_priority_arrival_does_not_preempt() {
    let (mut network, mut scheduler, queue, server) = preemptive_station(10.0);

    let a = network
        .inject_customer(&mut scheduler, 2, Sink::Queue(queue))
        .unwrap();

    scheduler
        .register_job(3.0, Inject { priority: 3, queue })
        .unwrap();
    scheduler.advance_time(&mut network).unwrap();

    assert_eq!(network.server(server).current_customer(), Some(a));
    assert_eq!(network.queue(queue).size(), 1);
}

#[test]
fn displaced_customer_overflowing_its_bucket_evicts_the_newest_entry() {
    // bucket capacity is 12 / 4 classes = 3
    let (mut network, mut scheduler, queue, server) = preemptive_station(10.0);

    // A in service, then three class-2 customers fill the class-2 bucket
    let a = network
        .inject_customer(&mut scheduler, 2, Sink::Queue(queue))
        .unwrap();
    for _ in 0..3 {
        network
            .inject_customer(&mut scheduler, 2, Sink::Queue(queue))
            .unwrap();
    }
    let newest = a + 3;
    assert_eq!(network.queue(queue).size(), 3, "class-2 bucket is full");

    // the class-1 preemptor pushes A back in at the head; the bucket is now
    // over capacity, and its newest entry is dropped
    scheduler
        .register_job(2.0, Inject { priority: 1, queue })
        .unwrap();
    scheduler.advance_time(&mut network).unwrap();

    assert_eq!(network.queue(queue).size(), 3, "bucket back at capacity");
    assert!(
        network.customer(newest).is_err(),
        "the newest class-2 entry was dropped from the system"
    );
    assert_eq!(
        network.customer(a).unwrap().service_time(),
        8.0,
        "A keeps the residual from its 2 seconds of service"
    );
    assert_eq!(network.server(server).current_customer(), Some(a + 4));

    let rates = network.spy().customer_loss_rates();
    assert_close!(rates["q"][&2], 1.0, "the only finished class-2 journey was a drop");
}
