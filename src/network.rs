use crate::arrivals::ArrivalSource;
use crate::balancer::RandomLoadBalancer;
use crate::customer::{Customer, CustomerId, CustomerStore, EventKind, PlaceKind};
use crate::queue::{Discipline, Queue};
use crate::scheduler::{Event, Scheduler};
use crate::server::Server;
use crate::spy::SimulationSpy;
use crate::world::SimWorld;
use crate::{Error, Result};
use log::debug;

pub type SourceId = usize;
pub type QueueId = usize;
pub type ServerId = usize;
pub type BalancerId = usize;

/// Where a component sends a customer it is finished with.
///
/// The whole topology is a fixed-at-wire-time graph of these edges: queues
/// drop to their exit sink, servers hand completed customers to theirs,
/// balancers fan out over a probability split of sinks, and arrival sources
/// deliver to their registered destinations. `Exit` leaves the system - the
/// spy consumes the customer's trace and the record is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    Queue(QueueId),
    Balancer(BalancerId),
    Exit,
}

/// The simulated queueing network: every component of one run, owned in one
/// place.
///
/// Components refer to each other by id (`QueueId`, `ServerId`, ...) and to
/// customers by [`CustomerId`] into the owned [`CustomerStore`], so the
/// delivery graph contains no reference cycles and no shared mutable state.
/// Events scheduled on the [`Scheduler`] carry ids and re-enter the network
/// through [`Event::execute`]; everything a dispatched event causes -
/// admissions, drops, hand-offs, preemptions, measurements - happens
/// synchronously inside that dispatch.
pub struct Network {
    customers: CustomerStore,
    sources: Vec<ArrivalSource>,
    queues: Vec<Queue>,
    servers: Vec<Server>,
    balancers: Vec<RandomLoadBalancer>,
    spy: SimulationSpy,
    next_customer_id: CustomerId,
    serviced_target: u32,
}

impl Network {
    pub fn new(spy: SimulationSpy) -> Self {
        Self {
            customers: CustomerStore::new(),
            sources: Vec::new(),
            queues: Vec::new(),
            servers: Vec::new(),
            balancers: Vec::new(),
            spy,
            next_customer_id: 0,
            serviced_target: 0,
        }
    }

    /// Stop the run once this many customers have been serviced (counted
    /// since the spy's last transient reset). Zero means never.
    pub fn set_serviced_target(&mut self, target: u32) {
        self.serviced_target = target;
    }

    pub fn add_source(&mut self, source: ArrivalSource) -> SourceId {
        self.sources.push(source);
        self.sources.len() - 1
    }

    pub fn add_queue(&mut self, queue: Queue) -> QueueId {
        self.queues.push(queue);
        self.queues.len() - 1
    }

    pub fn add_server(&mut self, server: Server) -> ServerId {
        self.servers.push(server);
        self.servers.len() - 1
    }

    pub fn add_balancer(&mut self, balancer: RandomLoadBalancer) -> BalancerId {
        self.balancers.push(balancer);
        self.balancers.len() - 1
    }

    /// Let a preemptive-priority queue displace the customer in service at
    /// `server` when a more important customer arrives.
    pub fn register_for_preempts(&mut self, queue: QueueId, server: ServerId) {
        self.queues[queue].register_for_preempts(server);
    }

    pub fn source_mut(&mut self, source: SourceId) -> &mut ArrivalSource {
        &mut self.sources[source]
    }

    pub fn queue(&self, queue: QueueId) -> &Queue {
        &self.queues[queue]
    }

    pub fn server(&self, server: ServerId) -> &Server {
        &self.servers[server]
    }

    pub fn spy(&self) -> &SimulationSpy {
        &self.spy
    }

    pub fn spy_mut(&mut self) -> &mut SimulationSpy {
        &mut self.spy
    }

    /// Look up a live customer.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownCustomer`] once the customer has left the system.
    pub fn customer(&self, id: CustomerId) -> Result<&Customer> {
        self.customers.get(id)
    }

    /// Customers currently alive anywhere in the system, including ones whose
    /// arrival is still scheduled.
    pub fn live_customers(&self) -> usize {
        self.customers.len()
    }

    /// Start the run: every server requests its first customer and every
    /// arrival source schedules its first arrival.
    ///
    /// # Errors
    ///
    /// Forwards scheduling failures.
    pub fn start(&mut self, scheduler: &mut Scheduler<Self>) -> Result {
        for server in 0..self.servers.len() {
            self.server_request_refill(scheduler, server)?;
        }
        for source in 0..self.sources.len() {
            self.schedule_next_arrival(scheduler, source)?;
        }
        Ok(())
    }

    /// Create a customer at the current virtual time and hand it straight to
    /// a sink. The spy sees it enter the system first. Experiment drivers use
    /// arrival sources instead; this entry point exists for scripted
    /// scenarios and tests.
    ///
    /// # Errors
    ///
    /// Forwards delivery failures.
    pub fn inject_customer(
        &mut self,
        scheduler: &mut Scheduler<Self>,
        priority: u32,
        sink: Sink,
    ) -> Result<CustomerId> {
        let id = self.create_customer(scheduler.time(), priority);
        self.spy.on_entering(self.customers.get(id)?);
        self.deliver(scheduler, id, sink)?;
        Ok(id)
    }

    fn create_customer(&mut self, arrival_time: f64, priority: u32) -> CustomerId {
        let id = self.next_customer_id;
        self.next_customer_id += 1;
        self.customers.insert(Customer::new(id, arrival_time, priority));
        id
    }

    fn schedule_next_arrival(&mut self, scheduler: &mut Scheduler<Self>, source: SourceId) -> Result {
        let (arrival_time, priority) = self.sources[source].next_arrival();
        let customer = self.create_customer(arrival_time, priority);
        debug!(
            "source {}: customer {} will arrive at {}",
            source, customer, arrival_time
        );
        scheduler.register_job(arrival_time, ArrivalEvent { source, customer })?;
        Ok(())
    }

    fn customer_arrived(
        &mut self,
        scheduler: &mut Scheduler<Self>,
        source: SourceId,
        customer: CustomerId,
    ) -> Result {
        debug!(
            "source {}: delivering customer {} at {}",
            source,
            customer,
            scheduler.time()
        );
        self.spy.on_entering(self.customers.get(customer)?);
        let destinations = self.sources[source].destinations().to_vec();
        for sink in destinations {
            self.deliver(scheduler, customer, sink)?;
        }
        self.schedule_next_arrival(scheduler, source)
    }

    /// Route a customer along one edge of the topology.
    fn deliver(&mut self, scheduler: &mut Scheduler<Self>, customer: CustomerId, sink: Sink) -> Result {
        match sink {
            Sink::Queue(queue) => self.queue_accept(scheduler, customer, queue),
            Sink::Balancer(balancer) => {
                let target = self.balancers[balancer].route();
                self.deliver(scheduler, customer, target)
            }
            Sink::Exit => self.exit_system(customer),
        }
    }

    fn exit_system(&mut self, customer: CustomerId) -> Result {
        let record = self.customers.remove(customer)?;
        self.spy.on_exiting(&record)
    }

    /// Admission: decide admit-or-drop for one customer, then hand out as
    /// many waiting customers as there are parked requests.
    fn queue_accept(&mut self, scheduler: &mut Scheduler<Self>, customer: CustomerId, queue: QueueId) -> Result {
        let now = scheduler.time();
        let priority = self.customers.get(customer)?.priority();

        if self.queues[queue].bucket_is_full(priority)? {
            return self.queue_drop(scheduler, customer, queue);
        }

        let service_time = self.queues[queue].sample_service_time();
        let name = self.queues[queue].name_rc();
        debug!(
            "{}: admitting customer {} with service demand {}",
            name, customer, service_time
        );
        {
            let record = self.customers.get_mut(customer)?;
            record.set_service_time(service_time);
            record.push_event(EventKind::Entered, PlaceKind::Queue, name, now);
        }

        // no parked request means the attached server is busy, so a
        // preemptive admission gets a shot at the customer in service
        let preemptable =
            self.queues[queue].discipline() == Discipline::PrioP && !self.queues[queue].has_requests();
        if preemptable {
            self.preemptive_admit(scheduler, customer, queue)?;
        } else {
            self.queues[queue].insert(&self.customers, customer)?;
        }

        self.queue_try_deliver(scheduler, queue)
    }

    /// The preemptive-priority admission path: no request is parked, so the
    /// attached server is busy. A strictly more important arrival displaces
    /// the customer in service; anything else queues up normally.
    fn preemptive_admit(&mut self, scheduler: &mut Scheduler<Self>, customer: CustomerId, queue: QueueId) -> Result {
        let server = self.queues[queue].preempt_server().ok_or(Error::MissingPreemptHook)?;

        let Some(in_service) = self.servers[server].in_service() else {
            return self.queues[queue].insert(&self.customers, customer);
        };

        let incoming_priority = self.customers.get(customer)?.priority();
        let current_priority = self.customers.get(in_service.customer)?.priority();
        if incoming_priority >= current_priority {
            // ties do not preempt
            return self.queues[queue].insert(&self.customers, customer);
        }

        let now = scheduler.time();
        let displaced = in_service.customer;
        debug!(
            "{}: customer {} preempts customer {} at {}",
            self.servers[server].name(),
            customer,
            displaced,
            now
        );

        // reclaim the unfinished work from the cancelled departure
        let old_departure = scheduler.remove_job(in_service.departure_job)?;
        let residual = old_departure - now;
        self.servers[server].clear_in_service();
        {
            let record = self.customers.get_mut(displaced)?;
            record.set_service_time(residual);
            record.retract_queue_exit()?;
        }

        // the preemptor passes straight through the queue
        let name = self.queues[queue].name_rc();
        self.customers
            .get_mut(customer)?
            .push_event(EventKind::Exited, PlaceKind::Queue, name, now);
        self.server_begin_service(scheduler, server, customer)?;

        // head-of-line restart for the displaced customer; the newest entry
        // of its class pays if the bucket is now over capacity
        let displaced_priority = self.customers.get(displaced)?.priority();
        self.queues[queue].push_front(displaced_priority, displaced)?;
        if let Some(victim) = self.queues[queue].pop_overflow(displaced_priority)? {
            self.queue_drop(scheduler, victim, queue)?;
        }
        Ok(())
    }

    fn queue_drop(&mut self, scheduler: &mut Scheduler<Self>, customer: CustomerId, queue: QueueId) -> Result {
        let now = scheduler.time();
        let name = self.queues[queue].name_rc();
        let exit = self.queues[queue].exit();
        debug!("{}: full, dropping customer {}", name, customer);
        {
            let record = self.customers.get_mut(customer)?;
            record.set_serviced(false);
            record.set_departure_time(now);
            record.push_event(EventKind::DroppedBy, PlaceKind::Queue, name, now);
        }
        self.deliver(scheduler, customer, exit)
    }

    /// Pair parked requests with waiting customers until one side runs dry.
    fn queue_try_deliver(&mut self, scheduler: &mut Scheduler<Self>, queue: QueueId) -> Result {
        while !self.queues[queue].is_empty() && self.queues[queue].has_requests() {
            let Some(server) = self.queues[queue].next_request() else {
                break;
            };
            let Some(customer) = self.queues[queue].take_next() else {
                break;
            };

            let now = scheduler.time();
            let name = self.queues[queue].name_rc();
            debug!("{}: delivering customer {} to {}", name, customer, self.servers[server].name());
            self.customers
                .get_mut(customer)?
                .push_event(EventKind::Exited, PlaceKind::Queue, name, now);
            self.server_begin_service(scheduler, server, customer)?;
        }
        Ok(())
    }

    fn server_begin_service(&mut self, scheduler: &mut Scheduler<Self>, server: ServerId, customer: CustomerId) -> Result {
        let now = scheduler.time();
        let service_time = self.customers.get(customer)?.service_time();
        let departure_time = now + service_time;
        debug!(
            "{}: customer {} in service until {}",
            self.servers[server].name(),
            customer,
            departure_time
        );
        let departure_job = scheduler.register_job(departure_time, DepartureEvent { server })?;
        self.servers[server].begin(customer, departure_job);
        Ok(())
    }

    fn server_fire_departure(&mut self, scheduler: &mut Scheduler<Self>, server: ServerId) -> Result {
        let Some(in_service) = self.servers[server].clear_in_service() else {
            return Err(Error::CorruptTrace("departure fired on an idle server"));
        };
        let customer = in_service.customer;
        let now = scheduler.time();
        let name = self.servers[server].name_rc();
        debug!("{}: customer {} serviced at {}", name, customer, now);
        {
            let record = self.customers.get_mut(customer)?;
            record.set_serviced(true);
            record.set_departure_time(now);
            record.push_event(EventKind::Exited, PlaceKind::Server, name, now);
        }

        let exit = self.servers[server].exit();
        self.deliver(scheduler, customer, exit)?;
        self.server_request_refill(scheduler, server)
    }

    fn server_request_refill(&mut self, scheduler: &mut Scheduler<Self>, server: ServerId) -> Result {
        let queue = self.servers[server].upstream();
        self.queues[queue].park_request(server);
        self.queue_try_deliver(scheduler, queue)
    }
}

impl SimWorld for Network {
    fn is_complete(&self, _: f64) -> bool {
        self.serviced_target > 0 && self.spy.total_serviced() >= self.serviced_target
    }
}

/// A scheduled customer arrival at its source's registered destinations.
#[derive(Debug)]
struct ArrivalEvent {
    source: SourceId,
    customer: CustomerId,
}

impl Event<Network> for ArrivalEvent {
    fn execute(&mut self, network: &mut Network, scheduler: &mut Scheduler<Network>) -> Result {
        network.customer_arrived(scheduler, self.source, self.customer)
    }
}

/// Completion of the customer in service at a server.
#[derive(Debug)]
struct DepartureEvent {
    server: ServerId,
}

impl Event<Network> for DepartureEvent {
    fn execute(&mut self, network: &mut Network, scheduler: &mut Scheduler<Network>) -> Result {
        network.server_fire_departure(scheduler, self.server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{ExponentialStream, PrioritySampler, ServiceSampler};

    fn empty_spy(queue_names: &[&str]) -> SimulationSpy {
        SimulationSpy::new(1000, queue_names, 0)
    }

    #[test]
    fn sources_generate_sequential_ids_at_increasing_times() {
        let mut network = Network::new(empty_spy(&[]));
        let source = network.add_source(ArrivalSource::new(
            ExponentialStream::new(1.0, 0),
            PrioritySampler::default(),
        ));
        assert_eq!(source, 0);

        let mut scheduler = Scheduler::new();
        network.start(&mut scheduler).unwrap();
        assert_eq!(network.live_customers(), 1, "first arrival is pending");

        for _ in 0..7 {
            scheduler.advance_time(&mut network).unwrap();
        }
        assert_eq!(network.live_customers(), 8, "seven delivered plus one pending");

        let mut last_arrival = 0.0;
        for id in 0..7 {
            let customer = network.customer(id).unwrap();
            assert_eq!(customer.id(), id, "ids are sequential");
            assert!(customer.arrival_time() > last_arrival, "times are increasing");
            last_arrival = customer.arrival_time();
        }
    }

    #[test]
    fn fcfs_network_services_in_arrival_order_and_drops_overflow() {
        let mut network = Network::new(empty_spy(&["Queue"]));
        let queue = network.add_queue(
            Queue::new(
                "Queue",
                10,
                Discipline::Fcfs,
                ServiceSampler::Constant(1.0),
                Sink::Exit,
            )
            .unwrap(),
        );
        let server = network.add_server(Server::new("Server", queue, Sink::Exit));

        let mut scheduler = Scheduler::new();
        network.start(&mut scheduler).unwrap();

        // the parked request grabs the first customer immediately
        let first = network
            .inject_customer(&mut scheduler, 0, Sink::Queue(queue))
            .unwrap();
        assert_eq!(network.server(server).current_customer(), Some(first));
        assert_eq!(network.queue(queue).size(), 0);

        // fill the buffer behind the busy server
        for _ in 0..10 {
            network
                .inject_customer(&mut scheduler, 0, Sink::Queue(queue))
                .unwrap();
        }
        assert_eq!(network.queue(queue).size(), 10, "queue is at max");

        // the eleventh is dropped and the buffer stays put
        let dropped = network
            .inject_customer(&mut scheduler, 0, Sink::Queue(queue))
            .unwrap();
        assert_eq!(network.queue(queue).size(), 10, "queue didn't exceed max");
        assert!(
            network.customer(dropped).is_err(),
            "dropped customer left the system"
        );
        let rates = network.spy().customer_loss_rates();
        assert_eq!(
            rates[crate::spy::ALL_QUEUES][&crate::spy::ALL_PRIORITIES],
            1.0 / 12.0,
            "one of twelve entrants lost so far"
        );

        // service completes strictly in arrival order
        for expected in 1..=10 {
            scheduler.advance_time(&mut network).unwrap();
            assert_eq!(
                network.server(server).current_customer(),
                Some(expected),
                "customers are fifo"
            );
        }
    }
}
