use crate::network::Sink;
use crate::random::{ExponentialStream, PrioritySampler};

/// Generates the customers that enter the system.
///
/// Holds an interarrival stream and a priority sampler (constant class 0
/// unless the experiment uses priority classes). Each generation cycle
/// samples one interarrival gap, advances the last-arrival stamp by it, and
/// hands the resulting arrival instant to the network, which creates the
/// customer record and registers the delivery job. At delivery the customer
/// is offered to every registered destination in registration order, and the
/// next cycle begins.
#[derive(Debug)]
pub struct ArrivalSource {
    interarrivals: ExponentialStream,
    priorities: PrioritySampler,
    destinations: Vec<Sink>,
    last_arrival: f64,
}

impl ArrivalSource {
    pub fn new(interarrivals: ExponentialStream, priorities: PrioritySampler) -> Self {
        Self {
            interarrivals,
            priorities,
            destinations: Vec::new(),
            last_arrival: 0.0,
        }
    }

    /// Add a delivery target. Targets receive each new customer in the order
    /// they were registered.
    pub fn register_destination(&mut self, destination: Sink) {
        self.destinations.push(destination);
    }

    pub fn destinations(&self) -> &[Sink] {
        &self.destinations
    }

    /// Sample the next customer: its arrival instant and priority class.
    pub(crate) fn next_arrival(&mut self) -> (f64, u32) {
        let gap = self.interarrivals.sample();
        self.last_arrival += gap;
        (self.last_arrival, self.priorities.sample())
    }
}
