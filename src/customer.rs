use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt::Formatter;
use std::rc::Rc;

/// Identifies one customer for the lifetime of a run. Components hold ids,
/// never the record itself: the record lives in a [`CustomerStore`] and is
/// owned by exactly one place at a time through its id.
pub type CustomerId = u32;

/// What happened to a customer at a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Entered,
    Exited,
    DroppedBy,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let text = match self {
            Self::Entered => "ENTERED",
            Self::Exited => "EXITED",
            Self::DroppedBy => "DROPPED_BY",
        };
        write!(f, "{}", text)
    }
}

/// The kind of station an event happened at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceKind {
    Queue,
    Server,
}

impl std::fmt::Display for PlaceKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let text = match self {
            Self::Queue => "QUEUE",
            Self::Server => "SERVER",
        };
        write!(f, "{}", text)
    }
}

/// One entry in a customer's trace: what happened, where, and when.
///
/// Place names are reference-counted so a queue can stamp thousands of events
/// without allocating per event; the crate is single-threaded throughout.
#[derive(Debug, Clone)]
pub struct CustomerEvent {
    pub kind: EventKind,
    pub place_kind: PlaceKind,
    pub place_name: Rc<str>,
    pub time: f64,
}

impl std::fmt::Display for CustomerEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} at {}",
            self.kind, self.place_kind, self.place_name, self.time
        )
    }
}

/// A unit of work traversing the network.
///
/// Carries identity, the priority class (lower numeric value means more
/// important; 0 is the sentinel for "no priority classes in use"), the
/// current service demand, and an append-only log of place/time events from
/// which all waiting-time statistics are later derived.
///
/// `service_time` is assigned when a queue admits the customer and may be
/// overwritten with the residual demand if the customer is preempted while in
/// service.
#[derive(Debug, Clone)]
pub struct Customer {
    id: CustomerId,
    arrival_time: f64,
    priority: u32,
    service_time: f64,
    serviced: bool,
    departure_time: f64,
    events: Vec<CustomerEvent>,
}

impl Customer {
    pub fn new(id: CustomerId, arrival_time: f64, priority: u32) -> Self {
        Self {
            id,
            arrival_time,
            priority,
            service_time: 0.0,
            serviced: false,
            departure_time: 0.0,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn arrival_time(&self) -> f64 {
        self.arrival_time
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn service_time(&self) -> f64 {
        self.service_time
    }

    pub fn serviced(&self) -> bool {
        self.serviced
    }

    pub fn departure_time(&self) -> f64 {
        self.departure_time
    }

    pub fn events(&self) -> &[CustomerEvent] {
        &self.events
    }

    pub fn set_service_time(&mut self, service_time: f64) {
        self.service_time = service_time;
    }

    pub fn set_serviced(&mut self, serviced: bool) {
        self.serviced = serviced;
    }

    pub fn set_departure_time(&mut self, departure_time: f64) {
        self.departure_time = departure_time;
    }

    pub fn push_event(&mut self, kind: EventKind, place_kind: PlaceKind, place_name: Rc<str>, time: f64) {
        self.events.push(CustomerEvent {
            kind,
            place_kind,
            place_name,
            time,
        });
    }

    /// Retract the trailing queue-exit event.
    ///
    /// Used on preemption: the displaced customer goes back to the head of
    /// its queue bucket, so the exit it recorded on delivery never really
    /// happened. Its earlier `ENTERED` stays open and will pair with the exit
    /// stamped when it is delivered again, which is how the preempted span
    /// ends up counted as waiting time.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptTrace`] if the log does not end with a queue exit.
    pub fn retract_queue_exit(&mut self) -> Result {
        match self.events.last() {
            Some(event) if event.kind == EventKind::Exited && event.place_kind == PlaceKind::Queue => {
                self.events.pop();
                Ok(())
            }
            _ => Err(Error::CorruptTrace("retracted event is not a queue exit")),
        }
    }

    /// Time spent in the system: departure minus arrival.
    pub fn system_time(&self) -> f64 {
        self.departure_time - self.arrival_time
    }

    /// Total time spent waiting in queues, summed over every
    /// `ENTERED`/`EXITED` pair in the log.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptTrace`] if the customer was never serviced, has fewer
    /// than two events, or an `ENTERED` is not followed by the matching
    /// `EXITED`.
    pub fn total_waiting_time(&self) -> Result<f64> {
        self.summed_waiting_time(None)
    }

    /// Time spent waiting in the named place, summed over every visit.
    ///
    /// # Errors
    ///
    /// As [`total_waiting_time()`](Customer::total_waiting_time).
    pub fn waiting_time(&self, place_name: &str) -> Result<f64> {
        self.summed_waiting_time(Some(place_name))
    }

    fn summed_waiting_time(&self, place_name: Option<&str>) -> Result<f64> {
        if !self.serviced {
            return Err(Error::CorruptTrace(
                "waiting time requested for an unserviced customer",
            ));
        }
        if self.events.len() < 2 {
            return Err(Error::CorruptTrace("too few events to derive waiting time"));
        }

        let mut waiting_time = 0.0;
        for pair in self.events.windows(2) {
            let event = &pair[0];
            let next_event = &pair[1];

            let relevant = match place_name {
                Some(name) => event.kind == EventKind::Entered && &*event.place_name == name,
                None => event.kind == EventKind::Entered && event.place_kind == PlaceKind::Queue,
            };
            if !relevant {
                continue;
            }

            if next_event.kind == EventKind::Exited && next_event.place_name == event.place_name {
                waiting_time += next_event.time - event.time;
            } else {
                return Err(Error::CorruptTrace("event following ENTERED wasn't the matching EXITED"));
            }
        }

        Ok(waiting_time)
    }

    /// Whether the customer ever entered the named place.
    pub fn entered(&self, place_name: &str) -> bool {
        self.events
            .iter()
            .any(|event| event.kind == EventKind::Entered && &*event.place_name == place_name)
    }

    /// How many times the customer entered the named place.
    pub fn entrances(&self, place_name: &str) -> u32 {
        self.events
            .iter()
            .filter(|event| event.kind == EventKind::Entered && &*event.place_name == place_name)
            .count() as u32
    }

    /// The place that dropped this customer.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptTrace`] if the log does not end with a drop.
    pub fn dropped_by(&self) -> Result<&str> {
        match self.events.last() {
            Some(event) if event.kind == EventKind::DroppedBy => Ok(&event.place_name),
            _ => Err(Error::CorruptTrace("dropped_by called on a customer who wasn't dropped")),
        }
    }
}

impl std::fmt::Display for Customer {
    /// The one-line summary. The alternate form (`{:#}`) appends the event
    /// log, one event per line.
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "id: {} Arrival Time: {} Priority: {} Service Time: {} Serviced: {} Departure Time: {}",
            self.id, self.arrival_time, self.priority, self.service_time, self.serviced, self.departure_time,
        )?;
        if f.alternate() {
            for event in &self.events {
                write!(f, "\n{}", event)?;
            }
        }
        Ok(())
    }
}

/// Arena of live customer records, keyed by id.
///
/// Exactly one component logically holds each live customer at any time
/// (a queue slot, a server's in-service slot, or a scheduled delivery job),
/// but they all reach the record through here. A record is removed only when
/// the customer leaves the system, after the measurement spy has consumed its
/// exit.
#[derive(Debug, Default)]
pub struct CustomerStore {
    customers: HashMap<CustomerId, Customer>,
}

impl CustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, customer: Customer) {
        self.customers.insert(customer.id(), customer);
    }

    /// # Errors
    ///
    /// [`Error::UnknownCustomer`] if no live customer carries `id`.
    pub fn get(&self, id: CustomerId) -> Result<&Customer> {
        self.customers.get(&id).ok_or(Error::UnknownCustomer(id))
    }

    /// # Errors
    ///
    /// [`Error::UnknownCustomer`] if no live customer carries `id`.
    pub fn get_mut(&mut self, id: CustomerId) -> Result<&mut Customer> {
        self.customers.get_mut(&id).ok_or(Error::UnknownCustomer(id))
    }

    /// # Errors
    ///
    /// [`Error::UnknownCustomer`] if no live customer carries `id`.
    pub fn remove(&mut self, id: CustomerId) -> Result<Customer> {
        self.customers.remove(&id).ok_or(Error::UnknownCustomer(id))
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}
