use crate::customer::{CustomerId, CustomerStore};
use crate::network::{ServerId, Sink};
use crate::random::ServiceSampler;
use crate::{Error, Result};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

/// The rule by which a queue chooses which waiting customer to deliver next.
///
/// A closed set: admission and selection switch exhaustively over these five,
/// so an unhandled discipline cannot exist at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    /// First come, first served.
    Fcfs,
    /// Last come, first served, non-preemptive.
    LcfsNp,
    /// Shortest job first, non-preemptive.
    SjfNp,
    /// Priority classes, non-preemptive.
    PrioNp,
    /// Priority classes, preemptive: an admission may displace the customer
    /// in service at the attached server.
    PrioP,
}

/// Bounded, priority-partitioned buffer of waiting customers.
///
/// Capacity is split evenly across the priority classes: each class gets
/// `max_size / n_classes` slots, and construction fails if the division is
/// not exact. A customer arriving to a full class bucket is dropped, not
/// displaced (except under [`Discipline::PrioP`], where an incoming
/// preemption can push a displaced customer back in and squeeze out the
/// newest same-class entry).
///
/// Consumers do not poll. A server registers interest through the owning
/// network and the request parks here, FIFO, until a customer is available;
/// admission and request registration both drain as many
/// (customer, request) pairs as possible.
///
/// The queue stores customer *ids*; the records live in the network's
/// [`CustomerStore`]. Only the service-time ordering of [`Discipline::SjfNp`]
/// needs to consult the records themselves.
pub struct Queue {
    name: Rc<str>,
    discipline: Discipline,
    bucket_capacity: usize,
    buckets: BTreeMap<u32, VecDeque<CustomerId>>,
    requests: VecDeque<ServerId>,
    service_times: ServiceSampler,
    exit: Sink,
    preempt_server: Option<ServerId>,
}

impl Queue {
    /// A queue with a single priority class (the sentinel class 0).
    ///
    /// # Errors
    ///
    /// As [`with_priorities()`](Queue::with_priorities).
    pub fn new(
        name: &str,
        max_size: usize,
        discipline: Discipline,
        service_times: ServiceSampler,
        exit: Sink,
    ) -> Result<Self> {
        Self::with_priorities(name, max_size, discipline, service_times, exit, 0, 0)
    }

    /// A queue partitioned over the priority classes
    /// `min_priority..=max_priority`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] if the class range is backwards or the
    /// number of classes does not evenly divide `max_size`.
    pub fn with_priorities(
        name: &str,
        max_size: usize,
        discipline: Discipline,
        service_times: ServiceSampler,
        exit: Sink,
        min_priority: u32,
        max_priority: u32,
    ) -> Result<Self> {
        if max_priority < min_priority {
            return Err(Error::InvalidConfiguration(format!(
                "priority range {}..={} is backwards",
                min_priority, max_priority
            )));
        }
        let classes = (max_priority - min_priority + 1) as usize;
        if max_size % classes != 0 {
            return Err(Error::InvalidConfiguration(format!(
                "{} priority classes must evenly divide the max size {}",
                classes, max_size
            )));
        }

        let mut buckets = BTreeMap::new();
        for priority in min_priority..=max_priority {
            buckets.insert(priority, VecDeque::new());
        }

        Ok(Self {
            name: Rc::from(name),
            discipline,
            bucket_capacity: max_size / classes,
            buckets,
            requests: VecDeque::new(),
            service_times,
            exit,
            preempt_server: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_rc(&self) -> Rc<str> {
        self.name.clone()
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    /// Where customers leaving this queue without service (drops) are sent.
    pub fn exit(&self) -> Sink {
        self.exit
    }

    /// Total customers currently waiting, across all classes.
    pub fn size(&self) -> usize {
        self.buckets.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(VecDeque::is_empty)
    }

    /// Whether the bucket for the given class is at capacity.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPriority`] if the queue has no such class.
    pub fn bucket_is_full(&self, priority: u32) -> Result<bool> {
        self.buckets
            .get(&priority)
            .map(|bucket| bucket.len() >= self.bucket_capacity)
            .ok_or(Error::UnknownPriority(priority))
    }

    /// Draw a service demand from this queue's configured distribution.
    pub(crate) fn sample_service_time(&mut self) -> f64 {
        self.service_times.sample()
    }

    /// Insert an admitted customer according to the discipline.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPriority`] if the customer's class has no bucket;
    /// [`Error::UnknownCustomer`] if a stored id has no live record.
    pub(crate) fn insert(&mut self, store: &CustomerStore, id: CustomerId) -> Result {
        let customer = store.get(id)?;
        let priority = customer.priority();
        let service_time = customer.service_time();

        let bucket = self
            .buckets
            .get_mut(&priority)
            .ok_or(Error::UnknownPriority(priority))?;

        match self.discipline {
            Discipline::Fcfs | Discipline::LcfsNp | Discipline::PrioNp | Discipline::PrioP => {
                bucket.push_back(id);
            }
            Discipline::SjfNp => {
                // bucket is kept sorted descending by service demand, so the
                // shortest job sits at the back; an equal demand lands after
                // the existing equals, making ties later-arrival-first on
                // delivery
                let mut position = bucket.len();
                for (index, other) in bucket.iter().enumerate() {
                    if service_time > store.get(*other)?.service_time() {
                        position = index;
                        break;
                    }
                }
                bucket.insert(position, id);
            }
        }
        Ok(())
    }

    /// Select and remove the next customer to deliver, per the discipline.
    /// `None` if the queue is empty.
    pub(crate) fn take_next(&mut self) -> Option<CustomerId> {
        let discipline = self.discipline;
        let bucket = self.buckets.values_mut().find(|bucket| !bucket.is_empty())?;
        match discipline {
            Discipline::Fcfs | Discipline::PrioNp | Discipline::PrioP => bucket.pop_front(),
            Discipline::LcfsNp | Discipline::SjfNp => bucket.pop_back(),
        }
    }

    /// Head-of-line reinsertion, used for a customer displaced from service.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPriority`] if the class has no bucket.
    pub(crate) fn push_front(&mut self, priority: u32, id: CustomerId) -> Result {
        self.buckets
            .get_mut(&priority)
            .ok_or(Error::UnknownPriority(priority))?
            .push_front(id);
        Ok(())
    }

    /// If the class bucket is over capacity, remove and return its newest
    /// entry.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownPriority`] if the class has no bucket.
    pub(crate) fn pop_overflow(&mut self, priority: u32) -> Result<Option<CustomerId>> {
        let capacity = self.bucket_capacity;
        let bucket = self
            .buckets
            .get_mut(&priority)
            .ok_or(Error::UnknownPriority(priority))?;
        if bucket.len() > capacity {
            Ok(bucket.pop_back())
        } else {
            Ok(None)
        }
    }

    pub(crate) fn park_request(&mut self, server: ServerId) {
        self.requests.push_back(server);
    }

    pub(crate) fn next_request(&mut self) -> Option<ServerId> {
        self.requests.pop_front()
    }

    pub fn has_requests(&self) -> bool {
        !self.requests.is_empty()
    }

    /// Install the server whose in-service customer a
    /// [`Discipline::PrioP`] admission may displace.
    pub(crate) fn register_for_preempts(&mut self, server: ServerId) {
        self.preempt_server = Some(server);
    }

    pub(crate) fn preempt_server(&self) -> Option<ServerId> {
        self.preempt_server
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::Customer;

    fn store_with_service_times(times: &[f64]) -> CustomerStore {
        let mut store = CustomerStore::new();
        for (id, time) in times.iter().enumerate() {
            let mut customer = Customer::new(id as CustomerId, 1.1, 0);
            customer.set_service_time(*time);
            store.insert(customer);
        }
        store
    }

    fn plain_queue(discipline: Discipline) -> Queue {
        Queue::new(
            "q",
            10,
            discipline,
            ServiceSampler::Constant(1.0),
            Sink::Exit,
        )
        .unwrap()
    }

    #[test]
    fn capacity_must_divide_evenly_across_classes() {
        let queue = Queue::with_priorities(
            "q",
            10,
            Discipline::PrioNp,
            ServiceSampler::Constant(1.0),
            Sink::Exit,
            1,
            4,
        );
        assert!(matches!(queue, Err(Error::InvalidConfiguration(_))), "10 / 4 classes must fail");

        let queue = Queue::with_priorities(
            "q",
            12,
            Discipline::PrioNp,
            ServiceSampler::Constant(1.0),
            Sink::Exit,
            1,
            4,
        )
        .unwrap();
        assert_eq!(queue.size(), 0, "queue empty at start");
        assert!(queue.bucket_is_full(5).is_err(), "class 5 has no bucket");
    }

    #[test]
    fn fcfs_delivers_in_insertion_order() {
        let store = store_with_service_times(&[1.0, 1.0, 1.0]);
        let mut queue = plain_queue(Discipline::Fcfs);

        for id in 0..3 {
            queue.insert(&store, id).unwrap();
        }
        assert_eq!(queue.size(), 3);

        for expected in 0..3 {
            assert_eq!(queue.take_next(), Some(expected), "customers are fifo");
        }
        assert_eq!(queue.take_next(), None, "queue drained");
    }

    #[test]
    fn lcfs_delivers_newest_first() {
        let store = store_with_service_times(&[1.0, 1.0, 1.0]);
        let mut queue = plain_queue(Discipline::LcfsNp);

        for id in [2, 1, 0] {
            queue.insert(&store, id).unwrap();
        }

        for expected in 0..3 {
            assert_eq!(queue.take_next(), Some(expected), "customers are lifo");
        }
    }

    #[test]
    fn sjf_delivers_shortest_job_first() {
        let store = store_with_service_times(&[3.0, 1.0, 2.0]);
        let mut queue = plain_queue(Discipline::SjfNp);

        for id in 0..3 {
            queue.insert(&store, id).unwrap();
        }

        let mut previous = 0.0;
        for _ in 0..3 {
            let id = queue.take_next().unwrap();
            let service_time = store.get(id).unwrap().service_time();
            assert!(service_time >= previous, "customers are shortest-first");
            previous = service_time;
        }
    }

    #[test]
    fn sjf_ties_deliver_the_later_arrival_first() {
        let store = store_with_service_times(&[2.0, 2.0, 2.0]);
        let mut queue = plain_queue(Discipline::SjfNp);

        for id in 0..3 {
            queue.insert(&store, id).unwrap();
        }

        assert_eq!(queue.take_next(), Some(2), "ties break toward the newest");
        assert_eq!(queue.take_next(), Some(1));
        assert_eq!(queue.take_next(), Some(0));
    }

    #[test]
    fn priority_buckets_deliver_lowest_class_fifo() {
        let mut store = CustomerStore::new();
        for (id, priority) in [(3u32, 3u32), (2, 2), (0, 1), (1, 1)] {
            let mut customer = Customer::new(id, 1.1, priority);
            customer.set_service_time(1.0);
            store.insert(customer);
        }

        let mut queue = Queue::with_priorities(
            "q",
            12,
            Discipline::PrioNp,
            ServiceSampler::Constant(1.0),
            Sink::Exit,
            1,
            4,
        )
        .unwrap();

        for id in [3, 2, 0, 1] {
            queue.insert(&store, id).unwrap();
        }

        for expected in 0..4 {
            assert_eq!(
                queue.take_next(),
                Some(expected),
                "customers are fifo within priority, lowest class first"
            );
        }
    }

    #[test]
    fn head_of_line_reinsertion_and_overflow() {
        let mut store = CustomerStore::new();
        for id in 0..4u32 {
            let mut customer = Customer::new(id, 1.1, 1);
            customer.set_service_time(1.0);
            store.insert(customer);
        }

        let mut queue = Queue::with_priorities(
            "q",
            3,
            Discipline::PrioP,
            ServiceSampler::Constant(1.0),
            Sink::Exit,
            1,
            1,
        )
        .unwrap();

        for id in 0..3 {
            queue.insert(&store, id).unwrap();
        }
        assert_eq!(queue.pop_overflow(1).unwrap(), None, "at capacity is not over it");

        queue.push_front(1, 3).unwrap();
        assert_eq!(queue.size(), 4);
        assert_eq!(
            queue.pop_overflow(1).unwrap(),
            Some(2),
            "overflow evicts the newest entry"
        );
        assert_eq!(queue.take_next(), Some(3), "displaced customer is at the head");
    }

    #[test]
    fn requests_park_fifo() {
        let mut queue = plain_queue(Discipline::Fcfs);
        assert!(!queue.has_requests());

        queue.park_request(4);
        queue.park_request(7);
        assert_eq!(queue.next_request(), Some(4), "first handled first");
        assert_eq!(queue.next_request(), Some(7), "second handled second");
        assert_eq!(queue.next_request(), None);
    }
}
