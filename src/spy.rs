use crate::customer::{Customer, CustomerId};
use crate::{Error, Result};
use log::{debug, trace};
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

/// Pseudo-key for statistics aggregated across every queue.
pub const ALL_QUEUES: &str = "overall";

/// Pseudo-key for statistics aggregated across every priority class.
pub const ALL_PRIORITIES: u32 = u32::MAX;

/// Derived statistics, by queue name and then by priority class. The
/// [`ALL_QUEUES`] and [`ALL_PRIORITIES`] pseudo-keys carry the aggregated
/// figures. Ordered maps so two identical runs print identically.
pub type QueuePriorityStats = BTreeMap<String, BTreeMap<u32, f64>>;

type ByPriority<T> = BTreeMap<u32, T>;

/// Observes every customer entering and leaving the system and accumulates
/// the run's statistics.
///
/// The spy sees each customer exactly twice: once at arrival and once at
/// exit. At exit it reads the whole event log off the customer - entrances,
/// per-queue waiting intervals, the terminal drop if there was one - so the
/// components in between never report anything themselves.
///
/// A configurable transient period discards the warm-up: when the exiting
/// customer's id equals `transient_period - 1`, every accumulator is cleared.
/// This is the only way the aggregates ever shrink.
///
/// If a service-time percentile mapping is provided (for distributions where
/// one is known), serviced customers also land in one of 100 slowdown bins
/// keyed by where their service demand falls in that distribution.
pub struct SimulationSpy {
    snapshot_base: u32,
    transient_period: u32,
    queue_names: Vec<Rc<str>>,
    percentile_to_value: Option<Box<dyn Fn(f64) -> f64>>,
    in_system: HashSet<CustomerId>,
    entered: ByPriority<u32>,
    serviced: ByPriority<u32>,
    lost: ByPriority<u32>,
    waiting_by_queue: BTreeMap<Rc<str>, ByPriority<f64>>,
    /// Entrances derived from the event log; drops do not count.
    entrances_by_queue: BTreeMap<Rc<str>, ByPriority<u32>>,
    /// Distinct customers that touched the queue; drops do count.
    unique_by_queue: BTreeMap<Rc<str>, ByPriority<u32>>,
    losses_by_queue: BTreeMap<Rc<str>, ByPriority<u32>>,
    total_service_time: f64,
    total_system_time: f64,
    slowdown_bins: Vec<(f64, u32)>,
    additional_stats: Vec<String>,
}

impl SimulationSpy {
    /// `snapshot_base` is the L parameter: exiting customers with ids
    /// `L, L+1, L+10, L+11` get an additional-statistics snapshot recorded.
    /// `transient_period` of 0 disables the warm-up reset.
    pub fn new(snapshot_base: u32, queue_names: &[&str], transient_period: u32) -> Self {
        Self {
            snapshot_base,
            transient_period,
            queue_names: queue_names.iter().map(|name| Rc::from(*name)).collect(),
            percentile_to_value: None,
            in_system: HashSet::new(),
            entered: BTreeMap::new(),
            serviced: BTreeMap::new(),
            lost: BTreeMap::new(),
            waiting_by_queue: BTreeMap::new(),
            entrances_by_queue: BTreeMap::new(),
            unique_by_queue: BTreeMap::new(),
            losses_by_queue: BTreeMap::new(),
            total_service_time: 0.0,
            total_system_time: 0.0,
            slowdown_bins: vec![(0.0, 0); 100],
            additional_stats: Vec::new(),
        }
    }

    /// Provide the service-time distribution's percentile-to-value mapping,
    /// enabling slowdown binning.
    pub fn set_percentile_mapping(&mut self, mapping: Box<dyn Fn(f64) -> f64>) {
        self.percentile_to_value = Some(mapping);
    }

    /// Record a customer entering the system.
    pub fn on_entering(&mut self, customer: &Customer) {
        trace!("spy: customer {} entering", customer.id());
        *self.entered.entry(customer.priority()).or_insert(0) += 1;
        self.in_system.insert(customer.id());
    }

    /// Record a customer leaving the system, serviced or dropped, and fold
    /// its event log into the aggregates.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownCustomer`] if the spy never saw this customer enter;
    /// [`Error::CorruptTrace`] if the event log cannot be read back.
    pub fn on_exiting(&mut self, customer: &Customer) -> Result {
        let id = customer.id();
        if !self.in_system.remove(&id) {
            return Err(Error::UnknownCustomer(id));
        }
        trace!("spy: customer {} exiting, {} left in system", id, self.in_system.len());

        let snapshot_ids = [
            self.snapshot_base,
            self.snapshot_base.wrapping_add(1),
            self.snapshot_base.wrapping_add(10),
            self.snapshot_base.wrapping_add(11),
        ];
        if snapshot_ids.contains(&id) {
            self.save_additional_stats(customer);
        }

        self.save_default_stats(customer)?;

        if self.transient_period > 0 && id == self.transient_period - 1 {
            self.clear_stats();
        }
        Ok(())
    }

    fn save_default_stats(&mut self, customer: &Customer) -> Result {
        let priority = customer.priority();

        if customer.serviced() {
            *self.serviced.entry(priority).or_insert(0) += 1;

            for name in &self.queue_names {
                let entrances = customer.entrances(name);
                if entrances == 0 {
                    continue;
                }
                let waiting = customer.waiting_time(name)?;
                *self
                    .entrances_by_queue
                    .entry(name.clone())
                    .or_default()
                    .entry(priority)
                    .or_insert(0) += entrances;
                *self
                    .unique_by_queue
                    .entry(name.clone())
                    .or_default()
                    .entry(priority)
                    .or_insert(0) += 1;
                *self
                    .waiting_by_queue
                    .entry(name.clone())
                    .or_default()
                    .entry(priority)
                    .or_insert(0.0) += waiting;
            }

            self.total_service_time += customer.service_time();
            self.total_system_time += customer.system_time();

            if self.percentile_to_value.is_some() {
                let waiting = customer.total_waiting_time()?;
                self.save_slowdown(customer.service_time(), waiting);
            }
        } else {
            let dropping_queue = customer.dropped_by()?;
            let key = self
                .queue_names
                .iter()
                .find(|name| name.as_ref() == dropping_queue)
                .cloned()
                .unwrap_or_else(|| Rc::from(dropping_queue));

            *self
                .losses_by_queue
                .entry(key.clone())
                .or_default()
                .entry(priority)
                .or_insert(0) += 1;
            *self
                .unique_by_queue
                .entry(key)
                .or_default()
                .entry(priority)
                .or_insert(0) += 1;
            *self.lost.entry(priority).or_insert(0) += 1;
        }
        Ok(())
    }

    fn save_additional_stats(&mut self, customer: &Customer) {
        self.additional_stats.push(format!(
            "Customer ID: {}, Arrival Time: {}, Service Time: {}, Departure Time: {}, Customers in system: {}",
            customer.id(),
            customer.arrival_time(),
            customer.service_time(),
            customer.departure_time(),
            self.in_system.len(),
        ));
    }

    fn save_slowdown(&mut self, service_time: f64, waiting_time: f64) {
        let Some(percentile_to_value) = &self.percentile_to_value else {
            return;
        };
        // smallest bin whose upper percentile boundary covers this demand;
        // float dust at the very top lands in the last bin
        let mut bin = 99;
        for k in 0..100 {
            let boundary = percentile_to_value((k as f64 + 1.0) * 0.01);
            if service_time <= boundary {
                bin = k;
                break;
            }
        }
        self.slowdown_bins[bin].0 += waiting_time / service_time;
        self.slowdown_bins[bin].1 += 1;
    }

    fn clear_stats(&mut self) {
        debug!("spy: transient period elapsed, discarding warm-up statistics");
        self.entered.clear();
        self.serviced.clear();
        self.lost.clear();
        self.waiting_by_queue.clear();
        self.entrances_by_queue.clear();
        self.unique_by_queue.clear();
        self.losses_by_queue.clear();
        self.total_service_time = 0.0;
        self.total_system_time = 0.0;
        self.slowdown_bins = vec![(0.0, 0); 100];
    }

    /// Serviced customers since the last transient reset, across all classes.
    pub fn total_serviced(&self) -> u32 {
        self.serviced.values().sum()
    }

    /// Loss rates by queue and priority.
    ///
    /// Per queue and class: drops over distinct customers that touched the
    /// queue. Per queue overall: total drops over total distinct customers.
    /// System-wide (the [`ALL_QUEUES`] block): customers lost anywhere over
    /// customers that entered the system.
    pub fn customer_loss_rates(&self) -> QueuePriorityStats {
        let mut out = QueuePriorityStats::new();

        for name in &self.queue_names {
            let Some(unique) = self.unique_by_queue.get(name.as_ref()) else {
                continue;
            };
            let losses = self.losses_by_queue.get(name.as_ref());

            let mut block = BTreeMap::new();
            let mut total_losses = 0u32;
            let mut total_unique = 0u32;
            for (&priority, &unique_count) in unique {
                if unique_count == 0 {
                    continue;
                }
                let loss_count = losses.and_then(|map| map.get(&priority)).copied().unwrap_or(0);
                block.insert(priority, f64::from(loss_count) / f64::from(unique_count));
                total_losses += loss_count;
                total_unique += unique_count;
            }
            if total_unique > 0 {
                block.insert(ALL_PRIORITIES, f64::from(total_losses) / f64::from(total_unique));
            }
            out.insert(name.to_string(), block);
        }

        let mut block = BTreeMap::new();
        let mut total_lost = 0u32;
        let mut total_entered = 0u32;
        for (&priority, &entered_count) in &self.entered {
            if entered_count == 0 {
                continue;
            }
            let lost_count = self.lost.get(&priority).copied().unwrap_or(0);
            block.insert(priority, f64::from(lost_count) / f64::from(entered_count));
            total_lost += lost_count;
            total_entered += entered_count;
        }
        if total_entered > 0 {
            block.insert(ALL_PRIORITIES, f64::from(total_lost) / f64::from(total_entered));
        }
        out.insert(ALL_QUEUES.to_string(), block);

        out
    }

    /// Average waiting times by queue and priority.
    ///
    /// Per queue and class: accumulated waiting over the number of
    /// *entrances*, i.e. the mean wait for one pass through the queue. The
    /// system-wide block instead divides by serviced customers, giving the
    /// mean total wait one customer accumulates - the two views differ
    /// exactly by the mean number of entrances a customer makes.
    pub fn average_waiting_times(&self) -> QueuePriorityStats {
        let mut out = QueuePriorityStats::new();

        for name in &self.queue_names {
            let Some(entrances) = self.entrances_by_queue.get(name.as_ref()) else {
                continue;
            };
            let waiting = self.waiting_by_queue.get(name.as_ref());

            let mut block = BTreeMap::new();
            let mut total_waiting = 0.0;
            let mut total_entrances = 0u32;
            for (&priority, &entrance_count) in entrances {
                if entrance_count == 0 {
                    continue;
                }
                let wait = waiting.and_then(|map| map.get(&priority)).copied().unwrap_or(0.0);
                block.insert(priority, wait / f64::from(entrance_count));
                total_waiting += wait;
                total_entrances += entrance_count;
            }
            if total_entrances > 0 {
                block.insert(ALL_PRIORITIES, total_waiting / f64::from(total_entrances));
            }
            out.insert(name.to_string(), block);
        }

        let mut block = BTreeMap::new();
        let mut grand_waiting = 0.0;
        let mut grand_serviced = 0u32;
        for (&priority, &serviced_count) in &self.serviced {
            if serviced_count == 0 {
                continue;
            }
            let wait: f64 = self
                .waiting_by_queue
                .values()
                .filter_map(|map| map.get(&priority))
                .sum();
            block.insert(priority, wait / f64::from(serviced_count));
            grand_waiting += wait;
            grand_serviced += serviced_count;
        }
        if grand_serviced > 0 {
            block.insert(ALL_PRIORITIES, grand_waiting / f64::from(grand_serviced));
        }
        out.insert(ALL_QUEUES.to_string(), block);

        out
    }

    /// Mean service time over serviced customers; 0 if none were serviced.
    pub fn average_service_time(&self) -> f64 {
        let serviced = self.total_serviced();
        if serviced == 0 {
            return 0.0;
        }
        self.total_service_time / f64::from(serviced)
    }

    /// Mean time in system over serviced customers; 0 if none were serviced.
    pub fn average_system_time(&self) -> f64 {
        let serviced = self.total_serviced();
        if serviced == 0 {
            return 0.0;
        }
        self.total_system_time / f64::from(serviced)
    }

    /// Mean slowdown per service-time percentile bin; 0 for empty bins.
    /// All zeros unless a percentile mapping was provided.
    pub fn average_slowdown_percentiles(&self) -> Vec<f64> {
        self.slowdown_bins
            .iter()
            .map(|(sum, count)| if *count == 0 { 0.0 } else { sum / f64::from(*count) })
            .collect()
    }

    /// The recorded snapshot lines for the configured customer ids.
    pub fn additional_stats(&self) -> &[String] {
        &self.additional_stats
    }
}
