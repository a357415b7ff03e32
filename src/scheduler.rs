mod event_traits;
mod job_holder;

pub use event_traits::Event;

use crate::{Error, Result};
use job_holder::JobHolder;
use log::trace;
use ordered_float::NotNan;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt::Formatter;

/// Identifies a registered job. Ids are handed out in strictly increasing
/// order, which also makes them the tiebreaker for jobs scheduled at the same
/// virtual time.
pub type JobId = u32;

/// Priority queue of scheduled jobs, keyed by virtual time.
///
/// Jobs execute in ascending order of execution time, with ties broken by
/// registration order. The clock only ever moves forward: it is set to the
/// execution time of a cohort of jobs immediately before that cohort is
/// dispatched, and registering a job in the past is an error.
///
/// [`advance_time()`] dispatches *every* job scheduled for the minimum time
/// on the list, not just the first. The cohort is snapshotted on entry: a job
/// registered during the dispatch, even for the exact current time, waits for
/// the next call. This keeps the behavior of reentrant registrations
/// deterministic.
///
/// Jobs may also be cancelled through [`remove_job()`], which reports the
/// time the job would have run at. Cancellation is how a server abandons a
/// scheduled departure when the customer in service is preempted, and the
/// returned time is what lets it compute the residual service demand.
/// Removal is lazy: the heap entry stays put and is discarded when it
/// surfaces.
///
/// The scheduler is not thread-safe; a simulation runs on one logical thread.
///
/// [`advance_time()`]: Scheduler::advance_time
/// [`remove_job()`]: Scheduler::remove_job
pub struct Scheduler<World> {
    jobs: BinaryHeap<Reverse<JobHolder<World>>>,
    /// Scheduled time of every job that has neither fired nor been cancelled.
    live: HashMap<JobId, NotNan<f64>>,
    cancelled: HashSet<JobId>,
    clock: NotNan<f64>,
    next_job_id: JobId,
}

impl<World> Scheduler<World> {
    /// Construct a scheduler with no registered jobs and the clock at zero.
    pub fn new() -> Self {
        Self {
            jobs: BinaryHeap::default(),
            live: HashMap::default(),
            cancelled: HashSet::default(),
            clock: NotNan::new(0.0).expect("0 should not be NaN"),
            next_job_id: 0,
        }
    }

    /// The current virtual time. Starts at zero and never decreases.
    pub fn time(&self) -> f64 {
        self.clock.into_inner()
    }

    /// The number of registered jobs that have neither fired nor been
    /// cancelled.
    pub fn pending_jobs(&self) -> usize {
        self.live.len()
    }

    /// Register a job for execution at the specified time, returning its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackInTime`] if `start_time` is earlier than the
    /// current clock, with no modification to the event list - a caller
    /// trying to rewind the clock almost certainly has a logic bug. Returns
    /// [`Error::InvalidTime`] if `start_time` is NaN.
    pub fn register_job<EventType>(&mut self, start_time: f64, event: EventType) -> Result<JobId>
    where
        EventType: Event<World> + 'static,
    {
        self.register_job_from_boxed(start_time, Box::new(event))
    }

    /// Register an already-boxed job for execution at the specified time.
    ///
    /// # Errors
    ///
    /// As [`register_job()`](Scheduler::register_job).
    pub fn register_job_from_boxed(
        &mut self,
        start_time: f64,
        event: Box<dyn Event<World>>,
    ) -> Result<JobId> {
        let execution_time = NotNan::new(start_time).map_err(|_| Error::InvalidTime)?;
        if execution_time < self.clock {
            return Err(Error::BackInTime);
        }

        let id = self.next_job_id;
        self.next_job_id += 1;

        trace!("registering job {} ({:?}) at time {}", id, event, start_time);
        self.live.insert(id, execution_time);
        self.jobs.push(Reverse(JobHolder {
            execution_time,
            id,
            event,
        }));
        Ok(id)
    }

    /// Cancel a registered job, returning the time it was scheduled for.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownJob`] if `id` is not live: never registered,
    /// already fired, or already removed.
    pub fn remove_job(&mut self, id: JobId) -> Result<f64> {
        match self.live.remove(&id) {
            Some(execution_time) => {
                trace!("removing job {} scheduled for {}", id, execution_time);
                self.cancelled.insert(id);
                Ok(execution_time.into_inner())
            }
            None => Err(Error::UnknownJob(id)),
        }
    }

    /// Advance the clock to the earliest scheduled time and dispatch every
    /// job registered for that time, in registration order.
    ///
    /// The cohort is fixed when this method is entered: jobs that a dispatch
    /// registers for the same time are held for the next call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySchedule`] if no live jobs remain. Errors
    /// returned by an executing event are forwarded as-is; jobs left in the
    /// cohort stay scheduled, but the run is not in a resumable state.
    pub fn advance_time(&mut self, world: &mut World) -> Result {
        self.discard_cancelled_heads();

        let now = match self.jobs.peek() {
            Some(Reverse(holder)) => holder.execution_time,
            None => return Err(Error::EmptySchedule),
        };
        let cohort_boundary = self.next_job_id;
        self.clock = now;
        trace!("advancing clock to {}", now);

        loop {
            let in_cohort = matches!(
                self.jobs.peek(),
                Some(Reverse(holder))
                    if holder.execution_time == now && holder.id < cohort_boundary
            );
            if !in_cohort {
                return Ok(());
            }

            let holder = match self.jobs.pop() {
                Some(Reverse(holder)) => holder,
                None => return Ok(()),
            };
            if self.cancelled.remove(&holder.id) {
                continue;
            }

            self.live.remove(&holder.id);
            let mut event = holder.event;
            event.execute(world, self)?;
        }
    }

    /// Drop cancelled jobs sitting at the front of the heap so the next
    /// cohort's time comes from a live job.
    fn discard_cancelled_heads(&mut self) {
        loop {
            let head_cancelled = matches!(
                self.jobs.peek(),
                Some(Reverse(holder)) if self.cancelled.contains(&holder.id)
            );
            if !head_cancelled {
                return;
            }
            if let Some(Reverse(holder)) = self.jobs.pop() {
                self.cancelled.remove(&holder.id);
            }
        }
    }
}

impl<World> Default for Scheduler<World> {
    fn default() -> Self {
        Self::new()
    }
}

impl<World> std::fmt::Display for Scheduler<World> {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "Scheduler with {} pending jobs at current time {}",
            self.live.len(),
            self.clock,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct CallLog {
        order: Vec<u32>,
    }

    #[derive(Debug)]
    struct PushValue {
        value: u32,
    }

    impl Event<CallLog> for PushValue {
        fn execute(&mut self, world: &mut CallLog, _: &mut Scheduler<CallLog>) -> crate::Result {
            world.order.push(self.value);
            Ok(())
        }
    }

    /// Pushes its value, then registers a follow-up push for the exact
    /// current time.
    #[derive(Debug)]
    struct PushThenChain {
        value: u32,
        chained_value: u32,
    }

    impl Event<CallLog> for PushThenChain {
        fn execute(
            &mut self,
            world: &mut CallLog,
            scheduler: &mut Scheduler<CallLog>,
        ) -> crate::Result {
            world.order.push(self.value);
            scheduler.register_job(
                scheduler.time(),
                PushValue {
                    value: self.chained_value,
                },
            )?;
            Ok(())
        }
    }

    #[test]
    fn jobs_fire_in_time_order_with_registration_tiebreak() {
        let mut log = CallLog::default();
        let mut scheduler = Scheduler::new();
        assert_eq!(scheduler.time(), 0.0, "initial time wasn't 0");

        scheduler.register_job(1.1, PushValue { value: 1 }).unwrap();
        scheduler.register_job(3.0, PushValue { value: 4 }).unwrap();
        scheduler.register_job(2.2, PushValue { value: 2 }).unwrap();
        scheduler.register_job(2.2, PushValue { value: 3 }).unwrap();

        assert!(log.order.is_empty(), "nothing fired before advancing");

        scheduler.advance_time(&mut log).unwrap();
        assert_eq!(log.order.len(), 1, "first call ran the first job");
        assert_eq!(scheduler.time(), 1.1);

        scheduler.advance_time(&mut log).unwrap();
        assert_eq!(log.order.len(), 3, "second call ran both tied jobs");
        assert_eq!(scheduler.time(), 2.2);

        scheduler.advance_time(&mut log).unwrap();
        assert_eq!(log.order.len(), 4, "third call ran the last job");
        assert_eq!(scheduler.time(), 3.0);

        assert_eq!(log.order, vec![1, 2, 3, 4], "call order was correct");

        assert_eq!(
            scheduler.advance_time(&mut log),
            Err(Error::EmptySchedule),
            "advancing an empty scheduler must fail"
        );
    }

    #[test]
    fn removed_job_does_not_fire_and_reports_its_time() {
        let mut log = CallLog::default();
        let mut scheduler = Scheduler::new();

        scheduler.register_job(1.0, PushValue { value: 1 }).unwrap();
        let removable = scheduler.register_job(2.0, PushValue { value: 99 }).unwrap();
        scheduler.register_job(3.0, PushValue { value: 2 }).unwrap();

        assert_eq!(scheduler.remove_job(removable), Ok(2.0));
        assert_eq!(
            scheduler.remove_job(removable),
            Err(Error::UnknownJob(removable)),
            "double removal must fail"
        );
        assert_eq!(
            scheduler.remove_job(1000),
            Err(Error::UnknownJob(1000)),
            "removing an unregistered id must fail"
        );

        scheduler.advance_time(&mut log).unwrap();
        scheduler.advance_time(&mut log).unwrap();
        assert_eq!(log.order, vec![1, 2], "cancelled job never fired");
        assert_eq!(scheduler.time(), 3.0, "clock skipped over the cancelled time");
    }

    #[test]
    fn removing_a_fired_job_fails() {
        let mut log = CallLog::default();
        let mut scheduler = Scheduler::new();

        let id = scheduler.register_job(1.0, PushValue { value: 1 }).unwrap();
        scheduler.advance_time(&mut log).unwrap();
        assert_eq!(scheduler.remove_job(id), Err(Error::UnknownJob(id)));
    }

    #[test]
    fn same_time_registrations_wait_for_the_next_cohort() {
        let mut log = CallLog::default();
        let mut scheduler = Scheduler::new();

        scheduler
            .register_job(
                5.0,
                PushThenChain {
                    value: 1,
                    chained_value: 2,
                },
            )
            .unwrap();

        scheduler.advance_time(&mut log).unwrap();
        assert_eq!(log.order, vec![1], "chained job held for the next call");
        assert_eq!(scheduler.pending_jobs(), 1);

        scheduler.advance_time(&mut log).unwrap();
        assert_eq!(log.order, vec![1, 2], "chained job fired on the next call");
        assert_eq!(scheduler.time(), 5.0, "clock did not move for the held job");
    }

    #[test]
    fn scheduling_in_the_past_fails() {
        let mut log = CallLog::default();
        let mut scheduler = Scheduler::new();

        scheduler.register_job(2.0, PushValue { value: 1 }).unwrap();
        scheduler.advance_time(&mut log).unwrap();

        assert_eq!(
            scheduler
                .register_job(1.0, PushValue { value: 2 })
                .unwrap_err(),
            Error::BackInTime,
        );
        assert!(
            scheduler.register_job(2.0, PushValue { value: 2 }).is_ok(),
            "scheduling for the current time is allowed"
        );
        assert_eq!(
            scheduler
                .register_job(f64::NAN, PushValue { value: 3 })
                .unwrap_err(),
            Error::InvalidTime,
        );
    }

    #[test]
    fn clock_is_monotonic_across_many_advances() {
        let mut log = CallLog::default();
        let mut scheduler = Scheduler::new();
        for i in 0..50u32 {
            // deliberately registered out of order
            let time = f64::from((i * 7) % 13) + 0.5;
            scheduler.register_job(time, PushValue { value: i }).unwrap();
        }

        let mut last = scheduler.time();
        while scheduler.pending_jobs() > 0 {
            scheduler.advance_time(&mut log).unwrap();
            assert!(scheduler.time() >= last, "clock moved backwards");
            last = scheduler.time();
        }
    }
}
