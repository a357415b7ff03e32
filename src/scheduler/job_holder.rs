use super::{Event, JobId};
use ordered_float::NotNan;
use std::cmp::Ordering;

/// Helper struct for the event list. Holds a [`Box`] to the event itself
/// alongside the data necessary to sort jobs within the priority queue: the
/// execution time and the job's id.
///
/// The implementation of [`Ord`] on this struct cares first about the
/// execution time, comparing ids only to break ties. Ids are handed out in
/// strictly increasing order by [`Scheduler::register_job()`], so the
/// tiebreaker reproduces registration order exactly.
///
/// [`Scheduler::register_job()`]: super::Scheduler::register_job
pub(super) struct JobHolder<World> {
    pub execution_time: NotNan<f64>,
    pub id: JobId,
    pub event: Box<dyn Event<World>>,
}

impl<World> PartialEq<Self> for JobHolder<World> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.execution_time == other.execution_time
    }
}

impl<World> Eq for JobHolder<World> {}

impl<World> PartialOrd<Self> for JobHolder<World> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<World> Ord for JobHolder<World> {
    fn cmp(&self, other: &Self) -> Ordering {
        let comparison = self.execution_time.cmp(&other.execution_time);
        match comparison {
            Ordering::Equal => self.id.cmp(&other.id),
            _ => comparison,
        }
    }
}
