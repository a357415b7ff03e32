use crate::customer::CustomerId;
use crate::scheduler::JobId;

/// Crate-wide result type. Most operations succeed with `()`; the handful
/// that produce a value on success override the default.
pub type Result<T = ()> = std::result::Result<T, Error>;

/// The ways a simulation run can fail.
///
/// Every variant is fatal to the current run: once an invariant is broken
/// there is no meaningful partial state to recover, so errors propagate
/// straight out of the event loop. Conditions that are part of normal
/// operation - a full queue dropping a customer, a request against an idle
/// queue - are not errors.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// An event was scheduled earlier than the current simulation time.
    BackInTime,
    /// A NaN reached the scheduler as an execution time.
    InvalidTime,
    /// `advance_time` was called with no jobs on the event list.
    EmptySchedule,
    /// A job id was cancelled that is not live (never registered, already
    /// fired, or already cancelled).
    UnknownJob(JobId),
    /// A preemptive-priority queue needed to preempt but no server was
    /// registered for preempts.
    MissingPreemptHook,
    /// A component was built with parameters that cannot work, e.g. a queue
    /// capacity that the number of priority classes does not divide.
    InvalidConfiguration(String),
    /// A customer arrived at a queue with a priority class the queue has no
    /// bucket for.
    UnknownPriority(u32),
    /// A customer's event log failed a statistics precondition, e.g. an
    /// ENTERED with no matching EXITED.
    CorruptTrace(&'static str),
    /// A customer id was dereferenced that no live customer carries, or the
    /// spy saw a customer exit that it never saw enter.
    UnknownCustomer(CustomerId),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let descriptor = match self {
            Self::BackInTime => "event execution time is less than current simulation time".into(),
            Self::InvalidTime => "event execution time is NaN".into(),
            Self::EmptySchedule => "advance_time called on an empty event list".into(),
            Self::UnknownJob(id) => format!("job {} is not live and cannot be removed", id),
            Self::MissingPreemptHook => {
                "preemptive-priority queue has no server registered for preempts".into()
            }
            Self::InvalidConfiguration(what) => format!("invalid configuration: {}", what),
            Self::UnknownPriority(priority) => {
                format!("no bucket for priority class {}", priority)
            }
            Self::CorruptTrace(what) => format!("corrupt customer event log: {}", what),
            Self::UnknownCustomer(id) => format!("customer {} is not in the system", id),
        };
        write!(f, "{}", descriptor)
    }
}

impl std::error::Error for Error {}
