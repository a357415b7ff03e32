use super::Scheduler;
use std::fmt::Debug;

/// A behavior or state change that occurs within a simulation.
///
/// This trait has one required method that describes what happens when the
/// implementing type executes. The trait is generic over the type used to
/// represent the simulated world so that event types can reach the components
/// they act on: an event receives exclusive access to the world and to the
/// scheduler, allowing both mutation of component state and registration or
/// cancellation of further jobs.
///
/// Requiring implementors to be [`Debug`] lets the scheduler trace job
/// registrations in a readable form.
///
/// Implementations are expected to be fallible: the run loop bubbles any
/// returned error straight out to the caller, aborting the simulation. A run
/// has no meaningful partial state once an invariant breaks, so there is no
/// infallible variant.
pub trait Event<World>: Debug {
    /// Update the world according to the specific type of event. The
    /// scheduler invokes this method during [`advance_time()`] for every job
    /// in the current cohort, in registration order among ties.
    ///
    /// Note that the simulation clock, accessible on the `scheduler`
    /// parameter, is updated before this method is invoked.
    ///
    /// # Errors
    ///
    /// Any [`Error`] returned here aborts the run; see the crate-level error
    /// documentation for the catalog of fatal conditions.
    ///
    /// [`advance_time()`]: Scheduler::advance_time
    /// [`Error`]: crate::Error
    fn execute(&mut self, world: &mut World, scheduler: &mut Scheduler<World>) -> crate::Result;
}
