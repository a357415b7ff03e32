/// The state a simulation executes against.
///
/// A world owns every component the dispatched events touch: events receive
/// exclusive access to the implementing type alongside the scheduler, so no
/// interior mutability or shared ownership is needed anywhere in a run.
///
/// The single required method tells [`Simulation::run()`] when to stop
/// popping events. Termination is a property of the world, not of the event
/// list: a run typically ends when a measurement component has seen enough
/// customers, while events are still scheduled.
///
/// [`Simulation::run()`]: crate::Simulation::run
pub trait SimWorld {
    /// Check whether the simulation has met its termination condition. The
    /// current virtual time is provided for worlds that stop on the clock
    /// rather than on observed state.
    fn is_complete(&self, now: f64) -> bool;
}
