use crate::scheduler::{Event, Scheduler};
use crate::world::SimWorld;
use std::fmt::Formatter;

/// Contains the scheduler and the world belonging to one simulation run.
///
/// A [`Simulation`] owns both its world and its event list, providing shared
/// and exclusive access to each so clients can set up and tear down instances
/// as needed - for example, wiring components and scheduling initial jobs
/// before the run, or reading measurement results out afterwards.
///
/// The expected workflow is:
///
/// 1. Build a value of a type that implements [`SimWorld`].
/// 2. Pass it to [`new()`].
/// 3. Schedule at least one initial job, typically through
///    [`parts_mut()`] so the setup code can touch the world and the
///    scheduler together.
/// 4. Call [`run()`]. Handle any error it might return.
/// 5. Use [`world()`] to read out the results.
///
/// [`new()`]: Simulation::new
/// [`parts_mut()`]: Simulation::parts_mut
/// [`run()`]: Simulation::run
/// [`world()`]: Simulation::world
pub struct Simulation<World>
where
    World: SimWorld,
{
    scheduler: Scheduler<World>,
    world: World,
}

impl<World> Simulation<World>
where
    World: SimWorld,
{
    /// Initialize a simulation over the provided world, with an empty event
    /// list and the clock at zero.
    pub fn new(world: World) -> Self {
        Self {
            scheduler: Scheduler::new(),
            world,
        }
    }

    /// Execute scheduled jobs, one cohort at a time, in ascending order of
    /// execution time, until the world reports itself complete.
    ///
    /// # Errors
    ///
    /// Errors raised by executing events are forwarded unchanged. Unlike a
    /// framework that treats a drained event list as a normal stop, running
    /// out of jobs while the world is incomplete returns
    /// [`Error::EmptySchedule`]: a simulation that starves before meeting its
    /// termination condition has a wiring bug.
    ///
    /// [`Error::EmptySchedule`]: crate::Error::EmptySchedule
    pub fn run(&mut self) -> crate::Result {
        loop {
            if self.world.is_complete(self.scheduler.time()) {
                return Ok(());
            }
            self.scheduler.advance_time(&mut self.world)?;
        }
    }

    /// Schedule the provided event at the specified time.
    ///
    /// # Errors
    ///
    /// As [`Scheduler::register_job()`].
    pub fn schedule<EventType>(&mut self, event: EventType, time: f64) -> crate::Result
    where
        EventType: Event<World> + 'static,
    {
        self.scheduler.register_job(time, event).map(|_| ())
    }

    /// Get a shared reference to the world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get an exclusive reference to the world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Get a shared reference to the scheduler.
    pub fn scheduler(&self) -> &Scheduler<World> {
        &self.scheduler
    }

    /// Get exclusive references to the world and the scheduler at the same
    /// time. Wiring code usually needs both: starting a component means
    /// mutating it while registering its first job.
    pub fn parts_mut(&mut self) -> (&mut World, &mut Scheduler<World>) {
        (&mut self.world, &mut self.scheduler)
    }
}

impl<World> std::fmt::Display for Simulation<World>
where
    World: SimWorld,
{
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Simulation at time {}", self.scheduler.time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct State {
        executed_event_values: Vec<u32>,
        complete: bool,
    }

    impl SimWorld for State {
        fn is_complete(&self, _: f64) -> bool {
            self.complete
        }
    }

    #[derive(Debug)]
    struct TestEvent {
        value: u32,
    }

    impl Event<State> for TestEvent {
        fn execute(&mut self, state: &mut State, _: &mut Scheduler<State>) -> crate::Result {
            state.executed_event_values.push(self.value);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct CompletionEvent {}

    impl Event<State> for CompletionEvent {
        fn execute(&mut self, state: &mut State, _: &mut Scheduler<State>) -> crate::Result {
            state.complete = true;
            Ok(())
        }
    }

    fn setup() -> Simulation<State> {
        let mut sim = Simulation::new(State {
            executed_event_values: Vec::with_capacity(3),
            complete: false,
        });

        let events: [TestEvent; 3] = [
            TestEvent { value: 1 },
            TestEvent { value: 3 },
            TestEvent { value: 2 },
        ];

        for (i, event) in events.into_iter().enumerate() {
            sim.schedule(event, 2.0 * i as f64).unwrap();
        }
        sim
    }

    #[test]
    fn simulation_executes_events() {
        let mut sim = setup();
        sim.schedule(CompletionEvent {}, 5.0).unwrap();
        sim.run().unwrap();

        let expected = vec![1, 3, 2];
        assert_eq!(
            expected,
            sim.world().executed_event_values,
            "events did not execute in correct order"
        );
    }

    #[test]
    fn simulation_stops_with_events_still_in_queue() {
        let mut sim = setup();
        sim.schedule(CompletionEvent {}, 3.0).unwrap();
        sim.run().unwrap();

        let expected = vec![1, 3];
        assert_eq!(
            expected,
            sim.world().executed_event_values,
            "simulation did not terminate with completion event"
        );
    }

    #[test]
    fn starved_simulation_is_an_error() {
        let mut sim = setup();
        assert_eq!(
            sim.run(),
            Err(crate::Error::EmptySchedule),
            "running out of jobs before completion must fail"
        );
    }
}
