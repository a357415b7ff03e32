//! # Overview
//!
//! qnsim is a discrete-event simulator for queueing networks: systems of
//! arrival sources, bounded priority queues, servers, and probabilistic load
//! balancers, measured by a per-customer event trace. It answers the
//! quantitative questions of queueing studies - loss rates, mean waiting and
//! sojourn times, per-priority slowdowns - by executing a virtual-time event
//! loop over a configured topology:
//!
//! * The [`Scheduler`] keeps a priority-ordered event list over a single
//!   virtual clock. Jobs at the same instant fire in registration order, and
//!   registered jobs can be cancelled - which is what makes service
//!   preemption expressible.
//! * The [`network::Network`] owns every component of one run and routes
//!   customers along fixed [`network::Sink`] edges. Components address each
//!   other by id and customers live in an id-keyed arena, so the delivery
//!   graph needs no shared ownership and no interior mutability.
//! * [`queue::Queue`] implements five service disciplines over per-priority
//!   bounded buckets, including preemptive priority with head-of-line
//!   restart and residual service preservation.
//! * The [`spy::SimulationSpy`] watches customers enter and leave, derives
//!   every reported statistic from their event logs, and can discard a
//!   configurable warm-up.
//! * [`experiments`] wires the standard study topologies (M/M/1/K, a
//!   CPU-and-IO web server, M/G/k) and aggregates replicates into 95%
//!   confidence intervals.
//!
//! Everything runs on one logical thread. "Concurrency" is virtual: a
//! component suspends by registering a future job and returning, and the
//! scheduler is the only thing that ever calls back in. Runs with identical
//! seeds replay identical statistics; replicates differ only by seed offsets.

pub mod arrivals;
pub mod balancer;
pub mod customer;
mod error;
pub mod experiments;
pub mod network;
pub mod queue;
pub mod random;
pub mod scheduler;
pub mod server;
mod simulation;
pub mod spy;
pub mod stats;
mod world;

pub use error::{Error, Result};
pub use scheduler::{Event, JobId, Scheduler};
pub use simulation::Simulation;
pub use world::SimWorld;
