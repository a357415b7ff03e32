use crate::customer::CustomerId;
use crate::network::{QueueId, Sink};
use crate::scheduler::JobId;
use std::rc::Rc;

/// The customer a server is working on, together with the scheduled job that
/// will complete it. Keeping the job id here is what makes preemption
/// possible: cancelling that job returns its scheduled time, from which the
/// residual service demand falls out.
#[derive(Debug, Clone, Copy)]
pub struct InService {
    pub customer: CustomerId,
    pub departure_job: JobId,
}

/// A single-slot service station.
///
/// A server is bound at wire-up to exactly one upstream queue (where it
/// requests work from) and one exit sink (where finished customers go). The
/// station holds pure state; the choreography - requesting a refill,
/// scheduling the departure, the preemption exchange - lives on the network,
/// which owns every component the choreography touches.
#[derive(Debug)]
pub struct Server {
    name: Rc<str>,
    upstream: QueueId,
    exit: Sink,
    in_service: Option<InService>,
}

impl Server {
    pub fn new(name: &str, upstream: QueueId, exit: Sink) -> Self {
        Self {
            name: Rc::from(name),
            upstream,
            exit,
            in_service: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_rc(&self) -> Rc<str> {
        self.name.clone()
    }

    pub fn upstream(&self) -> QueueId {
        self.upstream
    }

    pub fn exit(&self) -> Sink {
        self.exit
    }

    pub fn is_busy(&self) -> bool {
        self.in_service.is_some()
    }

    pub(crate) fn in_service(&self) -> Option<InService> {
        self.in_service
    }

    /// The customer currently being serviced, if any.
    pub fn current_customer(&self) -> Option<CustomerId> {
        self.in_service.map(|in_service| in_service.customer)
    }

    pub(crate) fn begin(&mut self, customer: CustomerId, departure_job: JobId) {
        self.in_service = Some(InService {
            customer,
            departure_job,
        });
    }

    /// Empty the service slot, returning what was in it.
    pub(crate) fn clear_in_service(&mut self) -> Option<InService> {
        self.in_service.take()
    }
}
