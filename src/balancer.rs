use crate::network::Sink;
use crate::random::UniformStream;
use crate::{Error, Result};

/// Routes each customer to one of several sinks with configured
/// probabilities.
///
/// Each target carries the upper edge of its probability interval: with
/// targets `{A, 0.3}, {B, 0.5}, {C, 1.0}`, A is chosen 30% of the time, B
/// 20%, and C 50% - a draw of 0.4 selects B. The uppers must be strictly
/// increasing and the last must be exactly 1.0, which together realise any
/// discrete categorical split.
#[derive(Debug)]
pub struct RandomLoadBalancer {
    targets: Vec<(Sink, f64)>,
    draws: UniformStream,
}

impl RandomLoadBalancer {
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] if the target list is empty, the upper
    /// probabilities are not strictly increasing starting above 0, or the
    /// last upper is not 1.0.
    pub fn new(targets: Vec<(Sink, f64)>, draws: UniformStream) -> Result<Self> {
        let mut upper = 0.0;
        for (_, target_upper) in &targets {
            if *target_upper <= upper {
                return Err(Error::InvalidConfiguration(
                    "upper probabilities must be in increasing order".into(),
                ));
            }
            upper = *target_upper;
        }
        if upper != 1.0 {
            return Err(Error::InvalidConfiguration(
                "last upper probability must be 1".into(),
            ));
        }

        Ok(Self { targets, draws })
    }

    /// Pick the sink for one customer.
    pub(crate) fn route(&mut self) -> Sink {
        let draw = self.draws.sample();
        for (sink, upper) in &self.targets {
            if draw < *upper {
                return *sink;
            }
        }
        // unreachable with an open-interval draw; the last upper is 1.0
        self.targets[self.targets.len() - 1].0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppers_must_increase_to_exactly_one() {
        let draws = UniformStream::new(0);
        assert!(
            RandomLoadBalancer::new(vec![], draws).is_err(),
            "no targets means no upper of 1.0"
        );

        let draws = UniformStream::new(0);
        let targets = vec![(Sink::Exit, 0.4), (Sink::Exit, 0.4), (Sink::Exit, 1.0)];
        assert!(
            RandomLoadBalancer::new(targets, draws).is_err(),
            "uppers must strictly increase"
        );

        let draws = UniformStream::new(0);
        let targets = vec![(Sink::Exit, 0.4), (Sink::Exit, 0.9)];
        assert!(
            RandomLoadBalancer::new(targets, draws).is_err(),
            "last upper must be 1.0"
        );

        let draws = UniformStream::new(0);
        let targets = vec![(Sink::Exit, 0.4), (Sink::Exit, 1.0)];
        assert!(RandomLoadBalancer::new(targets, draws).is_ok());
    }

    #[test]
    fn routing_respects_the_configured_split() {
        let targets = vec![
            (Sink::Queue(0), 0.1),
            (Sink::Queue(1), 0.4),
            (Sink::Queue(2), 1.0),
        ];
        let mut balancer = RandomLoadBalancer::new(targets, UniformStream::new(31)).unwrap();

        let mut counts = [0u32; 3];
        let draws = 1000;
        for _ in 0..draws {
            match balancer.route() {
                Sink::Queue(index) => counts[index] += 1,
                other => panic!("unexpected sink {:?}", other),
            }
        }

        assert_eq!(counts.iter().sum::<u32>(), draws, "every draw routed somewhere");
        assert!(counts[1] > counts[0], "~30% bigger than ~10%");
        assert!(counts[2] > counts[1], "~60% bigger than ~30%");
    }
}
