//! Random-pair baseline: explore, then check one uniformly random
//! (trigger, gate) pair, until termination.

use rand::seq::IteratorRandom;
use tracing::debug;

use linkscout_kernel::model::belief::BeliefModelV1;

use crate::contract::ActuationLayerV1;
use crate::engine::{DeathPolicy, Engine};
use crate::error::Interrupted;
use crate::policy::RandomPairsPolicy;
use crate::report::TerminationReasonV1;
use crate::strategy::Strategy;

#[derive(Debug, Clone, Default)]
pub struct RandomPairsStrategy {
    policy: RandomPairsPolicy,
    pairs_checked: u64,
}

impl RandomPairsStrategy {
    #[must_use]
    pub fn new(policy: RandomPairsPolicy) -> Self {
        Self {
            policy,
            pairs_checked: 0,
        }
    }

    #[must_use]
    pub fn pairs_checked(&self) -> u64 {
        self.pairs_checked
    }
}

impl<E: ActuationLayerV1> Strategy<E> for RandomPairsStrategy {
    fn name(&self) -> &'static str {
        "random-pairs"
    }

    fn death_policy(&self) -> DeathPolicy {
        DeathPolicy::EndsSearch
    }

    fn run(&mut self, engine: &mut Engine<E>) -> Result<TerminationReasonV1, Interrupted> {
        loop {
            engine.explore()?;
            if engine.termination_reached() {
                return Ok(engine
                    .check_termination()
                    .unwrap_or(TerminationReasonV1::BudgetExhausted));
            }
            if self.policy.max_pairs.is_some_and(|max| self.pairs_checked >= max) {
                return Ok(TerminationReasonV1::PairLimitReached);
            }
            let triggers = engine.belief().known_triggers();
            let gates = engine.belief().known_gates();
            let trigger = triggers.into_iter().choose(engine.rng());
            let gate = gates.into_iter().choose(engine.rng());
            let (Some(trigger), Some(gate)) = (trigger, gate) else {
                debug!("nothing to pair yet");
                continue;
            };
            self.pairs_checked += 1;
            engine.note_evaluation();
            engine.check_pair(&trigger, &gate)?;
        }
    }
}
