//! Evolutionary search over trigger sequences.
//!
//! A chromosome is a trace. Its fitness is measured by replaying it in a
//! fresh session with exploration after every step:
//!
//! - `max_fitness` if the goal predicate holds at the end,
//! - `-1` if the agent died,
//! - otherwise links observed during that replay plus open gates, kept
//!   strictly below `max_fitness`.
//!
//! The chromosome is truncated to the steps actually executed. A replay
//! that ran no step, or that the budget cut short, yields no chromosome.
//! Every evaluation still feeds newly seen triggers into the gene pool.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use linkscout_kernel::model::belief::{BeliefModelV1, BeliefSnapshotV1};
use linkscout_kernel::model::ids::TriggerId;
use linkscout_kernel::model::link::Link;
use linkscout_kernel::model::trace::TraceV1;

use crate::contract::ActuationLayerV1;
use crate::engine::Engine;
use crate::error::{Interrupted, SearchError};
use crate::policy::EvolutionaryPolicy;
use crate::report::TerminationReasonV1;
use crate::strategy::Strategy;

/// Fitness assigned to a chromosome whose execution killed the agent.
pub const DEATH_FITNESS: f32 = -1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Chromosome {
    pub trace: TraceV1,
    pub fitness: f32,
    /// Belief captured right after the evaluation.
    pub snapshot: BeliefSnapshotV1,
}

/// Chromosomes kept in descending fitness order. Equal fitness keeps
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct Population {
    members: Vec<Chromosome>,
}

impl Population {
    pub fn add(&mut self, chromosome: Chromosome) {
        let at = self
            .members
            .partition_point(|m| m.fitness >= chromosome.fitness);
        self.members.insert(at, chromosome);
    }

    #[must_use]
    pub fn best(&self) -> Option<&Chromosome> {
        self.members.first()
    }

    #[must_use]
    pub fn contains(&self, trace: &TraceV1) -> bool {
        self.members.iter().any(|m| m.trace == *trace)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chromosome> {
        self.members.iter()
    }

    /// Shrink to `target`, never dropping the first `elites` members; the
    /// rest are dropped uniformly at random.
    pub fn select<R: Rng + ?Sized>(&mut self, target: usize, elites: usize, rng: &mut R) {
        while self.members.len() > target && self.members.len() > elites {
            let k = rng.gen_range(elites..self.members.len());
            self.members.remove(k);
        }
    }

    fn retain_traces(&mut self, keep: &[TraceV1]) {
        self.members.retain(|m| keep.contains(&m.trace));
    }
}

/// Splice two parents into two offspring of the same total length.
///
/// The first half of the shorter parent goes with the longer parent's tail
/// from the same index, and the longer parent's head with the shorter
/// parent's tail. A single-gene shorter parent is extended with the longer
/// parent's tail from index 1; the longer parent is kept as the second
/// offspring. Returns `None` if either parent is empty.
#[must_use]
pub fn crossover(a: &TraceV1, b: &TraceV1) -> Option<(TraceV1, TraceV1)> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let (longer, shorter) = if a.len() >= b.len() { (a.steps(), b.steps()) } else { (b.steps(), a.steps()) };
    if shorter.len() == 1 {
        let first: TraceV1 = shorter.iter().chain(&longer[1..]).cloned().collect();
        return Some((first, longer.iter().cloned().collect()));
    }
    let cut = shorter.len() / 2;
    let first: TraceV1 = shorter[..cut].iter().chain(&longer[cut..]).cloned().collect();
    let second: TraceV1 = longer[..cut].iter().chain(&shorter[cut..]).cloned().collect();
    Some((first, second))
}

pub struct EvolutionaryStrategy {
    policy: EvolutionaryPolicy,
    population: Population,
    gene_pool: Vec<TriggerId>,
    generation: u64,
    links: BTreeSet<Link>,
}

impl EvolutionaryStrategy {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] if the policy fails validation.
    pub fn new(policy: EvolutionaryPolicy) -> Result<Self, SearchError> {
        policy.validate()?;
        Ok(Self {
            policy,
            population: Population::default(),
            gene_pool: Vec::new(),
            generation: 0,
            links: BTreeSet::new(),
        })
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn absorb_triggers(&mut self, belief: &dyn BeliefModelV1) {
        for trigger in belief.known_triggers() {
            if !self.gene_pool.contains(&trigger) {
                self.gene_pool.push(trigger);
            }
        }
    }

    /// Replay `trace` and score the resulting session.
    ///
    /// Returns `None` when no step ran, or when the budget ran out before
    /// the replay ended without death or goal.
    fn evaluate<E: ActuationLayerV1>(
        &mut self,
        engine: &mut Engine<E>,
        mut trace: TraceV1,
    ) -> Result<Option<Chromosome>, Interrupted> {
        engine.note_evaluation();
        let outcome = engine.replay(&trace, true)?;
        trace.truncate(outcome.executed);

        let snapshot = engine.snapshot();
        self.links.extend(snapshot.links.iter().cloned());
        self.absorb_triggers(engine.belief());

        if trace.is_empty() {
            debug!("no step ran; chromosome discarded");
            return Ok(None);
        }
        engine.checkpoint();
        if engine.budget().is_exhausted() && !snapshot.goal_holds && !outcome.died {
            debug!(trace = %trace, "budget ran out during replay; chromosome discarded");
            return Ok(None);
        }

        let fitness = if snapshot.goal_holds {
            self.policy.max_fitness
        } else if outcome.died {
            DEATH_FITNESS
        } else {
            #[allow(clippy::cast_precision_loss)]
            let raw = (snapshot.links.len() + snapshot.open_gates.len()) as f32;
            raw.min(below(self.policy.max_fitness))
        };
        debug!(trace = %trace, fitness, died = outcome.died, "chromosome evaluated");
        Ok(Some(Chromosome {
            trace,
            fitness,
            snapshot,
        }))
    }

    fn best_fitness(&self) -> Option<f32> {
        self.population.best().map(|c| c.fitness)
    }

    fn termination<E: ActuationLayerV1>(&self, engine: &mut Engine<E>) -> Option<TerminationReasonV1> {
        if engine.termination_reached() {
            return Some(
                engine
                    .check_termination()
                    .unwrap_or(TerminationReasonV1::BudgetExhausted),
            );
        }
        if self
            .best_fitness()
            .is_some_and(|f| f >= self.policy.max_fitness)
        {
            return Some(TerminationReasonV1::MaxFitnessReached);
        }
        None
    }

    fn initial_population<E: ActuationLayerV1>(
        &mut self,
        engine: &mut Engine<E>,
    ) -> Result<(), Interrupted> {
        engine.explore()?;
        self.absorb_triggers(engine.belief());
        let mut singles = self.gene_pool.clone();
        singles.shuffle(engine.rng());
        for trigger in singles {
            if self.population.len() >= self.policy.max_population_size
                || self.termination(engine).is_some()
            {
                return Ok(());
            }
            if let Some(chromosome) = self.evaluate(engine, vec![trigger].into())? {
                self.population.add(chromosome);
            }
        }

        // Fill any remaining room with random multi-gene samples.
        let max_len = self.policy.max_chromosome_length.min(self.gene_pool.len());
        let mut attempts = self.policy.max_population_size * 2;
        while max_len >= 2 && self.population.len() < self.policy.max_population_size && attempts > 0 {
            attempts -= 1;
            if self.termination(engine).is_some() {
                break;
            }
            let len = engine.rng().gen_range(2..=max_len);
            let sample: TraceV1 = self
                .gene_pool
                .choose_multiple(engine.rng(), len)
                .cloned()
                .collect();
            if self.population.contains(&sample) {
                continue;
            }
            let evaluation = self.evaluate(engine, sample)?;
            if let Some(chromosome) = evaluation.filter(|c| !self.population.contains(&c.trace)) {
                self.population.add(chromosome);
            }
        }
        Ok(())
    }

    /// Random survivors in pairs, crossed over with `crossover_probability`.
    fn pair<R: Rng + ?Sized>(&self, mut parents: Vec<TraceV1>, rng: &mut R) -> Vec<TraceV1> {
        let mut batch: Vec<TraceV1> = Vec::with_capacity(parents.len() * 2);
        while parents.len() > 1 {
            let p1 = parents.swap_remove(rng.gen_range(0..parents.len()));
            let p2 = parents.swap_remove(rng.gen_range(0..parents.len()));
            if rng.gen::<f32>() < self.policy.crossover_probability {
                if let Some((c1, c2)) = crossover(&p1, &p2) {
                    if !batch.contains(&c1) && !batch.contains(&c2) {
                        batch.push(c1);
                        batch.push(c2);
                        continue;
                    }
                }
            }
            batch.push(p1);
            batch.push(p2);
        }
        batch.append(&mut parents);
        batch
    }

    fn extend<R: Rng + ?Sized>(&self, trace: &TraceV1, rng: &mut R) -> Option<TraceV1> {
        if trace.len() >= self.policy.max_chromosome_length {
            return None;
        }
        let candidates: Vec<&TriggerId> = self
            .gene_pool
            .iter()
            .filter(|t| !self.policy.only_extend_with_new_gene || !trace.contains(*t))
            .collect();
        let gene = (*candidates.choose(rng)?).clone();
        let mut steps = trace.clone().into_steps();
        let at = rng.gen_range(0..=steps.len());
        steps.insert(at, gene);
        Some(steps.into())
    }

    fn mutate<R: Rng + ?Sized>(&self, trace: &TraceV1, rng: &mut R) -> Option<TraceV1> {
        if trace.is_empty() {
            return None;
        }
        let mut steps = trace.clone().into_steps();
        let at = rng.gen_range(0..steps.len());
        let candidates: Vec<&TriggerId> = self.gene_pool.iter().filter(|t| **t != steps[at]).collect();
        steps[at] = (*candidates.choose(rng)?).clone();
        Some(steps.into())
    }

    /// Append extended or mutated variants of every queued chromosome.
    fn vary<R: Rng + ?Sized>(&self, batch: &mut Vec<TraceV1>, rng: &mut R) {
        let queued = batch.len();
        for i in 0..queued {
            let source = batch[i].clone();
            let mut extended = false;
            if rng.gen::<f32>() < self.policy.insertion_probability {
                if let Some(child) = self.extend(&source, rng) {
                    if !self.population.contains(&child) && !batch.contains(&child) {
                        batch.push(child);
                        extended = true;
                    }
                }
            }
            if !extended && rng.gen::<f32>() < self.policy.mutation_probability {
                if let Some(child) = self.mutate(&source, rng) {
                    if !self.population.contains(&child) && !batch.contains(&child) {
                        batch.push(child);
                    }
                }
            }
        }
    }

    /// One generation. Returns the number of chromosomes evaluated.
    fn evolve<E: ActuationLayerV1>(&mut self, engine: &mut Engine<E>) -> Result<usize, Interrupted> {
        let half = self.policy.max_population_size / 2;
        self.population
            .select(half, self.policy.elites_to_keep, engine.rng());
        let parents: Vec<TraceV1> = self.population.iter().map(|c| c.trace.clone()).collect();
        let mut batch = self.pair(parents, engine.rng());
        self.vary(&mut batch, engine.rng());

        self.population.retain_traces(&batch);
        let mut evaluated = 0;
        for trace in batch {
            if self.population.contains(&trace) {
                continue;
            }
            if self.termination(engine).is_some() {
                break;
            }
            let evaluation = self.evaluate(engine, trace)?;
            evaluated += 1;
            // Truncation may turn a new trace into an existing one.
            if let Some(chromosome) = evaluation.filter(|c| !self.population.contains(&c.trace)) {
                self.population.add(chromosome);
            }
        }
        self.generation += 1;
        Ok(evaluated)
    }
}

/// Largest value strictly below `max`, for non-goal fitness.
fn below(max: f32) -> f32 {
    let step = (max.abs() * f32::EPSILON).max(f32::MIN_POSITIVE);
    max - step
}

impl<E: ActuationLayerV1> Strategy<E> for EvolutionaryStrategy {
    fn name(&self) -> &'static str {
        "evolutionary"
    }

    fn run(&mut self, engine: &mut Engine<E>) -> Result<TerminationReasonV1, Interrupted> {
        self.initial_population(engine)?;
        if self.gene_pool.is_empty() {
            info!("no trigger found; cannot seed a population");
            return Ok(TerminationReasonV1::NoTriggersFound);
        }
        info!(size = self.population.len(), best = ?self.best_fitness(), "initial population");
        let mut stale = 0;
        loop {
            if let Some(reason) = self.termination(engine) {
                info!(
                    generation = self.generation,
                    best = ?self.best_fitness(),
                    reason = reason.as_str(),
                    "evolution finished"
                );
                return Ok(reason);
            }
            if self.evolve(engine)? == 0 {
                stale += 1;
                if stale >= self.policy.max_stale_generations {
                    info!(generation = self.generation, "no new chromosome in recent generations");
                    return Ok(TerminationReasonV1::Stagnated);
                }
            } else {
                stale = 0;
            }
            info!(
                generation = self.generation,
                size = self.population.len(),
                best = ?self.best_fitness(),
                "generation evaluated"
            );
        }
    }

    fn discovered_links(&self, engine: &Engine<E>) -> BTreeSet<Link> {
        let mut links = self.links.clone();
        links.extend(engine.discovered_links());
        links
    }

    fn is_goal_solved(&self, _engine: &Engine<E>) -> bool {
        self.population.best().is_some_and(|c| c.snapshot.goal_holds)
    }

    fn winning_trace(&self) -> Option<TraceV1> {
        self.population
            .best()
            .filter(|c| c.snapshot.goal_holds)
            .map(|c| c.trace.clone())
    }
}
