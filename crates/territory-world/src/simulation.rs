//! Simulation engine for running a territory world.

use crate::grid::Grid;
use crate::interaction::{self, Contestant, Outcome};
use crate::organism::{Organism, MAX_STRENGTH};
use crate::resource::ResourceField;
use crate::snapshot::{
    DeathCause, InteractionRecord, RunSummary, StepEvent, StepSnapshot, Termination,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use territory_core::{
    Error, FamilyId, InteractionKind, MovementPolicy, OrganismId, Position, Result,
    SimulationConfig, StatsReporter, WorldConfig,
};
use tracing::{debug, event, info, instrument, trace, warn, Level};

pub struct Simulation {
    grid: Grid,
    /// Keyed by id, so iteration follows creation order
    organisms: BTreeMap<OrganismId, Organism>,
    resources: ResourceField,
    stats: StatsReporter,
    config: SimulationConfig,
    rng: ChaCha8Rng,
    step: u64,
    next_id: u64,
    events: Vec<StepEvent>,
    total_births: u64,
    total_deaths: u64,
}

impl Simulation {
    /// Build a world with one organism per configured family, each on a
    /// random free cell
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let mut sim = Self::empty(config)?;

        let families = sim.config.families.clone();
        let strength = sim.config.rules.initial_strength;
        for family in families {
            sim.spawn_organism(family, strength)?;
        }

        Ok(sim)
    }

    /// Default rules on a `width` x `height` world
    pub fn new_simulation(
        width: i32,
        height: i32,
        resource_density: f64,
        seed: u64,
    ) -> Result<Self> {
        let config = SimulationConfig {
            seed,
            world: WorldConfig {
                width,
                height,
                resource_density,
                ..Default::default()
            },
            ..Default::default()
        };
        Self::new(config)
    }

    /// Build a world with organisms at fixed positions.
    ///
    /// The founding families become the distinct families of `layout`, in the
    /// order they first appear.
    pub fn with_organisms(
        mut config: SimulationConfig,
        layout: impl IntoIterator<Item = (FamilyId, Position, i32)>,
    ) -> Result<Self> {
        let layout: Vec<_> = layout.into_iter().collect();

        config.families.clear();
        for (family, _, _) in &layout {
            if !config.families.contains(family) {
                config.families.push(*family);
            }
        }

        let mut sim = Self::empty(config)?;
        for (family, position, strength) in layout {
            if !(1..=MAX_STRENGTH).contains(&strength) {
                return Err(Error::InvalidConfiguration(format!(
                    "strength must be within 1..={}, got {}",
                    MAX_STRENGTH, strength
                )));
            }
            sim.insert_organism(family, position, strength)?;
        }

        Ok(sim)
    }

    fn empty(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let grid = Grid::from_config(&config.world);
        let mut stats = StatsReporter::new();
        for family in &config.families {
            stats.register(*family);
        }

        Ok(Self {
            grid,
            organisms: BTreeMap::new(),
            resources: ResourceField::new(),
            stats,
            config,
            rng,
            step: 0,
            next_id: 0,
            events: Vec::new(),
            total_births: 0,
            total_deaths: 0,
        })
    }

    /// Run up to `steps` steps, stopping early once the grid is full
    pub fn run(&mut self, steps: u64) -> Result<RunSummary> {
        self.run_with(steps, |_| Ok(()))
    }

    /// Like [`Simulation::run`], handing every step's snapshot to `on_step`
    #[instrument(skip(self, on_step), fields(seed = self.config.seed))]
    pub fn run_with<F>(&mut self, steps: u64, mut on_step: F) -> Result<RunSummary>
    where
        F: FnMut(&StepSnapshot) -> Result<()>,
    {
        info!(
            width = self.grid.width,
            height = self.grid.height,
            population = self.organisms.len(),
            "Starting simulation for {} steps",
            steps
        );

        let mut termination = Termination::StepLimit;
        for _ in 0..steps {
            if self.grid.is_full() {
                termination = Termination::Saturated;
                break;
            }

            let snapshot = self.advance()?;
            on_step(&snapshot)?;

            if self.step % 100 == 0 {
                info!(
                    "Step {}: {} organisms alive",
                    self.step,
                    self.organisms.len()
                );
            }

            if self.grid.is_full() {
                termination = Termination::Saturated;
                break;
            }
        }

        if termination == Termination::Saturated {
            info!(step = self.step, "The grid is full, stopping the simulation");
        }

        let summary = self.summary(termination);
        self.emit_run_summary(&summary);
        Ok(summary)
    }

    /// Run for the configured number of steps
    pub fn run_to_completion(&mut self) -> Result<RunSummary> {
        self.run(self.config.num_steps)
    }

    /// Execute one simulation step
    pub fn advance(&mut self) -> Result<StepSnapshot> {
        self.step += 1;
        self.events.clear();

        self.apply_upkeep()?;

        self.resources.generate(
            &self.grid,
            self.config.world.resource_density,
            &mut self.rng,
        );

        // Offspring born during the turn phase act from the next step on
        let turn_order: Vec<OrganismId> = self.organisms.keys().copied().collect();
        for id in turn_order {
            self.take_turn(id)?;
        }

        self.compact()?;
        self.update_statistics();

        let snapshot = self.snapshot();
        self.resources.clear();

        if self.step % 100 == 0 {
            self.emit_population_metrics();
        }

        Ok(snapshot)
    }

    fn apply_upkeep(&mut self) -> Result<()> {
        let cost = self.config.rules.upkeep_cost;
        let ids: Vec<OrganismId> = self.organisms.keys().copied().collect();

        for id in ids {
            let survived = match self.organisms.get_mut(&id) {
                Some(organism) => organism.decay(cost),
                None => continue,
            };
            if !survived {
                self.kill(id, DeathCause::Upkeep)?;
            }
        }

        Ok(())
    }

    fn take_turn(&mut self, id: OrganismId) -> Result<()> {
        // Might have been killed earlier in the step
        let origin = match self.organisms.get(&id) {
            Some(organism) if organism.is_alive() => match organism.position {
                Some(position) => position,
                None => return Ok(()),
            },
            _ => return Ok(()),
        };

        let candidates = match self.config.rules.movement {
            MovementPolicy::Contest => self.grid.valid_neighbors(origin),
            MovementPolicy::EmptyOnly => self.grid.empty_neighbors(origin),
        };

        match candidates.choose(&mut self.rng).copied() {
            Some(destination) => match self.grid.occupant(destination)? {
                Some(defender) => {
                    let reward = interaction::contact_reward(&mut self.rng);
                    let outcome = interaction::resolve(
                        self.contestant(id)?,
                        self.contestant(defender)?,
                        reward,
                        &mut self.rng,
                    );
                    self.apply_outcome(id, defender, destination, reward, outcome)?;
                }
                None => self.relocate(id, destination)?,
            },
            None => {
                trace!(organism_id = %id, step = self.step, "No destination, staying in place");
            }
        }

        let position = match self.organisms.get(&id) {
            Some(organism) => organism.position,
            None => return Ok(()), // lost a fight
        };

        if let Some(position) = position.filter(|p| *p != origin) {
            self.collect_resource(id, position)?;
        }

        self.try_reproduce(id)
    }

    fn contestant(&self, id: OrganismId) -> Result<Contestant> {
        self.organisms
            .get(&id)
            .map(Contestant::from)
            .ok_or(Error::UnknownOrganism(id))
    }

    fn apply_outcome(
        &mut self,
        mover: OrganismId,
        defender: OrganismId,
        destination: Position,
        reward: i32,
        outcome: Outcome,
    ) -> Result<()> {
        let mover_family = self.contestant(mover)?.family;
        let defender_family = self.contestant(defender)?.family;
        let winner = match outcome {
            Outcome::Fight { winner, .. } => Some(winner),
            Outcome::Cooperate { .. } => None,
        };

        debug!(
            event = "interaction",
            kind = %outcome.kind(),
            mover = %mover,
            defender = %defender,
            winner = ?winner,
            reward = reward,
            step = self.step,
            "Interaction happened between {} and {}",
            mover_family,
            defender_family
        );

        self.events.push(StepEvent::Interaction(InteractionRecord {
            kind: outcome.kind(),
            mover,
            mover_family,
            defender,
            defender_family,
            position: destination,
            reward,
            winner,
        }));

        match outcome {
            Outcome::Cooperate { share } => {
                for id in [mover, defender] {
                    if let Some(organism) = self.organisms.get_mut(&id) {
                        organism.consume(share);
                    }
                }
                self.stats
                    .record_interaction(mover_family, InteractionKind::Cooperate);
            }
            Outcome::Fight {
                winner,
                loser,
                reward,
            } => {
                self.stats
                    .record_interaction(mover_family, InteractionKind::Fight);
                self.stats
                    .record_interaction(defender_family, InteractionKind::Fight);

                self.kill(loser, DeathCause::Fight)?;
                if let Some(organism) = self.organisms.get_mut(&winner) {
                    organism.consume(reward);
                }
                if winner == mover {
                    self.relocate(mover, destination)?;
                }
            }
        }

        Ok(())
    }

    fn relocate(&mut self, id: OrganismId, destination: Position) -> Result<()> {
        let organism = self
            .organisms
            .get_mut(&id)
            .ok_or(Error::UnknownOrganism(id))?;
        let origin = organism.position.ok_or(Error::UnknownOrganism(id))?;

        self.grid.move_occupant(origin, destination)?;
        organism.move_to(destination);

        trace!(
            organism_id = %id,
            from = %origin,
            to = %destination,
            step = self.step,
            "Organism moved"
        );
        Ok(())
    }

    fn collect_resource(&mut self, id: OrganismId, position: Position) -> Result<()> {
        let Some(value) = self.resources.consume_if_present(position) else {
            return Ok(());
        };

        let organism = self
            .organisms
            .get_mut(&id)
            .ok_or(Error::UnknownOrganism(id))?;
        organism.consume(value);

        trace!(
            organism_id = %id,
            family = %organism.family,
            value = value,
            strength = organism.strength,
            step = self.step,
            "Organism consumed resource at {}",
            position
        );

        self.events.push(StepEvent::Consumed {
            organism: id,
            family: organism.family,
            position,
            value,
        });
        Ok(())
    }

    fn try_reproduce(&mut self, id: OrganismId) -> Result<()> {
        if !self.config.rules.allow_reproduction {
            return Ok(());
        }

        let ready = self
            .organisms
            .get(&id)
            .is_some_and(|organism| organism.can_reproduce());
        if !ready {
            return Ok(());
        }

        let free_cells = self.grid.empty_cells();
        let Some(&spot) = free_cells.choose(&mut self.rng) else {
            trace!(organism_id = %id, step = self.step, "Reproduction skipped: grid is full");
            return Ok(());
        };

        let child_id = self.allocate_id();
        let step = self.step;
        let parent = self
            .organisms
            .get_mut(&id)
            .ok_or(Error::UnknownOrganism(id))?;
        let Some(mut child) = parent.reproduce(child_id, step) else {
            return Ok(());
        };
        let parent_strength = parent.strength;

        self.grid.place(child_id, spot)?;
        child.move_to(spot);

        debug!(
            event = "reproduction",
            parent_id = %id,
            offspring_id = %child_id,
            family = %child.family,
            parent_strength = parent_strength,
            offspring_strength = child.strength,
            step = step,
            "Organism {} reproduced at {}",
            child.family,
            spot
        );

        self.stats.record_birth(child.family);
        self.events.push(StepEvent::Born {
            parent: id,
            child: child_id,
            family: child.family,
            position: spot,
        });
        self.total_births += 1;
        self.organisms.insert(child_id, child);

        Ok(())
    }

    /// Remove an organism from both the population and the grid
    fn kill(&mut self, id: OrganismId, cause: DeathCause) -> Result<()> {
        let organism = self
            .organisms
            .remove(&id)
            .ok_or(Error::UnknownOrganism(id))?;

        if let Some(position) = organism.position {
            if self.grid.occupant(position)? == Some(id) {
                self.grid.remove(position)?;
            }
        }

        debug!(
            event = "organism_death",
            organism_id = %id,
            family = %organism.family,
            cause = ?cause,
            age = organism.age(self.step),
            offspring_count = organism.offspring_count,
            step = self.step,
            "Organism {} died",
            organism.family
        );

        self.stats.record_death(organism.family);
        self.events.push(StepEvent::Died {
            organism: id,
            family: organism.family,
            cause,
        });
        self.total_deaths += 1;
        Ok(())
    }

    /// Keep exactly the living organisms the grid still references
    fn compact(&mut self) -> Result<()> {
        let grid = &self.grid;
        let stale: Vec<OrganismId> = self
            .organisms
            .values()
            .filter(|organism| {
                let on_grid = organism
                    .position
                    .and_then(|position| grid.occupant(position).ok().flatten())
                    == Some(organism.id);
                !organism.is_alive() || !on_grid
            })
            .map(|organism| organism.id)
            .collect();

        for id in stale {
            warn!(organism_id = %id, step = self.step, "Dropping organism that is dead or off the grid");
            if let Some(organism) = self.organisms.remove(&id) {
                if let Some(position) = organism.position {
                    if self.grid.occupant(position)? == Some(id) {
                        self.grid.remove(position)?;
                    }
                }
            }
        }

        Ok(())
    }

    fn update_statistics(&mut self) {
        for (family, alive) in self.family_counts() {
            self.stats.record_survival(family, self.step, alive);
        }
    }

    fn family_counts(&self) -> BTreeMap<FamilyId, usize> {
        let mut counts = BTreeMap::new();
        for organism in self.organisms.values() {
            *counts.entry(organism.family).or_insert(0) += 1;
        }
        counts
    }

    fn spawn_organism(&mut self, family: FamilyId, strength: i32) -> Result<OrganismId> {
        let free_cells = self.grid.empty_cells();
        let position = *free_cells.choose(&mut self.rng).ok_or_else(|| {
            Error::InvalidConfiguration(format!("no free cell left for family {}", family))
        })?;
        self.insert_organism(family, position, strength)
    }

    fn insert_organism(
        &mut self,
        family: FamilyId,
        position: Position,
        strength: i32,
    ) -> Result<OrganismId> {
        let id = OrganismId(self.next_id);
        self.grid.place(id, position)?;
        self.next_id += 1;

        let mut organism = Organism::new_with_birth_step(id, family, strength, self.step);
        organism.move_to(position);
        self.organisms.insert(id, organism);
        self.stats.register(family);

        debug!(organism_id = %id, family = %family, position = %position, "Organism placed");
        Ok(id)
    }

    fn allocate_id(&mut self) -> OrganismId {
        let id = OrganismId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Current grid occupancy and the events of the latest step
    pub fn snapshot(&self) -> StepSnapshot {
        let cells = self
            .grid
            .iter()
            .map(|(_, occupant)| {
                occupant.and_then(|id| self.organisms.get(&id).map(|organism| organism.family))
            })
            .collect();

        StepSnapshot {
            step: self.step,
            width: self.grid.width,
            height: self.grid.height,
            cells,
            family_counts: self.family_counts(),
            events: self.events.clone(),
            resources_left: self.resources.pending().to_vec(),
        }
    }

    fn summary(&self, termination: Termination) -> RunSummary {
        RunSummary {
            steps_completed: self.step,
            termination,
            longest_surviving: self.stats.longest_surviving().cloned(),
            families: self.stats.families().to_vec(),
            final_population: self.organisms.len(),
        }
    }

    fn emit_population_metrics(&self) {
        let total = self.organisms.len();
        let avg_strength = if total > 0 {
            self.organisms.values().map(|o| o.strength as f64).sum::<f64>() / total as f64
        } else {
            0.0
        };

        info!(
            event = "population_metrics",
            step = self.step,
            total_population = total,
            families_alive = self.family_counts().len(),
            avg_strength = format!("{:.2}", avg_strength),
            occupied_cells = self.grid.occupied_count(),
            total_births = self.total_births,
            total_deaths = self.total_deaths,
            "Population metrics snapshot"
        );

        event!(
            Level::INFO,
            gauge_name = "population_total",
            gauge_value = total,
            step = self.step,
            "Population gauge"
        );
    }

    fn emit_run_summary(&self, summary: &RunSummary) {
        match &summary.longest_surviving {
            Some(best) => info!(
                event = "run_summary",
                steps_completed = summary.steps_completed,
                termination = ?summary.termination,
                final_population = summary.final_population,
                total_births = self.total_births,
                total_deaths = self.total_deaths,
                longest_surviving = %best.family,
                last_step_seen = best.last_step_seen,
                fights = best.fights,
                cooperations = best.cooperations,
                "Simulation complete"
            ),
            None => info!(
                event = "run_summary",
                steps_completed = summary.steps_completed,
                termination = ?summary.termination,
                "Simulation complete without any tracked family"
            ),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Living organisms in creation order
    pub fn organisms(&self) -> impl Iterator<Item = &Organism> + '_ {
        self.organisms.values()
    }

    pub fn organism(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms.get(&id)
    }

    pub fn stats(&self) -> &StatsReporter {
        &self.stats
    }

    /// Resources of the step in progress; empty between steps
    pub fn resources(&self) -> &ResourceField {
        &self.resources
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn current_step(&self) -> u64 {
        self.step
    }

    pub fn population(&self) -> usize {
        self.organisms.len()
    }

    pub fn is_saturated(&self) -> bool {
        self.grid.is_full()
    }
}
