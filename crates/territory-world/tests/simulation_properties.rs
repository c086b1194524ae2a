use proptest::prelude::*;
use std::collections::HashSet;
use territory_core::{
    BoundaryPolicy, FamilyId, InteractionKind, MovementPolicy, SimulationConfig, WorldConfig,
};
use territory_world::organism::MAX_STRENGTH;
use territory_world::{Simulation, StepEvent, Termination};

fn config(
    width: i32,
    height: i32,
    density: f64,
    seed: u64,
    boundary: BoundaryPolicy,
    movement: MovementPolicy,
) -> SimulationConfig {
    let mut config = SimulationConfig {
        seed,
        world: WorldConfig {
            width,
            height,
            resource_density: density,
            boundary,
        },
        ..Default::default()
    };
    config.rules.movement = movement;
    config
}

fn boundary_strategy() -> impl Strategy<Value = BoundaryPolicy> {
    prop_oneof![Just(BoundaryPolicy::Bounded), Just(BoundaryPolicy::Toroidal)]
}

fn movement_strategy() -> impl Strategy<Value = MovementPolicy> {
    prop_oneof![Just(MovementPolicy::Contest), Just(MovementPolicy::EmptyOnly)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn step_invariants_hold(
        width in 3i32..9,
        height in 2i32..9,
        density in 0.0f64..=1.0,
        seed in any::<u64>(),
        boundary in boundary_strategy(),
        movement in movement_strategy(),
    ) {
        let mut sim = Simulation::new(config(width, height, density, seed, boundary, movement)).unwrap();
        let cells = (width * height) as usize;

        for _ in 0..20 {
            if sim.is_saturated() {
                break;
            }
            let before = sim.population();
            let snapshot = sim.advance().unwrap();

            // Population only grows through births
            prop_assert!(sim.population() <= before + snapshot.births());
            prop_assert_eq!(snapshot.population(), sim.population());
            prop_assert!(sim.grid().occupied_count() <= cells);
            prop_assert_eq!(sim.grid().occupied_count(), sim.population());

            for organism in sim.organisms() {
                prop_assert!(organism.strength >= 1 && organism.strength <= MAX_STRENGTH);
                let position = organism.position.unwrap();
                prop_assert_eq!(sim.grid().occupant(position).unwrap(), Some(organism.id));
                prop_assert_eq!(snapshot.family_at(position), Some(organism.family));
            }

            // Resources left over never share a cell
            let spots: HashSet<_> = snapshot.resources_left.iter().map(|r| r.position).collect();
            prop_assert_eq!(spots.len(), snapshot.resources_left.len());
        }
    }

    #[test]
    fn interactions_follow_family_rules(seed in any::<u64>()) {
        let mut sim = Simulation::new(config(4, 4, 0.2, seed, BoundaryPolicy::Bounded, MovementPolicy::Contest)).unwrap();

        for _ in 0..15 {
            if sim.is_saturated() {
                break;
            }
            let snapshot = sim.advance().unwrap();

            let fight_deaths = snapshot
                .events
                .iter()
                .filter(|event| matches!(event, StepEvent::Died { cause: territory_world::snapshot::DeathCause::Fight, .. }))
                .count();
            let fights = snapshot
                .interactions()
                .filter(|record| record.kind == InteractionKind::Fight)
                .count();
            prop_assert_eq!(fight_deaths, fights);

            for record in snapshot.interactions() {
                match record.kind {
                    InteractionKind::Cooperate => {
                        prop_assert_eq!(record.mover_family, record.defender_family);
                        prop_assert!(record.winner.is_none());
                    }
                    InteractionKind::Fight => {
                        prop_assert_ne!(record.mover_family, record.defender_family);
                        let winner = record.winner.unwrap();
                        prop_assert!(winner == record.mover || winner == record.defender);
                    }
                }
            }
        }
    }

    #[test]
    fn same_seed_is_reproducible(seed in any::<u64>()) {
        let mut first = Simulation::new_simulation(5, 5, 0.2, seed).unwrap();
        let mut second = Simulation::new_simulation(5, 5, 0.2, seed).unwrap();

        prop_assert_eq!(first.run(1).unwrap(), second.run(1).unwrap());
        prop_assert_eq!(first.snapshot(), second.snapshot());
    }
}

#[test]
fn saturation_stops_reproduction() {
    // Plenty of food on a tiny world fills it quickly
    let mut config = config(
        3,
        3,
        1.0,
        17,
        BoundaryPolicy::Bounded,
        MovementPolicy::EmptyOnly,
    );
    config.families = vec![FamilyId('A')];
    let mut sim = Simulation::new(config).unwrap();

    let summary = sim.run(200).unwrap();
    assert!(sim.population() <= 9);
    if summary.termination == Termination::Saturated {
        assert!(sim.is_saturated());
        assert_eq!(sim.population(), 9);
        assert!(summary.steps_completed < 200);
    }
}

#[test]
fn longest_surviving_family_matches_stats() {
    let mut sim = Simulation::new_simulation(7, 7, 0.15, 2024).unwrap();
    let summary = sim.run(60).unwrap();

    let best = summary.longest_surviving.clone().unwrap();
    let first_max = summary
        .families
        .iter()
        .fold(None::<&territory_core::FamilyStats>, |acc, stats| match acc {
            Some(current) if current.last_step_seen >= stats.last_step_seen => Some(current),
            _ => Some(stats),
        })
        .unwrap();
    assert_eq!(&best, first_max);
    assert_eq!(summary.families.len(), 5);
    assert!(summary.to_string().contains(&format!(
        "Family that lasted the longest: {}",
        best.family
    )));
}

#[test]
fn snapshot_display_matches_grid() {
    let mut sim = Simulation::new_simulation(4, 3, 0.25, 8).unwrap();
    let snapshot = sim.advance().unwrap();
    let rendered = snapshot.to_string();

    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in lines {
        assert_eq!(line.split(' ').count(), 4);
    }
    let letters = rendered.chars().filter(|c| c.is_ascii_uppercase()).count();
    assert_eq!(letters, sim.population());
}
