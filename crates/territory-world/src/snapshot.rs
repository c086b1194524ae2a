//! Read-only views of the simulation handed to display code.

use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use territory_core::{FamilyId, FamilyStats, InteractionKind, OrganismId, Position, Result};

/// One contact between two organisms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub kind: InteractionKind,
    pub mover: OrganismId,
    pub mover_family: FamilyId,
    pub defender: OrganismId,
    pub defender_family: FamilyId,
    pub position: Position,
    pub reward: i32,
    /// Set for fights only
    pub winner: Option<OrganismId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Upkeep,
    Fight,
}

/// Something that happened during a step, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StepEvent {
    Interaction(InteractionRecord),
    Consumed {
        organism: OrganismId,
        family: FamilyId,
        position: Position,
        value: i32,
    },
    Born {
        parent: OrganismId,
        child: OrganismId,
        family: FamilyId,
        position: Position,
    },
    Died {
        organism: OrganismId,
        family: FamilyId,
        cause: DeathCause,
    },
}

/// Grid occupancy and the event log after a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub step: u64,
    pub width: i32,
    pub height: i32,
    /// Family tag per cell, row-major
    pub cells: Vec<Option<FamilyId>>,
    pub family_counts: BTreeMap<FamilyId, usize>,
    pub events: Vec<StepEvent>,
    /// Resources nobody collected this step
    pub resources_left: Vec<Resource>,
}

impl StepSnapshot {
    pub fn family_at(&self, pos: Position) -> Option<FamilyId> {
        if pos.x < 0 || pos.x >= self.width || pos.y < 0 || pos.y >= self.height {
            return None;
        }
        self.cells[(pos.y * self.width + pos.x) as usize]
    }

    pub fn population(&self) -> usize {
        self.family_counts.values().sum()
    }

    pub fn interactions(&self) -> impl Iterator<Item = &InteractionRecord> + '_ {
        self.events.iter().filter_map(|event| match event {
            StepEvent::Interaction(record) => Some(record),
            _ => None,
        })
    }

    pub fn births(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, StepEvent::Born { .. }))
            .count()
    }

    pub fn deaths(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, StepEvent::Died { .. }))
            .count()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for StepSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.width.max(1) as usize) {
            let line: Vec<String> = row
                .iter()
                .map(|cell| match cell {
                    Some(family) => family.to_string(),
                    None => ".".to_string(),
                })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The requested number of steps was run
    StepLimit,
    /// Every cell was occupied
    Saturated,
}

/// Final statistics of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub steps_completed: u64,
    pub termination: Termination,
    pub longest_surviving: Option<FamilyStats>,
    pub families: Vec<FamilyStats>,
    pub final_population: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation statistics:")?;
        if self.termination == Termination::Saturated {
            writeln!(f, "The grid is full. Stopped after step {}.", self.steps_completed)?;
        }
        match &self.longest_surviving {
            Some(stats) => {
                writeln!(f, "Family that lasted the longest: {}", stats.family)?;
                writeln!(f, "Steps survived: {}", stats.last_step_seen)?;
                writeln!(f, "Times fought: {}", stats.fights)?;
                writeln!(f, "Times cooperated: {}", stats.cooperations)?;
            }
            None => writeln!(f, "No family was tracked")?,
        }
        write!(f, "Final population: {}", self.final_population)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> StepSnapshot {
        let mut family_counts = BTreeMap::new();
        family_counts.insert(FamilyId('A'), 1);
        family_counts.insert(FamilyId('B'), 2);
        StepSnapshot {
            step: 1,
            width: 3,
            height: 2,
            cells: vec![
                Some(FamilyId('A')),
                None,
                Some(FamilyId('B')),
                None,
                Some(FamilyId('B')),
                None,
            ],
            family_counts,
            events: vec![
                StepEvent::Died {
                    organism: OrganismId(9),
                    family: FamilyId('C'),
                    cause: DeathCause::Upkeep,
                },
                StepEvent::Interaction(InteractionRecord {
                    kind: InteractionKind::Fight,
                    mover: OrganismId(1),
                    mover_family: FamilyId('A'),
                    defender: OrganismId(4),
                    defender_family: FamilyId('C'),
                    position: Position::new(1, 0),
                    reward: 5,
                    winner: Some(OrganismId(1)),
                }),
            ],
            resources_left: Vec::new(),
        }
    }

    #[test]
    fn test_display_grid() {
        assert_eq!(snapshot().to_string(), "A . B\n. B .\n");
    }

    #[test]
    fn test_queries() {
        let snapshot = snapshot();
        assert_eq!(snapshot.family_at(Position::new(2, 0)), Some(FamilyId('B')));
        assert_eq!(snapshot.family_at(Position::new(0, 1)), None);
        assert_eq!(snapshot.family_at(Position::new(3, 0)), None);
        assert_eq!(snapshot.population(), 3);
        assert_eq!(snapshot.interactions().count(), 1);
        assert_eq!(snapshot.deaths(), 1);
        assert_eq!(snapshot.births(), 0);
    }

    #[test]
    fn test_json_tags_events() {
        let json = snapshot().to_json().unwrap();
        assert!(json.contains(r#""event":"died""#));
        assert!(json.contains(r#""cause":"upkeep""#));
        assert!(json.contains(r#""event":"interaction""#));
    }

    #[test]
    fn test_summary_report() {
        let mut stats = FamilyStats::new(FamilyId('B'));
        stats.last_step_seen = 12;
        stats.fights = 3;
        stats.cooperations = 1;
        let summary = RunSummary {
            steps_completed: 12,
            termination: Termination::StepLimit,
            longest_surviving: Some(stats.clone()),
            families: vec![stats],
            final_population: 4,
        };

        let report = summary.to_string();
        assert!(report.contains("Family that lasted the longest: B"));
        assert!(report.contains("Steps survived: 12"));
        assert!(report.contains("Times fought: 3"));
        assert!(report.contains("Times cooperated: 1"));
        assert!(!report.contains("grid is full"));
    }
}
