//! Annex C: which round-of-32 fixture each qualifying third-placed team plays in.
//!
//! The table maps the set of eight groups that produced a qualifying third to a
//! fixed assignment of those thirds to the eight group winners that face one.
//! There are C(12, 8) = 495 possible sets; lookups never guess.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::model::{GroupLabel, TeamId};
use crate::third_place::QUALIFYING_THIRDS;

/// Group winners that face a third-placed team, in table column order, with the
/// round-of-32 match each one hosts.
pub static HOSTS: [(char, &str); QUALIFYING_THIRDS] = [
    ('A', "M79"),
    ('B', "M85"),
    ('D', "M81"),
    ('E', "M74"),
    ('G', "M82"),
    ('I', "M77"),
    ('K', "M87"),
    ('L', "M80"),
];

/// Total number of eight-of-twelve group sets.
pub const COMBINATIONS: usize = 495;

const EMBEDDED_TABLE: &str = include_str!("../data/annex_c.csv");

static EMBEDDED: Lazy<EngineResult<AnnexCTable>> = Lazy::new(|| AnnexCTable::parse(EMBEDDED_TABLE));

/// Order-independent key: one bit per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupSet(u16);

impl GroupSet {
    pub fn from_groups(groups: &[GroupLabel]) -> EngineResult<Self> {
        let mut bits = 0u16;
        for group in groups {
            let bit = 1u16 << group.index();
            if bits & bit != 0 {
                return Err(EngineError::DuplicateGroup { group: *group });
            }
            bits |= bit;
        }
        Ok(GroupSet(bits))
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, group: GroupLabel) -> bool {
        self.0 & (1u16 << group.index()) != 0
    }

    pub fn groups(self) -> Vec<GroupLabel> {
        GroupLabel::ALL
            .into_iter()
            .filter(|g| self.contains(*g))
            .collect()
    }
}

impl fmt::Display for GroupSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in self.groups() {
            write!(f, "{group}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnexOption {
    pub option: u16,
    /// Third-place group facing each host, in [`HOSTS`] order.
    pub slots: [GroupLabel; QUALIFYING_THIRDS],
}

impl AnnexOption {
    /// `(round label, third-place group)` for each of the eight fixtures.
    pub fn assignments(&self) -> impl Iterator<Item = (&'static str, GroupLabel)> + '_ {
        HOSTS
            .iter()
            .zip(self.slots.iter())
            .map(|((_, round), group)| (*round, *group))
    }
}

/// Team placed into the away slot of a round-of-32 fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThirdPlaceSlot {
    pub round: String,
    pub group: GroupLabel,
    pub team_id: TeamId,
}

#[derive(Debug, Clone, Default)]
pub struct AnnexCTable {
    rows: HashMap<GroupSet, AnnexOption>,
}

impl AnnexCTable {
    /// The rows shipped with the crate.
    pub fn embedded() -> EngineResult<&'static AnnexCTable> {
        (*EMBEDDED).as_ref().map_err(Clone::clone)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read Annex C table {}", path.display()))?;
        let table = Self::parse(&raw)
            .with_context(|| format!("parse Annex C table {}", path.display()))?;
        debug!(rows = table.len(), path = %path.display(), "loaded Annex C table");
        Ok(table)
    }

    /// Parses `option,3X,...` rows. Every row is checked; the first bad one fails the
    /// whole table.
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let hosts = host_groups()?;
        let mut rows: HashMap<GroupSet, AnnexOption> = HashMap::new();
        let mut seen_options: HashMap<u16, usize> = HashMap::new();

        for (idx, line) in raw.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let bad = |reason: String| EngineError::AnnexTableRow {
                line: line_no,
                reason,
            };

            let cells: Vec<&str> = trimmed.split(',').map(str::trim).collect();
            if cells.len() != QUALIFYING_THIRDS + 1 {
                return Err(bad(format!(
                    "expected {} columns, found {}",
                    QUALIFYING_THIRDS + 1,
                    cells.len()
                )));
            }
            let option = cells[0]
                .parse::<u16>()
                .map_err(|_| bad(format!("invalid option number `{}`", cells[0])))?;
            if let Some(prev) = seen_options.insert(option, line_no) {
                return Err(bad(format!("option {option} already defined on line {prev}")));
            }

            let mut slots = [GroupLabel::ALL[0]; QUALIFYING_THIRDS];
            for (slot, cell) in slots.iter_mut().zip(&cells[1..]) {
                let Some(letter) = cell.strip_prefix('3') else {
                    return Err(bad(format!("`{cell}` is not a third-place entry")));
                };
                *slot = letter
                    .parse::<GroupLabel>()
                    .map_err(|err| bad(err.to_string()))?;
            }
            for (host, slot) in hosts.iter().zip(slots.iter()) {
                if host == slot {
                    return Err(bad(format!(
                        "third of group {slot} drawn against winner of {host}"
                    )));
                }
            }

            let key = GroupSet::from_groups(&slots).map_err(|err| bad(err.to_string()))?;
            if let Some(existing) = rows.get(&key) {
                return Err(bad(format!(
                    "groups {key} already covered by option {}",
                    existing.option
                )));
            }
            rows.insert(key, AnnexOption { option, slots });
        }

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.rows.len() == COMBINATIONS
    }

    /// The row for exactly this set of groups, in any order.
    pub fn lookup(&self, groups: &[GroupLabel]) -> EngineResult<&AnnexOption> {
        if groups.len() != QUALIFYING_THIRDS {
            return Err(EngineError::ThirdPlaceGroupCount {
                found: groups.len(),
            });
        }
        let key = GroupSet::from_groups(groups)?;
        self.rows
            .get(&key)
            .ok_or_else(|| EngineError::AnnexCombinationMissing {
                key: key.to_string(),
            })
    }

    /// Places each qualifying third into its fixture.
    pub fn resolve_third_place_slots(
        &self,
        groups: &[GroupLabel],
        thirds_by_group: &BTreeMap<GroupLabel, TeamId>,
    ) -> EngineResult<Vec<ThirdPlaceSlot>> {
        let option = self.lookup(groups)?;
        let mut out = Vec::with_capacity(QUALIFYING_THIRDS);
        for (round, group) in option.assignments() {
            let team_id = thirds_by_group
                .get(&group)
                .ok_or(EngineError::ThirdPlaceTeamMissing { group })?;
            out.push(ThirdPlaceSlot {
                round: round.to_string(),
                group,
                team_id: team_id.clone(),
            });
        }
        debug!(option = option.option, "resolved Annex C option");
        Ok(out)
    }

    /// Every eight-group set the table does not cover, in ascending key order.
    pub fn missing_combinations(&self) -> Vec<GroupSet> {
        (0u16..(1 << GroupLabel::COUNT))
            .filter(|bits| bits.count_ones() as usize == QUALIFYING_THIRDS)
            .map(GroupSet)
            .filter(|key| !self.rows.contains_key(key))
            .collect()
    }

    pub fn options(&self) -> impl Iterator<Item = &AnnexOption> {
        self.rows.values()
    }
}

fn host_groups() -> EngineResult<[GroupLabel; QUALIFYING_THIRDS]> {
    let mut out = [GroupLabel::ALL[0]; QUALIFYING_THIRDS];
    for (slot, (letter, _)) in out.iter_mut().zip(HOSTS.iter()) {
        *slot = GroupLabel::from_letter(*letter)?;
    }
    Ok(out)
}
