use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::model::{GroupLabel, TeamId};
use crate::standings::{StandingRow, compare_group_wide};

/// How many third-placed teams go through to the round of 32.
pub const QUALIFYING_THIRDS: usize = 8;

#[derive(Debug, Clone, Serialize)]
pub struct BestThirds {
    /// The qualifiers, best first.
    pub qualified: Vec<StandingRow>,
    /// Third-placed teams that go out, best first.
    pub eliminated: Vec<StandingRow>,
    /// Groups of the qualifiers, in rank order (the Annex C key before sorting).
    pub groups: Vec<GroupLabel>,
}

impl BestThirds {
    pub fn team_by_group(&self) -> BTreeMap<GroupLabel, TeamId> {
        self.qualified
            .iter()
            .map(|row| (row.team.group, row.team.id.clone()))
            .collect()
    }
}

/// Ranks the third-placed team of every group and keeps the best eight.
///
/// The teams never met, so there is no head-to-head step: points, then the
/// group-wide criteria.
pub fn select_best_third_places(
    tables: &BTreeMap<GroupLabel, Vec<StandingRow>>,
) -> EngineResult<BestThirds> {
    if tables.len() != GroupLabel::COUNT {
        return Err(EngineError::WrongGroupCount {
            found: tables.len(),
            expected: GroupLabel::COUNT,
        });
    }

    let mut thirds = Vec::with_capacity(tables.len());
    for (group, table) in tables {
        let Some(row) = table.get(2) else {
            return Err(EngineError::GroupTooSmall {
                group: *group,
                teams: table.len(),
            });
        };
        thirds.push(row.clone());
    }

    thirds.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| compare_group_wide(a, b)));
    let eliminated = thirds.split_off(QUALIFYING_THIRDS);
    let groups = thirds.iter().map(|row| row.team.group).collect();

    Ok(BestThirds {
        qualified: thirds,
        eliminated,
        groups,
    })
}
