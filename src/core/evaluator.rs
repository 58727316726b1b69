/// Faction requirement evaluation — does the verdict follow the path a
/// faction asked for?
use serde::{Deserialize, Serialize};

use crate::schema::case::{FactionRequirement, FactionStoryline};
use crate::schema::faction::Faction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compliance {
    Complied,
    Defected,
}

impl Compliance {
    pub fn from_bool(complied: bool) -> Self {
        if complied {
            Self::Complied
        } else {
            Self::Defected
        }
    }

    /// Influence the faction gains (+1) or loses (-1).
    pub fn influence_delta(self) -> i32 {
        match self {
            Self::Complied => 1,
            Self::Defected => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionVerdict {
    pub faction: Faction,
    pub compliance: Compliance,
}

/// Strict prefix match of `path` against the requirement.
///
/// A path shorter than the requirement never complies.
pub fn evaluate(path: &[usize], requirement: &FactionRequirement) -> bool {
    let required = &requirement.required_prefix;
    path.len() >= required.len() && path[..required.len()] == required[..]
}

/// Judge every storyline in order against the final path.
pub fn evaluate_storylines<'a, I>(path: &[usize], storylines: I) -> Vec<FactionVerdict>
where
    I: IntoIterator<Item = &'a FactionStoryline>,
{
    storylines
        .into_iter()
        .map(|storyline| FactionVerdict {
            faction: storyline.faction,
            compliance: Compliance::from_bool(evaluate(path, &storyline.requirement)),
        })
        .collect()
}
