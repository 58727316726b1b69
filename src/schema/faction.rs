use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The four ministries whose influence the player's verdicts shift.
///
/// Truth is the player's own ministry; its storylines are never for sale,
/// and it does not take part in the dominance or conflict layers of the
/// ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Faction {
    Truth,
    Order,
    Love,
    Peace,
}

impl Faction {
    /// Every faction, in declaration order.
    pub const ALL: [Faction; 4] = [Faction::Truth, Faction::Order, Faction::Love, Faction::Peace];

    /// Factions that sell storylines and compete for the ending.
    pub const RIVALS: [Faction; 3] = [Faction::Order, Faction::Love, Faction::Peace];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Truth => "Truth",
            Self::Order => "Order",
            Self::Love => "Love",
            Self::Peace => "Peace",
        }
    }

    /// Parse a faction name, case-insensitively.
    pub fn parse(name: &str) -> Option<Faction> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Fixed position of the faction in per-faction arrays.
    pub(crate) fn slot(self) -> usize {
        match self {
            Self::Truth => 0,
            Self::Order => 1,
            Self::Love => 2,
            Self::Peace => 3,
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A score for every faction of the closed set.
///
/// Serialized as a map keyed by faction name. Factions missing from the
/// serialized form read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<Faction, i32>", into = "BTreeMap<Faction, i32>")]
pub struct FactionScores {
    scores: [i32; 4],
}

impl FactionScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, faction: Faction) -> i32 {
        self.scores[faction.slot()]
    }

    pub fn set(&mut self, faction: Faction, value: i32) {
        self.scores[faction.slot()] = value;
    }

    /// Add `delta` to one faction. `None` if the score would overflow, in
    /// which case nothing changes.
    pub fn checked_add(&mut self, faction: Faction, delta: i32) -> Option<()> {
        let slot = &mut self.scores[faction.slot()];
        *slot = slot.checked_add(delta)?;
        Some(())
    }

    /// Per-faction sum, or the first faction whose score would overflow.
    pub fn checked_sum(&self, rhs: &FactionScores) -> Result<FactionScores, Faction> {
        let mut sum = *self;
        for (faction, delta) in rhs.iter() {
            sum.checked_add(faction, delta).ok_or(faction)?;
        }
        Ok(sum)
    }

    /// Builder-style setter, handy for authoring deltas inline.
    pub fn with(mut self, faction: Faction, value: i32) -> Self {
        self.set(faction, value);
        self
    }

    pub fn is_zero(&self) -> bool {
        self.scores.iter().all(|s| *s == 0)
    }

    /// (faction, score) pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Faction, i32)> + '_ {
        Faction::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

impl From<BTreeMap<Faction, i32>> for FactionScores {
    fn from(map: BTreeMap<Faction, i32>) -> Self {
        let mut scores = FactionScores::default();
        for (faction, value) in map {
            scores.set(faction, value);
        }
        scores
    }
}

impl From<FactionScores> for BTreeMap<Faction, i32> {
    fn from(scores: FactionScores) -> Self {
        scores.iter().collect()
    }
}
