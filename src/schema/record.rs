use serde::{Deserialize, Serialize};

use super::faction::{Faction, FactionScores};

/// What the player did during one case: storylines bought and the
/// judgment path taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    #[serde(rename = "caseID")]
    pub case_id: String,
    /// Purchase order is preserved; a faction appears at most once.
    #[serde(rename = "purchasedStorylines", default)]
    pub purchased_factions: Vec<Faction>,
    #[serde(rename = "finalJudgmentPath", default)]
    pub judgment_path: Vec<usize>,
}

impl CaseRecord {
    pub fn new(case_id: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            purchased_factions: Vec::new(),
            judgment_path: Vec::new(),
        }
    }

    pub fn has_purchased(&self, faction: Faction) -> bool {
        self.purchased_factions.contains(&faction)
    }
}

/// Aggregated state across every case played so far.
///
/// This is the document handed to the ending resolver and, serialized,
/// to the image-generation request log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingSnapshot {
    #[serde(rename = "totalPublicOpinion")]
    pub total_opinion: i32,
    #[serde(rename = "factionInfluences")]
    pub faction_scores: FactionScores,
    #[serde(rename = "caseRecords", default)]
    pub case_records: Vec<CaseRecord>,
}

impl EndingSnapshot {
    pub fn score(&self, faction: Faction) -> i32 {
        self.faction_scores.get(faction)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(input: &str) -> serde_json::Result<EndingSnapshot> {
        serde_json::from_str(input)
    }
}
