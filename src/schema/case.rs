/// Authored case definitions and the JSON document that carries them.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::faction::{Faction, FactionScores};

#[derive(Debug, Error)]
pub enum CaseLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed case document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level case document: `{"Cases": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDocument {
    #[serde(rename = "Cases")]
    pub cases: Vec<CaseDefinition>,
}

/// One self-contained case: briefing, judgment tree and the faction
/// storylines on offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDefinition {
    #[serde(rename = "caseID")]
    pub case_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "briefingMessages", default)]
    pub briefing: Vec<ChatMessage>,
    #[serde(rename = "judgmentTreeRoot")]
    pub judgment_tree: JudgmentNodeDef,
    #[serde(rename = "factionStorylines", default)]
    pub storylines: Vec<FactionStoryline>,
}

impl CaseDefinition {
    pub fn storyline(&self, faction: Faction) -> Option<&FactionStoryline> {
        self.storylines.iter().find(|s| s.faction == faction)
    }
}

/// An authored stage of the judgment tree, children nested inline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JudgmentNodeDef {
    #[serde(rename = "stageDescription", default)]
    pub label: String,
    #[serde(default)]
    pub choices: Vec<ChoiceDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceDef {
    #[serde(rename = "choiceID", default)]
    pub id: String,
    #[serde(rename = "choiceText", default)]
    pub text: String,
    #[serde(rename = "publicOpinionChange", default)]
    pub opinion_delta: i32,
    #[serde(rename = "influenceChanges", default)]
    pub faction_delta: FactionScores,
    #[serde(rename = "nextNode", default)]
    pub next: Option<Box<JudgmentNodeDef>>,
}

/// A faction storyline the player can buy during a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionStoryline {
    pub faction: Faction,
    #[serde(rename = "chatMessages", default)]
    pub chat_messages: Vec<ChatMessage>,
    pub requirement: FactionRequirement,
    #[serde(rename = "evaluationSuccessMessages", default)]
    pub success_messages: Vec<ChatMessage>,
    #[serde(rename = "evaluationFailureMessages", default)]
    pub failure_messages: Vec<ChatMessage>,
}

/// Choice indices (0 = left, 1 = right, ...) a faction expects the verdict
/// to start with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionRequirement {
    #[serde(rename = "requiredChoiceIndices", default)]
    pub required_prefix: Vec<usize>,
}

impl FactionRequirement {
    pub fn new(required_prefix: Vec<usize>) -> Self {
        Self { required_prefix }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Faction,
    #[serde(rename = "messageContent")]
    pub content: String,
}

/// Load case definitions from a JSON file.
pub fn load_cases_from_json(path: &Path) -> Result<Vec<CaseDefinition>, CaseLoadError> {
    let contents = std::fs::read_to_string(path)?;
    parse_cases_json(&contents)
}

/// Parse case definitions from a JSON string.
pub fn parse_cases_json(input: &str) -> Result<Vec<CaseDefinition>, CaseLoadError> {
    let document: CaseDocument = serde_json::from_str(input)?;
    Ok(document.cases)
}
