//! WASM bindings for lex-speculum — a JSON-in/JSON-out game session for the
//! web front-end.

use wasm_bindgen::prelude::*;

use lex_speculum::core::autoplay::Autoplayer;
use lex_speculum::core::bindings::StageBindings;
use lex_speculum::core::session::{GamePhase, GameSession};
use lex_speculum::schema::case::parse_cases_json;
use lex_speculum::schema::faction::Faction;

// ---------------------------------------------------------------------------
// Embedded case data — compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const CASES: &str = include_str!("../../case_data/cases.json");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct ChoiceView {
    index: usize,
    text: String,
}

#[derive(serde::Serialize)]
struct StageView {
    label: String,
    choices: Vec<ChoiceView>,
}

#[derive(serde::Serialize)]
struct ButtonView {
    faction: Faction,
    enabled: bool,
    owned: bool,
}

#[derive(serde::Serialize)]
struct SessionView {
    phase: GamePhase,
    case_id: Option<String>,
    title: Option<String>,
    stage: Option<StageView>,
    energy: u32,
    max_energy: u32,
    buttons: Vec<ButtonView>,
    unread: Vec<Faction>,
}

fn parse_faction(name: &str) -> Result<Faction, JsError> {
    Faction::parse(name).ok_or_else(|| JsError::new(&format!("Unknown faction: {name}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

// ---------------------------------------------------------------------------
// WasmSession — the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct WasmSession {
    session: GameSession,
}

#[wasm_bindgen]
impl WasmSession {
    /// Create a session over the bundled cases.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WasmSession, JsError> {
        Self::from_cases_json(data::CASES)
    }

    /// Create a session over a `{"Cases": [...]}` document.
    pub fn from_cases_json(cases_json: &str) -> Result<WasmSession, JsError> {
        let cases = parse_cases_json(cases_json)
            .map_err(|e| JsError::new(&format!("Case parse error: {e}")))?;
        let session = GameSession::builder()
            .cases(cases)
            .build()
            .map_err(|e| JsError::new(&format!("Session build error: {e}")))?;
        Ok(WasmSession { session })
    }

    pub fn start(&mut self) -> Result<(), JsError> {
        self.session
            .start()
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Open a faction channel. Returns its history as a JSON array.
    pub fn open_channel(&mut self, faction: &str) -> Result<String, JsError> {
        let faction = parse_faction(faction)?;
        to_json(&self.session.open_channel(faction))
    }

    pub fn enter_storyline_phase(&mut self) -> Result<(), JsError> {
        self.session
            .enter_storyline_phase()
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Buy a storyline. Returns the outcome name as JSON.
    pub fn purchase_storyline(&mut self, faction: &str) -> Result<String, JsError> {
        let faction = parse_faction(faction)?;
        let outcome = self
            .session
            .purchase_storyline(faction)
            .map_err(|e| JsError::new(&e.to_string()))?;
        to_json(&outcome)
    }

    pub fn enter_judgment_phase(&mut self) -> Result<(), JsError> {
        self.session
            .enter_judgment_phase()
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Select a choice. Returns the faction verdicts as JSON when the case
    /// closed, `null` otherwise.
    pub fn select_choice(&mut self, index: usize) -> Result<String, JsError> {
        let outcome = self
            .session
            .select_choice(index)
            .map_err(|e| JsError::new(&e.to_string()))?;
        to_json(&outcome.verdicts)
    }

    /// Check that the front-end has one panel per stage of the current case.
    ///
    /// Expected JSON shape: `["Case_01_Evidence", "Case_01_Sentence", ...]`.
    pub fn bind_panels(&self, labels_json: &str) -> Result<usize, JsError> {
        let labels: Vec<String> = serde_json::from_str(labels_json)
            .map_err(|e| JsError::new(&format!("Invalid label JSON: {e}")))?;
        let case = self
            .session
            .current_case()
            .ok_or_else(|| JsError::new("No case is loaded"))?;
        let bindings = StageBindings::bind(
            &case.tree,
            labels.into_iter().enumerate().map(|(i, label)| (label, i)),
        )
        .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(bindings.len())
    }

    /// Everything the front-end needs to redraw, as JSON.
    pub fn state(&self) -> Result<String, JsError> {
        to_json(&self.view())
    }

    /// Pending events as a JSON array, oldest first.
    pub fn drain_events(&mut self) -> Result<String, JsError> {
        to_json(&self.session.drain_events())
    }

    pub fn snapshot(&self) -> Result<String, JsError> {
        self.session
            .snapshot()
            .to_json()
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// The resolved ending (tone, dominance, conflict, texts) as JSON.
    pub fn ending(&self) -> Result<String, JsError> {
        to_json(&self.session.resolve_ending())
    }

    /// Play the rest of the game with a seeded random player.
    pub fn autoplay(&mut self, seed: u64) -> Result<String, JsError> {
        let snapshot = Autoplayer::new(seed)
            .play(&mut self.session)
            .map_err(|e| JsError::new(&e.to_string()))?;
        snapshot
            .to_json()
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// Return JSON array of faction names.
    pub fn factions() -> String {
        serde_json::to_string(&Faction::ALL).unwrap_or_else(|_| "[]".to_string())
    }
}

impl WasmSession {
    fn view(&self) -> SessionView {
        let case = self.session.current_case();
        let stage = self.session.current_stage().map(|node| StageView {
            label: node.label.clone(),
            choices: node
                .choices
                .iter()
                .map(|c| ChoiceView {
                    index: c.index,
                    text: c.text.clone(),
                })
                .collect(),
        });
        let buttons = case
            .map(|c| {
                c.definition
                    .storylines
                    .iter()
                    .map(|s| ButtonView {
                        faction: s.faction,
                        enabled: self.session.faction_button_enabled(s.faction),
                        owned: self.session.purchased().contains(&s.faction),
                    })
                    .collect()
            })
            .unwrap_or_default();

        SessionView {
            phase: self.session.phase(),
            case_id: case.map(|c| c.id().to_string()),
            title: case.map(|c| c.definition.title.clone()),
            stage,
            energy: self.session.energy().current(),
            max_energy: self.session.energy().max(),
            buttons,
            unread: Faction::ALL
                .into_iter()
                .filter(|f| self.session.chat().is_unread(*f))
                .collect(),
        }
    }
}
