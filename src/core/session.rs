/// Game session — drives cases from briefing to verdict and collects the
/// ending.
///
/// Owns every service the game loop needs: the compiled cases, the judgment
/// walker, the energy pool, chat channels, the ending aggregator and the
/// ending resolver. The front-end calls in with player input and drains
/// `SessionEvent`s to update its panels.
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::core::aggregator::{AggregatorError, EndingAggregator};
use crate::core::chat::ChatLog;
use crate::core::energy::EnergyPool;
use crate::core::evaluator::{evaluate_storylines, Compliance, FactionVerdict};
use crate::core::resolver::{NarrativeTemplateResolver, ResolvedEnding};
use crate::core::templates::{EndingTemplates, TemplateError};
use crate::core::tree::{JudgmentNode, JudgmentTree, TreeError};
use crate::core::walker::{Cursor, JudgmentWalker, StepOutcome, WalkError};
use crate::schema::case::{load_cases_from_json, CaseDefinition, CaseLoadError, ChatMessage};
use crate::schema::faction::Faction;
use crate::schema::record::EndingSnapshot;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("case load error: {0}")]
    CaseLoad(#[from] CaseLoadError),
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("judgment tree of case '{case_id}' is invalid: {source}")]
    Tree {
        case_id: String,
        #[source]
        source: TreeError,
    },
    #[error("walk error: {0}")]
    Walk(#[from] WalkError),
    #[error("aggregator error: {0}")]
    Aggregator(#[from] AggregatorError),
    #[error("no cases to play")]
    NoCases,
    #[error("case id '{0}' is used more than once")]
    DuplicateCase(String),
    #[error("case '{0}' not found")]
    CaseNotFound(String),
    #[error("case '{case_id}' offers two {faction} storylines")]
    DuplicateStoryline { case_id: String, faction: Faction },
    #[error("case '{case_id}' offers no {faction} storyline")]
    StorylineNotFound { case_id: String, faction: Faction },
    #[error("cannot {action} during {phase:?}")]
    WrongPhase {
        action: &'static str,
        phase: GamePhase,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Built but no case loaded yet.
    Idle,
    CaseBriefing,
    StorylinePhase,
    JudgmentPhase,
    CaseWrapUp,
    GameEnd,
}

/// Signals for the front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    CaseStarted { case_id: String, title: String },
    PhaseChanged(GamePhase),
    StageShown(String),
    StageHidden(String),
    FactionButton { faction: Faction, enabled: bool },
    ChannelUnread(Faction),
    CaseEnded {
        case_id: String,
        verdicts: Vec<FactionVerdict>,
    },
    GameEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOutcome {
    Purchased,
    /// Already bought this case; nothing was charged.
    AlreadyOwned,
    InsufficientEnergy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOutcome {
    pub step: StepOutcome,
    /// Faction verdicts, present when this choice closed the case.
    pub verdicts: Option<Vec<FactionVerdict>>,
}

/// A case definition with its validated judgment tree.
#[derive(Debug, Clone)]
pub struct Case {
    pub definition: CaseDefinition,
    pub tree: Arc<JudgmentTree>,
}

impl Case {
    pub fn compile(definition: CaseDefinition) -> Result<Case, SessionError> {
        let tree = JudgmentTree::from_definition(&definition.judgment_tree).map_err(|source| {
            SessionError::Tree {
                case_id: definition.case_id.clone(),
                source,
            }
        })?;

        let mut seen = Vec::new();
        for storyline in &definition.storylines {
            if seen.contains(&storyline.faction) {
                return Err(SessionError::DuplicateStoryline {
                    case_id: definition.case_id.clone(),
                    faction: storyline.faction,
                });
            }
            seen.push(storyline.faction);
            if storyline.faction == Faction::Truth {
                warn!(case_id = %definition.case_id, "Truth storyline offered for purchase");
            }
        }

        Ok(Case {
            definition,
            tree: Arc::new(tree),
        })
    }

    pub fn id(&self) -> &str {
        &self.definition.case_id
    }
}

pub struct GameSession {
    cases: Vec<Case>,
    current: Option<usize>,
    phase: GamePhase,
    walker: Option<JudgmentWalker>,
    purchased: Vec<Faction>,
    briefing_read: bool,
    energy: EnergyPool,
    storyline_cost: u32,
    chat: ChatLog,
    aggregator: EndingAggregator,
    resolver: NarrativeTemplateResolver,
    events: Vec<SessionEvent>,
}

/// Builder for constructing a `GameSession`.
pub struct GameSessionBuilder {
    cases_path: Option<String>,
    templates_path: Option<String>,
    energy: u32,
    storyline_cost: u32,
    /// Directly provided cases (for testing without files).
    cases: Option<Vec<CaseDefinition>>,
    /// Directly provided templates (for testing without files).
    templates: Option<EndingTemplates>,
}

impl GameSession {
    pub fn builder() -> GameSessionBuilder {
        GameSessionBuilder {
            cases_path: None,
            templates_path: None,
            energy: 3,
            storyline_cost: 1,
            cases: None,
            templates: None,
        }
    }

    /// Load the first case.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.require(GamePhase::Idle, "start the game")?;
        self.load_case(0)
    }

    /// Load the case with id `case_id`; later cases follow in order.
    pub fn start_new_case(&mut self, case_id: &str) -> Result<(), SessionError> {
        self.require(GamePhase::Idle, "start a case")?;
        let index = self
            .cases
            .iter()
            .position(|c| c.id() == case_id)
            .ok_or_else(|| SessionError::CaseNotFound(case_id.to_string()))?;
        self.load_case(index)
    }

    /// Switch the visible chat channel. Opening the Truth channel during
    /// the briefing counts as reading it and unlocks the storyline phase.
    pub fn open_channel(&mut self, faction: Faction) -> Vec<String> {
        let history = self.chat.open(faction).to_vec();
        if faction == Faction::Truth && self.phase == GamePhase::CaseBriefing && !self.briefing_read
        {
            self.briefing_read = true;
            debug!("briefing read");
            self.set_phase(GamePhase::StorylinePhase);
            self.emit_button_states();
        }
        history
    }

    pub fn enter_storyline_phase(&mut self) -> Result<(), SessionError> {
        self.require(GamePhase::CaseBriefing, "open storylines")?;
        self.briefing_read = true;
        self.set_phase(GamePhase::StorylinePhase);
        self.emit_button_states();
        Ok(())
    }

    pub fn purchase_storyline(&mut self, faction: Faction) -> Result<PurchaseOutcome, SessionError> {
        self.require(GamePhase::StorylinePhase, "buy a storyline")?;
        let index = self.current_index()?;
        let case = &self.cases[index];
        let Some(storyline) = case.definition.storyline(faction) else {
            error!(case_id = %case.id(), %faction, "storyline not offered");
            return Err(SessionError::StorylineNotFound {
                case_id: case.id().to_string(),
                faction,
            });
        };

        if self.purchased.contains(&faction) {
            return Ok(PurchaseOutcome::AlreadyOwned);
        }
        if !self.energy.can_afford(self.storyline_cost) {
            info!(%faction, energy = self.energy.current(), "not enough energy for storyline");
            return Ok(PurchaseOutcome::InsufficientEnergy);
        }

        self.aggregator.record_purchase(faction)?;
        self.energy.spend(self.storyline_cost);
        self.purchased.push(faction);
        for message in &storyline.chat_messages {
            post(&mut self.chat, &mut self.events, message);
        }
        info!(%faction, energy = self.energy.current(), "storyline purchased");
        self.emit_button_states();
        Ok(PurchaseOutcome::Purchased)
    }

    pub fn enter_judgment_phase(&mut self) -> Result<(), SessionError> {
        self.require(GamePhase::StorylinePhase, "open the trial")?;
        let index = self.current_index()?;
        let walker = JudgmentWalker::start(self.cases[index].tree.clone());
        let root_label = walker
            .current_stage()
            .map(|stage| stage.label.clone())
            .unwrap_or_default();
        self.walker = Some(walker);
        self.set_phase(GamePhase::JudgmentPhase);
        self.emit_button_states();
        self.events.push(SessionEvent::StageShown(root_label));
        Ok(())
    }

    /// Select a choice at the current stage. The last choice of a case
    /// judges the purchased storylines and loads the next case.
    pub fn select_choice(&mut self, index: usize) -> Result<ChoiceOutcome, SessionError> {
        self.require(GamePhase::JudgmentPhase, "select a choice")?;
        let walker = self
            .walker
            .as_mut()
            .ok_or(SessionError::Walk(WalkError::NotInProgress))?;
        let previous = walker
            .current_stage()
            .map(|stage| stage.label.clone())
            .unwrap_or_default();

        let checkpoint = walker.clone();
        let step = walker.select_choice(index).map_err(|e| {
            error!(error = %e, "choice rejected");
            SessionError::Walk(e)
        })?;
        if let Err(e) = self
            .aggregator
            .record_choice(step.applied.opinion, &step.applied.factions)
        {
            error!(error = %e, "choice rejected");
            *walker = checkpoint;
            return Err(e.into());
        }
        let next_label = match step.next {
            Cursor::Stage(id) => Some(walker.tree().node(id).label.clone()),
            Cursor::Ended => None,
        };

        self.events.push(SessionEvent::StageHidden(previous));

        let verdicts = match next_label {
            Some(label) => {
                self.events.push(SessionEvent::StageShown(label));
                None
            }
            None => Some(self.end_case()?),
        };
        Ok(ChoiceOutcome { step, verdicts })
    }

    /// Add energy to the pool, capped at its maximum.
    pub fn restore_energy(&mut self, amount: u32) {
        self.energy.restore(amount);
        if self.phase == GamePhase::StorylinePhase {
            self.emit_button_states();
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn current_case(&self) -> Option<&Case> {
        self.current.map(|i| &self.cases[i])
    }

    pub fn current_stage(&self) -> Option<&JudgmentNode> {
        if self.phase != GamePhase::JudgmentPhase {
            return None;
        }
        self.walker.as_ref().and_then(|w| w.current_stage())
    }

    /// Choices made so far in the current case.
    pub fn path(&self) -> &[usize] {
        self.walker.as_ref().map(|w| w.path()).unwrap_or(&[])
    }

    pub fn purchased(&self) -> &[Faction] {
        &self.purchased
    }

    pub fn energy(&self) -> &EnergyPool {
        &self.energy
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn aggregator(&self) -> &EndingAggregator {
        &self.aggregator
    }

    pub fn resolver(&self) -> &NarrativeTemplateResolver {
        &self.resolver
    }

    /// Whether the storyline button for `faction` should accept clicks.
    pub fn faction_button_enabled(&self, faction: Faction) -> bool {
        self.phase == GamePhase::StorylinePhase
            && self
                .current_case()
                .is_some_and(|c| c.definition.storyline(faction).is_some())
            && !self.purchased.contains(&faction)
            && self.energy.can_afford(self.storyline_cost)
    }

    pub fn snapshot(&self) -> EndingSnapshot {
        self.aggregator.finalize()
    }

    pub fn resolve_ending(&self) -> ResolvedEnding {
        self.resolver.resolve(&self.aggregator.finalize())
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    fn require(&self, phase: GamePhase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == phase {
            return Ok(());
        }
        warn!(action, phase = ?self.phase, "input ignored in this phase");
        Err(SessionError::WrongPhase {
            action,
            phase: self.phase,
        })
    }

    fn current_index(&self) -> Result<usize, SessionError> {
        self.current
            .ok_or(SessionError::Aggregator(AggregatorError::NoOpenCase))
    }

    fn set_phase(&mut self, phase: GamePhase) {
        info!(from = ?self.phase, to = ?phase, "phase change");
        self.phase = phase;
        self.events.push(SessionEvent::PhaseChanged(phase));
    }

    fn emit_button_states(&mut self) {
        let Some(case) = self.current_case() else { return };
        let states: Vec<SessionEvent> = case
            .definition
            .storylines
            .iter()
            .map(|s| SessionEvent::FactionButton {
                faction: s.faction,
                enabled: self.faction_button_enabled(s.faction),
            })
            .collect();
        self.events.extend(states);
    }

    fn load_case(&mut self, index: usize) -> Result<(), SessionError> {
        if index >= self.cases.len() {
            self.end_game();
            return Ok(());
        }

        let case = &self.cases[index];
        self.aggregator.start_case(case.id())?;
        info!(case_id = %case.id(), title = %case.definition.title, "case loaded");
        self.events.push(SessionEvent::CaseStarted {
            case_id: case.id().to_string(),
            title: case.definition.title.clone(),
        });
        for message in &case.definition.briefing {
            post(&mut self.chat, &mut self.events, message);
        }

        self.current = Some(index);
        self.walker = None;
        self.purchased.clear();
        self.briefing_read = false;
        self.set_phase(GamePhase::CaseBriefing);
        self.emit_button_states();
        Ok(())
    }

    fn end_case(&mut self) -> Result<Vec<FactionVerdict>, SessionError> {
        let index = self.current_index()?;
        self.set_phase(GamePhase::CaseWrapUp);

        let path = self.path().to_vec();
        self.aggregator.record_judgment_path(&path)?;

        let case = &self.cases[index];
        let storylines: Vec<_> = self
            .purchased
            .iter()
            .filter_map(|f| case.definition.storyline(*f))
            .collect();
        let verdicts = evaluate_storylines(&path, storylines.iter().copied());

        for (verdict, storyline) in verdicts.iter().zip(&storylines) {
            self.aggregator
                .record_compliance(verdict.faction, verdict.compliance)?;
            let messages = match verdict.compliance {
                Compliance::Complied => &storyline.success_messages,
                Compliance::Defected => &storyline.failure_messages,
            };
            for message in messages {
                post(&mut self.chat, &mut self.events, message);
            }
            info!(
                case_id = %case.id(),
                faction = %verdict.faction,
                compliance = ?verdict.compliance,
                "storyline judged"
            );
        }

        self.aggregator.end_case()?;
        self.events.push(SessionEvent::CaseEnded {
            case_id: case.id().to_string(),
            verdicts: verdicts.clone(),
        });

        self.load_case(index + 1)?;
        Ok(verdicts)
    }

    fn end_game(&mut self) {
        self.current = None;
        self.walker = None;
        self.set_phase(GamePhase::GameEnd);
        let snapshot = self.aggregator.finalize();
        match snapshot.to_json() {
            Ok(json) => info!(snapshot = %json, "all cases judged"),
            Err(e) => error!(error = %e, "could not serialize ending snapshot"),
        }
        self.events.push(SessionEvent::GameEnded);
    }
}

/// Post a chat message and raise an unread event if needed.
fn post(chat: &mut ChatLog, events: &mut Vec<SessionEvent>, message: &ChatMessage) {
    if chat.post(message) {
        events.push(SessionEvent::ChannelUnread(message.sender));
    }
}

impl GameSessionBuilder {
    pub fn cases_path(mut self, path: &str) -> Self {
        self.cases_path = Some(path.to_string());
        self
    }

    pub fn templates_path(mut self, path: &str) -> Self {
        self.templates_path = Some(path.to_string());
        self
    }

    /// Starting and maximum energy.
    pub fn energy(mut self, energy: u32) -> Self {
        self.energy = energy;
        self
    }

    pub fn storyline_cost(mut self, cost: u32) -> Self {
        self.storyline_cost = cost;
        self
    }

    /// Provide cases directly (for testing without files).
    pub fn cases(mut self, cases: Vec<CaseDefinition>) -> Self {
        self.cases = Some(cases);
        self
    }

    /// Provide templates directly (for testing without files).
    pub fn templates(mut self, templates: EndingTemplates) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn build(self) -> Result<GameSession, SessionError> {
        let mut definitions = self.cases.unwrap_or_default();
        if let Some(ref path) = self.cases_path {
            match load_cases_from_json(Path::new(path)) {
                Ok(loaded) => definitions.extend(loaded),
                Err(e) => {
                    error!(path = %path, error = %e, "failed to load case definitions");
                    return Err(e.into());
                }
            }
        }
        if definitions.is_empty() {
            error!("no case definitions; the game cannot start");
            return Err(SessionError::NoCases);
        }

        let mut cases: Vec<Case> = Vec::with_capacity(definitions.len());
        for definition in definitions {
            if cases.iter().any(|c| c.id() == definition.case_id) {
                return Err(SessionError::DuplicateCase(definition.case_id));
            }
            cases.push(Case::compile(definition)?);
        }

        let templates = match (self.templates, self.templates_path) {
            (Some(templates), _) => templates,
            (None, Some(path)) => EndingTemplates::load_from_ron(Path::new(&path))?,
            (None, None) => EndingTemplates::default(),
        };

        Ok(GameSession {
            cases,
            current: None,
            phase: GamePhase::Idle,
            walker: None,
            purchased: Vec::new(),
            briefing_read: false,
            energy: EnergyPool::full(self.energy),
            storyline_cost: self.storyline_cost,
            chat: ChatLog::new(),
            aggregator: EndingAggregator::new(),
            resolver: NarrativeTemplateResolver::new(templates),
            events: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::case::{parse_cases_json, ChoiceDef, FactionRequirement, FactionStoryline, JudgmentNodeDef};
    use crate::schema::faction::FactionScores;

    fn storyline(faction: Faction, prefix: &[usize]) -> FactionStoryline {
        FactionStoryline {
            faction,
            chat_messages: vec![ChatMessage {
                sender: faction,
                content: format!("{} has a request", faction),
            }],
            requirement: FactionRequirement::new(prefix.to_vec()),
            success_messages: vec![ChatMessage {
                sender: faction,
                content: "well done".to_string(),
            }],
            failure_messages: vec![ChatMessage {
                sender: faction,
                content: "you will regret this".to_string(),
            }],
        }
    }

    fn one_stage_case(id: &str) -> CaseDefinition {
        CaseDefinition {
            case_id: id.to_string(),
            title: format!("Case {}", id),
            briefing: vec![ChatMessage {
                sender: Faction::Truth,
                content: "A new case.".to_string(),
            }],
            judgment_tree: JudgmentNodeDef {
                label: format!("{}-verdict", id),
                choices: vec![
                    ChoiceDef {
                        id: "guilty".to_string(),
                        opinion_delta: -1,
                        faction_delta: FactionScores::new().with(Faction::Order, 2),
                        ..ChoiceDef::default()
                    },
                    ChoiceDef {
                        id: "innocent".to_string(),
                        opinion_delta: 1,
                        faction_delta: FactionScores::new().with(Faction::Love, 1),
                        ..ChoiceDef::default()
                    },
                ],
            },
            storylines: vec![storyline(Faction::Order, &[0]), storyline(Faction::Love, &[1])],
        }
    }

    fn session() -> GameSession {
        GameSession::builder()
            .cases(vec![one_stage_case("A"), one_stage_case("B")])
            .build()
            .unwrap()
    }

    #[test]
    fn empty_case_list_cannot_start() {
        let err = GameSession::builder().build().err().unwrap();
        assert!(matches!(err, SessionError::NoCases));
    }

    #[test]
    fn duplicate_case_ids_rejected() {
        let err = GameSession::builder()
            .cases(vec![one_stage_case("A"), one_stage_case("A")])
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SessionError::DuplicateCase(id) if id == "A"));
    }

    #[test]
    fn duplicate_storylines_rejected() {
        let mut case = one_stage_case("A");
        case.storylines.push(storyline(Faction::Order, &[1]));
        let err = GameSession::builder().cases(vec![case]).build().err().unwrap();
        assert!(matches!(
            err,
            SessionError::DuplicateStoryline {
                faction: Faction::Order,
                ..
            }
        ));
    }

    #[test]
    fn malformed_case_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = GameSession::builder()
            .cases_path(path.to_str().unwrap())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SessionError::CaseLoad(CaseLoadError::Json(_))));
    }

    #[test]
    fn cases_path_loads_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.json");
        let document = crate::schema::case::CaseDocument {
            cases: vec![one_stage_case("A")],
        };
        std::fs::write(&path, serde_json::to_string(&document).unwrap()).unwrap();
        let session = GameSession::builder()
            .cases_path(path.to_str().unwrap())
            .build()
            .unwrap();
        assert_eq!(session.cases().len(), 1);
        assert_eq!(
            parse_cases_json(&std::fs::read_to_string(&path).unwrap())
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn reading_the_briefing_opens_storylines() {
        let mut s = session();
        s.start().unwrap();
        assert_eq!(s.phase(), GamePhase::CaseBriefing);
        assert!(!s.faction_button_enabled(Faction::Order));

        s.open_channel(Faction::Love);
        assert_eq!(s.phase(), GamePhase::CaseBriefing);

        let history = s.open_channel(Faction::Truth);
        assert_eq!(history, vec!["A new case.".to_string()]);
        assert_eq!(s.phase(), GamePhase::StorylinePhase);
        assert!(s.faction_button_enabled(Faction::Order));
        assert!(!s.faction_button_enabled(Faction::Peace), "not offered");
    }

    #[test]
    fn input_out_of_phase_is_rejected() {
        let mut s = session();
        assert!(matches!(
            s.select_choice(0),
            Err(SessionError::WrongPhase { .. })
        ));
        s.start().unwrap();
        assert!(matches!(
            s.purchase_storyline(Faction::Order),
            Err(SessionError::WrongPhase { .. })
        ));
        assert!(matches!(
            s.enter_judgment_phase(),
            Err(SessionError::WrongPhase { .. })
        ));
        assert!(matches!(s.start(), Err(SessionError::WrongPhase { .. })));
    }

    #[test]
    fn purchase_spends_energy_once() {
        let mut s = GameSession::builder()
            .cases(vec![one_stage_case("A")])
            .energy(1)
            .build()
            .unwrap();
        s.start().unwrap();
        s.enter_storyline_phase().unwrap();

        assert_eq!(s.purchase_storyline(Faction::Order).unwrap(), PurchaseOutcome::Purchased);
        assert_eq!(s.energy().current(), 0);
        assert_eq!(
            s.purchase_storyline(Faction::Order).unwrap(),
            PurchaseOutcome::AlreadyOwned
        );
        assert_eq!(
            s.purchase_storyline(Faction::Love).unwrap(),
            PurchaseOutcome::InsufficientEnergy
        );
        assert!(!s.faction_button_enabled(Faction::Love));
        assert!(matches!(
            s.purchase_storyline(Faction::Peace),
            Err(SessionError::StorylineNotFound { .. })
        ));
        assert_eq!(
            s.aggregator().open_record().unwrap().purchased_factions,
            vec![Faction::Order]
        );
        assert!(s.chat().is_unread(Faction::Order));
    }

    #[test]
    fn verdict_judges_storylines_and_advances() {
        let mut s = session();
        s.start().unwrap();
        s.enter_storyline_phase().unwrap();
        s.purchase_storyline(Faction::Order).unwrap();
        s.purchase_storyline(Faction::Love).unwrap();
        s.enter_judgment_phase().unwrap();
        assert_eq!(s.current_stage().unwrap().label, "A-verdict");

        let outcome = s.select_choice(0).unwrap();
        let verdicts = outcome.verdicts.unwrap();
        assert_eq!(verdicts.len(), 2);
        assert_eq!(verdicts[0].compliance, Compliance::Complied);
        assert_eq!(verdicts[1].compliance, Compliance::Defected);

        // Order: +2 from the choice, +1 for compliance. Love: -1 for defection.
        assert_eq!(s.aggregator().scores().get(Faction::Order), 3);
        assert_eq!(s.aggregator().scores().get(Faction::Love), -1);
        assert_eq!(s.aggregator().total_opinion(), -1);

        assert_eq!(s.phase(), GamePhase::CaseBriefing);
        assert_eq!(s.current_case().unwrap().id(), "B");
        assert!(s.purchased().is_empty());
        assert_eq!(s.aggregator().records()[0].judgment_path, vec![0]);
    }

    #[test]
    fn invalid_choice_changes_nothing() {
        let mut s = session();
        s.start().unwrap();
        s.enter_storyline_phase().unwrap();
        s.enter_judgment_phase().unwrap();
        let before = s.snapshot();
        assert!(matches!(
            s.select_choice(9),
            Err(SessionError::Walk(WalkError::InvalidChoiceIndex { .. }))
        ));
        assert_eq!(s.snapshot(), before);
        assert!(s.path().is_empty());
    }

    #[test]
    fn last_case_ends_the_game() {
        let mut s = session();
        s.start_new_case("B").unwrap();
        s.enter_storyline_phase().unwrap();
        s.enter_judgment_phase().unwrap();
        s.drain_events();
        s.select_choice(1).unwrap();

        assert_eq!(s.phase(), GamePhase::GameEnd);
        let events = s.drain_events();
        assert!(events.contains(&SessionEvent::GameEnded));
        assert!(events.contains(&SessionEvent::StageHidden("B-verdict".to_string())));
        let snapshot = s.snapshot();
        assert_eq!(snapshot.case_records.len(), 1);
        assert_eq!(snapshot.case_records[0].case_id, "B");
    }

    #[test]
    fn unknown_start_case_rejected() {
        let mut s = session();
        assert!(matches!(
            s.start_new_case("Z"),
            Err(SessionError::CaseNotFound(id)) if id == "Z"
        ));
        assert_eq!(s.phase(), GamePhase::Idle);
    }

    #[test]
    fn overflowing_choice_is_rejected_and_can_be_retried() {
        let mut cases = vec![one_stage_case("A"), one_stage_case("B")];
        for case in &mut cases {
            case.judgment_tree.choices[0].opinion_delta = i32::MIN;
        }
        let mut s = GameSession::builder().cases(cases).build().unwrap();
        s.start().unwrap();
        s.enter_storyline_phase().unwrap();
        s.enter_judgment_phase().unwrap();
        s.select_choice(0).unwrap();
        assert_eq!(s.aggregator().total_opinion(), i32::MIN);

        s.enter_storyline_phase().unwrap();
        s.enter_judgment_phase().unwrap();
        let before = s.snapshot();
        assert!(matches!(
            s.select_choice(0),
            Err(SessionError::Aggregator(AggregatorError::ScoreOverflow { .. }))
        ));
        assert_eq!(s.snapshot(), before);
        assert!(s.path().is_empty());
        assert_eq!(s.current_stage().unwrap().label, "B-verdict");

        s.select_choice(1).unwrap();
        assert_eq!(s.phase(), GamePhase::GameEnd);
        assert_eq!(s.snapshot().total_opinion, i32::MIN + 1);
    }

    #[test]
    fn rejected_purchase_keeps_energy() {
        let mut s = session();
        s.start().unwrap();
        s.enter_storyline_phase().unwrap();
        s.aggregator.end_case().unwrap();

        assert!(matches!(
            s.purchase_storyline(Faction::Order),
            Err(SessionError::Aggregator(AggregatorError::NoOpenCase))
        ));
        assert_eq!(s.energy().current(), 3);
        assert!(s.purchased().is_empty());
    }
}
