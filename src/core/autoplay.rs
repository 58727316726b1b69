/// Seeded random player — drives a session from the first briefing to the
/// end of the game. Same seed and same cases give the same playthrough.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::core::session::{GamePhase, GameSession, PurchaseOutcome, SessionError};
use crate::schema::faction::Faction;
use crate::schema::record::EndingSnapshot;

pub struct Autoplayer {
    rng: StdRng,
    /// Chance of buying each storyline on offer.
    purchase_chance: f64,
}

impl Autoplayer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            purchase_chance: 0.5,
        }
    }

    pub fn with_purchase_chance(mut self, chance: f64) -> Self {
        self.purchase_chance = chance.clamp(0.0, 1.0);
        self
    }

    /// Play `session` to `GameEnd` and return the final snapshot.
    pub fn play(&mut self, session: &mut GameSession) -> Result<EndingSnapshot, SessionError> {
        loop {
            match session.phase() {
                GamePhase::Idle => session.start()?,
                GamePhase::CaseBriefing => {
                    session.open_channel(Faction::Truth);
                }
                GamePhase::StorylinePhase => {
                    self.shop(session)?;
                    session.enter_judgment_phase()?;
                }
                GamePhase::JudgmentPhase => {
                    let available = session
                        .current_stage()
                        .map(|stage| stage.choices.len())
                        .unwrap_or(0);
                    let index = self.rng.gen_range(0..available.max(1));
                    debug!(index, available, "autoplay choice");
                    session.select_choice(index)?;
                }
                GamePhase::CaseWrapUp => {
                    return Err(SessionError::WrongPhase {
                        action: "autoplay",
                        phase: GamePhase::CaseWrapUp,
                    })
                }
                GamePhase::GameEnd => return Ok(session.snapshot()),
            }
        }
    }

    fn shop(&mut self, session: &mut GameSession) -> Result<(), SessionError> {
        let offered: Vec<Faction> = session
            .current_case()
            .map(|case| case.definition.storylines.iter().map(|s| s.faction).collect())
            .unwrap_or_default();
        for faction in offered {
            if !self.rng.gen_bool(self.purchase_chance) {
                continue;
            }
            if session.purchase_storyline(faction)? == PurchaseOutcome::InsufficientEnergy {
                debug!(%faction, "autoplay out of energy");
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::case::{ChoiceDef, JudgmentNodeDef};
    use crate::schema::case::{CaseDefinition, FactionRequirement, FactionStoryline};

    fn case(id: &str) -> CaseDefinition {
        let leaf = |id: &str| ChoiceDef {
            id: id.to_string(),
            opinion_delta: 1,
            ..ChoiceDef::default()
        };
        CaseDefinition {
            case_id: id.to_string(),
            title: String::new(),
            briefing: Vec::new(),
            judgment_tree: JudgmentNodeDef {
                label: format!("{}-opening", id),
                choices: vec![
                    ChoiceDef {
                        next: Some(Box::new(JudgmentNodeDef {
                            label: format!("{}-closing", id),
                            choices: vec![leaf("a"), leaf("b")],
                        })),
                        ..leaf("x")
                    },
                    leaf("y"),
                ],
            },
            storylines: vec![FactionStoryline {
                faction: Faction::Peace,
                chat_messages: Vec::new(),
                requirement: FactionRequirement::new(vec![0]),
                success_messages: Vec::new(),
                failure_messages: Vec::new(),
            }],
        }
    }

    fn session() -> GameSession {
        GameSession::builder()
            .cases(vec![case("one"), case("two"), case("three")])
            .build()
            .unwrap()
    }

    #[test]
    fn plays_to_the_end() {
        let mut s = session();
        let snapshot = Autoplayer::new(7).play(&mut s).unwrap();
        assert_eq!(s.phase(), GamePhase::GameEnd);
        assert_eq!(snapshot.case_records.len(), 3);
        for record in &snapshot.case_records {
            assert!(!record.judgment_path.is_empty());
        }
    }

    #[test]
    fn same_seed_same_playthrough() {
        for seed in 0..20 {
            let a = Autoplayer::new(seed).play(&mut session()).unwrap();
            let b = Autoplayer::new(seed).play(&mut session()).unwrap();
            assert_eq!(a, b, "seed {}", seed);
        }
    }

    #[test]
    fn always_buy_spends_energy() {
        let mut s = session();
        Autoplayer::new(1)
            .with_purchase_chance(1.0)
            .play(&mut s)
            .unwrap();
        assert_eq!(s.energy().current(), 0);
        assert!(s
            .snapshot()
            .case_records
            .iter()
            .all(|r| r.has_purchased(Faction::Peace)));
    }
}
