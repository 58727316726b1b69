/// Ending aggregator — running opinion, faction influence and case history.
use thiserror::Error;
use tracing::{debug, info};

use crate::core::evaluator::Compliance;
use crate::schema::faction::{Faction, FactionScores};
use crate::schema::record::{CaseRecord, EndingSnapshot};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregatorError {
    #[error("case '{open}' is still open; end it before starting '{requested}'")]
    CaseAlreadyOpen { open: String, requested: String },
    #[error("no case is open")]
    NoOpenCase,
    #[error("judgment path for '{case_id}' would shrink from {recorded} to {offered} choices")]
    PathShrunk {
        case_id: String,
        recorded: usize,
        offered: usize,
    },
    #[error("{score} would overflow")]
    ScoreOverflow { score: String },
}

#[derive(Debug, Clone, Default)]
pub struct EndingAggregator {
    total_opinion: i32,
    scores: FactionScores,
    /// Archived cases followed, while one is open, by the open case.
    records: Vec<CaseRecord>,
    open: bool,
}

impl EndingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh record for `case_id`.
    pub fn start_case(&mut self, case_id: &str) -> Result<(), AggregatorError> {
        if let Some(open) = self.open_record() {
            return Err(AggregatorError::CaseAlreadyOpen {
                open: open.case_id.clone(),
                requested: case_id.to_string(),
            });
        }
        self.records.push(CaseRecord::new(case_id));
        self.open = true;
        debug!(case_id, "case record opened");
        Ok(())
    }

    /// Archive the open record. It is read-only from here on.
    pub fn end_case(&mut self) -> Result<&CaseRecord, AggregatorError> {
        if !self.open {
            return Err(AggregatorError::NoOpenCase);
        }
        self.open = false;
        let record = self.records.last().ok_or(AggregatorError::NoOpenCase)?;
        info!(
            case_id = %record.case_id,
            path = ?record.judgment_path,
            purchased = ?record.purchased_factions,
            "case archived"
        );
        Ok(record)
    }

    /// Totals are unbounded within `i32`; a change that would leave that
    /// range is rejected and nothing is applied.
    pub fn record_opinion_change(&mut self, delta: i32) -> Result<(), AggregatorError> {
        self.total_opinion = checked_opinion(self.total_opinion, delta)?;
        Ok(())
    }

    pub fn record_faction_delta(&mut self, delta: &FactionScores) -> Result<(), AggregatorError> {
        self.scores = checked_scores(&self.scores, delta)?;
        Ok(())
    }

    /// Apply both deltas of one choice, or neither.
    pub fn record_choice(
        &mut self,
        opinion: i32,
        factions: &FactionScores,
    ) -> Result<(), AggregatorError> {
        let total_opinion = checked_opinion(self.total_opinion, opinion)?;
        let scores = checked_scores(&self.scores, factions)?;
        self.total_opinion = total_opinion;
        self.scores = scores;
        Ok(())
    }

    /// Note a storyline purchase on the open case. Buying twice is a no-op.
    pub fn record_purchase(&mut self, faction: Faction) -> Result<(), AggregatorError> {
        let record = self.open_record_mut()?;
        if !record.has_purchased(faction) {
            record.purchased_factions.push(faction);
        }
        Ok(())
    }

    /// Replace the open case's judgment path.
    pub fn record_judgment_path(&mut self, path: &[usize]) -> Result<(), AggregatorError> {
        let record = self.open_record_mut()?;
        if path.len() < record.judgment_path.len() {
            return Err(AggregatorError::PathShrunk {
                case_id: record.case_id.clone(),
                recorded: record.judgment_path.len(),
                offered: path.len(),
            });
        }
        record.judgment_path = path.to_vec();
        Ok(())
    }

    /// Apply the compliance bonus or penalty for one faction.
    pub fn record_compliance(
        &mut self,
        faction: Faction,
        compliance: Compliance,
    ) -> Result<(), AggregatorError> {
        self.scores
            .checked_add(faction, compliance.influence_delta())
            .ok_or_else(|| overflow(faction.name()))
    }

    pub fn total_opinion(&self) -> i32 {
        self.total_opinion
    }

    pub fn scores(&self) -> &FactionScores {
        &self.scores
    }

    pub fn records(&self) -> &[CaseRecord] {
        &self.records
    }

    pub fn open_record(&self) -> Option<&CaseRecord> {
        if self.open {
            self.records.last()
        } else {
            None
        }
    }

    fn open_record_mut(&mut self) -> Result<&mut CaseRecord, AggregatorError> {
        if !self.open {
            return Err(AggregatorError::NoOpenCase);
        }
        self.records.last_mut().ok_or(AggregatorError::NoOpenCase)
    }

    /// Snapshot of the current state. Can be taken any number of times.
    pub fn finalize(&self) -> EndingSnapshot {
        EndingSnapshot {
            total_opinion: self.total_opinion,
            faction_scores: self.scores,
            case_records: self.records.clone(),
        }
    }
}

fn overflow(score: &str) -> AggregatorError {
    AggregatorError::ScoreOverflow {
        score: score.to_string(),
    }
}

fn checked_opinion(total: i32, delta: i32) -> Result<i32, AggregatorError> {
    total
        .checked_add(delta)
        .ok_or_else(|| overflow("public opinion"))
}

fn checked_scores(
    scores: &FactionScores,
    delta: &FactionScores,
) -> Result<FactionScores, AggregatorError> {
    scores
        .checked_sum(delta)
        .map_err(|faction| overflow(faction.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    #[test]
    fn start_requires_previous_case_ended() {
        let mut agg = EndingAggregator::new();
        agg.start_case("Case_01").unwrap();
        let err = agg.start_case("Case_02").unwrap_err();
        assert_eq!(
            err,
            AggregatorError::CaseAlreadyOpen {
                open: "Case_01".to_string(),
                requested: "Case_02".to_string(),
            }
        );
        agg.end_case().unwrap();
        agg.start_case("Case_02").unwrap();
        assert_eq!(agg.records().len(), 2);
    }

    #[test]
    fn purchases_are_idempotent() {
        let mut agg = EndingAggregator::new();
        agg.start_case("Case_01").unwrap();
        agg.record_purchase(Faction::Love).unwrap();
        agg.record_purchase(Faction::Peace).unwrap();
        agg.record_purchase(Faction::Love).unwrap();
        assert_eq!(
            agg.open_record().unwrap().purchased_factions,
            vec![Faction::Love, Faction::Peace]
        );
    }

    #[test]
    fn recording_needs_an_open_case() {
        let mut agg = EndingAggregator::new();
        assert_eq!(agg.record_purchase(Faction::Order), Err(AggregatorError::NoOpenCase));
        assert_eq!(agg.record_judgment_path(&[0]), Err(AggregatorError::NoOpenCase));
        assert!(agg.end_case().is_err());

        agg.start_case("Case_01").unwrap();
        agg.end_case().unwrap();
        assert_eq!(agg.record_purchase(Faction::Order), Err(AggregatorError::NoOpenCase));
    }

    #[test]
    fn judgment_path_never_shrinks() {
        let mut agg = EndingAggregator::new();
        agg.start_case("Case_01").unwrap();
        agg.record_judgment_path(&[1, 0]).unwrap();
        agg.record_judgment_path(&[1, 0, 1]).unwrap();
        let err = agg.record_judgment_path(&[1]).unwrap_err();
        assert!(matches!(err, AggregatorError::PathShrunk { recorded: 3, offered: 1, .. }));
        assert_eq!(agg.open_record().unwrap().judgment_path, vec![1, 0, 1]);
    }

    #[test]
    fn compliance_adjusts_faction_score() {
        let mut agg = EndingAggregator::new();
        agg.record_compliance(Faction::Order, Compliance::Complied).unwrap();
        agg.record_compliance(Faction::Peace, Compliance::Defected).unwrap();
        assert_eq!(agg.scores().get(Faction::Order), 1);
        assert_eq!(agg.scores().get(Faction::Peace), -1);
    }

    #[test]
    fn totals_are_order_independent() {
        let deltas: Vec<(i32, FactionScores)> = (0..20)
            .map(|i| {
                (
                    i % 5 - 2,
                    FactionScores::new()
                        .with(Faction::Order, i % 3 - 1)
                        .with(Faction::Love, 2 - i % 4)
                        .with(Faction::Peace, i % 2),
                )
            })
            .collect();

        let mut expected = EndingAggregator::new();
        for (opinion, factions) in &deltas {
            expected.record_opinion_change(*opinion).unwrap();
            expected.record_faction_delta(factions).unwrap();
        }
        let sum_opinion: i32 = deltas.iter().map(|(o, _)| o).sum();
        assert_eq!(expected.total_opinion(), sum_opinion);

        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..10 {
            let mut shuffled = deltas.clone();
            shuffled.shuffle(&mut rng);
            let mut agg = EndingAggregator::new();
            for (opinion, factions) in &shuffled {
                agg.record_choice(*opinion, factions).unwrap();
            }
            assert_eq!(agg.total_opinion(), expected.total_opinion());
            assert_eq!(agg.scores(), expected.scores());
        }
    }

    #[test]
    fn finalize_reflects_current_state_each_time() {
        let mut agg = EndingAggregator::new();
        agg.start_case("Case_01").unwrap();
        agg.record_opinion_change(-2).unwrap();
        let first = agg.finalize();
        agg.record_opinion_change(1).unwrap();
        let second = agg.finalize();
        assert_eq!(first.total_opinion, -2);
        assert_eq!(second.total_opinion, -1);
        assert_eq!(second.case_records.len(), 1);
    }

    #[test]
    fn overflowing_totals_are_rejected_unchanged() {
        let mut agg = EndingAggregator::new();
        agg.record_opinion_change(i32::MAX).unwrap();
        assert_eq!(
            agg.record_opinion_change(1),
            Err(AggregatorError::ScoreOverflow {
                score: "public opinion".to_string()
            })
        );
        assert_eq!(agg.total_opinion(), i32::MAX);
        agg.record_opinion_change(i32::MIN).unwrap();
        assert_eq!(agg.total_opinion(), -1);

        agg.record_faction_delta(&FactionScores::new().with(Faction::Love, i32::MIN))
            .unwrap();
        agg.record_compliance(Faction::Order, Compliance::Complied).unwrap();
        assert_eq!(
            agg.record_compliance(Faction::Love, Compliance::Defected),
            Err(AggregatorError::ScoreOverflow {
                score: "Love".to_string()
            })
        );
        assert_eq!(agg.scores().get(Faction::Love), i32::MIN);

        // A choice whose influence overflows leaves the opinion untouched too.
        let delta = FactionScores::new().with(Faction::Love, -1);
        assert!(agg.record_choice(5, &delta).is_err());
        assert_eq!(agg.total_opinion(), -1);
        assert_eq!(agg.scores().get(Faction::Order), 1);
    }
}
