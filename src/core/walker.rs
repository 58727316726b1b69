/// Judgment walker — a cursor over one case's judgment tree.
///
/// The walker records the path taken and the deltas each choice carries.
/// Applying those deltas to the ending aggregate is the caller's job.
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::core::tree::{JudgmentNode, JudgmentTree, NodeId};
use crate::schema::faction::FactionScores;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalkError {
    #[error("choice {index} does not exist at stage '{stage}' ({available} choices)")]
    InvalidChoiceIndex {
        stage: String,
        index: usize,
        available: usize,
    },
    #[error("the case has already reached a verdict")]
    NotInProgress,
    #[error("choice {index} at stage '{stage}' overflows the running totals")]
    TotalsOverflow { stage: String, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    InProgress,
    Ended,
}

/// Where the walker stands after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Stage(NodeId),
    Ended,
}

/// Opinion and influence carried by the selected choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedDeltas {
    pub opinion: i32,
    pub factions: FactionScores,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub choice_index: usize,
    pub choice_id: String,
    pub applied: AppliedDeltas,
    pub next: Cursor,
}

#[derive(Debug, Clone)]
pub struct JudgmentWalker {
    tree: Arc<JudgmentTree>,
    cursor: Cursor,
    path: Vec<usize>,
    totals: AppliedDeltas,
}

impl JudgmentWalker {
    /// Place a new walker at the root of `tree`.
    pub fn start(tree: Arc<JudgmentTree>) -> Self {
        let root = tree.root();
        Self {
            tree,
            cursor: Cursor::Stage(root),
            path: Vec::new(),
            totals: AppliedDeltas::default(),
        }
    }

    /// Walk `path` from the root in one go.
    pub fn replay(tree: Arc<JudgmentTree>, path: &[usize]) -> Result<Self, WalkError> {
        let mut walker = Self::start(tree);
        for &index in path {
            walker.select_choice(index)?;
        }
        Ok(walker)
    }

    pub fn state(&self) -> WalkState {
        match self.cursor {
            Cursor::Stage(_) => WalkState::InProgress,
            Cursor::Ended => WalkState::Ended,
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn tree(&self) -> &JudgmentTree {
        &self.tree
    }

    /// The stage awaiting a choice, or `None` once the case has ended.
    pub fn current_stage(&self) -> Option<&JudgmentNode> {
        match self.cursor {
            Cursor::Stage(id) => Some(self.tree.node(id)),
            Cursor::Ended => None,
        }
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Sum of every delta applied so far.
    pub fn totals(&self) -> &AppliedDeltas {
        &self.totals
    }

    /// Select the choice at `index` of the current stage.
    ///
    /// On error nothing changes.
    pub fn select_choice(&mut self, index: usize) -> Result<StepOutcome, WalkError> {
        let Cursor::Stage(id) = self.cursor else {
            return Err(WalkError::NotInProgress);
        };
        let node = self.tree.node(id);
        let choice = node
            .choices
            .get(index)
            .ok_or_else(|| WalkError::InvalidChoiceIndex {
                stage: node.label.clone(),
                index,
                available: node.choices.len(),
            })?;

        let applied = AppliedDeltas {
            opinion: choice.opinion_delta,
            factions: choice.faction_delta,
        };
        let overflow = || WalkError::TotalsOverflow {
            stage: node.label.clone(),
            index,
        };
        let totals = AppliedDeltas {
            opinion: self
                .totals
                .opinion
                .checked_add(applied.opinion)
                .ok_or_else(overflow)?,
            factions: self
                .totals
                .factions
                .checked_sum(&applied.factions)
                .map_err(|_| overflow())?,
        };
        let next = match choice.next {
            Some(child) if !self.tree.is_terminal(choice) => Cursor::Stage(child),
            _ => Cursor::Ended,
        };
        let outcome = StepOutcome {
            choice_index: index,
            choice_id: choice.id.clone(),
            applied,
            next,
        };

        debug!(
            stage = %node.label,
            choice = index,
            opinion = applied.opinion,
            ended = next == Cursor::Ended,
            "judgment choice selected"
        );

        self.path.push(index);
        self.totals = totals;
        self.cursor = next;
        Ok(outcome)
    }
}
