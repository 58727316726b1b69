/// Judgment tree — immutable arena of stages and choices built from an
/// authored case definition.
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::schema::case::JudgmentNodeDef;
use crate::schema::faction::FactionScores;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("root stage has no choices")]
    EmptyRoot,
    #[error("stage label '{0}' is used more than once")]
    DuplicateStage(String),
    #[error("stage '{0}' is reachable but offers no choices")]
    DeadEndStage(String),
}

/// Authoring issues that do not prevent play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeLint {
    /// A choice leads to a child node with an empty label. The walker ends
    /// the case there, so any choices under that child are never offered.
    EmptyLabelChild {
        stage: String,
        choice_index: usize,
        hidden_choices: usize,
    },
}

/// Index of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub struct JudgmentNode {
    pub id: NodeId,
    pub label: String,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone)]
pub struct Choice {
    /// Position among the sibling choices, 0-based.
    pub index: usize,
    pub id: String,
    pub text: String,
    pub opinion_delta: i32,
    pub faction_delta: FactionScores,
    pub next: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct JudgmentTree {
    nodes: Vec<JudgmentNode>,
    root: NodeId,
    /// Reachable stages by label.
    stages: FxHashMap<String, NodeId>,
    /// Reachable stages in depth-first order.
    stage_order: Vec<NodeId>,
    lints: Vec<TreeLint>,
}

impl JudgmentTree {
    /// Build and validate a tree from its authored definition.
    pub fn from_definition(root: &JudgmentNodeDef) -> Result<JudgmentTree, TreeError> {
        let mut nodes = Vec::new();
        let root_id = intern(&mut nodes, root);

        let mut tree = JudgmentTree {
            nodes,
            root: root_id,
            stages: FxHashMap::default(),
            stage_order: Vec::new(),
            lints: Vec::new(),
        };
        tree.validate()?;

        for lint in &tree.lints {
            match lint {
                TreeLint::EmptyLabelChild {
                    stage,
                    choice_index,
                    hidden_choices,
                } => warn!(
                    stage = %stage,
                    choice_index,
                    hidden_choices,
                    "choice leads to an unlabelled stage; treating it as terminal"
                ),
            }
        }

        Ok(tree)
    }

    fn validate(&mut self) -> Result<(), TreeError> {
        if self.nodes[self.root.0].choices.is_empty() {
            return Err(TreeError::EmptyRoot);
        }

        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.choices.is_empty() {
                return Err(TreeError::DeadEndStage(node.label.clone()));
            }
            if !node.label.is_empty() && self.stages.insert(node.label.clone(), id).is_some() {
                return Err(TreeError::DuplicateStage(node.label.clone()));
            }
            self.stage_order.push(id);

            let mut children = Vec::new();
            for choice in &node.choices {
                let Some(child) = choice.next else { continue };
                let child_node = &self.nodes[child.0];
                if child_node.label.is_empty() {
                    self.lints.push(TreeLint::EmptyLabelChild {
                        stage: node.label.clone(),
                        choice_index: choice.index,
                        hidden_choices: child_node.choices.len(),
                    });
                } else {
                    children.push(child);
                }
            }
            // First choice's subtree is visited first.
            stack.extend(children.into_iter().rev());
        }
        Ok(())
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &JudgmentNode {
        &self.nodes[id.0]
    }

    /// Look up a reachable stage by its label.
    pub fn stage(&self, label: &str) -> Option<NodeId> {
        self.stages.get(label).copied()
    }

    /// Labels of every stage the player can reach, depth-first.
    pub fn stage_labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.stage_order
            .iter()
            .map(|id| self.nodes[id.0].label.as_str())
    }

    pub fn stage_count(&self) -> usize {
        self.stage_order.len()
    }

    pub fn lints(&self) -> &[TreeLint] {
        &self.lints
    }

    /// A choice ends the case when it has no child, or when its child
    /// carries no label.
    pub fn is_terminal(&self, choice: &Choice) -> bool {
        match choice.next {
            None => true,
            Some(child) => self.nodes[child.0].label.is_empty(),
        }
    }

    /// Whether `path` can be walked from the root without running past a
    /// terminal choice or selecting a missing choice.
    pub fn admits_prefix(&self, path: &[usize]) -> bool {
        let mut current = Some(self.root);
        for &index in path {
            let Some(id) = current else { return false };
            let Some(choice) = self.nodes[id.0].choices.get(index) else {
                return false;
            };
            current = if self.is_terminal(choice) {
                None
            } else {
                choice.next
            };
        }
        true
    }

    /// Length of the longest playable path.
    pub fn depth(&self) -> usize {
        self.depth_from(self.root)
    }

    fn depth_from(&self, id: NodeId) -> usize {
        self.nodes[id.0]
            .choices
            .iter()
            .map(|choice| match choice.next {
                Some(child) if !self.is_terminal(choice) => 1 + self.depth_from(child),
                _ => 1,
            })
            .max()
            .unwrap_or(0)
    }
}

fn intern(nodes: &mut Vec<JudgmentNode>, def: &JudgmentNodeDef) -> NodeId {
    let id = NodeId(nodes.len());
    nodes.push(JudgmentNode {
        id,
        label: def.label.clone(),
        choices: Vec::with_capacity(def.choices.len()),
    });

    let mut choices = Vec::with_capacity(def.choices.len());
    for (index, choice) in def.choices.iter().enumerate() {
        let next = choice.next.as_deref().map(|child| intern(nodes, child));
        choices.push(Choice {
            index,
            id: choice.id.clone(),
            text: choice.text.clone(),
            opinion_delta: choice.opinion_delta,
            faction_delta: choice.faction_delta,
            next,
        });
    }
    nodes[id.0].choices = choices;
    id
}
