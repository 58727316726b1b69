/// Stage bindings — a validated map from judgment stages to whatever the
/// front-end uses to show them (panel ids, widget handles, ...).
///
/// Built once per case and checked eagerly, so a missing or misnamed panel
/// is reported at load time instead of on the first click.
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::error;

use crate::core::tree::{JudgmentTree, NodeId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("{found} panels supplied for {expected} authored stages")]
    ConfigurationMismatch { expected: usize, found: usize },
    #[error("no stage labelled '{0}' in the judgment tree")]
    StageNotFound(String),
    #[error("stage '{0}' is bound twice")]
    DuplicateBinding(String),
}

#[derive(Debug, Clone)]
pub struct StageBindings<H> {
    handles: FxHashMap<NodeId, H>,
}

impl<H> StageBindings<H> {
    /// Bind one handle per labelled stage of `tree`.
    pub fn bind<I>(tree: &JudgmentTree, handles: I) -> Result<Self, BindingError>
    where
        I: IntoIterator<Item = (String, H)>,
    {
        let supplied: Vec<(String, H)> = handles.into_iter().collect();
        let expected = tree.stage_labels().filter(|l| !l.is_empty()).count();
        if supplied.len() != expected {
            error!(expected, found = supplied.len(), "stage panel count mismatch");
            return Err(BindingError::ConfigurationMismatch {
                expected,
                found: supplied.len(),
            });
        }

        let mut bound = FxHashMap::default();
        for (label, handle) in supplied {
            let Some(id) = tree.stage(&label) else {
                error!(label = %label, "no stage for panel");
                return Err(BindingError::StageNotFound(label));
            };
            if bound.insert(id, handle).is_some() {
                return Err(BindingError::DuplicateBinding(label));
            }
        }
        Ok(Self { handles: bound })
    }

    pub fn handle(&self, id: NodeId) -> Option<&H> {
        self.handles.get(&id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
