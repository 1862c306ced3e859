//! Validated step graph

use super::step::{Step, StepId};
use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Graph misconfiguration, detected eagerly at construction
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Duplicate step id: {0}")]
    DuplicateStep(StepId),
    #[error("Entry step not found: {0}")]
    UnknownEntry(StepId),
    #[error("Step {from} references unknown step {to}")]
    DanglingReference { from: StepId, to: StepId },
    #[error("Choice step {0} declares no choices")]
    EmptyChoices(StepId),
    #[error("Step {step} declares choice value {value:?} more than once")]
    DuplicateChoiceValue { step: StepId, value: String },
    #[error("Cycle through step {0}")]
    Cycle(StepId),
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidReference
    }
}

/// Serialized form of a graph: an entry id plus the step table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDocument {
    pub entry: StepId,
    pub steps: Vec<Step>,
}

/// Immutable, validated conversation graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "FlowDocument", into = "FlowDocument")]
pub struct StepGraph {
    entry: StepId,
    steps: Vec<Step>,
    index: HashMap<StepId, usize>,
}

impl StepGraph {
    /// Validate and index a step table
    ///
    /// Every successor must resolve, choice steps must offer at least one
    /// choice with distinct values, and the graph must be acyclic.
    pub fn new(entry: impl Into<StepId>, steps: Vec<Step>) -> Result<Self, GraphError> {
        let entry = entry.into();

        let mut index = HashMap::with_capacity(steps.len());
        for (position, step) in steps.iter().enumerate() {
            if index.insert(step.id.clone(), position).is_some() {
                return Err(GraphError::DuplicateStep(step.id.clone()));
            }
        }

        if !index.contains_key(&entry) {
            return Err(GraphError::UnknownEntry(entry));
        }

        for step in &steps {
            if step.kind().accepts_choice() {
                if step.choices().is_empty() {
                    return Err(GraphError::EmptyChoices(step.id.clone()));
                }
                let mut seen = HashSet::new();
                for choice in step.choices() {
                    if !seen.insert(choice.value.as_str()) {
                        return Err(GraphError::DuplicateChoiceValue {
                            step: step.id.clone(),
                            value: choice.value.clone(),
                        });
                    }
                }
            }

            for next in step.successors() {
                if !index.contains_key(next) {
                    return Err(GraphError::DanglingReference {
                        from: step.id.clone(),
                        to: next.clone(),
                    });
                }
            }
        }

        let graph = Self {
            entry,
            steps,
            index,
        };
        graph.check_acyclic()?;

        let reachable = graph.reachable();
        for step in &graph.steps {
            if !reachable.contains(&step.id) {
                tracing::warn!(step = %step.id, "Step is unreachable from the entry step");
            }
        }

        Ok(graph)
    }

    pub fn entry(&self) -> &StepId {
        &self.entry
    }

    pub fn get(&self, id: &str) -> Option<&Step> {
        self.index.get(id).map(|&position| &self.steps[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Steps in declaration order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn reachable(&self) -> HashSet<StepId> {
        let mut seen = HashSet::new();
        let mut stack = vec![&self.entry];
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(step) = self.get(id.as_str()) {
                stack.extend(step.successors());
            }
        }
        seen
    }

    /// Depth-first search with three colours; a grey hit is a back edge
    fn check_acyclic(&self) -> Result<(), GraphError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.steps.len()];

        for root in 0..self.steps.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            // (step position, index of the next successor to visit)
            let mut stack = vec![(root, 0usize)];
            marks[root] = Mark::InProgress;

            while let Some((position, cursor)) = stack.pop() {
                let successors = self.steps[position].successors();
                if let Some(next) = successors.get(cursor) {
                    stack.push((position, cursor + 1));
                    let next_position = self.index[*next];
                    match marks[next_position] {
                        Mark::InProgress => return Err(GraphError::Cycle((*next).clone())),
                        Mark::Unvisited => {
                            marks[next_position] = Mark::InProgress;
                            stack.push((next_position, 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[position] = Mark::Done;
                }
            }
        }

        Ok(())
    }
}

impl TryFrom<FlowDocument> for StepGraph {
    type Error = GraphError;

    fn try_from(document: FlowDocument) -> Result<Self, Self::Error> {
        StepGraph::new(document.entry, document.steps)
    }
}

impl From<StepGraph> for FlowDocument {
    fn from(graph: StepGraph) -> Self {
        FlowDocument {
            entry: graph.entry,
            steps: graph.steps,
        }
    }
}
