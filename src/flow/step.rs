//! Step and choice types

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Unique key of a step in the graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StepId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for StepId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Widget kind tag, shared by steps and bot messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    ChoiceList,
    ChoiceGrid,
    CurrencyInput,
    Terminal,
}

impl StepKind {
    /// Whether the step expects a `Choice` from the user
    pub fn accepts_choice(self) -> bool {
        matches!(self, StepKind::ChoiceList | StepKind::ChoiceGrid)
    }

    pub fn is_terminal(self) -> bool {
        self == StepKind::Terminal
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::ChoiceList => write!(f, "choice-list"),
            StepKind::ChoiceGrid => write!(f, "choice-grid"),
            StepKind::CurrencyInput => write!(f, "currency-input"),
            StepKind::Terminal => write!(f, "terminal"),
        }
    }
}

/// A selectable option on a choice step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub value: String,
    /// Successor step; `None` ends the conversation after this answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<StepId>,
}

impl Choice {
    pub fn new(label: impl Into<String>, value: impl Into<String>, next: impl Into<StepId>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            next: Some(next.into()),
        }
    }

    /// A choice that ends the conversation
    pub fn closing(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            next: None,
        }
    }
}

/// Kind-specific data of a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StepWidget {
    ChoiceList { choices: Vec<Choice> },
    ChoiceGrid { choices: Vec<Choice> },
    CurrencyInput { next: StepId },
    Terminal,
}

/// A node in the conversation graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub prompt: String,
    #[serde(flatten)]
    pub widget: StepWidget,
}

impl Step {
    pub fn choice_list(id: impl Into<StepId>, prompt: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            widget: StepWidget::ChoiceList { choices },
        }
    }

    pub fn choice_grid(id: impl Into<StepId>, prompt: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            widget: StepWidget::ChoiceGrid { choices },
        }
    }

    pub fn currency_input(
        id: impl Into<StepId>,
        prompt: impl Into<String>,
        next: impl Into<StepId>,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            widget: StepWidget::CurrencyInput { next: next.into() },
        }
    }

    pub fn terminal(id: impl Into<StepId>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            widget: StepWidget::Terminal,
        }
    }

    pub fn kind(&self) -> StepKind {
        match self.widget {
            StepWidget::ChoiceList { .. } => StepKind::ChoiceList,
            StepWidget::ChoiceGrid { .. } => StepKind::ChoiceGrid,
            StepWidget::CurrencyInput { .. } => StepKind::CurrencyInput,
            StepWidget::Terminal => StepKind::Terminal,
        }
    }

    /// Declared choices; empty for non-choice steps
    pub fn choices(&self) -> &[Choice] {
        match &self.widget {
            StepWidget::ChoiceList { choices } | StepWidget::ChoiceGrid { choices } => choices,
            StepWidget::CurrencyInput { .. } | StepWidget::Terminal => &[],
        }
    }

    /// Every step id this step can lead to, in declaration order
    pub fn successors(&self) -> Vec<&StepId> {
        match &self.widget {
            StepWidget::ChoiceList { choices } | StepWidget::ChoiceGrid { choices } => {
                choices.iter().filter_map(|c| c.next.as_ref()).collect()
            }
            StepWidget::CurrencyInput { next } => vec![next],
            StepWidget::Terminal => vec![],
        }
    }
}
