//! Startup configuration from the environment

use crate::error::ErrorKind;
use crate::flow::{lead_questionnaire, FlowDocument, GraphError, StepGraph};
use crate::state_machine::{state::DEFAULT_TYPING_DELAY, FlowContext};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const TYPING_DELAY_VAR: &str = "CONCIERGE_TYPING_DELAY_MS";
pub const CURRENCY_SYMBOL_VAR: &str = "CONCIERGE_CURRENCY_SYMBOL";
pub const FLOW_PATH_VAR: &str = "CONCIERGE_FLOW_PATH";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },
    #[error("Cannot read flow file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed flow file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid flow: {0}")]
    Graph(#[from] GraphError),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Graph(e) => e.kind(),
            _ => ErrorKind::Validation,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConciergeConfig {
    pub typing_delay: Duration,
    pub currency_symbol: String,
    /// JSON flow document; the built-in questionnaire when absent
    pub flow_path: Option<PathBuf>,
}

impl Default for ConciergeConfig {
    fn default() -> Self {
        Self {
            typing_delay: DEFAULT_TYPING_DELAY,
            currency_symbol: "$".to_string(),
            flow_path: None,
        }
    }
}

impl ConciergeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get(TYPING_DELAY_VAR) {
            let millis: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: TYPING_DELAY_VAR,
                value: raw.clone(),
            })?;
            config.typing_delay = Duration::from_millis(millis);
        }

        if let Some(symbol) = get(CURRENCY_SYMBOL_VAR) {
            config.currency_symbol = symbol;
        }

        config.flow_path = get(FLOW_PATH_VAR).map(PathBuf::from);

        Ok(config)
    }

    /// Load and validate the conversation graph
    pub fn load_graph(&self) -> Result<StepGraph, ConfigError> {
        match &self.flow_path {
            Some(path) => load_flow_file(path),
            None => Ok(lead_questionnaire()?),
        }
    }

    /// Graph plus settings, ready to spawn a conversation
    pub fn flow_context(&self) -> Result<FlowContext, ConfigError> {
        let graph = self.load_graph()?;
        Ok(FlowContext::new(Arc::new(graph))
            .with_typing_delay(self.typing_delay)
            .with_currency_symbol(self.currency_symbol.clone()))
    }
}

fn load_flow_file(path: &Path) -> Result<StepGraph, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document: FlowDocument = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let graph = StepGraph::try_from(document)?;
    tracing::info!(path = %path.display(), steps = graph.len(), "Loaded flow file");
    Ok(graph)
}
