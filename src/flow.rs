//! Static conversation graph
//!
//! Steps are pure data: prompt text, a closed widget kind, and the ids of
//! their successors. A `StepGraph` is validated once at construction and is
//! immutable afterwards.

mod catalog;
pub mod currency;
mod graph;
mod step;

pub use catalog::lead_questionnaire;
pub use currency::{format_amount, parse_amount, AmountError};
pub use graph::{FlowDocument, GraphError, StepGraph};
pub use step::{Choice, Step, StepId, StepKind, StepWidget};
