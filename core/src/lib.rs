// tienda-flow/src/lib.rs

//! tienda-flow: a small asynchronous step-workflow engine.
//!
//! A [`Flow`] is an ordered list of named steps. Every step can carry `before`,
//! `on` and `after` handlers which receive a shared [`ContextData`] and answer
//! with a [`FlowControl`] signal. On top of that the engine offers:
//!  - optional steps and `skip_if` predicates evaluated against the context,
//!  - structural edits (insert before/after, remove) so flows can be extended,
//!  - branches: a step that picks one of several sub-flows by predicate and runs
//!    it on a sub-context extracted from the parent context,
//!  - a [`FlowRegistry`] keyed by context type so callers only need the context
//!    to dispatch the right flow.
//!
//! Handlers must release `ContextData` lock guards before awaiting.

pub mod branch;
pub mod core;
pub mod error;
pub mod flow;
pub mod registry;

pub use crate::branch::{BranchArmConfigurator, BranchBuilder};
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{FlowControl, FlowOutcome};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef};
pub use crate::error::{FlowError, FlowResult};
pub use crate::flow::Flow;
pub use crate::registry::FlowRegistry;
