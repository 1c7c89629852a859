// tienda-flow/src/core/mod.rs

//! Building blocks shared by flows, branches and the registry.

pub mod context_data;
pub mod control;
pub mod handler;
pub mod step;
