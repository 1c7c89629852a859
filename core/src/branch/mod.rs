// tienda-flow/src/branch/mod.rs

//! Branching steps: pick one sub-flow out of several by predicate and run it
//! on a sub-context extracted from the parent context.

mod arm;
mod builder;

pub use builder::{BranchArmConfigurator, BranchBuilder};
