// tienda-flow/src/flow/mod.rs

mod definition;
mod execution;
mod hooks;

pub use definition::Flow;
