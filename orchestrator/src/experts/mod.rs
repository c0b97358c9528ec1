// orchestrator/src/experts/mod.rs

pub mod classifier;
