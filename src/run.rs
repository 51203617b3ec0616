//! Load run options and drive the stages of one training run

/// Read, validate, and persist the flat run options record
pub mod options;

/// Named stages a run is made of
pub mod stage;

/// Execute stages in order, delegating to an external trainer
pub mod driver;
