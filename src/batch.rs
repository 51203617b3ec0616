//! Build AWS Batch submission requests and chain them into pipelines

/// Build a submission request from a command and submit it
pub mod job;

/// Submit an ordered list of pipeline commands as a chain of dependent jobs
pub mod runner;
