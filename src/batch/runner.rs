use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::batch::job::{submit_job, SubmitJob, SubmitOpts};
use crate::config::BatchConfig;

/// Runner name passed to the remote command so the container resolves the
/// same backend
pub const BATCH_RUNNER: &str = "batch";

/// Environment variable set by Batch inside each instance of an array job
const ARRAY_INDEX_VAR: &str = "AWS_BATCH_JOB_ARRAY_INDEX";

/// An ordered list of pipeline commands with per-command routing
///
/// `split_commands` may fan out into array jobs; `gpu_commands` run on the
/// GPU queue. Both name entries of `commands`.
#[derive(Debug, Deserialize, Serialize)]
pub struct Pipeline {
    pub commands: Vec<String>,
    #[serde(default)]
    pub split_commands: Vec<String>,
    #[serde(default)]
    pub gpu_commands: Vec<String>,
}

impl Pipeline {
    pub fn from_file(path: &Path) -> Result<Pipeline> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("can't read pipeline config at {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("invalid pipeline config at {}", path.display()))
    }
}

/// Submission options shared by every job in the pipeline
#[derive(Debug, Clone)]
pub struct RunnerOpts {
    /// Fan splittable commands out into this many array jobs
    pub num_splits: i64,
    pub debug: bool,
    pub profile: bool,
}

impl Default for RunnerOpts {
    fn default() -> Self {
        RunnerOpts { num_splits: 1, debug: false, profile: false }
    }
}

/// Submit one job per pipeline command, each depending on the previous one
///
/// The chain is strictly sequential: job i+1 lists job i as its only parent,
/// so Batch runs the pipeline in order even though all jobs are submitted up
/// front. A failed submission aborts the loop and leaves the already-accepted
/// jobs in the queue. Returns the job ids in submission order.
pub async fn run_pipeline<S: SubmitJob + ?Sized>(
    client: &S,
    config: &BatchConfig,
    cfg_json_uri: &str,
    pipeline: &Pipeline,
    opts: &RunnerOpts,
) -> Result<Vec<String>> {
    let mut parent_job_ids: Vec<String> = Vec::new();
    let mut job_ids: Vec<String> = Vec::new();

    for command in &pipeline.commands {
        let mut cmd: Vec<String> = [
            "louhi",
            "run_command",
            cfg_json_uri,
            command,
            "--runner",
            BATCH_RUNNER,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut num_array_jobs = None;
        if pipeline.split_commands.contains(command) && opts.num_splits > 1 {
            num_array_jobs = Some(opts.num_splits);
            cmd.push("--num-splits".to_string());
            cmd.push(opts.num_splits.to_string());
        }

        let submit_opts = SubmitOpts {
            debug: opts.debug,
            profile: opts.profile,
            attempts: config.attempts,
            parent_job_ids: parent_job_ids.clone(),
            num_array_jobs,
            use_gpu: pipeline.gpu_commands.contains(command),
        };

        info!("submitting pipeline command: {command}");
        let job_id = submit_job(client, config, &cmd, &submit_opts).await?;

        parent_job_ids = vec![job_id.clone()];
        job_ids.push(job_id);
    }

    Ok(job_ids)
}

/// Index of this instance within an array job, 0 for plain jobs
pub fn array_index() -> i64 {
    env::var(ARRAY_INDEX_VAR)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}
