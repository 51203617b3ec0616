use anyhow::Result;
use async_trait::async_trait;
use log::info;
use rusoto_batch::{
    ArrayProperties, Batch, BatchClient, ContainerOverrides, JobDependency, RetryStrategy,
    SubmitJobRequest,
};
use uuid::Uuid;

use crate::config::BatchConfig;

/// Wrapper that runs the command under a remote debug server (ptvsd), so a
/// debugger can attach to the container over port 6006
const DEBUG_WRAPPER: [&str; 8] = [
    "python", "-m", "ptvsd", "--host", "0.0.0.0", "--port", "6006", "--wait",
];

/// Wrapper that runs the command under kernprof, a line profiler
const PROFILE_WRAPPER: [&str; 3] = ["kernprof", "-v", "-l"];

/// Options for one job submission
///
/// An explicit struct rather than loose keyword arguments, so the recognised
/// options are enumerated in one place.
#[derive(Debug, Clone)]
pub struct SubmitOpts {
    /// Run the command under a remote debug server wrapper
    pub debug: bool,
    /// Run the command under a line profiler wrapper
    pub profile: bool,
    /// Times Batch retries the job on failure
    pub attempts: i64,
    /// Jobs that must complete successfully before this one starts.
    /// Must reference already-submitted jobs.
    pub parent_job_ids: Vec<String>,
    /// If set, submit an array job that fans out into this many instances
    pub num_array_jobs: Option<i64>,
    /// Route to the GPU queue and job definition
    pub use_gpu: bool,
}

impl Default for SubmitOpts {
    fn default() -> Self {
        SubmitOpts {
            debug: false,
            profile: false,
            attempts: 5,
            parent_job_ids: Vec::new(),
            num_array_jobs: None,
            use_gpu: false,
        }
    }
}

/// One remote call to the Batch API
///
/// A seam over `rusoto_batch::BatchClient` so pipeline chaining can be
/// exercised without AWS.
#[async_trait]
pub trait SubmitJob {
    /// Submit the request and return the job id assigned by Batch
    async fn submit(&self, request: SubmitJobRequest) -> Result<String>;
}

#[async_trait]
impl SubmitJob for BatchClient {
    async fn submit(&self, request: SubmitJobRequest) -> Result<String> {
        let response = Batch::submit_job(self, request).await?;
        Ok(response.job_id)
    }
}

/// Assemble a submission request for one command
pub fn build_request(config: &BatchConfig, cmd: &[String], opts: &SubmitOpts) -> SubmitJobRequest {
    let (job_queue, job_def) = match opts.use_gpu {
        true => (&config.gpu_job_queue, &config.gpu_job_def),
        false => (&config.cpu_job_queue, &config.cpu_job_def),
    };

    let job_name = format!("louhi-{}", Uuid::new_v4());

    let mut command: Vec<String> = cmd.to_vec();
    if opts.debug {
        // the debugger wrapper takes the target as a module, like python -m
        let mut wrapped: Vec<String> = DEBUG_WRAPPER.iter().map(|s| s.to_string()).collect();
        wrapped.push("-m".to_string());
        wrapped.extend(command);
        command = wrapped;
    }
    if opts.profile {
        let mut wrapped: Vec<String> = PROFILE_WRAPPER.iter().map(|s| s.to_string()).collect();
        wrapped.extend(command);
        command = wrapped;
    }

    let depends_on = match opts.parent_job_ids.is_empty() {
        true => None,
        false => Some(
            opts.parent_job_ids
                .iter()
                .map(|id| JobDependency {
                    job_id: Some(id.clone()),
                    ..Default::default()
                })
                .collect(),
        ),
    };

    SubmitJobRequest {
        job_name,
        job_queue: job_queue.clone(),
        job_definition: job_def.clone(),
        container_overrides: Some(ContainerOverrides {
            command: Some(command),
            ..Default::default()
        }),
        retry_strategy: Some(RetryStrategy {
            attempts: Some(opts.attempts),
            ..Default::default()
        }),
        depends_on,
        array_properties: opts.num_array_jobs.map(|size| ArrayProperties { size: Some(size) }),
        ..Default::default()
    }
}

/// Submit one command as a Batch job and return its job id
///
/// One network call, one log line. Failures from the remote call propagate
/// to the caller untouched.
pub async fn submit_job<S: SubmitJob + ?Sized>(
    client: &S,
    config: &BatchConfig,
    cmd: &[String],
    opts: &SubmitOpts,
) -> Result<String> {
    let request = build_request(config, cmd, opts);
    let job_name = request.job_name.clone();
    let command = request
        .container_overrides
        .as_ref()
        .and_then(|overrides| overrides.command.clone())
        .unwrap_or_default();

    let job_id = client.submit(request).await?;
    info!("submitted job with jobName={job_name} and jobId={job_id}");
    info!("{:?}", command);

    Ok(job_id)
}
