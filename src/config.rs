use std::env;

use anyhow::{Context, Result};

/// Queue and job definition identifiers for the AWS Batch environment
///
/// The same compute environment carries two queue/definition pairs: a cheap
/// CPU one for most pipeline commands and a GPU one for training. Resolved
/// from `AWS_BATCH_*` environment variables and passed explicitly to the
/// submission functions.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub cpu_job_queue: String,
    pub cpu_job_def: String,
    pub gpu_job_queue: String,
    pub gpu_job_def: String,
    /// Times Batch retries a failed job before giving up
    pub attempts: i64,
}

impl BatchConfig {
    pub fn from_env() -> Result<BatchConfig> {
        Ok(BatchConfig {
            cpu_job_queue: require_var("AWS_BATCH_CPU_JOB_QUEUE")?,
            cpu_job_def: require_var("AWS_BATCH_CPU_JOB_DEF")?,
            gpu_job_queue: require_var("AWS_BATCH_GPU_JOB_QUEUE")?,
            gpu_job_def: require_var("AWS_BATCH_GPU_JOB_DEF")?,
            attempts: attempts_var()?,
        })
    }
}

fn require_var(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} is not set"))
}

fn attempts_var() -> Result<i64> {
    match env::var("AWS_BATCH_ATTEMPTS") {
        Ok(value) => value
            .parse()
            .with_context(|| format!("AWS_BATCH_ATTEMPTS is not a number: {value}")),
        Err(_) => Ok(5),
    }
}

/// Serialises tests that mutate process environment variables, which are
/// shared across the parallel test harness
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    fn set_queue_vars() {
        env::set_var("AWS_BATCH_CPU_JOB_QUEUE", "cpuQueue");
        env::set_var("AWS_BATCH_CPU_JOB_DEF", "cpuDef");
        env::set_var("AWS_BATCH_GPU_JOB_QUEUE", "gpuQueue");
        env::set_var("AWS_BATCH_GPU_JOB_DEF", "gpuDef");
    }

    #[test]
    fn reads_queues_from_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_queue_vars();
        env::remove_var("AWS_BATCH_ATTEMPTS");

        let config = BatchConfig::from_env().expect("config");
        assert_eq!(config.cpu_job_queue, "cpuQueue");
        assert_eq!(config.gpu_job_def, "gpuDef");
        assert_eq!(config.attempts, 5);
    }
}
