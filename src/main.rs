use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use rusoto_batch::BatchClient;
use rusoto_core::Region;

use crate::batch::runner::{run_pipeline, Pipeline, RunnerOpts};
use crate::config::BatchConfig;
use crate::run::driver::{execute_stages, ProcessTrainer};
use crate::run::options::RunOptions;
use crate::run::stage::Stage;

mod batch;
mod config;
mod run;

#[derive(Parser)]
#[command(name = "louhi", about = "Submit pipelines to AWS Batch and drive training runs")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Submit a pipeline as a chain of dependent Batch jobs
    ///
    /// The submitted jobs invoke a `run_command` entry point provided by the
    /// container image; this binary only constructs the invocation.
    Submit {
        /// Path of the serialised pipeline configuration, also passed to the
        /// remote jobs
        cfg_json_uri: String,
        /// Fan splittable commands out into this many array jobs
        #[arg(long, default_value_t = 1)]
        num_splits: i64,
        /// Run remote commands under a debug server wrapper
        #[arg(long)]
        debug: bool,
        /// Run remote commands under a line profiler wrapper
        #[arg(long)]
        profile: bool,
    },
    /// Execute stages of a training run described by an options file
    Run {
        /// Path to the run options JSON file
        file_path: PathBuf,
        /// Stages to execute, in order
        #[arg(value_enum)]
        stages: Vec<Stage>,
        /// External trainer program invoked for train and eval stages
        #[arg(long, default_value = "train")]
        trainer: String,
        /// Directory run results are written under
        #[arg(long, default_value = "results")]
        results_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("louhi starting up");

    let cli = Cli::parse();
    match cli.command {
        CliCommand::Submit { cfg_json_uri, num_splits, debug, profile } => {
            let config = BatchConfig::from_env()?;
            let pipeline = Pipeline::from_file(Path::new(&cfg_json_uri))?;
            let client = BatchClient::new(Region::default());
            let opts = RunnerOpts { num_splits, debug, profile };
            let job_ids = run_pipeline(&client, &config, &cfg_json_uri, &pipeline, &opts).await?;
            info!("submitted {} jobs", job_ids.len());
        }
        CliCommand::Run { file_path, stages, trainer, results_dir } => {
            let split_ind = batch::runner::array_index();
            if split_ind > 0 {
                info!("running as array job instance {split_ind}");
            }
            let options = RunOptions::load(&file_path)?;
            let trainer = ProcessTrainer::new(trainer);
            execute_stages(&trainer, &options, &file_path, &results_dir, &stages)?;
        }
    }

    Ok(())
}
