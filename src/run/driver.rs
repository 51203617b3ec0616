use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use log::info;

use crate::run::options::RunOptions;
use crate::run::stage::Stage;

/// External training and evaluation code the driver delegates to
///
/// The driver owns stage sequencing only; everything model-related happens
/// on the other side of this trait.
pub trait Trainer {
    fn train(&self, options_path: &Path, options: &RunOptions) -> Result<()>;
    fn eval(&self, options_path: &Path, options: &RunOptions) -> Result<()>;
}

/// Runs an external trainer program as `<program> <stage> <options-file>`
pub struct ProcessTrainer {
    program: String,
}

impl ProcessTrainer {
    pub fn new(program: String) -> ProcessTrainer {
        ProcessTrainer { program }
    }

    fn run_stage(&self, stage: Stage, options_path: &Path) -> Result<()> {
        let mut trainer = Command::new(&self.program);
        let cmd = trainer.arg(stage.to_string()).arg(options_path);
        info!("Running trainer process");
        info!("{:?}", &cmd);

        let status = cmd
            .status()
            .with_context(|| format!("failed to execute {}", self.program))?;
        if !status.success() {
            bail!("{} {stage} exited with {status}", self.program);
        }
        Ok(())
    }
}

impl Trainer for ProcessTrainer {
    fn train(&self, options_path: &Path, _options: &RunOptions) -> Result<()> {
        self.run_stage(Stage::Train, options_path)
    }

    fn eval(&self, options_path: &Path, _options: &RunOptions) -> Result<()> {
        self.run_stage(Stage::Eval, options_path)
    }
}

/// Create the run's results directory and drop a copy of its options there
pub fn setup_run(options: &RunOptions, results_dir: &Path) -> Result<PathBuf> {
    let run_name = options.run_name.as_deref().context("run name is assigned at load")?;
    let run_path = results_dir.join(run_name);
    info!("Setting up run directory {}", run_path.display());
    fs::create_dir_all(&run_path)
        .with_context(|| format!("can't create run directory {}", run_path.display()))?;
    options.save(&run_path.join("options.json"))?;
    Ok(run_path)
}

/// Execute the requested stages strictly in the given order
///
/// Single-threaded and synchronous; the first failing stage aborts the run.
pub fn execute_stages(
    trainer: &dyn Trainer,
    options: &RunOptions,
    options_path: &Path,
    results_dir: &Path,
    stages: &[Stage],
) -> Result<()> {
    for stage in stages {
        info!("Executing stage {stage}");
        match stage {
            Stage::Setup => {
                setup_run(options, results_dir)?;
            }
            Stage::Train => trainer.train(options_path, options)?,
            Stage::Eval => trainer.eval(options_path, options)?,
        }
    }
    Ok(())
}
