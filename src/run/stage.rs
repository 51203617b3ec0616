use std::fmt;
use clap::ValueEnum;

/// One named stage of a training run, executed in CLI argument order
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Stage {
    Setup,
    Train,
    Eval,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stage::Setup => write!(f, "setup"),
            Stage::Train => write!(f, "train"),
            Stage::Eval => write!(f, "eval"),
        }
    }
}
