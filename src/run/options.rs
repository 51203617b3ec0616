use std::fmt;
use std::fs;
use std::path::Path;

use jsonschema::JSONSchema;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug)]
pub enum OptionsError {
    ReadError,
    JSONDecodeError,
    JSONValidationError,
    DeserialisationError,
    WriteError,
}

impl fmt::Display for OptionsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OptionsError::ReadError => write!(f, "can't read options file"),
            OptionsError::JSONDecodeError => write!(f, "options file is not valid JSON"),
            OptionsError::JSONValidationError => write!(f, "options file fails schema validation"),
            OptionsError::DeserialisationError => write!(f, "options file can't be deserialised"),
            OptionsError::WriteError => write!(f, "can't write options file"),
        }
    }
}

impl std::error::Error for OptionsError {}

/// Hyperparameters and identity of one training run
///
/// A flat record persisted as a whole JSON file. Mutated only at load time
/// (run name defaulting, depth flag) and immutable for the rest of the run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RunOptions {
    /// Output of `git rev-parse HEAD` when the run was configured
    pub git_commit: Option<String>,
    pub model_type: String,
    /// Rows, columns, channels
    pub input_shape: [u32; 3],
    pub nb_labels: u32,
    /// Assigned from the model type and a fresh UUID when absent
    pub run_name: Option<String>,
    pub batch_size: u32,
    pub samples_per_epoch: u32,
    pub nb_epoch: u32,
    pub nb_val_samples: u32,
    pub nb_prediction_images: u32,
    /// Early stopping patience, in epochs
    pub patience: u32,
    /// Learning rate cooldown, in epochs
    pub cooldown: u32,
    #[serde(default)]
    pub include_depth: bool,
}

impl RunOptions {
    /// Load options from a file, assigning a unique run name if not present
    ///
    /// The raw JSON is validated against the bundled schema before
    /// deserialising. The possibly-updated record is written back to the
    /// same path, so re-loading reproduces the same values.
    pub fn load(path: &Path) -> Result<RunOptions, OptionsError> {
        info!("Reading run options at {}", path.display());
        let json_string = fs::read_to_string(path).map_err(|err| {
            warn!("Can't read options at path {}: {}", path.display(), err);
            OptionsError::ReadError
        })?;

        let json = serde_json::from_str::<Value>(&json_string)
            .map_err(|_| OptionsError::JSONDecodeError)?;
        validate(&json)?;

        let mut options = serde_json::from_value::<RunOptions>(json)
            .map_err(|_| OptionsError::DeserialisationError)?;

        if options.run_name.is_none() {
            let run_name = format!("{}/{}", options.model_type, Uuid::new_v4());
            info!("Assigning run name {run_name}");
            options.run_name = Some(run_name);
        }
        // a fourth channel is depth
        if options.input_shape[2] == 4 {
            options.include_depth = true;
        }

        options.save(path)?;
        Ok(options)
    }

    /// Write the record to a file as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), OptionsError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|_| OptionsError::WriteError)?;
        fs::write(path, json).map_err(|err| {
            warn!("Can't write options to path {}: {}", path.display(), err);
            OptionsError::WriteError
        })
    }
}

fn validate(json: &Value) -> Result<(), OptionsError> {
    let schema = compiled_schema();
    let result = match schema.validate(json) {
        Ok(_) => Ok(()),
        Err(errors) => {
            for error in errors {
                warn!("Options validation error: {error}");
            }
            Err(OptionsError::JSONValidationError)
        }
    };
    result
}

fn compiled_schema() -> JSONSchema {
    /// included run options schema
    static SCHEMA: &str =
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schemas/run_options.json"));
    let schema_json: Value = serde_json::from_str(SCHEMA).expect("Valid JSON");
    JSONSchema::compile(&schema_json).expect("Valid schema")
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn options_json(run_name: Option<&str>, channels: u32) -> String {
        let run_name = match run_name {
            Some(name) => format!("\"{name}\""),
            None => "null".to_string(),
        };
        format!(
            r#"{{
                "git_commit": "abc123",
                "model_type": "fcn_resnet",
                "input_shape": [256, 256, {channels}],
                "nb_labels": 6,
                "run_name": {run_name},
                "batch_size": 8,
                "samples_per_epoch": 1024,
                "nb_epoch": 50,
                "nb_val_samples": 256,
                "nb_prediction_images": 16,
                "patience": 5,
                "cooldown": 2
            }}"#
        )
    }

    #[test]
    fn load_assigns_and_persists_a_run_name() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("options.json");
        fs::write(&path, options_json(None, 3)).expect("write options");

        let options = RunOptions::load(&path).expect("load options");
        let run_name = options.run_name.clone().expect("run name assigned");
        assert!(run_name.starts_with("fcn_resnet/"));

        // the assigned name was written back, so a reload sees the same one
        let reloaded = RunOptions::load(&path).expect("reload options");
        assert_eq!(reloaded.run_name.as_deref(), Some(run_name.as_str()));
    }

    #[test]
    fn load_keeps_an_existing_run_name() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("options.json");
        fs::write(&path, options_json(Some("fcn_resnet/first"), 3)).expect("write options");

        let options = RunOptions::load(&path).expect("load options");
        assert_eq!(options.run_name.as_deref(), Some("fcn_resnet/first"));
    }

    #[test]
    fn four_channel_input_implies_depth() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("options.json");
        fs::write(&path, options_json(Some("fcn_resnet/run"), 4)).expect("write options");

        let options = RunOptions::load(&path).expect("load options");
        assert!(options.include_depth);
    }

    #[test]
    fn three_channel_input_leaves_depth_unset() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("options.json");
        fs::write(&path, options_json(Some("fcn_resnet/run"), 3)).expect("write options");

        let options = RunOptions::load(&path).expect("load options");
        assert!(!options.include_depth);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("options.json");
        fs::write(&path, options_json(Some("fcn_resnet/run"), 3)).expect("write options");

        let options = RunOptions::load(&path).expect("load options");
        let saved_path = dir.path().join("copy.json");
        options.save(&saved_path).expect("save options");

        let reloaded = RunOptions::load(&saved_path).expect("reload options");
        assert_eq!(options, reloaded);
    }

    #[test]
    fn missing_fields_fail_validation() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("options.json");
        fs::write(&path, r#"{"model_type": "fcn_resnet"}"#).expect("write options");

        let err = RunOptions::load(&path).expect_err("validation failure");
        assert!(matches!(err, OptionsError::JSONValidationError));
    }

    #[test]
    fn unknown_fields_fail_validation() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("options.json");
        let json = options_json(Some("fcn_resnet/run"), 3)
            .replace("\"git_commit\"", "\"surprise\": 1, \"git_commit\"");
        fs::write(&path, json).expect("write options");

        let err = RunOptions::load(&path).expect_err("validation failure");
        assert!(matches!(err, OptionsError::JSONValidationError));
    }

    #[test]
    fn garbage_fails_to_decode() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("options.json");
        fs::write(&path, "not json").expect("write options");

        let err = RunOptions::load(&path).expect_err("decode failure");
        assert!(matches!(err, OptionsError::JSONDecodeError));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nope.json");

        let err = RunOptions::load(&path).expect_err("read failure");
        assert!(matches!(err, OptionsError::ReadError));
    }
}
