use crate::cli::RepairArgs;
use crate::error::{CliError, Result};
use lynx_core::engine::config::{RepairConfig, RepairConfigBuilder};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialRelocationConfig {
    #[serde(rename = "max-steps")]
    max_steps: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRepairConfig {
    relocation: Option<PartialRelocationConfig>,
}

impl PartialRepairConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Loads the file if one was given, otherwise starts from an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Resolves the final configuration. Precedence, lowest first: file, `--set`, dedicated flags.
    pub fn merge_with_cli(mut self, args: &RepairArgs) -> Result<RepairConfig> {
        self.apply_set_values(&args.set_values)?;

        let relocation = self.relocation.take().unwrap_or_default();
        let max_steps = args.max_relocation_steps.or(relocation.max_steps);

        RepairConfigBuilder::new()
            .max_relocation_steps(max_steps)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key.trim() {
                "relocation.max-steps" => {
                    self.relocation
                        .get_or_insert_with(Default::default)
                        .max_steps = Some(value_str.trim().parse().map_err(|_| {
                        CliError::Config(format!(
                            "Invalid integer value for {}: {}",
                            key, value_str
                        ))
                    })?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
