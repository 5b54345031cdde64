use crate::cli::PipelineArgs;
use crate::error::{CliError, Result};
use cdxml2gnr::engine::config as core_config;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Pipeline settings as read from a TOML file; every key is optional.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialPipelineConfig {
    cc_equilibrium_bond: Option<f64>,
    ch_bond_length: Option<f64>,
    embedding_padding: Option<f64>,
    embedding_rotation_degrees: Option<f64>,
    working_cell_xy_factor: Option<f64>,
    working_cell_z: Option<f64>,
    mode_tolerance: Option<f64>,
    cell_padding: Option<f64>,
    alignment_tolerance: Option<f64>,
    wrap_eps: Option<f64>,
    duplicate_distance: Option<f64>,
    neighbor_skin: Option<f64>,
    min_coordination: Option<usize>,
    saturation_bond_length: Option<f64>,
    explicit_hydrogens: Option<bool>,
}

impl PartialPipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading pipeline configuration from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Applies `KEY=VALUE` overrides, using the same kebab-case keys as the file.
    pub fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let (key, value) = (key.trim(), value.trim());
            match key {
                "cc-equilibrium-bond" => self.cc_equilibrium_bond = Some(parse_value(key, value)?),
                "ch-bond-length" => self.ch_bond_length = Some(parse_value(key, value)?),
                "embedding-padding" => self.embedding_padding = Some(parse_value(key, value)?),
                "embedding-rotation-degrees" => {
                    self.embedding_rotation_degrees = Some(parse_value(key, value)?)
                }
                "working-cell-xy-factor" => {
                    self.working_cell_xy_factor = Some(parse_value(key, value)?)
                }
                "working-cell-z" => self.working_cell_z = Some(parse_value(key, value)?),
                "mode-tolerance" => self.mode_tolerance = Some(parse_value(key, value)?),
                "cell-padding" => self.cell_padding = Some(parse_value(key, value)?),
                "alignment-tolerance" => self.alignment_tolerance = Some(parse_value(key, value)?),
                "wrap-eps" => self.wrap_eps = Some(parse_value(key, value)?),
                "duplicate-distance" => self.duplicate_distance = Some(parse_value(key, value)?),
                "neighbor-skin" => self.neighbor_skin = Some(parse_value(key, value)?),
                "min-coordination" => self.min_coordination = Some(parse_value(key, value)?),
                "saturation-bond-length" => {
                    self.saturation_bond_length = Some(parse_value(key, value)?)
                }
                "explicit-hydrogens" => self.explicit_hydrogens = Some(parse_value(key, value)?),
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

    /// Builds the final configuration; values left unset take the library defaults.
    pub fn into_core_config(self) -> Result<core_config::PipelineConfig> {
        let mut builder = core_config::PipelineConfigBuilder::new();
        if let Some(v) = self.cc_equilibrium_bond {
            builder = builder.cc_equilibrium_bond(v);
        }
        if let Some(v) = self.ch_bond_length {
            builder = builder.ch_bond_length(v);
        }
        if let Some(v) = self.embedding_padding {
            builder = builder.embedding_padding(v);
        }
        if let Some(v) = self.embedding_rotation_degrees {
            builder = builder.embedding_rotation_degrees(v);
        }
        if let Some(v) = self.working_cell_xy_factor {
            builder = builder.working_cell_xy_factor(v);
        }
        if let Some(v) = self.working_cell_z {
            builder = builder.working_cell_z(v);
        }
        if let Some(v) = self.mode_tolerance {
            builder = builder.mode_tolerance(v);
        }
        if let Some(v) = self.cell_padding {
            builder = builder.cell_padding(v);
        }
        if let Some(v) = self.alignment_tolerance {
            builder = builder.alignment_tolerance(v);
        }
        if let Some(v) = self.wrap_eps {
            builder = builder.wrap_eps(v);
        }
        if let Some(v) = self.duplicate_distance {
            builder = builder.duplicate_distance(v);
        }
        if let Some(v) = self.neighbor_skin {
            builder = builder.neighbor_skin(v);
        }
        if let Some(v) = self.min_coordination {
            builder = builder.min_coordination(v);
        }
        if let Some(v) = self.saturation_bond_length {
            builder = builder.saturation_bond_length(v);
        }
        if let Some(v) = self.explicit_hydrogens {
            builder = builder.explicit_hydrogens(v);
        }
        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value
        ))
    })
}

/// Merges the config file, `-S` overrides and dedicated flags, in that order of precedence.
pub fn build_config(args: &PipelineArgs, no_hydrogens: bool) -> Result<core_config::PipelineConfig> {
    let mut partial = match &args.config {
        Some(path) => PartialPipelineConfig::from_file(path)?,
        None => PartialPipelineConfig::default(),
    };
    partial.apply_set_values(&args.set_values)?;
    if no_hydrogens {
        partial.explicit_hydrogens = Some(false);
    }
    let config = partial.into_core_config()?;
    debug!("Final pipeline configuration: {:?}", config);
    Ok(config)
}
