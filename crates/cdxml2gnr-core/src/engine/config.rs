use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CC_EQUILIBRIUM_BOND: f64 = 1.4313333333;
pub const DEFAULT_CH_BOND_LENGTH: f64 = 1.09;
pub const DEFAULT_EMBEDDING_PADDING: f64 = 10.0;
pub const DEFAULT_EMBEDDING_ROTATION_DEGREES: f64 = -90.0;
pub const DEFAULT_WORKING_CELL_XY_FACTOR: f64 = 1.5;
pub const DEFAULT_WORKING_CELL_Z: f64 = 15.0;
pub const DEFAULT_MODE_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_CELL_PADDING: f64 = 15.0;
pub const DEFAULT_ALIGNMENT_TOLERANCE: f64 = 0.01;
pub const DEFAULT_WRAP_EPS: f64 = 0.001;
pub const DEFAULT_DUPLICATE_DISTANCE: f64 = 0.4;
pub const DEFAULT_NEIGHBOR_SKIN: f64 = 0.3;
pub const DEFAULT_MIN_COORDINATION: usize = 3;
pub const DEFAULT_SATURATION_BOND_LENGTH: f64 = 1.1;
pub const DEFAULT_EXPLICIT_HYDROGENS: bool = true;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
    #[error("Failed to read configuration file: {0}")]
    Io(String),
}

/// Heuristic constants of the reconstruction pipeline.
///
/// Lengths are in Angstroms except where they apply to raw sketch coordinates
/// (the embedding padding and the working cell), which are in document units.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PipelineConfig {
    /// Target C-C distance the most common nearest-neighbor distance is scaled to.
    pub cc_equilibrium_bond: f64,
    /// C-H length; its ratio to `cc_equilibrium_bond` sets sketch-space H distances.
    pub ch_bond_length: f64,
    pub embedding_padding: f64,
    pub embedding_rotation_degrees: f64,
    pub working_cell_xy_factor: f64,
    pub working_cell_z: f64,
    /// Distances closer than this are counted as the same value when taking the mode.
    pub mode_tolerance: f64,
    pub cell_padding: f64,
    /// Misalignment (radians) below which a periodic cell is cut without rotating.
    pub alignment_tolerance: f64,
    pub wrap_eps: f64,
    /// Periodic images closer than this are duplicates.
    pub duplicate_distance: f64,
    /// Added to each covalent radius to form the bonding cutoff.
    pub neighbor_skin: f64,
    /// Carbon and nitrogen atoms with fewer neighbors than this receive a hydrogen.
    pub min_coordination: usize,
    pub saturation_bond_length: f64,
    /// Turn implicit hydrogens into atoms when a molecule is selected.
    pub explicit_hydrogens: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cc_equilibrium_bond: DEFAULT_CC_EQUILIBRIUM_BOND,
            ch_bond_length: DEFAULT_CH_BOND_LENGTH,
            embedding_padding: DEFAULT_EMBEDDING_PADDING,
            embedding_rotation_degrees: DEFAULT_EMBEDDING_ROTATION_DEGREES,
            working_cell_xy_factor: DEFAULT_WORKING_CELL_XY_FACTOR,
            working_cell_z: DEFAULT_WORKING_CELL_Z,
            mode_tolerance: DEFAULT_MODE_TOLERANCE,
            cell_padding: DEFAULT_CELL_PADDING,
            alignment_tolerance: DEFAULT_ALIGNMENT_TOLERANCE,
            wrap_eps: DEFAULT_WRAP_EPS,
            duplicate_distance: DEFAULT_DUPLICATE_DISTANCE,
            neighbor_skin: DEFAULT_NEIGHBOR_SKIN,
            min_coordination: DEFAULT_MIN_COORDINATION,
            saturation_bond_length: DEFAULT_SATURATION_BOND_LENGTH,
            explicit_hydrogens: DEFAULT_EXPLICIT_HYDROGENS,
        }
    }
}

impl PipelineConfig {
    /// Parses a (possibly partial) TOML document; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys, and
    /// [`ConfigError::InvalidValue`] if a value fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// errors of [`PipelineConfig::from_toml_str`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Sketch-space H bond length as a fraction of the sketch C-C bond length.
    pub fn hydrogen_length_ratio(&self) -> f64 {
        self.ch_bond_length / self.cc_equilibrium_bond
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("cc-equilibrium-bond", self.cc_equilibrium_bond),
            ("ch-bond-length", self.ch_bond_length),
            ("working-cell-xy-factor", self.working_cell_xy_factor),
            ("working-cell-z", self.working_cell_z),
            ("duplicate-distance", self.duplicate_distance),
            ("saturation-bond-length", self.saturation_bond_length),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: format!("must be a positive number, got {value}"),
                });
            }
        }

        let non_negative = [
            ("embedding-padding", self.embedding_padding),
            ("mode-tolerance", self.mode_tolerance),
            ("cell-padding", self.cell_padding),
            ("alignment-tolerance", self.alignment_tolerance),
            ("wrap-eps", self.wrap_eps),
            ("neighbor-skin", self.neighbor_skin),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: format!("must be a non-negative number, got {value}"),
                });
            }
        }

        if !self.embedding_rotation_degrees.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "embedding-rotation-degrees",
                reason: "must be finite".to_string(),
            });
        }
        if self.wrap_eps >= 1.0 {
            return Err(ConfigError::InvalidValue {
                name: "wrap-eps",
                reason: format!("must be below 1, got {}", self.wrap_eps),
            });
        }
        if self.min_coordination == 0 {
            return Err(ConfigError::InvalidValue {
                name: "min-coordination",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct PipelineConfigBuilder {
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

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cc_equilibrium_bond(mut self, length: f64) -> Self {
        self.cc_equilibrium_bond = Some(length);
        self
    }
    pub fn ch_bond_length(mut self, length: f64) -> Self {
        self.ch_bond_length = Some(length);
        self
    }
    pub fn embedding_padding(mut self, padding: f64) -> Self {
        self.embedding_padding = Some(padding);
        self
    }
    pub fn embedding_rotation_degrees(mut self, degrees: f64) -> Self {
        self.embedding_rotation_degrees = Some(degrees);
        self
    }
    pub fn working_cell_xy_factor(mut self, factor: f64) -> Self {
        self.working_cell_xy_factor = Some(factor);
        self
    }
    pub fn working_cell_z(mut self, length: f64) -> Self {
        self.working_cell_z = Some(length);
        self
    }
    pub fn mode_tolerance(mut self, tolerance: f64) -> Self {
        self.mode_tolerance = Some(tolerance);
        self
    }
    pub fn cell_padding(mut self, padding: f64) -> Self {
        self.cell_padding = Some(padding);
        self
    }
    pub fn alignment_tolerance(mut self, radians: f64) -> Self {
        self.alignment_tolerance = Some(radians);
        self
    }
    pub fn wrap_eps(mut self, eps: f64) -> Self {
        self.wrap_eps = Some(eps);
        self
    }
    pub fn duplicate_distance(mut self, distance: f64) -> Self {
        self.duplicate_distance = Some(distance);
        self
    }
    pub fn neighbor_skin(mut self, skin: f64) -> Self {
        self.neighbor_skin = Some(skin);
        self
    }
    pub fn min_coordination(mut self, n: usize) -> Self {
        self.min_coordination = Some(n);
        self
    }
    pub fn saturation_bond_length(mut self, length: f64) -> Self {
        self.saturation_bond_length = Some(length);
        self
    }
    pub fn explicit_hydrogens(mut self, enabled: bool) -> Self {
        self.explicit_hydrogens = Some(enabled);
        self
    }

    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            cc_equilibrium_bond: self.cc_equilibrium_bond.unwrap_or(defaults.cc_equilibrium_bond),
            ch_bond_length: self.ch_bond_length.unwrap_or(defaults.ch_bond_length),
            embedding_padding: self.embedding_padding.unwrap_or(defaults.embedding_padding),
            embedding_rotation_degrees: self
                .embedding_rotation_degrees
                .unwrap_or(defaults.embedding_rotation_degrees),
            working_cell_xy_factor: self
                .working_cell_xy_factor
                .unwrap_or(defaults.working_cell_xy_factor),
            working_cell_z: self.working_cell_z.unwrap_or(defaults.working_cell_z),
            mode_tolerance: self.mode_tolerance.unwrap_or(defaults.mode_tolerance),
            cell_padding: self.cell_padding.unwrap_or(defaults.cell_padding),
            alignment_tolerance: self.alignment_tolerance.unwrap_or(defaults.alignment_tolerance),
            wrap_eps: self.wrap_eps.unwrap_or(defaults.wrap_eps),
            duplicate_distance: self.duplicate_distance.unwrap_or(defaults.duplicate_distance),
            neighbor_skin: self.neighbor_skin.unwrap_or(defaults.neighbor_skin),
            min_coordination: self.min_coordination.unwrap_or(defaults.min_coordination),
            saturation_bond_length: self
                .saturation_bond_length
                .unwrap_or(defaults.saturation_bond_length),
            explicit_hydrogens: self.explicit_hydrogens.unwrap_or(defaults.explicit_hydrogens),
        };
        config.validate()?;
        Ok(config)
    }
}
