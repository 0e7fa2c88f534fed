//! Solver configuration.
use serde::Deserialize;
use thiserror::Error;

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{option}: value {value} is outside the allowed range {range}")]
    OutOfRange {
        option: &'static str,
        value: f64,
        range: &'static str,
    },
}

/// Initial polarity selection strategy.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PolarityMode {
    /// Always branch on the positive literal.
    True,
    /// Always branch on the negative literal.
    False,
    /// Pick a random polarity at each decision.
    Rnd,
    /// Jeroslow-Wang seeded polarities with phase saving.
    Auto,
}

/// Accepts the strings `true`, `false`, `rnd` and `auto`, as well as plain
/// booleans, since `polarity_mode=true` parses as a boolean in TOML.
impl<'de> serde::Deserialize<'de> for PolarityMode {
    fn deserialize<D>(deserializer: D) -> Result<PolarityMode, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ModeVisitor;

        impl<'de> serde::de::Visitor<'de> for ModeVisitor {
            type Value = PolarityMode;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("one of \"true\", \"false\", \"rnd\", \"auto\"")
            }

            fn visit_bool<E>(self, value: bool) -> Result<PolarityMode, E>
            where
                E: serde::de::Error,
            {
                Ok(if value {
                    PolarityMode::True
                } else {
                    PolarityMode::False
                })
            }

            fn visit_str<E>(self, value: &str) -> Result<PolarityMode, E>
            where
                E: serde::de::Error,
            {
                match value {
                    "true" => Ok(PolarityMode::True),
                    "false" => Ok(PolarityMode::False),
                    "rnd" => Ok(PolarityMode::Rnd),
                    "auto" => Ok(PolarityMode::Auto),
                    _ => Err(E::invalid_value(serde::de::Unexpected::Str(value), &self)),
                }
            }
        }

        deserializer.deserialize_any(ModeVisitor)
    }
}

/// Restart policy selection.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartMode {
    /// Sample glue statistics first, then commit to static or dynamic.
    Auto,
    /// Luby sequence scaled by `restart_scale`.
    Static,
    /// Restart when the short-term glue average overtakes the long-run one.
    Dynamic,
}

/// Configurable parameters used during solving.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Initial polarity selection strategy. (Default: auto)
    pub polarity_mode: PolarityMode,

    /// Probability of picking a random branch variable at a decision. (Default: 0.02)
    pub random_var_freq: f64,

    /// Seed for the decision RNG, 0 selects the built-in default seed. (Default: 0)
    pub seed: u64,

    /// Pick uniformly among the top-K active variables when branching, 0 disables. (Default: 0)
    pub restrict_pick_branch: usize,

    /// Multiplicative decay for the VSIDS decision heuristic. (Default: 0.95)
    pub vsids_decay: f32,

    /// Multiplicative decay for clause activities. (Default: 0.999)
    pub clause_activity_decay: f32,

    /// Restart policy. (Default: auto)
    pub restart_mode: RestartMode,

    /// Scaling factor for Luby sequence based restarts, in conflicts. (Default: 128)
    pub restart_scale: u64,

    /// Dynamic restarts trigger when the short-term glue average exceeds the
    /// long-run average times this margin. (Default: 1.25)
    pub dynamic_restart_margin: f64,

    /// Conflicts sampled before the auto restart mode commits. (Default: 4096)
    pub auto_restart_sample_conflicts: u64,

    /// Cap on the number of restarts, 0 means unlimited. (Default: 0)
    pub max_restarts: u64,

    /// Cap on the number of conflicts, 0 means unlimited. (Default: 0)
    pub max_conflicts: u64,

    /// Number of conflicts between learnt clause database reductions. (Default: 15000)
    pub reduce_interval: u64,

    /// Increase of the reduction interval after each reduction. (Default: 300)
    pub reduce_interval_inc: u64,

    /// Learnt clauses born with a glue above this are transient and get
    /// discarded at the next backjump below their installation level, 0
    /// disables. (Default: 0)
    pub max_glue: usize,

    /// Remove redundant literals from learnt clauses. (Default: true)
    pub minimize_learnt: bool,

    /// Use recursive instead of local learnt clause minimization. (Default: true)
    pub minimize_recursive: bool,

    /// Number of conflicts before the first simplification episode. (Default: 8000)
    pub simplify_interval: u64,

    /// Growth factor of the simplification interval after each episode. (Default: 1.5)
    pub simplify_interval_mult: f64,

    /// Number of models to enumerate before stopping. (Default: 1)
    pub max_solutions: usize,

    /// Run Gaussian elimination at decision levels up to this depth, 0
    /// disables the matrix engine. (Default: 0)
    pub gauss_decision_until: usize,

    /// Order matrix columns by variable occurrence count to reduce fill-in. (Default: true)
    pub gauss_order_cols: bool,

    /// Re-run elimination to a fixpoint instead of a single pass. (Default: true)
    pub gauss_iterative_reduce: bool,

    /// Matrices with more rows than this are excluded from elimination. (Default: 1000)
    pub gauss_max_matrix_rows: usize,

    /// Matrices with fewer rows than this are excluded from elimination. (Default: 3)
    pub gauss_min_matrix_rows: usize,

    /// Snapshot the matrix state every nth decision level. (Default: 2)
    pub gauss_save_every_nth: usize,

    /// Maximum number of matrices kept for elimination. (Default: 3)
    pub gauss_max_num_matrixes: usize,

    /// Put all XOR constraints into a single matrix instead of splitting by
    /// connected components. (Default: false)
    pub gauss_no_matrix_find: bool,

    /// Keep running elimination on matrices that stopped producing
    /// propagations. (Default: false)
    pub gauss_dont_disable: bool,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            polarity_mode: PolarityMode::Auto,
            random_var_freq: 0.02,
            seed: 0,
            restrict_pick_branch: 0,
            vsids_decay: 0.95,
            clause_activity_decay: 0.999,
            restart_mode: RestartMode::Auto,
            restart_scale: 128,
            dynamic_restart_margin: 1.25,
            auto_restart_sample_conflicts: 4096,
            max_restarts: 0,
            max_conflicts: 0,
            reduce_interval: 15000,
            reduce_interval_inc: 300,
            max_glue: 0,
            minimize_learnt: true,
            minimize_recursive: true,
            simplify_interval: 8000,
            simplify_interval_mult: 1.5,
            max_solutions: 1,
            gauss_decision_until: 0,
            gauss_order_cols: true,
            gauss_iterative_reduce: true,
            gauss_max_matrix_rows: 1000,
            gauss_min_matrix_rows: 3,
            gauss_save_every_nth: 2,
            gauss_max_num_matrixes: 3,
            gauss_no_matrix_find: false,
            gauss_dont_disable: false,
        }
    }
}

impl SolverConfig {
    /// Check all values for their allowed ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.random_var_freq >= 0.0 && self.random_var_freq <= 1.0) {
            return Err(ConfigError::OutOfRange {
                option: "random_var_freq",
                value: self.random_var_freq,
                range: "[0, 1]",
            });
        }
        for &(option, value) in &[
            ("vsids_decay", self.vsids_decay),
            ("clause_activity_decay", self.clause_activity_decay),
        ] {
            if !(value < 1.0 && value > 1.0 / 16.0) {
                return Err(ConfigError::OutOfRange {
                    option,
                    value: value as f64,
                    range: "(1/16, 1)",
                });
            }
        }
        if !(self.dynamic_restart_margin >= 1.0) {
            return Err(ConfigError::OutOfRange {
                option: "dynamic_restart_margin",
                value: self.dynamic_restart_margin,
                range: "[1, ∞)",
            });
        }
        if !(self.simplify_interval_mult >= 1.0) {
            return Err(ConfigError::OutOfRange {
                option: "simplify_interval_mult",
                value: self.simplify_interval_mult,
                range: "[1, ∞)",
            });
        }
        if self.gauss_save_every_nth == 0 {
            return Err(ConfigError::OutOfRange {
                option: "gauss_save_every_nth",
                value: 0.0,
                range: "[1, ∞)",
            });
        }
        if self.max_solutions == 0 {
            return Err(ConfigError::OutOfRange {
                option: "max_solutions",
                value: 0.0,
                range: "[1, ∞)",
            });
        }
        Ok(())
    }

    /// Apply an update to this configuration.
    pub fn merge(&mut self, update: &SolverConfigUpdate) {
        macro_rules! merge_fields {
            ( $( $field:ident ),* $(,)? ) => {
                $(
                    if let Some(value) = update.$field {
                        self.$field = value;
                    }
                )*
            };
        }
        merge_fields!(
            polarity_mode,
            random_var_freq,
            seed,
            restrict_pick_branch,
            vsids_decay,
            clause_activity_decay,
            restart_mode,
            restart_scale,
            dynamic_restart_margin,
            auto_restart_sample_conflicts,
            max_restarts,
            max_conflicts,
            reduce_interval,
            reduce_interval_inc,
            max_glue,
            minimize_learnt,
            minimize_recursive,
            simplify_interval,
            simplify_interval_mult,
            max_solutions,
            gauss_decision_until,
            gauss_order_cols,
            gauss_iterative_reduce,
            gauss_max_matrix_rows,
            gauss_min_matrix_rows,
            gauss_save_every_nth,
            gauss_max_num_matrixes,
            gauss_no_matrix_find,
            gauss_dont_disable,
        );
    }
}

/// A partial solver configuration.
///
/// Every field mirrors a [`SolverConfig`] field; absent fields leave the
/// current value unchanged. This deserializes from TOML fragments, so both a
/// configuration file and single `key=value` command line options can be
/// merged into the active configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfigUpdate {
    pub polarity_mode: Option<PolarityMode>,
    pub random_var_freq: Option<f64>,
    pub seed: Option<u64>,
    pub restrict_pick_branch: Option<usize>,
    pub vsids_decay: Option<f32>,
    pub clause_activity_decay: Option<f32>,
    pub restart_mode: Option<RestartMode>,
    pub restart_scale: Option<u64>,
    pub dynamic_restart_margin: Option<f64>,
    pub auto_restart_sample_conflicts: Option<u64>,
    pub max_restarts: Option<u64>,
    pub max_conflicts: Option<u64>,
    pub reduce_interval: Option<u64>,
    pub reduce_interval_inc: Option<u64>,
    pub max_glue: Option<usize>,
    pub minimize_learnt: Option<bool>,
    pub minimize_recursive: Option<bool>,
    pub simplify_interval: Option<u64>,
    pub simplify_interval_mult: Option<f64>,
    pub max_solutions: Option<usize>,
    pub gauss_decision_until: Option<usize>,
    pub gauss_order_cols: Option<bool>,
    pub gauss_iterative_reduce: Option<bool>,
    pub gauss_max_matrix_rows: Option<usize>,
    pub gauss_min_matrix_rows: Option<usize>,
    pub gauss_save_every_nth: Option<usize>,
    pub gauss_max_num_matrixes: Option<usize>,
    pub gauss_no_matrix_find: Option<bool>,
    pub gauss_dont_disable: Option<bool>,
}

impl SolverConfigUpdate {
    /// Create an empty update.
    pub fn new() -> SolverConfigUpdate {
        SolverConfigUpdate::default()
    }

    /// Overlay another update on top of this one.
    pub fn merge(&mut self, other: SolverConfigUpdate) {
        macro_rules! merge_fields {
            ( $( $field:ident ),* $(,)? ) => {
                $(
                    if let Some(value) = other.$field {
                        self.$field = Some(value);
                    }
                )*
            };
        }
        merge_fields!(
            polarity_mode,
            random_var_freq,
            seed,
            restrict_pick_branch,
            vsids_decay,
            clause_activity_decay,
            restart_mode,
            restart_scale,
            dynamic_restart_margin,
            auto_restart_sample_conflicts,
            max_restarts,
            max_conflicts,
            reduce_interval,
            reduce_interval_inc,
            max_glue,
            minimize_learnt,
            minimize_recursive,
            simplify_interval,
            simplify_interval_mult,
            max_solutions,
            gauss_decision_until,
            gauss_order_cols,
            gauss_iterative_reduce,
            gauss_max_matrix_rows,
            gauss_min_matrix_rows,
            gauss_save_every_nth,
            gauss_max_num_matrixes,
            gauss_no_matrix_find,
            gauss_dont_disable,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        SolverConfig::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut config = SolverConfig::default();
        config.random_var_freq = 1.5;
        assert!(config.validate().is_err());

        let mut config = SolverConfig::default();
        config.vsids_decay = 1.0;
        assert!(config.validate().is_err());

        let mut config = SolverConfig::default();
        config.max_solutions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn merge_overrides_only_present_fields() {
        let mut config = SolverConfig::default();
        let mut update = SolverConfigUpdate::new();
        update.seed = Some(42);
        update.restart_mode = Some(RestartMode::Static);
        config.merge(&update);

        assert_eq!(config.seed, 42);
        assert_eq!(config.restart_mode, RestartMode::Static);
        assert_eq!(config.random_var_freq, SolverConfig::default().random_var_freq);
    }
}
