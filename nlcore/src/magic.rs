/// Name of the environment variable containing the path to the compiler configuration file.
/// If not set, defaults to
///  (1) on Linux and macOS: `$XDG_CONFIG_HOME/nlinstr/config.toml` or `$HOME/.config/nlinstr/config.toml`
///  (2) on Windows: `%APPDATA%\nlinstr\config.toml`
pub const ENV_CONFIG_PATH: &str = "NLINSTR_CONFIG_PATH";

/// Directory and file name of the configuration below the platform config directory.
pub const CONFIG_DIR_NAME: &str = "nlinstr";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Name prefix of emitted nonlinear constraints, followed by the constraint index.
pub const CONSTRAINT_NAME_PREFIX: &str = "NonlinearExp";

/// Name prefix of emitted nonlinear objective constraints, followed by the objective index.
pub const OBJECTIVE_NAME_PREFIX: &str = "NonlinearObj";

/// Name of the auxiliary variable carrying a nonlinear objective.
pub const OBJECTIVE_AUX_NAME: &str = "nlobj";

/// Tolerance used when neither the configuration nor the problem provides one.
pub const DEFAULT_FEASIBILITY_TOLERANCE: f64 = 1e-6;
