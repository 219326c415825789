pub mod env;
pub mod ident;
pub mod outcome;
pub mod phase;
pub mod settings;

pub use env::{missing_variables, BootstrapRequest, ConfigError, EnvSource, ProcessEnv};
pub use ident::{IdentError, SqlIdent};
pub use outcome::{BootstrapResult, OverallStatus, PhaseOutcome};
pub use phase::Phase;
pub use settings::Settings;
