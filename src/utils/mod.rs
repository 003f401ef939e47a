pub mod config;
pub mod exclusions;
pub mod logger;
pub(crate) mod settings_toml;

pub use config::*;
pub use exclusions::{ExclusionList, ExclusionPattern};
pub use logger::{Colors, setup_logging};
