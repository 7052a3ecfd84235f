//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatekeeperConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On file change:
//!     watcher.rs detects change (unchanged saves dropped)
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps gate rules atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Gate rules (route patterns, sign-in target, lookup timeout) are
//!   hot-reloaded; other sections need a restart and are logged as such

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, AuthConfig, GatekeeperConfig, ListenerConfig, ObservabilityConfig,
    RoutesConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::ValidationError;
