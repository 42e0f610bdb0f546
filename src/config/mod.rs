//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → LrsConfig (validated, immutable)
//!     → BindTarget + server options at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a new server is built for new settings
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{CorsConfig, ListenerConfig, LrsConfig, ObservabilityConfig};
pub use validation::{validate_config, ValidationError};
