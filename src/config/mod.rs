//! Project configuration (`.shopvault.toml`).

pub mod settings;

pub use settings::Settings;
