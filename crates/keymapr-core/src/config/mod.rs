// Keymapr Configuration
// TOML parsing into keymaps and detection preferences

mod parser;

pub use parser::{Config, ConfigError};
