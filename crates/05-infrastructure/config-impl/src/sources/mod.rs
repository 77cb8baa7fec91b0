//! 内置属性源实现

mod dynamic;
mod environment;
mod map;
mod toml_source;

pub use dynamic::DynamicPropertySource;
pub use environment::{EnvironmentPropertySource, DEFAULT_ENVIRONMENT_ORDINAL};
pub use map::MapPropertySource;
pub use toml_source::{TomlPropertySource, DEFAULT_TOML_ORDINAL};
