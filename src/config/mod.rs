mod settings;

pub use settings::{Config, ConfigUpdate, RuntimeConfig, ServiceConfig, StorePaths};
