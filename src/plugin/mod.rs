pub mod locator;
pub mod manager;
pub mod swapper;

pub use manager::PluginManager;
