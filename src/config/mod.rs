pub mod config;

pub use config::{Config, ConnectorKind, DemoConfig, WalletConfig};
