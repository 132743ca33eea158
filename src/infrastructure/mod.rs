pub mod connector;
pub mod provider;
