pub mod connector_trait;
pub mod local_connector;
pub mod rpc_connector;

pub use connector_trait::{Connection, Connector};
pub use local_connector::LocalWalletConnector;
pub use rpc_connector::RpcConnector;
