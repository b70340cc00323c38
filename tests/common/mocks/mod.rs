pub mod mock_network;
pub mod mock_session;
pub mod mock_store;
pub mod mock_transport;

pub use mock_network::*;
pub use mock_session::*;
pub use mock_store::*;
pub use mock_transport::*;
