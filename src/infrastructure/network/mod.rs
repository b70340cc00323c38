pub mod reachability_probe;
pub mod reqwest_transport;

pub use reachability_probe::{ManualLinkSignal, ReachabilityProbe};
pub use reqwest_transport::ReqwestTransport;
