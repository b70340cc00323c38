use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    Offline,
    /// Associated with a network that has no upstream path.
    LimitedConnectivity,
    Online,
}

impl ConnectivityState {
    pub fn is_online(&self) -> bool {
        matches!(self, ConnectivityState::Online)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityState::Offline => "offline",
            ConnectivityState::LimitedConnectivity => "limited_connectivity",
            ConnectivityState::Online => "online",
        }
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
