use serde::{Deserialize, Serialize};

/// Connection lifecycle. `Closed` is terminal for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting { url: String },
    Connected { url: String },
    Closed { reason: String },
}

impl ConnectionState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: &ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, target),
            // From Disconnected
            (Disconnected, Connecting { .. }) |

            // From Connecting
            (Connecting { .. }, Connected { .. }) |
            (Connecting { .. }, Closed { .. }) |

            // From Connected
            (Connected { .. }, Closed { .. })
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting { .. } => "Connecting",
            Self::Connected { .. } => "Connected",
            Self::Closed { .. } => "Closed",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Disconnected
    }
}
