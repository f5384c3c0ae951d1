//! Connection state machine

use crate::{Error, Result};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// TCP connected, nothing negotiated yet
    Initial,

    /// TLS handshake in progress
    NegotiatingTls,

    /// `AUTH` sent, awaiting reply
    Authenticating,

    /// Ready for a command
    Ready,

    /// Command written, reply pending
    InFlight,

    /// Closed
    Closed,
}

impl ConnectionState {
    /// Check if transition is valid
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Initial, NegotiatingTls)
                | (Initial, Authenticating)
                | (Initial, Ready)
                | (NegotiatingTls, Authenticating)
                | (NegotiatingTls, Ready)
                | (Authenticating, Ready)
                | (Ready, InFlight)
                | (InFlight, Ready)
                | (_, Closed)
        )
    }

    /// Transition to new state
    pub fn transition(&mut self, next: ConnectionState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidState {
                expected: format!("valid transition from {:?}", self),
                actual: format!("{:?}", next),
            });
        }
        *self = next;
        Ok(())
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::NegotiatingTls => write!(f, "negotiating_tls"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Ready => write!(f, "ready"),
            Self::InFlight => write!(f, "in_flight"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
