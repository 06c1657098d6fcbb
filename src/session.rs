use crate::{
    address::Address,
    contracts::Contracts,
};

/// A connected account together with the handles bound for it.
#[derive(Clone)]
pub struct Session {
    pub account: Address,
    pub network: String,
    pub contracts: Contracts,
}

/// ```text
/// Disconnected --connect/silent accounts--> Connecting --bound--> Connected
///      ^                                        |                    |
///      +-------------- failure -----------------+      provider event |
///      +------------------ bootstrap done <---- Rebinding <-----------+
/// ```
#[derive(Clone, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(Session),
    Rebinding,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    Connected,
    Rebinding,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Disconnected => SessionPhase::Disconnected,
            SessionState::Connecting => SessionPhase::Connecting,
            SessionState::Connected(_) => SessionPhase::Connected,
            SessionState::Rebinding => SessionPhase::Rebinding,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Connected(session) => Some(session),
            _ => None,
        }
    }

    pub fn account(&self) -> Option<Address> {
        self.session().map(|session| session.account)
    }
}
