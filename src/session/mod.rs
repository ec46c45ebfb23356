//! Session: connection lifecycle for the one active wallet

mod manager;
mod state;

pub use manager::{ActiveHandle, ReconnectOutcome, SessionManager};
pub use state::{ConnectionStatus, ErrorNotice, HandleToken, SessionSnapshot};
