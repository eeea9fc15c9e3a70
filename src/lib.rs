pub mod address;
pub mod auth;
pub mod config;
pub mod contact;
pub mod dlc;
pub mod join;
pub mod message;
pub mod observable;
pub mod offer;
pub mod oracle_explorer;
pub mod orchestrator;
pub mod poller;
pub mod server_client;
pub mod state;
pub mod types;
pub mod wallet;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use message::{MessageType, ServerMessage};
pub use observable::{Observable, Subscription};
pub use orchestrator::{InitError, InitPhase, WalletContext};
pub use server_client::{ClientError, HttpServerClient, ServerTransport};
pub use types::ServerResponse;
