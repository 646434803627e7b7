pub mod accelerator;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod events;
pub mod hub;
pub mod inference;
pub mod model_state;
pub mod orchestrator;
pub mod server;
pub mod session;
pub mod tutor;
pub mod vision;

pub use error::{Error, Result};
