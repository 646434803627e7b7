mod blocking;
mod client;
mod types;

pub use blocking::{BlockingEngine, BlockingProvider};
pub use client::{InferenceProvider, OpenAiProvider};
pub use types::*;
