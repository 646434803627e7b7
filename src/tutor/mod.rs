mod chunker;
mod prompt;

pub use chunker::{WordChunks, pseudo_stream};
pub use prompt::*;
