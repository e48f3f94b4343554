pub mod generator;
pub mod provider;

pub use generator::{DraftContext, DraftGenerator, GeneratorSettings, MAX_POST_CHARS};
pub use provider::{ChatMessage, CompletionProvider, CompletionRequest, OpenAiProvider};
