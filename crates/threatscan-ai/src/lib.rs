//! LLM layer: chat-completions client, prompts, and the windowed classifier pipeline.

pub mod client;
pub mod copy;
pub mod pipeline;
pub mod prompts;

pub use client::{ChatClient, ChatError, LanguageModel};
pub use copy::generate_ad_copy;
pub use pipeline::{PipelineError, WindowError, classify, classify_window, predict_one};
