pub mod input;
pub mod transcript;

pub use input::{InputAction, InputWidget};
pub use transcript::{ChatWidget, ScrollState, TranscriptView};
