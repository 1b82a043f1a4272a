pub mod decoder;
pub mod error;
pub mod session;
pub mod transcript;

pub use decoder::{FrameDecoder, StreamEvent};
pub use error::{ChatError, Result};
pub use session::{
    ByteStream, CancelHandle, ChatTransport, GenerationParams, GenerationSession, SessionOutcome,
};
pub use transcript::{Message, Role, Transcript, TranscriptChange};
