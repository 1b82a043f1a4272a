use serde::Deserialize;

/// One decoded unit of the server stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Response text to append to the in-flight message.
    Response(String),
    /// Auxiliary reasoning text to append to the in-flight message.
    Thinking(String),
    /// The stream has failed; the message is the server-reported reason.
    Error(String),
    /// Normal termination.
    Done,
}

#[derive(Debug, Default, Deserialize)]
struct FramePayload {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    thinking: Option<String>,
}

/// Incremental decoder for the backend's `data: `-framed stream.
///
/// Chunks arrive at arbitrary boundaries; a single buffer accumulates them
/// and complete frames are split off at the blank-line delimiter. Frames
/// without the `data: ` prefix and payloads that fail to parse are protocol
/// noise and yield nothing. Once `[DONE]` is seen the decoder is finished:
/// anything still buffered (including further complete frames) is discarded.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
    // Incomplete UTF-8 tail carried between byte chunks.
    pending: Vec<u8>,
    finished: bool,
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feeds one raw chunk and returns every event completed by it, in
    /// arrival order.
    pub fn push(&mut self, chunk: &str) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        self.buffer.push_str(chunk);

        while let Some(pos) = self.buffer.find("\n\n") {
            let frame = self.buffer[..pos].to_string();
            self.buffer.drain(..pos + 2);
            self.decode_frame(frame.trim(), &mut events);
            if self.finished {
                self.buffer.clear();
                break;
            }
        }

        events
    }

    /// Byte-chunk variant for transport streams. Chunk boundaries may fall
    /// inside a UTF-8 sequence; the incomplete tail is held back until the
    /// next chunk completes it.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.pending.extend_from_slice(chunk);
        let (text, consumed) = match std::str::from_utf8(&self.pending) {
            Ok(s) => (s.to_string(), self.pending.len()),
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                (
                    String::from_utf8_lossy(&self.pending[..valid]).into_owned(),
                    valid,
                )
            }
            Err(_) => (
                String::from_utf8_lossy(&self.pending).into_owned(),
                self.pending.len(),
            ),
        };
        self.pending.drain(..consumed);
        self.push(&text)
    }

    fn decode_frame(&mut self, frame: &str, events: &mut Vec<StreamEvent>) {
        let Some(payload) = frame.strip_prefix("data: ") else {
            return;
        };

        if payload == "[DONE]" {
            self.finished = true;
            events.push(StreamEvent::Done);
            return;
        }

        if let Some(message) = payload.strip_prefix("ERROR:") {
            events.push(StreamEvent::Error(message.trim().to_string()));
            return;
        }

        match serde_json::from_str::<FramePayload>(payload) {
            Ok(record) => {
                if let Some(thinking) = record.thinking.filter(|t| !t.is_empty()) {
                    events.push(StreamEvent::Thinking(thinking));
                }
                if let Some(token) = record.token.filter(|t| !t.is_empty()) {
                    events.push(StreamEvent::Response(token));
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Dropping malformed stream frame");
            }
        }
    }
}
