//! Event-stream subscription seam.
//!
//! The live session never talks to a socket directly. A [`Transport`] opens
//! a [`Connection`] and hands back a channel of [`StreamSignal`]s; [`pump`]
//! feeds those signals to a [`StreamHandler`] until it reports that it is
//! finished.

use tokio::sync::mpsc;

use crate::error::BattleError;
use crate::session::PlayRequest;

/// What a transport can report about its stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSignal {
    /// The `data` of one complete server-sent event.
    Message(String),
    /// The transport failed without a structured payload.
    Error(String),
    /// The stream ended.
    Closed,
}

pub type SignalSender = mpsc::UnboundedSender<StreamSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<StreamSignal>;

/// Consumer side of a subscription.
pub trait StreamHandler {
    fn on_message(&mut self, data: &str);
    fn on_error(&mut self, detail: &str);
    fn on_close(&mut self);

    /// Once true, [`pump`] stops delivering signals.
    fn is_finished(&self) -> bool {
        false
    }
}

/// An open server-push stream.
pub trait Connection: Send {
    /// Close the stream. Calling this more than once must be harmless.
    fn close(&mut self);
    fn is_open(&self) -> bool;
}

/// Something that can open a play stream.
pub trait Transport {
    fn open(
        &self,
        request: &PlayRequest,
    ) -> Result<(Box<dyn Connection>, SignalReceiver), BattleError>;
}

/// Deliver signals to `handler` until it finishes or the stream ends.
///
/// A dropped sender is reported as [`StreamHandler::on_close`].
pub async fn pump<H>(signals: &mut SignalReceiver, handler: &mut H)
where
    H: StreamHandler + ?Sized,
{
    while !handler.is_finished() {
        match signals.recv().await {
            Some(StreamSignal::Message(data)) => handler.on_message(&data),
            Some(StreamSignal::Error(detail)) => handler.on_error(&detail),
            Some(StreamSignal::Closed) | None => {
                handler.on_close();
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// text/event-stream decoding
// ---------------------------------------------------------------------------

/// Incremental `text/event-stream` decoder.
///
/// Bytes are buffered until a full line is available so multi-byte UTF-8
/// sequences split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the data of every event it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let decoded = String::from_utf8_lossy(&raw[..line_end]);
            let line = decoded.strip_suffix('\r').unwrap_or(&decoded[..]);

            if line.is_empty() {
                if let Some(data) = self.dispatch() {
                    events.push(data);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            if field == "data" {
                self.data_lines.push(value.to_string());
            }
            // event:, id: and retry: carry nothing the play stream uses.
        }

        events
    }

    /// Bytes still waiting for a line terminator or a blank line.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty() || !self.data_lines.is_empty()
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        if data == "[DONE]" {
            return None;
        }
        Some(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut d = SseDecoder::new();
        let events = d.feed(b"data: {\"role\":\"interrogator\"}\n\n");
        assert_eq!(events, vec![r#"{"role":"interrogator"}"#.to_string()]);
        assert!(!d.has_pending());
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut d = SseDecoder::new();
        assert!(d.feed(b"data: {\"a\":").is_empty());
        assert!(d.feed(b"1}\n").is_empty());
        assert!(d.has_pending());
        assert_eq!(d.feed(b"\n"), vec![r#"{"a":1}"#.to_string()]);
    }

    #[test]
    fn test_multibyte_split() {
        let mut d = SseDecoder::new();
        let bytes = "data: héllo\n\n".as_bytes();
        // split inside the two-byte 'é'
        let split = 8;
        assert!(d.feed(&bytes[..split]).is_empty());
        assert_eq!(d.feed(&bytes[split..]), vec!["héllo".to_string()]);
    }

    #[test]
    fn test_crlf_and_comments() {
        let mut d = SseDecoder::new();
        let events = d.feed(b": keepalive\r\nevent: message\r\ndata: x\r\n\r\n");
        assert_eq!(events, vec!["x".to_string()]);
    }

    #[test]
    fn test_multi_line_data_joined() {
        let mut d = SseDecoder::new();
        let events = d.feed(b"data: a\ndata: b\n\n");
        assert_eq!(events, vec!["a\nb".to_string()]);
    }

    #[test]
    fn test_done_ignored() {
        let mut d = SseDecoder::new();
        assert!(d.feed(b"data: [DONE]\n\n").is_empty());
    }

    #[test]
    fn test_blank_lines_without_data() {
        let mut d = SseDecoder::new();
        assert!(d.feed(b"\n\n\n").is_empty());
    }

    #[test]
    fn test_two_events_one_chunk() {
        let mut d = SseDecoder::new();
        let events = d.feed(b"data: 1\n\ndata: 2\n\n");
        assert_eq!(events, vec!["1".to_string(), "2".to_string()]);
    }

    struct Recorder {
        log: Vec<String>,
        stop_after: usize,
    }

    impl StreamHandler for Recorder {
        fn on_message(&mut self, data: &str) {
            self.log.push(format!("msg:{data}"));
        }
        fn on_error(&mut self, detail: &str) {
            self.log.push(format!("err:{detail}"));
        }
        fn on_close(&mut self) {
            self.log.push("close".into());
        }
        fn is_finished(&self) -> bool {
            self.log.len() >= self.stop_after
        }
    }

    #[tokio::test]
    async fn test_pump_stops_when_finished() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(StreamSignal::Message("a".into())).unwrap();
        tx.send(StreamSignal::Message("b".into())).unwrap();
        tx.send(StreamSignal::Message("c".into())).unwrap();
        let mut r = Recorder {
            log: vec![],
            stop_after: 2,
        };
        pump(&mut rx, &mut r).await;
        assert_eq!(r.log, vec!["msg:a", "msg:b"]);
    }

    #[tokio::test]
    async fn test_pump_dropped_sender_is_close() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(StreamSignal::Error("reset".into())).unwrap();
        drop(tx);
        let mut r = Recorder {
            log: vec![],
            stop_after: usize::MAX,
        };
        pump(&mut rx, &mut r).await;
        assert_eq!(r.log, vec!["err:reset", "close"]);
    }
}
