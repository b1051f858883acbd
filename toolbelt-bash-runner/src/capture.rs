//! Background capture of a child's stdout/stderr pipes.
//!
//! Each stream is scanned for a completion marker as bytes arrive, so the
//! session never re-reads what it has already seen. Retained output is
//! capped; anything past the cap is only counted.

use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

/// Longest exit status accepted after a marker token.
const MAX_STATUS_DIGITS: usize = 11;

/// Marker seen on a stream: the token, optional status digits, and a newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub exit_code: Option<i32>,
}

/// Output retained for one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub text: String,
    /// Characters discarded once the retention cap was reached.
    pub dropped_chars: usize,
}

#[derive(Debug)]
struct CaptureState {
    retained: Vec<u8>,
    limit: usize,
    dropped_chars: usize,
    marker: Option<Vec<u8>>,
    /// Unscanned bytes that may be the start of a marker.
    pending: Vec<u8>,
    completion: Option<Completion>,
}

enum Tail {
    Complete(Option<i32>),
    Incomplete,
    NotMarker,
}

impl CaptureState {
    fn keep(&mut self, bytes: &[u8]) {
        let room = self.limit.saturating_sub(self.retained.len()).min(bytes.len());
        let (kept, rest) = bytes.split_at(room);
        self.retained.extend_from_slice(kept);
        self.dropped_chars += char_count(rest);
    }

    fn ingest(&mut self, chunk: &[u8]) {
        // Bytes after the marker belong to no command.
        if self.completion.is_some() {
            return;
        }
        let Some(marker) = self.marker.clone() else {
            self.keep(chunk);
            return;
        };

        let mut pending = std::mem::take(&mut self.pending);
        pending.extend_from_slice(chunk);
        let mut start = 0;
        loop {
            let window = &pending[start..];
            let Some(at) = find(window, &marker) else {
                let safe = window.len().saturating_sub(marker.len().saturating_sub(1));
                self.keep(&window[..safe]);
                start += safe;
                break;
            };
            match parse_tail(&window[at + marker.len()..]) {
                Tail::Complete(exit_code) => {
                    self.keep(&window[..at]);
                    self.completion = Some(Completion { exit_code });
                    start = pending.len();
                    break;
                }
                Tail::Incomplete => {
                    self.keep(&window[..at]);
                    start += at;
                    break;
                }
                Tail::NotMarker => {
                    let skip = at + marker.len();
                    self.keep(&window[..skip]);
                    start += skip;
                }
            }
        }
        pending.drain(..start);
        self.pending = pending;
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_tail(after: &[u8]) -> Tail {
    for (index, byte) in after.iter().enumerate() {
        match byte {
            b'\n' if index == 0 => return Tail::Complete(None),
            b'\n' => {
                return std::str::from_utf8(&after[..index])
                    .ok()
                    .and_then(|digits| digits.parse::<i32>().ok())
                    .map_or(Tail::NotMarker, |code| Tail::Complete(Some(code)));
            }
            b'0'..=b'9' if index < MAX_STATUS_DIGITS => {}
            _ => return Tail::NotMarker,
        }
    }
    Tail::Incomplete
}

/// Characters in UTF-8 `bytes`, counting each non-continuation byte.
fn char_count(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&byte| byte & 0xC0 != 0x80).count()
}

/// One output stream of the shell.
///
/// A reader task feeds the buffer; the session arms it with a fresh token
/// before each command and polls [`OutputBuffer::completion`].
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    state: Arc<Mutex<CaptureState>>,
    closed: Arc<AtomicBool>,
}

impl OutputBuffer {
    /// Buffer retaining at most `limit` bytes per command.
    pub fn new(limit: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CaptureState {
                retained: Vec::new(),
                limit,
                dropped_chars: 0,
                marker: None,
                pending: Vec::new(),
                completion: None,
            })),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a task that copies `reader` into this buffer until EOF.
    pub fn spawn_reader<R>(&self, mut reader: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = self.clone();
        tokio::spawn(async move {
            let mut chunk = vec![0u8; 8_192];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => buffer.ingest(&chunk[..n]),
                    Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
            buffer.closed.store(true, Ordering::SeqCst);
        })
    }

    /// Forget earlier output and watch for `token` from now on.
    pub fn arm(&self, token: &str) {
        let mut state = self.state.lock();
        state.retained.clear();
        state.dropped_chars = 0;
        state.pending.clear();
        state.completion = None;
        state.marker = Some(token.as_bytes().to_vec());
    }

    pub fn ingest(&self, chunk: &[u8]) {
        self.state.lock().ingest(chunk);
    }

    /// Set once the first marker line after [`OutputBuffer::arm`] arrived.
    pub fn completion(&self) -> Option<Completion> {
        self.state.lock().completion
    }

    /// Remove and return the output retained so far (marker excluded).
    pub fn take(&self) -> Captured {
        let mut state = self.state.lock();
        let bytes = std::mem::take(&mut state.retained);
        Captured {
            text: String::from_utf8_lossy(&bytes).into_owned(),
            dropped_chars: std::mem::take(&mut state.dropped_chars),
        }
    }

    /// True once the writing end reached EOF (the process closed the pipe).
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TOKEN: &str = "__DONE__";

    fn armed(limit: usize) -> OutputBuffer {
        let buffer = OutputBuffer::new(limit);
        buffer.arm(TOKEN);
        buffer
    }

    #[tokio::test]
    async fn reader_fills_and_closes() {
        let buffer = armed(1_024);
        let handle = buffer.spawn_reader(&b"hello\nworld\n__DONE__0\n"[..]);
        handle.await.ok();

        assert!(buffer.is_closed());
        assert_eq!(buffer.completion(), Some(Completion { exit_code: Some(0) }));
        assert_eq!(buffer.take().text, "hello\nworld\n");
        assert_eq!(buffer.take().text, "");
    }

    #[test]
    fn bytes_after_marker_are_ignored() {
        let buffer = armed(1_024);
        buffer.ingest(b"fg\n__DONE__0\nlate\n");
        buffer.ingest(b"later still\n");

        assert_eq!(buffer.completion(), Some(Completion { exit_code: Some(0) }));
        assert_eq!(buffer.take().text, "fg\n");
    }

    #[test]
    fn marker_split_across_chunks() {
        let stream = b"out\n__DONE__127\n";
        for split in 0..=stream.len() {
            let buffer = armed(1_024);
            let (first, second) = stream.split_at(split);
            buffer.ingest(first);
            if split < stream.len() {
                assert_eq!(buffer.completion(), None, "split at {split}");
            }
            buffer.ingest(second);
            assert_eq!(
                buffer.completion(),
                Some(Completion { exit_code: Some(127) }),
                "split at {split}"
            );
            assert_eq!(buffer.take().text, "out\n");
        }
    }

    #[test]
    fn marker_without_status_completes() {
        let buffer = armed(1_024);
        buffer.ingest(b"oops__DONE__\n");
        assert_eq!(buffer.completion(), Some(Completion { exit_code: None }));
        assert_eq!(buffer.take().text, "oops");
    }

    #[test]
    fn token_inside_text_is_not_a_marker() {
        let buffer = armed(1_024);
        buffer.ingest(b"__DONE__ appears here\n__DONE__x\n");
        assert_eq!(buffer.completion(), None);
        buffer.ingest(b"__DONE__3\n");
        assert_eq!(buffer.completion(), Some(Completion { exit_code: Some(3) }));
        assert_eq!(buffer.take().text, "__DONE__ appears here\n__DONE__x\n");
    }

    #[test]
    fn retention_is_capped_and_counted() {
        let buffer = armed(10);
        buffer.ingest(&[b'a'; 100]);
        buffer.ingest("é\n__DONE__0\n".as_bytes());

        let captured = buffer.take();
        assert_eq!(captured.text, "a".repeat(10));
        assert_eq!(captured.dropped_chars, 92);
        assert!(buffer.state.lock().pending.is_empty());
    }

    #[test]
    fn arming_resets_previous_command() {
        let buffer = armed(1_024);
        buffer.ingest(b"one\n__DONE__0\n");
        buffer.arm("__NEXT__");
        assert_eq!(buffer.completion(), None);
        buffer.ingest(b"two\n__NEXT__1\n");
        assert_eq!(buffer.completion(), Some(Completion { exit_code: Some(1) }));
        assert_eq!(buffer.take().text, "two\n");
    }
}
