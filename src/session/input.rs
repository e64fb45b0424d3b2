//! Blocking input on a dedicated thread.
//!
//! `tokio::io::stdin()` reads on the runtime's blocking pool, and a runtime
//! cannot shut down while one of those reads is still waiting for a line.
//! [`ThreadReader`] does the blocking reads on its own OS thread instead and
//! hands the bytes over a channel, so the runtime can always be dropped.

use bytes::Bytes;
use std::io::{self, Read};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;
use tracing::trace;

/// Size of each blocking read
const CHUNK_SIZE: usize = 8 * 1024;

/// Chunks buffered between the reader thread and the session
const CHANNEL_CAPACITY: usize = 16;

/// An [`AsyncRead`] fed by a blocking reader running on its own thread.
#[derive(Debug)]
pub struct ThreadReader {
    chunks: mpsc::Receiver<io::Result<Bytes>>,
    pending: Bytes,
}

impl ThreadReader {
    /// Starts a thread that reads `reader` until EOF or an error.
    ///
    /// The thread is detached. It stops after EOF, after a read error, or
    /// on its next read once this `ThreadReader` is dropped.
    pub fn spawn<R>(mut reader: R) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, chunks) = mpsc::channel(CHANNEL_CAPACITY);

        std::thread::Builder::new()
            .name("snapkv-input".to_string())
            .spawn(move || {
                let mut buf = vec![0u8; CHUNK_SIZE];
                loop {
                    let chunk = match reader.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => Ok(Bytes::copy_from_slice(&buf[..n])),
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => Err(e),
                    };
                    let failed = chunk.is_err();
                    if tx.blocking_send(chunk).is_err() || failed {
                        break;
                    }
                }
                trace!("Input thread finished");
            })?;

        Ok(Self {
            chunks,
            pending: Bytes::new(),
        })
    }

    /// Reads standard input on a dedicated thread.
    pub fn stdin() -> io::Result<Self> {
        Self::spawn(io::stdin())
    }
}

impl AsyncRead for ThreadReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;

        if this.pending.is_empty() {
            match ready!(this.chunks.poll_recv(cx)) {
                Some(Ok(chunk)) => this.pending = chunk,
                Some(Err(e)) => return Poll::Ready(Err(e)),
                // Sender gone: EOF
                None => return Poll::Ready(Ok(())),
            }
        }

        let n = this.pending.len().min(buf.remaining());
        buf.put_slice(&this.pending.split_to(n));
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandHandler;
    use crate::session::{Session, SessionStats};
    use crate::storage::Store;
    use std::sync::mpsc as std_mpsc;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;

    /// A reader that blocks until the test hands it bytes, like a terminal.
    struct Terminal(std_mpsc::Receiver<Vec<u8>>);

    impl Read for Terminal {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.recv() {
                Ok(data) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }

    #[tokio::test]
    async fn test_reads_until_eof() {
        let mut reader = ThreadReader::spawn(&b"SET a 1\nGET a\n"[..]).unwrap();

        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "SET a 1\nGET a\n");
    }

    #[tokio::test]
    async fn test_small_buffer_reads_whole_chunk() {
        let mut reader = ThreadReader::spawn(&b"abcdef"[..]).unwrap();

        let mut first = [0u8; 4];
        reader.read_exact(&mut first).await.unwrap();
        assert_eq!(&first, b"abcd");

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"ef");
    }

    #[tokio::test]
    async fn test_session_over_thread_reader() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("state.json")));
        let handler = CommandHandler::new(store);
        let stats = Arc::new(SessionStats::new());

        let (tx, rx) = std_mpsc::channel();
        tx.send(b"SET name Ariz\n".to_vec()).unwrap();
        tx.send(b"GET name\n".to_vec()).unwrap();
        drop(tx);

        let reader = ThreadReader::spawn(Terminal(rx)).unwrap();
        let mut session = Session::new(reader, Vec::new(), handler, stats);
        session.run().await.unwrap();

        let output = String::from_utf8(session.into_writer()).unwrap();
        assert_eq!(output, "OK\nAriz\n");
    }

    #[test]
    fn test_runtime_shuts_down_with_read_pending() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("state.json")));
        let handler = CommandHandler::new(store);
        let stats = Arc::new(SessionStats::new());

        // Never sends and stays open until after the runtime is gone
        let (tx, rx) = std_mpsc::channel::<Vec<u8>>();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let reader = ThreadReader::spawn(Terminal(rx)).unwrap();
            let mut session = Session::new(reader, Vec::new(), handler, stats);

            tokio::select! {
                _ = session.run() => panic!("session ended without input"),
                _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            }
        });

        // Dropping the runtime must not wait for the blocked read
        let (done_tx, done_rx) = std_mpsc::channel();
        std::thread::spawn(move || {
            drop(runtime);
            let _ = done_tx.send(());
        });
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());

        drop(tx);
    }
}
