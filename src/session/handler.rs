use crate::commands::{parse_line, CommandHandler, USAGE};
use bytes::BytesMut;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, trace, warn};

/// Maximum length of a single input line (64 KB)
const MAX_LINE_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for a session
#[derive(Debug, Default)]
pub struct SessionStats {
    /// Total lines read (including blank ones)
    pub lines_read: AtomicU64,
    /// Total store commands executed
    pub commands_processed: AtomicU64,
    /// Lines rejected by the parser
    pub parse_errors: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_read(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// What to do after a line has been handled.
enum Flow {
    Continue,
    Quit,
}

/// Drives one interactive session.
///
/// Reads lines from `R`, executes them and writes replies to `W`. Store
/// calls run on tokio's blocking pool since they hold a mutex across file I/O.
pub struct Session<R, W: AsyncWrite> {
    /// Where input comes from
    reader: R,

    /// Where replies go
    writer: BufWriter<W>,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command handler (shares the store)
    command_handler: CommandHandler,

    /// Session statistics (shared)
    stats: Arc<SessionStats>,

    /// Printed before each line is read, if set
    prompt: Option<&'static str>,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a new session without a prompt.
    pub fn new(
        reader: R,
        writer: W,
        command_handler: CommandHandler,
        stats: Arc<SessionStats>,
    ) -> Self {
        Self {
            reader,
            writer: BufWriter::new(writer),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            stats,
            prompt: None,
        }
    }

    /// Sets the prompt shown before each line.
    pub fn with_prompt(mut self, prompt: &'static str) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Consumes the session and returns the underlying writer.
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    /// Runs the read-execute-respond loop until `QUIT`, `EXIT` or end of input.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        debug!("Session started");
        self.write_prompt().await?;

        loop {
            while let Some(line) = self.next_line()? {
                if let Flow::Quit = self.handle_line(&line).await? {
                    debug!("Session ended by user");
                    return Ok(());
                }
                self.write_prompt().await?;
            }

            if !self.read_more_data().await? {
                // A final line without a newline still counts
                if !self.buffer.is_empty() {
                    let rest = self.buffer.split();
                    let line = String::from_utf8_lossy(&rest).into_owned();
                    self.handle_line(&line).await?;
                }
                debug!("Session ended at end of input");
                return Ok(());
            }
        }
    }

    /// Takes one complete line out of the buffer, if there is one.
    fn next_line(&mut self) -> Result<Option<String>, SessionError> {
        match self.buffer.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                let mut raw = self.buffer.split_to(pos + 1);
                raw.truncate(pos);
                if raw.last() == Some(&b'\r') {
                    raw.truncate(pos - 1);
                }
                trace!(bytes = raw.len(), remaining = self.buffer.len(), "Read line");
                Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
            }
            None if self.buffer.len() > MAX_LINE_SIZE => {
                let size = self.buffer.len();
                self.buffer.clear();
                Err(SessionError::LineTooLong(size))
            }
            None => Ok(None),
        }
    }

    /// Reads more input into the buffer. Returns false at end of input.
    async fn read_more_data(&mut self) -> Result<bool, SessionError> {
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.reader.read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Ok(false);
        }

        self.stats.bytes_read(n);
        trace!(bytes = n, "Read data");
        Ok(true)
    }

    async fn handle_line(&mut self, line: &str) -> Result<Flow, SessionError> {
        self.stats.line_read();

        let first = match line.split_whitespace().next() {
            Some(word) => word.to_ascii_uppercase(),
            None => return Ok(Flow::Continue),
        };

        match first.as_str() {
            "QUIT" | "EXIT" => return Ok(Flow::Quit),
            "HELP" => {
                self.write_line(USAGE).await?;
                return Ok(Flow::Continue);
            }
            _ => {}
        }

        let parsed = match parse_line(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.stats.parse_error();
                debug!(error = %e, "Rejected input");
                self.write_line(&format!("Error: {}", e)).await?;
                return Ok(Flow::Continue);
            }
        };

        if let Some(warning) = &parsed.warning {
            warn!(command = parsed.command.name(), "{}", warning);
            self.write_line(&format!("Warning: {}", warning)).await?;
        }

        let handler = self.command_handler.clone();
        let reply = tokio::task::spawn_blocking(move || handler.execute(parsed.command)).await?;
        self.stats.command_processed();

        self.write_line(&reply.to_string()).await?;
        Ok(Flow::Continue)
    }

    async fn write_line(&mut self, text: &str) -> Result<(), SessionError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn write_prompt(&mut self) -> Result<(), SessionError> {
        if let Some(prompt) = self.prompt {
            self.writer.write_all(prompt.as_bytes()).await?;
            self.writer.flush().await?;
        }
        Ok(())
    }
}

/// Errors that can end a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// I/O error on the reader or writer
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A line exceeded the size limit
    #[error("input line too long ({0} bytes)")]
    LineTooLong(usize),

    /// The blocking task running a command panicked or was cancelled
    #[error("command task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
