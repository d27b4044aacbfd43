//! Line-oriented channel to a UCI engine
//!
//! The protocol carries no request identifiers: a response belongs to
//! whichever command was sent last. Callers must therefore never interleave
//! two exchanges on one channel; `EngineManager` enforces this.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::trace;

use crate::error::ChannelError;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Bidirectional text channel to an engine
pub struct UciChannel {
    reader: BufReader<BoxedReader>,
    writer: BoxedWriter,
    buffer: Vec<u8>,
}

impl UciChannel {
    /// Wraps the engine's output stream and input stream
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: BufReader::new(Box::new(reader) as BoxedReader),
            writer: Box::new(writer),
            buffer: Vec::with_capacity(256),
        }
    }

    /// Sends a command to the engine
    pub async fn send(&mut self, command: &str) -> Result<(), ChannelError> {
        trace!(target: "uci", ">> {}", command);
        self.writer
            .write_all(command.as_bytes())
            .await
            .map_err(ChannelError::Write)?;
        self.writer.write_all(b"\n").await.map_err(ChannelError::Write)?;
        self.writer.flush().await.map_err(ChannelError::Write)?;
        Ok(())
    }

    /// Reads one line, trimmed, waiting at most `timeout`
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than rejected; such
    /// a line is still a line and the parser decides what to do with it.
    ///
    /// A timed-out read may leave a partial line buffered, so the channel
    /// must not be reused after `ChannelError::Timeout`.
    pub async fn receive_line(&mut self, timeout: Duration) -> Result<String, ChannelError> {
        self.buffer.clear();

        let bytes_read = tokio::time::timeout(timeout, self.reader.read_until(b'\n', &mut self.buffer))
            .await
            .map_err(|_| ChannelError::Timeout(timeout))?
            .map_err(|e| {
                trace!(target: "uci", "read failed: {}", e);
                ChannelError::Closed
            })?;

        if bytes_read == 0 {
            return Err(ChannelError::Closed);
        }

        let line = String::from_utf8_lossy(&self.buffer);
        let line = line.trim();
        trace!(target: "uci", "<< {}", line);
        Ok(line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_send_appends_newline() {
        let (client, mut server) = tokio::io::duplex(64);
        let (read, write) = tokio::io::split(client);
        let mut channel = UciChannel::new(read, write);

        channel.send("isready").await.unwrap();

        let mut buf = [0u8; 8];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"isready\n");
    }

    #[tokio::test]
    async fn test_receive_trims_lines() {
        let (client, mut server) = tokio::io::duplex(64);
        let (read, write) = tokio::io::split(client);
        let mut channel = UciChannel::new(read, write);

        server.write_all(b"readyok\r\nuciok\n").await.unwrap();

        let timeout = Duration::from_secs(1);
        assert_eq!(channel.receive_line(timeout).await.unwrap(), "readyok");
        assert_eq!(channel.receive_line(timeout).await.unwrap(), "uciok");
    }

    #[tokio::test]
    async fn test_receive_tolerates_invalid_utf8() {
        let (client, mut server) = tokio::io::duplex(64);
        let (read, write) = tokio::io::split(client);
        let mut channel = UciChannel::new(read, write);

        server.write_all(b"info string net \xff\xfe.nnue\nreadyok\n").await.unwrap();

        let timeout = Duration::from_secs(1);
        let line = channel.receive_line(timeout).await.unwrap();
        assert!(line.starts_with("info string net "));
        assert_eq!(channel.receive_line(timeout).await.unwrap(), "readyok");
    }

    #[tokio::test]
    async fn test_receive_times_out() {
        let (client, _server) = tokio::io::duplex(64);
        let (read, write) = tokio::io::split(client);
        let mut channel = UciChannel::new(read, write);

        let err = channel.receive_line(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, ChannelError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_receive_reports_closed() {
        let (client, server) = tokio::io::duplex(64);
        let (read, write) = tokio::io::split(client);
        let mut channel = UciChannel::new(read, write);
        drop(server);

        let err = channel.receive_line(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (client, server) = tokio::io::duplex(64);
        let (read, write) = tokio::io::split(client);
        let mut channel = UciChannel::new(read, write);
        drop(server);

        let err = channel.send("go movetime 100").await.unwrap_err();
        assert!(matches!(err, ChannelError::Write(_)));
    }
}
