// src/serial/channel.rs
//! Owned serial device handle with line-oriented reads

use super::line_discipline::SavedLineDiscipline;
use super::{SerialConfig, LINE_BUFFER_SIZE};
use crate::error::{GpsError, Result};
use std::{future::Future, io, path::Path, time::Duration};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::Instant;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tokio_util::sync::CancellationToken;

/// Closes a [`SerialChannel`] from another task.
///
/// A read or write in progress on the channel fails with `ReadFailed`/`WriteFailed`
/// once the handle is closed.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    token: CancellationToken,
}

impl CloseHandle {
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A configured character device, read one line at a time.
///
/// Only one channel should own a given device path at a time. The terminal settings
/// found on the device at open time are put back when the channel is closed or dropped.
pub struct SerialChannel<S = SerialStream> {
    // Declared first so the saved settings are restored before the stream is released
    line_discipline: Option<SavedLineDiscipline>,
    reader: BufReader<S>,
    pending: Vec<u8>,
    // Discarding the rest of an overlong line
    resyncing: bool,
    config: SerialConfig,
    cancel: CancellationToken,
}

impl SerialChannel<SerialStream> {
    /// Open and configure the device named by `config`.
    ///
    /// The port is set to raw mode, 8N1, hardware flow control, at the configured baud
    /// rate. Must be called from within a Tokio runtime.
    pub fn open(config: SerialConfig) -> Result<Self> {
        let path = config.device_path().to_string();

        if !Path::new(&path).exists() {
            return Err(GpsError::DeviceUnavailable {
                path,
                reason: "no such device".to_string(),
            });
        }

        let line_discipline =
            SavedLineDiscipline::capture(&path).map_err(|e| GpsError::DeviceUnavailable {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let stream = tokio_serial::new(&path, config.baud_rate())
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::Hardware)
            .open_native_async()
            .map_err(|e| GpsError::DeviceUnavailable {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(
            "Opened {} at {} baud ({:?})",
            path,
            config.baud_rate(),
            config.framing_mode()
        );

        Ok(Self::with_parts(stream, config, Some(line_discipline)))
    }
}

impl<S> SerialChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already-open byte stream (a pty, a pipe, an in-memory duplex).
    /// No terminal settings are saved or restored.
    pub fn from_stream(stream: S, config: SerialConfig) -> Self {
        Self::with_parts(stream, config, None)
    }

    fn with_parts(
        stream: S,
        config: SerialConfig,
        line_discipline: Option<SavedLineDiscipline>,
    ) -> Self {
        Self {
            line_discipline,
            reader: BufReader::with_capacity(config.framing_mode().buffer_size(), stream),
            pending: Vec::new(),
            resyncing: false,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Effective configuration, after baud rate fallback
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            token: self.cancel.clone(),
        }
    }

    /// Read one line, without its `\n` or `\r\n` terminator.
    ///
    /// Waits until a terminator arrives, the timeout expires, the channel is closed,
    /// or the device reports an error. Bytes received before a timeout are kept and
    /// returned as the start of the next line. Lines longer than [`LINE_BUFFER_SIZE`]
    /// are dropped up to the next terminator.
    pub async fn read_line(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>> {
        if self.cancel.is_cancelled() {
            return Err(GpsError::ReadFailed(channel_closed()));
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            // pending never holds a full buffer between reads
            let room = LINE_BUFFER_SIZE.saturating_sub(self.pending.len()).max(1) as u64;
            let Self {
                reader,
                pending,
                cancel,
                ..
            } = &mut *self;

            let mut limited = (&mut *reader).take(room);
            let read = with_deadline(deadline, limited.read_until(b'\n', pending));
            let n = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GpsError::ReadFailed(channel_closed())),
                result = read => result.map_err(GpsError::ReadFailed)?,
            };

            if self.pending.ends_with(b"\n") {
                if self.resyncing {
                    self.resyncing = false;
                    self.pending.clear();
                    continue;
                }
                break;
            }

            if n > 0 && self.pending.len() >= LINE_BUFFER_SIZE {
                if !self.resyncing {
                    tracing::warn!(
                        "Dropping line longer than {} bytes from {}",
                        LINE_BUFFER_SIZE,
                        self.config.device_path()
                    );
                    self.resyncing = true;
                }
                self.pending.clear();
                continue;
            }

            // read_until only stops short of a terminator and the limit at end of stream
            return Err(GpsError::ReadFailed(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "device closed the stream",
            )));
        }

        let mut line = std::mem::take(&mut self.pending);
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(line)
    }

    /// Read up to `max` bytes in a single read, with no line framing.
    pub async fn read_raw(&mut self, max: usize, timeout: Option<Duration>) -> Result<Vec<u8>> {
        if self.cancel.is_cancelled() {
            return Err(GpsError::ReadFailed(channel_closed()));
        }

        // Leftovers from an interrupted line read come first
        if !self.pending.is_empty() {
            let take = max.min(self.pending.len());
            return Ok(self.pending.drain(..take).collect());
        }

        let mut buf = vec![0u8; max];
        let Self { reader, cancel, .. } = self;

        let deadline = timeout.map(|t| Instant::now() + t);
        let read = with_deadline(deadline, reader.read(&mut buf));
        let n = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GpsError::ReadFailed(channel_closed())),
            result = read => result.map_err(GpsError::ReadFailed)?,
        };

        if n == 0 && max > 0 {
            return Err(GpsError::ReadFailed(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "device closed the stream",
            )));
        }

        buf.truncate(n);
        Ok(buf)
    }

    /// Write all of `bytes` to the device, returning the count written.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(GpsError::WriteFailed(channel_closed()));
        }

        let Self { reader, cancel, .. } = self;
        let stream = reader.get_mut();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GpsError::WriteFailed(channel_closed())),
            result = async {
                stream.write_all(bytes).await?;
                stream.flush().await
            } => result.map_err(GpsError::WriteFailed)?,
        };

        Ok(bytes.len())
    }

    /// Wait until buffered output has been handed to the device.
    pub async fn flush(&mut self) -> Result<()> {
        self.reader
            .get_mut()
            .flush()
            .await
            .map_err(GpsError::WriteFailed)
    }

    /// Restore the terminal settings found at open time, then release the device.
    pub fn close(mut self) -> Result<()> {
        self.cancel.cancel();
        if let Some(mut line_discipline) = self.line_discipline.take() {
            line_discipline.restore().map_err(GpsError::Io)?;
        }
        tracing::debug!("Closed {}", self.config.device_path());
        Ok(())
    }
}

fn channel_closed() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "serial channel closed")
}

async fn with_deadline<F>(deadline: Option<Instant>, io: F) -> io::Result<usize>
where
    F: Future<Output = io::Result<usize>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, io)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "serial read timed out"))?,
        None => io.await,
    }
}
