// src/gps/framer.rs
//! Picks GPGGA sentences out of the receiver's line stream

use crate::error::Result;
use crate::serial::{Framing, SerialChannel, LINE_BUFFER_SIZE};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;

/// Talker + sentence ID of the GGA fix sentence
pub const GGA_PREFIX: &str = "$GPGGA";

/// Reads lines until one starts with the target prefix.
///
/// Under [`Framing::RawByteCount`] the channel is read in chunks of that size and
/// lines are assembled here; bytes past the returned sentence stay in the framer.
///
/// There is no internal deadline: a stream that never carries the target sentence is
/// read forever unless the channel has a read timeout configured or is closed.
#[derive(Debug, Clone)]
pub struct SentenceFramer {
    prefix: String,
    skipped: u64,
    chunks: Vec<u8>,
    resyncing: bool,
}

impl SentenceFramer {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            skipped: 0,
            chunks: Vec::new(),
            resyncing: false,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Lines discarded so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Next line matching the prefix. Channel errors propagate unchanged.
    pub async fn next_sentence<S>(&mut self, channel: &mut SerialChannel<S>) -> Result<String>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let line = self.next_line(channel).await?;
            if line.starts_with(self.prefix.as_bytes()) {
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            self.skipped += 1;
            tracing::trace!("Skipping {}", String::from_utf8_lossy(&line));
        }
    }

    async fn next_line<S>(&mut self, channel: &mut SerialChannel<S>) -> Result<Vec<u8>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let timeout = channel.config().timeout();
        let chunk_size = match channel.config().framing_mode() {
            Framing::CanonicalLine => return channel.read_line(timeout).await,
            raw @ Framing::RawByteCount(_) => raw.buffer_size(),
        };

        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if let Some(end) = self.chunks.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.chunks.drain(..=end).collect();
                if self.resyncing {
                    self.resyncing = false;
                    continue;
                }
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(line);
            }

            if self.chunks.len() >= LINE_BUFFER_SIZE {
                if !self.resyncing {
                    tracing::warn!("Dropping line longer than {} bytes", LINE_BUFFER_SIZE);
                    self.resyncing = true;
                }
                self.chunks.clear();
            }

            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let chunk = channel.read_raw(chunk_size, remaining).await?;
            self.chunks.extend_from_slice(&chunk);
        }
    }
}

impl Default for SentenceFramer {
    fn default() -> Self {
        Self::new(GGA_PREFIX)
    }
}

/// Read lines from `channel` until a `$GPGGA` sentence arrives.
///
/// Under raw framing, bytes read past the sentence are dropped; keep a
/// [`SentenceFramer`] to read a stream of sentences.
pub async fn next_gga_sentence<S>(channel: &mut SerialChannel<S>) -> Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    SentenceFramer::default().next_sentence(channel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GpsError;
    use crate::serial::SerialConfig;
    use tokio::io::{duplex, AsyncWriteExt};

    const GGA: &str =
        "$GPGGA,030059.000,3706.7966,N,11332.4206,W,2,11,0.8,842.5,M,-20.5,M,2.0,0000*49";

    #[tokio::test]
    async fn test_skips_other_sentences() {
        let (client, mut device) = duplex(4096);
        let mut channel = SerialChannel::from_stream(client, SerialConfig::default());

        let traffic = format!(
            "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n\
             $GPGSV,3,1,12,01,40,083,46,02,17,308,41,12,07,344,39,14,22,228,45*75\r\n\
             \r\n\
             GPGGA,no dollar\r\n\
             {}\r\n",
            GGA
        );
        device.write_all(traffic.as_bytes()).await.unwrap();

        let mut framer = SentenceFramer::default();
        let sentence = framer.next_sentence(&mut channel).await.unwrap();
        assert_eq!(sentence, GGA);
        assert_eq!(framer.skipped(), 4);
    }

    #[tokio::test]
    async fn test_channel_error_propagates() {
        let (client, mut device) = duplex(4096);
        let mut channel = SerialChannel::from_stream(client, SerialConfig::default());

        device.write_all(b"$GPRMC,only\r\n").await.unwrap();
        drop(device);

        match next_gga_sentence(&mut channel).await {
            Err(GpsError::ReadFailed(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof)
            }
            other => panic!("expected read failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_channel_timeout_bounds_the_search() {
        let (client, mut device) = duplex(4096);
        let config = SerialConfig::default()
            .read_timeout(Some(std::time::Duration::from_millis(30)));
        let mut channel = SerialChannel::from_stream(client, config);

        device.write_all(b"$GPGSA,A,3*00\r\n").await.unwrap();

        match next_gga_sentence(&mut channel).await {
            Err(GpsError::ReadFailed(e)) => assert_eq!(e.kind(), std::io::ErrorKind::TimedOut),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_raw_chunks_are_assembled_into_lines() {
        let (client, mut device) = duplex(4096);
        let config = SerialConfig::default().framing(Framing::RawByteCount(7));
        let mut channel = SerialChannel::from_stream(client, config);

        let traffic = format!("$GPGSA,A,3*00\r\n{}\r\n{}\n", GGA, GGA);
        device.write_all(traffic.as_bytes()).await.unwrap();

        let mut framer = SentenceFramer::default();
        assert_eq!(framer.next_sentence(&mut channel).await.unwrap(), GGA);
        assert_eq!(framer.next_sentence(&mut channel).await.unwrap(), GGA);
        assert_eq!(framer.skipped(), 1);
    }

    #[tokio::test]
    async fn test_raw_framing_drops_overlong_lines() {
        let (client, mut device) = duplex(4096);
        let config = SerialConfig::default().framing(Framing::RawByteCount(64));
        let mut channel = SerialChannel::from_stream(client, config);

        let traffic = format!("{}\r\n{}\r\n", "Z".repeat(1000), GGA);
        device.write_all(traffic.as_bytes()).await.unwrap();

        let mut framer = SentenceFramer::default();
        assert_eq!(framer.next_sentence(&mut channel).await.unwrap(), GGA);
        assert_eq!(framer.skipped(), 0);
    }

    #[tokio::test]
    async fn test_raw_framing_times_out() {
        let (client, mut device) = duplex(4096);
        let config = SerialConfig::default()
            .framing(Framing::RawByteCount(16))
            .read_timeout(Some(std::time::Duration::from_millis(30)));
        let mut channel = SerialChannel::from_stream(client, config);

        device.write_all(b"$GPGGA,partial").await.unwrap();

        match next_gga_sentence(&mut channel).await {
            Err(GpsError::ReadFailed(e)) => assert_eq!(e.kind(), std::io::ErrorKind::TimedOut),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let (client, mut device) = duplex(4096);
        let mut channel = SerialChannel::from_stream(client, SerialConfig::default());
        device
            .write_all(b"$GPGGA,1\r\n$GPRMC,2\r\n")
            .await
            .unwrap();

        let mut framer = SentenceFramer::new("$GPRMC");
        assert_eq!(framer.next_sentence(&mut channel).await.unwrap(), "$GPRMC,2");
        assert_eq!(framer.prefix(), "$GPRMC");
    }
}
