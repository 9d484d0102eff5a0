// src/monitor.rs
//! Fix acquisition: channel -> framer -> checksum -> decoder

use crate::{
    error::Result,
    gps::{checksum, data::FixRecord, framer::SentenceFramer, nmea},
    serial::{CloseHandle, SerialChannel, SerialConfig},
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
    task::JoinHandle,
};
use tokio_serial::SerialStream;

/// Reads fixes from one owned serial channel
pub struct FixMonitor<S = SerialStream> {
    channel: SerialChannel<S>,
    framer: SentenceFramer,
    discarded: u64,
}

impl FixMonitor<SerialStream> {
    /// Open the configured device and monitor it for GGA fixes
    pub fn open(config: SerialConfig) -> Result<Self> {
        Ok(Self::new(SerialChannel::open(config)?))
    }
}

impl<S> FixMonitor<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(channel: SerialChannel<S>) -> Self {
        Self {
            channel,
            framer: SentenceFramer::default(),
            discarded: 0,
        }
    }

    /// Next successfully decoded fix.
    ///
    /// Sentences that fail the checksum or cannot be decoded are logged and dropped,
    /// and reading continues. Channel errors end the search.
    pub async fn next_fix(&mut self) -> Result<FixRecord> {
        loop {
            let sentence = self.framer.next_sentence(&mut self.channel).await?;
            match nmea::parse_gga(&sentence) {
                Ok(fix) => return Ok(fix),
                Err(e) if e.is_sentence_error() => {
                    self.discarded += 1;
                    tracing::warn!("Discarding {:?}: {}", sentence, e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a sentence such as `$PSRF100,1,4800,8,1,0` to the receiver,
    /// with its checksum and line terminator appended.
    pub async fn send_sentence(&mut self, sentence: &str) -> Result<usize> {
        let framed = checksum::with_checksum(sentence);
        tracing::debug!("Sending {:?}", framed.trim_end());
        self.channel.write(framed.as_bytes()).await
    }

    /// GGA sentences dropped for checksum or decoding errors
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Non-GGA lines skipped
    pub fn skipped(&self) -> u64 {
        self.framer.skipped()
    }

    pub fn channel(&self) -> &SerialChannel<S> {
        &self.channel
    }

    pub fn close_handle(&self) -> CloseHandle {
        self.channel.close_handle()
    }

    /// Stop monitoring and release the device
    pub fn close(self) -> Result<()> {
        self.channel.close()
    }
}

impl<S> FixMonitor<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Run the read loop on its own task, delivering fixes through a bounded queue.
    ///
    /// The worker stops after forwarding the first channel error, when the receiving
    /// side is dropped, or when the returned handle is closed. It closes the channel
    /// on the way out.
    pub fn spawn(self, capacity: usize) -> FixWorker {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let close = self.close_handle();

        let task = tokio::spawn(async move {
            let mut monitor = self;
            loop {
                let result = tokio::select! {
                    result = monitor.next_fix() => result,
                    _ = tx.closed() => break,
                };
                let failed = result.is_err();
                if tx.send(result).await.is_err() || failed {
                    break;
                }
            }
            tracing::debug!(
                "Fix worker stopping ({} skipped, {} discarded)",
                monitor.skipped(),
                monitor.discarded()
            );
            monitor.close()
        });

        FixWorker {
            receiver: rx,
            close,
            task,
        }
    }
}

/// Receiving end of a spawned [`FixMonitor`]
pub struct FixWorker {
    receiver: mpsc::Receiver<Result<FixRecord>>,
    close: CloseHandle,
    task: JoinHandle<Result<()>>,
}

impl FixWorker {
    /// Next fix or channel error; `None` once the worker has stopped
    pub async fn recv(&mut self) -> Option<Result<FixRecord>> {
        self.receiver.recv().await
    }

    /// Ask the worker to stop; an outstanding read fails and the worker exits.
    pub fn stop(&self) {
        self.close.close();
    }

    /// Stop the worker and wait for it to release the device
    pub async fn shutdown(self) -> Result<()> {
        self.close.close();
        drop(self.receiver);
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(crate::error::GpsError::Other(format!("Fix worker failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GpsError;
    use crate::gps::data::FixQuality;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    const GGA: &str =
        "$GPGGA,030059.000,3706.7966,N,11332.4206,W,2,11,0.8,842.5,M,-20.5,M,2.0,0000*49";
    const GGA_NO_DGPS: &str =
        "$GPGGA,030059.000,3706.7966,N,11332.4206,W,2,11,0.8,842.5,M,-20.5,M,,0000*65";

    fn monitor() -> (FixMonitor<DuplexStream>, DuplexStream) {
        let (client, device) = duplex(4096);
        let channel = SerialChannel::from_stream(client, SerialConfig::default());
        (FixMonitor::new(channel), device)
    }

    #[tokio::test]
    async fn test_next_fix_discards_bad_sentences() {
        let (mut monitor, mut device) = monitor();
        let traffic = format!(
            "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n\
             {}\r\n\
             $GPGGA,030059.000,3706.7966,N*00\r\n\
             {}\r\n",
            GGA.replace("*49", "*48"),
            GGA
        );
        device.write_all(traffic.as_bytes()).await.unwrap();

        let fix = monitor.next_fix().await.unwrap();
        assert_eq!(fix.fix_quality, FixQuality::Dgps);
        assert_eq!(fix.satellites_in_view, 11);
        assert_eq!(monitor.skipped(), 1);
        assert_eq!(monitor.discarded(), 2);
    }

    #[tokio::test]
    async fn test_next_fix_with_raw_framing() {
        let (client, mut device) = duplex(4096);
        let config = SerialConfig::default().framing(crate::serial::Framing::RawByteCount(5));
        let mut monitor = FixMonitor::new(SerialChannel::from_stream(client, config));

        let traffic = format!("$GPRMC,1*00\r\n{}\r\n{}\r\n", GGA, GGA_NO_DGPS);
        device.write_all(traffic.as_bytes()).await.unwrap();

        let first = monitor.next_fix().await.unwrap();
        assert_eq!(first.sentence_checksum, 0x49);
        assert_eq!(first.satellites_in_view, 11);

        let second = monitor.next_fix().await.unwrap();
        assert_eq!(second.dgps_age(), None);
        assert_eq!(monitor.skipped(), 1);
        assert_eq!(monitor.discarded(), 0);
    }

    #[tokio::test]
    async fn test_send_sentence_appends_checksum() {
        let (mut monitor, mut device) = monitor();
        let n = monitor.send_sentence("$PSRF100,1,4800,8,1,0").await.unwrap();

        let mut buf = vec![0u8; n];
        device.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, b"$PSRF100,1,4800,8,1,0*0E\r\n");
    }

    #[tokio::test]
    async fn test_worker_delivers_fixes_then_error() {
        let (monitor, mut device) = monitor();
        let mut worker = monitor.spawn(4);

        device
            .write_all(format!("{}\r\n{}\r\n", GGA, GGA_NO_DGPS).as_bytes())
            .await
            .unwrap();

        let first = worker.recv().await.unwrap().unwrap();
        assert_eq!(first.last_dgps_update_seconds, 2.0);
        let second = worker.recv().await.unwrap().unwrap();
        assert_eq!(second.dgps_age(), None);

        drop(device);
        assert!(matches!(
            worker.recv().await,
            Some(Err(GpsError::ReadFailed(_)))
        ));
        assert!(worker.recv().await.is_none());
        assert!(worker.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_worker_shutdown_interrupts_read() {
        let (monitor, _device) = monitor();
        let worker = monitor.spawn(1);
        worker.stop();
        assert!(worker.shutdown().await.is_ok());
    }
}
