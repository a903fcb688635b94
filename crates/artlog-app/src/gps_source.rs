//! Host GPS sources
//!
//! A serial receiver read on a dedicated thread, or an NMEA log replayed
//! one sentence per tick.

use std::io::{self, Read};
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use artlog_core::gps::SentenceFramer;
use artlog_core::latch::LatchWriter;
use serialport::SerialPort;

/// Open the receiver port (8N1, no flow control)
pub fn open_port(name: &str, baud: u32) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(name, baud)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(Duration::from_millis(100))
        .open()
        .with_context(|| format!("Could not open GPS port {name}"))?;
    tracing::info!("GPS receiver on {name} @ {baud} baud");
    Ok(port)
}

/// Frame sentences from the port until it fails or the reader goes away
pub fn spawn_serial_reader(
    mut port: Box<dyn SerialPort>,
    sentences: LatchWriter<String>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut framer = SentenceFramer::new();
        let mut buf = [0u8; 256];
        while !sentences.is_closed() {
            match port.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => {
                    for sentence in framer.push_bytes(&buf[..n]) {
                        sentences.publish(sentence);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    tracing::error!("GPS port read failed: {e}");
                    break;
                }
            }
        }
        tracing::debug!(dropped = framer.dropped(), "GPS reader finished");
    })
}

/// Load the sentences of an NMEA log
pub fn load_nmea(path: &Path) -> Result<Vec<String>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Could not read {}", path.display()))?;
    let mut framer = SentenceFramer::new();
    let mut sentences = framer.push_bytes(&bytes);
    // last line may lack its terminator
    sentences.extend(framer.push_byte(b'\n'));
    tracing::info!("Replaying {} sentences from {}", sentences.len(), path.display());
    Ok(sentences)
}

/// Publish one sentence per tick period, then stop
pub async fn replay(sentences: Vec<String>, period: Duration, writer: LatchWriter<String>) {
    let mut interval = tokio::time::interval(period);
    for sentence in sentences {
        interval.tick().await;
        if writer.is_closed() {
            return;
        }
        writer.publish(sentence);
    }
    tracing::info!("NMEA replay finished");
}
