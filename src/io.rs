//! Read loops feeding a framer from a byte source.
//!
//! The transport itself (socket, USB bridge, capture dump) belongs to the
//! caller. These helpers only move bytes from a reader into a
//! [`StreamFramer`] until EOF, and stop early once the session errors.
//!
//! # Example
//!
//! ```
//! use mrcwire::io::pump;
//! use mrcwire::protocol::{build_frame, PayloadType};
//! use mrcwire::StreamFramer;
//!
//! let bytes = build_frame(PayloadType::VideoData, b"frame");
//! let framer = StreamFramer::new();
//!
//! let read = pump(&bytes[..], &framer).unwrap();
//! assert_eq!(read, bytes.len() as u64);
//! assert!(framer.has_completed_frame());
//! ```

use std::io::{ErrorKind, Read};

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

use crate::error::Result;
use crate::framer::StreamFramer;

/// Read buffer size per call.
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Feed `reader` into `framer` until EOF or a parse error.
///
/// Returns the number of bytes read.
pub fn pump<R: Read>(mut reader: R, framer: &StreamFramer) -> Result<u64> {
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break, // EOF
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        total += n as u64;

        framer.add_data(&buf[..n]);
        if framer.has_error() {
            warn!("Stopping read loop after {} bytes: stream corrupted", total);
            break;
        }
    }

    debug!("Read loop finished, {} bytes", total);
    Ok(total)
}

/// Async variant of [`pump`].
pub async fn pump_async<R: AsyncRead + Unpin>(mut reader: R, framer: &StreamFramer) -> Result<u64> {
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break, // EOF
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        total += n as u64;

        framer.add_data(&buf[..n]);
        if framer.has_error() {
            warn!("Stopping read loop after {} bytes: stream corrupted", total);
            break;
        }
    }

    debug!("Read loop finished, {} bytes", total);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MrcError;
    use crate::protocol::{build_frame, PayloadType};
    use std::io::Cursor;

    fn stream(count: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        for i in 0..count {
            bytes.extend(build_frame(PayloadType::VideoData, &vec![i as u8; 1000]));
        }
        bytes
    }

    #[test]
    fn test_pump_reads_to_eof() {
        let bytes = stream(100);
        let framer = StreamFramer::new();

        let read = pump(Cursor::new(&bytes), &framer).unwrap();

        assert_eq!(read, bytes.len() as u64);
        assert_eq!(framer.queued_frames(), 100);
        assert_eq!(framer.buffered_len(), 0);
    }

    #[test]
    fn test_pump_stops_on_corruption() {
        let mut bytes = vec![0xAAu8; 16];
        bytes.extend(vec![0u8; READ_CHUNK_SIZE * 2]);
        let framer = StreamFramer::new();

        let read = pump(Cursor::new(&bytes), &framer).unwrap();

        assert_eq!(read, READ_CHUNK_SIZE as u64);
        assert!(framer.has_error());
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn test_pump_propagates_io_error() {
        let framer = StreamFramer::new();
        let err = pump(FailingReader, &framer).unwrap_err();
        assert!(matches!(err, MrcError::Io(_)));
    }

    #[tokio::test]
    async fn test_pump_async_over_duplex() {
        let bytes = stream(20);
        let expected = bytes.len() as u64;
        let framer = StreamFramer::new();

        let (mut client, server) = tokio::io::duplex(4096);
        let writer = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            for chunk in bytes.chunks(333) {
                client.write_all(chunk).await.unwrap();
            }
        });

        let read = pump_async(server, &framer).await.unwrap();
        writer.await.unwrap();

        assert_eq!(read, expected);
        assert_eq!(framer.queued_frames(), 20);
    }
}
