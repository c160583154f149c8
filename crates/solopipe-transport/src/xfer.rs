use std::io::{ErrorKind, Read, Write};

use tracing::debug;

/// Read exactly `buf.len()` bytes unless the peer closes first.
///
/// A read of zero bytes means the peer shut down in an orderly way; the
/// bytes moved so far are returned and the count will be less than
/// `buf.len()`. Interruption by a signal is retried with no progress
/// charged and is never surfaced. Any other error aborts the transfer
/// immediately; partial progress is lost.
pub fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut moved = 0usize;

    while moved < buf.len() {
        match r.read(&mut buf[moved..]) {
            Ok(0) => {
                debug!(moved, wanted = buf.len(), "peer closed during read");
                return Ok(moved);
            }
            Ok(n) => moved += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                debug!(moved, wanted = buf.len(), %err, "read failed");
                return Err(err);
            }
        }
    }

    Ok(moved)
}

/// Write exactly `buf.len()` bytes unless the peer closes first.
///
/// Same contract as [`read_full`]: a zero-byte write terminates with the
/// short count, interrupted calls are retried invisibly, and any other
/// error aborts the transfer.
pub fn write_full<W: Write>(w: &mut W, buf: &[u8]) -> std::io::Result<usize> {
    let mut moved = 0usize;

    while moved < buf.len() {
        match w.write(&buf[moved..]) {
            Ok(0) => return Ok(moved),
            Ok(n) => moved += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                debug!(moved, wanted = buf.len(), %err, "write failed");
                return Err(err);
            }
        }
    }

    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_completes_from_one_byte_chunks() {
        let mut reader = ByteByByteReader {
            bytes: b"dribble".to_vec(),
            pos: 0,
        };
        let mut buf = [0u8; 7];

        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 7);
        assert_eq!(&buf, b"dribble");
    }

    #[test]
    fn read_reports_short_count_on_close() {
        let mut reader = ByteByByteReader {
            bytes: b"abc".to_vec(),
            pos: 0,
        };
        let mut buf = [0u8; 8];

        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn read_retries_after_interruption() {
        let mut reader = InterruptedThenData {
            interrupted: false,
            bytes: b"resume".to_vec(),
            pos: 0,
        };
        let mut buf = [0u8; 6];

        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 6);
        assert_eq!(&buf, b"resume");
    }

    #[test]
    fn read_propagates_hard_errors() {
        let mut reader = BrokenReader;
        let mut buf = [0u8; 4];

        let err = read_full(&mut reader, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionReset);
    }

    #[test]
    fn empty_read_succeeds_immediately() {
        let mut reader = BrokenReader;
        assert_eq!(read_full(&mut reader, &mut []).unwrap(), 0);
    }

    #[test]
    fn write_completes_through_one_byte_sink() {
        let mut writer = ByteByByteWriter { data: Vec::new() };

        assert_eq!(write_full(&mut writer, b"trickle").unwrap(), 7);
        assert_eq!(writer.data, b"trickle");
    }

    #[test]
    fn write_reports_short_count_on_close() {
        let mut writer = ClosesAfter {
            limit: 5,
            data: Vec::new(),
        };

        assert_eq!(write_full(&mut writer, b"overflow").unwrap(), 5);
        assert_eq!(writer.data, b"overf");
    }

    #[test]
    fn write_retries_after_interruption() {
        let mut writer = InterruptedThenSink {
            interrupted: false,
            data: Vec::new(),
        };

        assert_eq!(write_full(&mut writer, b"retry").unwrap(), 5);
        assert_eq!(writer.data, b"retry");
    }

    #[test]
    fn write_propagates_hard_errors() {
        let mut writer = BrokenWriter;
        let err = write_full(&mut writer, b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::ConnectionReset))
        }
    }

    struct ByteByByteWriter {
        data: Vec<u8>,
    }

    impl Write for ByteByByteWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if buf.is_empty() {
                return Ok(0);
            }
            self.data.push(buf[0]);
            Ok(1)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ClosesAfter {
        limit: usize,
        data: Vec<u8>,
    }

    impl Write for ClosesAfter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.data.len() >= self.limit {
                return Ok(0);
            }
            let n = buf.len().min(self.limit - self.data.len());
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct InterruptedThenSink {
        interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedThenSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
