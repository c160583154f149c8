use std::os::unix::net::UnixStream;

use solopipe_transport::{read_full, write_full};
use solopipe_wire::WireBuf;
use tracing::info;

use crate::error::{EndpointError, Result};

/// One end of a single-connection local pipe.
///
/// All multi-byte values cross the wire little-endian. Every read and write
/// either moves exactly the requested bytes or closes the endpoint for
/// good; there is no partial success and no reconnection. Dropping the
/// endpoint closes the underlying socket.
#[derive(Debug)]
pub struct PipeEndpoint {
    name: String,
    label: Option<String>,
    stream: Option<UnixStream>,
}

impl PipeEndpoint {
    /// Bind `name` in the abstract namespace, block until one peer connects,
    /// and stop listening. The returned endpoint is the only connection this
    /// name will ever serve from this call.
    pub fn serve(name: &str) -> Result<Self> {
        let stream = solopipe_transport::serve_once(name)?;
        Ok(Self::from_stream(name, stream))
    }

    /// Connect to a pipe another process is serving under `name`.
    pub fn connect(name: &str) -> Result<Self> {
        let stream = solopipe_transport::connect(name)?;
        Ok(Self::from_stream(name, stream))
    }

    /// Adopt an already-connected stream as an endpoint.
    pub fn from_stream(name: impl Into<String>, stream: UnixStream) -> Self {
        Self {
            name: name.into(),
            label: None,
            stream: Some(stream),
        }
    }

    /// The logical name this endpoint was created under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable label used in diagnostics.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Attach a human-readable label used in diagnostics.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    /// True until a transfer fails.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Read exactly `buf.len()` bytes from the peer.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(EndpointError::Closed)?;
        match read_full(stream, buf) {
            Ok(n) if n == buf.len() => Ok(()),
            Ok(n) => Err(self.fail_short(buf.len(), n)),
            Err(err) => Err(self.fail_io(err)),
        }
    }

    /// Write all of `buf` to the peer.
    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(EndpointError::Closed)?;
        match write_full(stream, buf) {
            Ok(n) if n == buf.len() => Ok(()),
            Ok(n) => Err(self.fail_short(buf.len(), n)),
            Err(err) => Err(self.fail_io(err)),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut raw = [0u8; 1];
        self.read_exact(&mut raw)?;
        Ok(raw[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut raw = [0u8; 2];
        self.read_exact(&mut raw)?;
        Ok(u16::from_le_bytes(raw))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        self.read_exact(&mut raw)?;
        Ok(u32::from_le_bytes(raw))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut raw = [0u8; 8];
        self.read_exact(&mut raw)?;
        Ok(u64::from_le_bytes(raw))
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_all(&[v])
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_all(&v.to_le_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_all(&v.to_le_bytes())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.write_all(&v.to_le_bytes())
    }

    /// Transmit the staged contents of `buf` as one message: a 4-byte
    /// little-endian length equal to the buffer's write length, then exactly
    /// that many payload bytes.
    ///
    /// There is deliberately no matching receive operation; the reader takes
    /// the 4-byte length and then reads that many bytes into its own buffer.
    pub fn send_buf(&mut self, buf: &WireBuf) -> Result<()> {
        if buf.len() > u32::MAX as usize {
            return Err(EndpointError::MessageTooLarge {
                size: buf.len(),
                max: u32::MAX as usize,
            });
        }
        self.write_u32(buf.len() as u32)?;
        self.write_all(buf.as_slice())
    }

    fn fail_short(&mut self, expected: usize, transferred: usize) -> EndpointError {
        self.close_for_good("peer disconnected mid-transfer");
        EndpointError::Disconnected {
            expected,
            transferred,
        }
    }

    fn fail_io(&mut self, err: std::io::Error) -> EndpointError {
        self.close_for_good("transfer error");
        EndpointError::Io(err)
    }

    fn close_for_good(&mut self, cause: &str) {
        info!(
            name = %self.name,
            label = self.label.as_deref().unwrap_or(""),
            cause,
            "closing pipe endpoint"
        );
        // Dropping the stream closes the socket. The endpoint stays closed;
        // callers create a new one if they need the channel back.
        self.stream = None;
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn pair(tag: &str) -> (PipeEndpoint, PipeEndpoint) {
        let (a, b) = UnixStream::pair().unwrap();
        (
            PipeEndpoint::from_stream(format!("{tag}-a"), a),
            PipeEndpoint::from_stream(format!("{tag}-b"), b),
        )
    }

    #[test]
    fn typed_values_roundtrip_in_order() {
        let (mut tx, mut rx) = pair("typed");

        tx.write_u8(9).unwrap();
        tx.write_u16(0xabcd).unwrap();
        tx.write_u32(0x00c0_ffee).unwrap();
        tx.write_u64(u64::MAX - 1).unwrap();

        assert_eq!(rx.read_u8().unwrap(), 9);
        assert_eq!(rx.read_u16().unwrap(), 0xabcd);
        assert_eq!(rx.read_u32().unwrap(), 0x00c0_ffee);
        assert_eq!(rx.read_u64().unwrap(), u64::MAX - 1);
    }

    #[test]
    fn integers_are_little_endian_on_the_wire() {
        let (mut tx, mut rx) = pair("endian");

        tx.write_u32(0x0403_0201).unwrap();

        let mut raw = [0u8; 4];
        rx.read_exact(&mut raw).unwrap();
        assert_eq!(raw, [0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn send_buf_produces_a_length_prefixed_message() {
        let (mut tx, mut rx) = pair("frame");

        let mut msg = WireBuf::new();
        msg.put_u32(0x1122_3344);
        msg.put_str("status");
        tx.send_buf(&msg).unwrap();

        let len = rx.read_u32().unwrap() as usize;
        assert_eq!(len, msg.len());

        let mut payload = vec![0u8; len];
        rx.read_exact(&mut payload).unwrap();
        assert_eq!(payload, msg.as_slice());
    }

    #[test]
    fn empty_buffer_sends_a_zero_length_message() {
        let (mut tx, mut rx) = pair("empty");

        tx.send_buf(&WireBuf::new()).unwrap();
        assert_eq!(rx.read_u32().unwrap(), 0);
    }

    #[test]
    fn short_read_closes_the_endpoint() {
        let (mut tx, mut rx) = pair("short");

        tx.write_u16(0x0102).unwrap();
        drop(tx);

        let err = rx.read_u32().unwrap_err();
        assert!(matches!(
            err,
            EndpointError::Disconnected {
                expected: 4,
                transferred: 2
            }
        ));
        assert!(!rx.is_connected());
    }

    #[test]
    fn closed_endpoint_refuses_io_without_touching_the_socket() {
        let (tx, mut rx) = pair("noop");
        drop(tx);

        // First read sees the close and latches the endpoint shut.
        assert!(matches!(
            rx.read_u8().unwrap_err(),
            EndpointError::Disconnected { .. }
        ));

        // Every call after that is refused up front.
        assert!(matches!(rx.read_u64().unwrap_err(), EndpointError::Closed));
        assert!(matches!(
            rx.write_u8(1).unwrap_err(),
            EndpointError::Closed
        ));
        assert!(matches!(
            rx.send_buf(&WireBuf::new()).unwrap_err(),
            EndpointError::Closed
        ));
    }

    #[test]
    fn failed_write_closes_the_endpoint() {
        let (mut tx, rx) = pair("wfail");
        drop(rx);

        // The peer is gone; within a few writes the kernel reports it.
        let mut outcome = Ok(());
        for _ in 0..64 {
            outcome = tx.write_u64(7);
            if outcome.is_err() {
                break;
            }
        }
        assert!(outcome.is_err());
        assert!(!tx.is_connected());
        assert!(matches!(
            tx.write_u8(0).unwrap_err(),
            EndpointError::Closed
        ));
    }

    #[test]
    fn label_is_attached_and_readable() {
        let (mut tx, _rx) = pair("label");
        assert_eq!(tx.label(), None);
        tx.set_label("worker-side");
        assert_eq!(tx.label(), Some("worker-side"));
    }

    fn connect_with_retry(name: &str, timeout: Duration) -> Result<PipeEndpoint> {
        let start = Instant::now();
        loop {
            match PipeEndpoint::connect(name) {
                Ok(pipe) => return Ok(pipe),
                Err(err) if start.elapsed() >= timeout => return Err(err),
                Err(_) => std::thread::sleep(Duration::from_millis(10)),
            }
        }
    }

    #[test]
    fn serve_accepts_one_peer_and_only_one() {
        let name = format!("solopipe-endpoint-lifecycle-{}", std::process::id());
        let server_name = name.clone();
        let server = std::thread::spawn(move || {
            let mut pipe = PipeEndpoint::serve(&server_name).unwrap();
            let value = pipe.read_u32().unwrap();
            pipe.write_u32(value + 1).unwrap();
            pipe
        });

        let mut client = connect_with_retry(&name, Duration::from_secs(5)).unwrap();
        client.write_u32(41).unwrap();
        assert_eq!(client.read_u32().unwrap(), 42);

        let served = server.join().unwrap();
        assert_eq!(served.name(), name);
        assert!(served.is_connected());

        // The listener is gone; the same name refuses a second peer.
        assert!(PipeEndpoint::connect(&name).is_err());
    }
}
