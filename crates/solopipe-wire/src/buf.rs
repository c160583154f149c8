use tracing::trace;

/// Capacity used when none (or zero) is requested.
pub const DEFAULT_CAPACITY: usize = 32;

/// Above this capacity, growth switches from doubling to fixed increments.
pub const LINEAR_GROWTH_STEP: usize = 1_048_576;

/// A growable byte buffer with a write length and an independent read
/// position.
///
/// Capacity doubles while it is below 1 MiB and grows by 1 MiB steps once
/// past it, which bounds reallocation churn for small messages without
/// doubling multi-megabyte payloads forever. Capacity never shrinks.
///
/// Reads are clamped: asking for more bytes than remain before the write
/// length copies only what is there and reports the copied count. Callers
/// must not assume full delivery.
#[derive(Debug)]
pub struct WireBuf {
    storage: Vec<u8>,
    len: usize,
    rpos: usize,
}

impl WireBuf {
    /// Create a buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a buffer with `initial` bytes of capacity (the default
    /// capacity if `initial` is zero).
    pub fn with_capacity(initial: usize) -> Self {
        let initial = if initial == 0 {
            DEFAULT_CAPACITY
        } else {
            initial
        };
        Self {
            storage: vec![0; initial],
            len: 0,
            rpos: 0,
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current storage capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.rpos
    }

    /// Move the read position. Positions past the write length are allowed;
    /// subsequent reads will simply copy nothing.
    pub fn set_position(&mut self, pos: usize) {
        self.rpos = pos;
    }

    /// The written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    /// Reset the write length and read position, keeping the storage.
    pub fn clear(&mut self) {
        self.len = 0;
        self.rpos = 0;
    }

    /// Append `bytes` at the write length, growing storage as needed.
    /// Empty input is a no-op.
    pub fn write(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        let needed = self.len + bytes.len();
        if needed > self.storage.len() {
            self.grow_to_fit(needed);
        }

        self.storage[self.len..needed].copy_from_slice(bytes);
        self.len = needed;
    }

    /// Copy up to `dst.len()` bytes from the read position into `dst`,
    /// advancing the read position by the copied count.
    ///
    /// The copy is silently clamped to the bytes remaining before the write
    /// length; the return value is the only indication of a short read.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let remaining = self.len.saturating_sub(self.rpos);
        let count = dst.len().min(remaining);
        dst[..count].copy_from_slice(&self.storage[self.rpos..self.rpos + count]);
        self.rpos += count;
        count
    }

    fn grow_to_fit(&mut self, needed: usize) {
        let mut capacity = self.storage.len();
        while needed > capacity {
            let old = capacity;
            if capacity < LINEAR_GROWTH_STEP {
                capacity *= 2;
            } else {
                capacity += LINEAR_GROWTH_STEP;
            }
            trace!(old, new = capacity, "growing wire buffer");
        }
        self.storage.resize(capacity, 0);
    }

    /// Append a single byte.
    pub fn put_u8(&mut self, v: u8) {
        self.write(&[v]);
    }

    /// Append a little-endian u16.
    pub fn put_u16(&mut self, v: u16) {
        self.write(&v.to_le_bytes());
    }

    /// Append a little-endian u32.
    pub fn put_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    /// Append a little-endian u64.
    pub fn put_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    /// Append a string as a 2-byte little-endian length prefix followed by
    /// the raw bytes, with no terminator.
    ///
    /// The length field holds the byte length truncated to 16 bits; strings
    /// past 65535 bytes silently wrap the prefix while all bytes are still
    /// written. Callers own keeping strings within range.
    pub fn put_str(&mut self, s: &str) {
        self.put_u16(s.len() as u16);
        self.write(s.as_bytes());
    }

    /// Read a single byte (zero if none remain).
    pub fn get_u8(&mut self) -> u8 {
        let mut raw = [0u8; 1];
        self.read(&mut raw);
        raw[0]
    }

    /// Read a little-endian u16. A clamped read zero-extends.
    pub fn get_u16(&mut self) -> u16 {
        let mut raw = [0u8; 2];
        self.read(&mut raw);
        u16::from_le_bytes(raw)
    }

    /// Read a little-endian u32. A clamped read zero-extends.
    pub fn get_u32(&mut self) -> u32 {
        let mut raw = [0u8; 4];
        self.read(&mut raw);
        u32::from_le_bytes(raw)
    }

    /// Read a little-endian u64. A clamped read zero-extends.
    pub fn get_u64(&mut self) -> u64 {
        let mut raw = [0u8; 8];
        self.read(&mut raw);
        u64::from_le_bytes(raw)
    }
}

impl Default for WireBuf {
    fn default() -> Self {
        Self::new()
    }
}
