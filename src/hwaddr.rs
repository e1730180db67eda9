use std::fmt;

/// 48-bit link-layer address of a TAP interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HwAddr([u8; HwAddr::LEN]);

impl HwAddr {
    pub const LEN: usize = 6;

    pub const fn new(octets: [u8; Self::LEN]) -> Self {
        Self(octets)
    }

    /// Copies at most six bytes of `bytes`, zero-padding a shorter address.
    pub fn from_prefix(bytes: &[u8]) -> Self {
        let mut octets = [0u8; Self::LEN];
        let n = bytes.len().min(Self::LEN);
        octets[..n].copy_from_slice(&bytes[..n]);
        Self(octets)
    }

    pub fn octets(&self) -> [u8; Self::LEN] {
        self.0
    }

    /// The address as a big-endian 48-bit integer.
    pub fn to_u64(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
    }
}

impl From<[u8; HwAddr::LEN]> for HwAddr {
    fn from(octets: [u8; HwAddr::LEN]) -> Self {
        Self(octets)
    }
}

impl From<HwAddr> for u64 {
    fn from(addr: HwAddr) -> Self {
        addr.to_u64()
    }
}

impl fmt::Display for HwAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}
