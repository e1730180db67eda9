use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tracing::{debug, info};

use crate::native::{self, Attach, Attached, ControlSocket, Native};
use crate::{DeviceName, Error, HwAddr, Kind};

/// Largest frame moved by a single receive.
pub const MAX_FRAME_LEN: usize = 65535;

/// An open TUN or TAP interface.
///
/// The handle exclusively owns the device descriptor. Once closed, every I/O
/// and control operation fails with [`Error::Closed`]; dropping the handle
/// closes the descriptor if it is still open.
#[derive(Debug)]
pub struct Interface {
    fd: Option<OwnedFd>,
    name: String,
    kind: Kind,
    hw_addr: Option<HwAddr>,
    timeout: Option<Duration>,
}

impl Interface {
    /// Attaches to the interface named by `path`, brings it up and, for TAP,
    /// resolves its hardware address.
    ///
    /// `path` is either a bare name (`tun`, `tap0`) or a device path whose last
    /// segment follows the same convention. The kernel may bind a different name
    /// than the one requested; [`Interface::name`] reports the bound one.
    pub fn open(path: &str) -> Result<Self, Error> {
        let req = DeviceName::parse(path)?;
        let Attached { fd, name } = Native::attach(&req)?;

        let mut iface = Self::from_parts(fd, name, req.kind());
        iface.up()?;
        if iface.kind == Kind::Tap {
            iface.hw_addr = iface.hardware_address()?;
        }

        match iface.hw_addr {
            Some(addr) => info!("opened {} {} ({})", iface.kind, iface.name, addr),
            None => info!("opened {} {}", iface.kind, iface.name),
        }
        Ok(iface)
    }

    pub(crate) fn from_parts(fd: OwnedFd, name: String, kind: Kind) -> Self {
        Self {
            fd: Some(fd),
            name,
            kind,
            hw_addr: None,
            timeout: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Hardware address resolved when the interface was opened.
    pub fn hw_addr(&self) -> Option<HwAddr> {
        self.hw_addr
    }

    /// The device descriptor, for integration with the caller's own polling.
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.fd.as_ref().map(|fd| fd.as_raw_fd())
    }

    pub fn is_closed(&self) -> bool {
        self.fd.is_none()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sets the receive timeout. `None` blocks indefinitely.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Sets the receive timeout in seconds. Negative or non-finite values block
    /// indefinitely.
    pub fn set_timeout_secs(&mut self, secs: f64) {
        self.timeout = Duration::try_from_secs_f64(secs).ok();
    }

    /// Marks the interface administratively up. Already-up interfaces are left
    /// untouched.
    pub fn up(&self) -> Result<(), Error> {
        if self.fd.is_none() {
            return Err(Error::Closed);
        }
        let ctl = ControlSocket::new()?;
        native::bring_up(&ctl, &self.name)
    }

    /// Queries the current hardware address.
    ///
    /// Returns `None` for TUN interfaces, closed handles, and interfaces the
    /// kernel does not list with a link-layer address. The result is not cached.
    pub fn hardware_address(&self) -> Result<Option<HwAddr>, Error> {
        if self.fd.is_none() || self.kind != Kind::Tap {
            return Ok(None);
        }
        native::link_address(&self.name)
    }

    /// Receives one frame of at most `max_len` bytes (default and upper bound
    /// [`MAX_FRAME_LEN`]).
    pub fn recv(&self, max_len: Option<usize>) -> Result<Bytes, Error> {
        if self.fd.is_none() {
            return Err(Error::Closed);
        }
        let len = max_len.unwrap_or(MAX_FRAME_LEN).min(MAX_FRAME_LEN);

        let mut buf = BytesMut::zeroed(len);
        let n = self.recv_into(&mut buf)?;
        buf.truncate(n);
        Ok(buf.freeze())
    }

    /// Receives one frame into `buf`, using at most [`MAX_FRAME_LEN`] bytes of it.
    pub fn recv_into(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let fd = self.fd.as_ref().ok_or(Error::Closed)?;
        let len = buf.len().min(MAX_FRAME_LEN);

        if let Some(timeout) = self.timeout {
            native::wait_readable(fd.as_fd(), timeout)?;
        }

        let n = native::read(fd.as_raw_fd(), &mut buf[..len]).map_err(Error::ReadFailed)?;
        debug!("{} read {} bytes", self.name, n);
        Ok(n)
    }

    /// Writes one frame, returning the number of bytes the kernel accepted.
    pub fn send(&self, buf: &[u8]) -> Result<usize, Error> {
        let fd = self.fd.as_ref().ok_or(Error::Closed)?;

        let n = native::write(fd.as_raw_fd(), buf).map_err(Error::WriteFailed)?;
        debug!("{} wrote {} bytes", self.name, n);
        Ok(n)
    }

    /// Closes the descriptor. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.fd.take().is_some() {
            debug!("{} closed", self.name);
        }
    }

    #[cfg_attr(not(feature = "async"), allow(dead_code))]
    pub(crate) fn take_fd(&mut self) -> Option<OwnedFd> {
        self.fd.take()
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::net::UnixDatagram;
    use std::time::Instant;

    use super::*;

    fn pair(name: &str, kind: Kind) -> (Interface, UnixDatagram) {
        let (a, b) = UnixDatagram::pair().unwrap();
        b.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        (Interface::from_parts(a.into(), name.to_owned(), kind), b)
    }

    #[test]
    fn test_round_trip() {
        let (iface, peer) = pair("tap0", Kind::Tap);
        let mut buf = vec![0u8; MAX_FRAME_LEN + 1];

        for size in [0, 1, MAX_FRAME_LEN] {
            let frame: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();

            assert_eq!(iface.send(&frame).unwrap(), size);
            let n = peer.recv(&mut buf).unwrap();
            assert_eq!(&buf[..n], &frame[..]);

            peer.send(&frame).unwrap();
            assert_eq!(iface.recv(None).unwrap(), frame);
        }
    }

    #[test]
    fn test_recv_clamps_to_max_frame() {
        let (iface, peer) = pair("tun0", Kind::Tun);
        let frame = vec![0x45u8; MAX_FRAME_LEN + 4465];

        peer.send(&frame).unwrap();
        let got = iface.recv(Some(100_000)).unwrap();
        assert_eq!(got.len(), MAX_FRAME_LEN);
        assert_eq!(&got[..], &frame[..MAX_FRAME_LEN]);
    }

    #[test]
    fn test_recv_max_len() {
        let (iface, peer) = pair("tun0", Kind::Tun);

        peer.send(b"0123456789").unwrap();
        assert_eq!(iface.recv(Some(4)).unwrap(), &b"0123"[..]);

        peer.send(b"abc").unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(iface.recv_into(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn test_timeout() {
        let (mut iface, peer) = pair("tap0", Kind::Tap);
        assert_eq!(iface.timeout(), None);

        iface.set_timeout(Some(Duration::from_millis(50)));
        let start = Instant::now();
        assert!(matches!(iface.recv(None), Err(Error::Timeout)));
        assert!(start.elapsed() >= Duration::from_millis(40));

        peer.send(b"late").unwrap();
        assert_eq!(iface.recv(None).unwrap(), &b"late"[..]);

        iface.set_timeout(None);
        peer.send(b"again").unwrap();
        assert_eq!(iface.recv(None).unwrap(), &b"again"[..]);
    }

    #[test]
    fn test_recv_huge_timeout() {
        let (mut iface, peer) = pair("tap0", Kind::Tap);

        iface.set_timeout_secs(1e19);
        assert!(iface.timeout().is_some());
        peer.send(b"x").unwrap();
        assert_eq!(iface.recv(None).unwrap(), &b"x"[..]);

        iface.set_timeout(Some(Duration::MAX));
        peer.send(b"y").unwrap();
        assert_eq!(iface.recv(None).unwrap(), &b"y"[..]);
    }

    #[test]
    fn test_set_timeout_secs() {
        let (mut iface, _peer) = pair("tun0", Kind::Tun);

        let cases = [
            (1.5, Some(Duration::from_millis(1500))),
            (0.0, Some(Duration::ZERO)),
            (-1.0, None),
            (f64::NAN, None),
            (f64::INFINITY, None),
        ];

        for (secs, expected) in cases {
            iface.set_timeout_secs(secs);
            assert_eq!(iface.timeout(), expected, "{secs}");
        }
    }

    #[test]
    fn test_closed() {
        let (mut iface, _peer) = pair("tap0", Kind::Tap);
        assert!(iface.raw_fd().is_some());

        iface.close();
        assert!(iface.is_closed());
        assert_eq!(iface.raw_fd(), None);

        assert!(matches!(iface.recv(None), Err(Error::Closed)));
        assert!(matches!(iface.recv_into(&mut [0u8; 4]), Err(Error::Closed)));
        assert!(matches!(iface.send(b"frame"), Err(Error::Closed)));
        assert!(matches!(iface.up(), Err(Error::Closed)));
        assert_eq!(iface.hardware_address().unwrap(), None);

        iface.close();
        assert!(iface.is_closed());
    }

    #[test]
    fn test_hardware_address() {
        let (iface, _peer) = pair("tun0", Kind::Tun);
        assert_eq!(iface.hardware_address().unwrap(), None);
        assert_eq!(iface.hw_addr(), None);

        let (iface, _peer) = pair("tap-missing1", Kind::Tap);
        assert_eq!(iface.hardware_address().unwrap(), None);
    }

    #[test]
    fn test_send_failure() {
        let (iface, peer) = pair("tun0", Kind::Tun);
        drop(peer);

        assert!(matches!(iface.send(b"frame"), Err(Error::WriteFailed(_))));
    }
}
