use std::os::fd::{AsRawFd, OwnedFd};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::unix::AsyncFd;
use tracing::debug;

use crate::native;
use crate::{Error, HwAddr, Interface, Kind, MAX_FRAME_LEN};

/// An opened interface driven by tokio's reactor.
#[derive(Debug)]
pub struct AsyncInterface {
    fd: Option<AsyncFd<OwnedFd>>,
    name: String,
    kind: Kind,
    hw_addr: Option<HwAddr>,
    timeout: Option<Duration>,
}

impl AsyncInterface {
    /// Takes over the descriptor of `iface` and switches it to non-blocking mode.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(mut iface: Interface) -> Result<Self, Error> {
        let fd = iface.take_fd().ok_or(Error::Closed)?;
        native::set_nonblocking(fd.as_raw_fd())?;

        Ok(Self {
            fd: Some(AsyncFd::new(fd)?),
            name: iface.name().to_owned(),
            kind: iface.kind(),
            hw_addr: iface.hw_addr(),
            timeout: iface.timeout(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn hw_addr(&self) -> Option<HwAddr> {
        self.hw_addr
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn is_closed(&self) -> bool {
        self.fd.is_none()
    }

    pub async fn recv(&self, max_len: Option<usize>) -> Result<Bytes, Error> {
        let fd = self.fd.as_ref().ok_or(Error::Closed)?;
        let len = max_len.unwrap_or(MAX_FRAME_LEN).min(MAX_FRAME_LEN);

        let buf = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, Self::read_frame(fd, len))
                .await
                .map_err(|_| Error::Timeout)??,
            None => Self::read_frame(fd, len).await?,
        };
        debug!("{} read {} bytes", self.name, buf.len());
        Ok(buf)
    }

    async fn read_frame(fd: &AsyncFd<OwnedFd>, len: usize) -> Result<Bytes, Error> {
        let mut buf = BytesMut::zeroed(len);

        loop {
            let ret = {
                let mut guard = fd.readable().await?;
                guard.try_io(|inner| native::read(inner.as_raw_fd(), &mut buf))
            };

            match ret {
                Ok(Ok(n)) => {
                    buf.truncate(n);
                    return Ok(buf.freeze());
                }
                Ok(Err(e)) => return Err(Error::ReadFailed(e)),
                Err(_would_block) => continue,
            }
        }
    }

    pub async fn send(&self, buf: &[u8]) -> Result<usize, Error> {
        let fd = self.fd.as_ref().ok_or(Error::Closed)?;

        loop {
            let mut guard = fd.writable().await?;
            match guard.try_io(|inner| native::write(inner.as_raw_fd(), buf)) {
                Ok(Ok(n)) => {
                    debug!("{} wrote {} bytes", self.name, n);
                    return Ok(n);
                }
                Ok(Err(e)) => return Err(Error::WriteFailed(e)),
                Err(_would_block) => continue,
            }
        }
    }

    /// Deregisters and closes the descriptor. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.fd.take().is_some() {
            debug!("{} closed", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::net::UnixDatagram;

    use super::*;

    fn pair(kind: Kind) -> (AsyncInterface, UnixDatagram) {
        let (a, b) = UnixDatagram::pair().unwrap();
        let mut iface = Interface::from_parts(a.into(), "tap0".to_owned(), kind);
        iface.set_timeout(Some(Duration::from_millis(50)));
        (AsyncInterface::new(iface).unwrap(), b)
    }

    #[tokio::test]
    async fn test_recv_send() {
        let (iface, peer) = pair(Kind::Tap);
        assert_eq!(iface.name(), "tap0");
        assert_eq!(iface.timeout(), Some(Duration::from_millis(50)));

        peer.send(b"frame").unwrap();
        assert_eq!(iface.recv(None).await.unwrap(), &b"frame"[..]);

        assert_eq!(iface.send(b"reply").await.unwrap(), 5);
        let mut buf = [0u8; 16];
        let n = peer.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"reply");
    }

    #[tokio::test]
    async fn test_recv_timeout() {
        let (mut iface, peer) = pair(Kind::Tun);

        assert!(matches!(iface.recv(None).await, Err(Error::Timeout)));

        peer.send(b"0123456789").unwrap();
        assert_eq!(iface.recv(Some(3)).await.unwrap(), &b"012"[..]);

        iface.set_timeout(None);
        peer.send(b"x").unwrap();
        assert_eq!(iface.recv(None).await.unwrap(), &b"x"[..]);
    }

    #[tokio::test]
    async fn test_closed() {
        let (mut iface, _peer) = pair(Kind::Tap);

        iface.close();
        iface.close();
        assert!(iface.is_closed());
        assert!(matches!(iface.recv(None).await, Err(Error::Closed)));
        assert!(matches!(iface.send(b"x").await, Err(Error::Closed)));
    }

    #[tokio::test]
    async fn test_new_from_closed() {
        let (a, _b) = UnixDatagram::pair().unwrap();
        let mut iface = Interface::from_parts(a.into(), "tun0".to_owned(), Kind::Tun);
        iface.close();

        assert!(matches!(AsyncInterface::new(iface), Err(Error::Closed)));
    }
}
