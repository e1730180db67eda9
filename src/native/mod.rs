#[cfg(any(
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd",
    target_os = "macos"
))]
mod bsd;
#[cfg(any(target_os = "linux", target_os = "android"))]
mod linux;

#[cfg(any(
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd",
    target_os = "macos"
))]
pub(crate) use bsd::{link_hwaddr, NamedNode as Native};
#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) use linux::{link_hwaddr, CloneDevice as Native};

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd",
    target_os = "macos"
)))]
compile_error!("tuntap supports Linux, FreeBSD, DragonFly, OpenBSD and macOS only");

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::time::{Duration, Instant};

use libc::c_int;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::ifaddrs::getifaddrs;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::socket::{socket, AddressFamily, SockFlag, SockType};
use tracing::{debug, warn};

use crate::{DeviceName, Error, HwAddr};

/// A device descriptor bound to a kernel interface.
pub(crate) struct Attached {
    pub fd: OwnedFd,
    pub name: String,
}

/// Platform attach sequence: open the device and bind it to an interface.
///
/// The returned name is the one the kernel actually bound, which can differ
/// from the requested basename.
pub(crate) trait Attach {
    fn attach(name: &DeviceName) -> Result<Attached, Error>;
}

/// Interface flag word access through a control-plane socket.
pub(crate) trait InterfaceFlags {
    fn flags(&self, name: &str) -> nix::Result<c_int>;
    fn set_flags(&self, name: &str, flags: c_int) -> nix::Result<()>;
}

/// Throwaway socket used only to issue interface ioctls.
pub(crate) struct ControlSocket(OwnedFd);

impl ControlSocket {
    pub fn new() -> Result<Self, Error> {
        socket(
            AddressFamily::Inet,
            SockType::Datagram,
            SockFlag::empty(),
            None,
        )
        .map(Self)
        .map_err(Error::SocketFailed)
    }
}

impl AsRawFd for ControlSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}

/// Sets `IFF_UP` on `name` unless it is already set. The flag is never cleared.
pub(crate) fn bring_up<F: InterfaceFlags>(ctl: &F, name: &str) -> Result<(), Error> {
    let flags = ctl
        .flags(name)
        .map_err(|source| Error::FlagQueryFailed {
            name: name.to_owned(),
            source,
        })?;

    if flags & libc::IFF_UP != 0 {
        debug!("{} is already up", name);
        return Ok(());
    }

    ctl.set_flags(name, flags | libc::IFF_UP)
        .map_err(|source| Error::FlagSetFailed {
            name: name.to_owned(),
            source,
        })?;
    debug!("{} is up", name);
    Ok(())
}

/// Looks up the link-layer address of `name` in a fresh interface snapshot.
pub(crate) fn link_address(name: &str) -> Result<Option<HwAddr>, Error> {
    let addrs = getifaddrs().map_err(Error::EnumerationFailed)?;

    for ifa in addrs.filter(|ifa| ifa.interface_name == name) {
        if let Some(link) = ifa.address.as_ref().and_then(|addr| addr.as_link_addr()) {
            return Ok(Some(link_hwaddr(link)));
        }
    }

    warn!("no link-layer address found for {}", name);
    Ok(None)
}

/// Blocks until `fd` is readable or `timeout` elapses.
///
/// A timeout too large to form a deadline waits indefinitely.
pub(crate) fn wait_readable(fd: BorrowedFd<'_>, timeout: Duration) -> Result<(), Error> {
    let deadline = Instant::now().checked_add(timeout);

    loop {
        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        let timeout = match remaining {
            Some(remaining) => {
                PollTimeout::try_from(poll_duration(remaining)).unwrap_or(PollTimeout::MAX)
            }
            None => PollTimeout::NONE,
        };

        match poll(&mut fds, timeout) {
            Ok(0) if remaining.is_some_and(|r| r.is_zero()) => return Err(Error::Timeout),
            // Clamped wait or early wakeup: the deadline is still ahead.
            Ok(0) => continue,
            Ok(_) => return Ok(()),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(Error::ReadFailed(e.into())),
        }
    }
}

/// Rounds `remaining` up to whole milliseconds, capped at what `poll` accepts.
fn poll_duration(remaining: Duration) -> Duration {
    const MAX_POLL: Duration = Duration::from_millis(i32::MAX as u64);

    if remaining >= MAX_POLL {
        return MAX_POLL;
    }
    let millis = remaining.as_nanos().div_ceil(1_000_000) as u64;
    Duration::from_millis(millis)
}

pub(crate) fn read(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    let ret = unsafe { libc::read(fd, buf.as_mut_ptr() as _, buf.len()) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

pub(crate) fn write(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    let ret = unsafe { libc::write(fd, buf.as_ptr() as _, buf.len()) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

#[cfg_attr(not(feature = "async"), allow(dead_code))]
pub(crate) fn set_nonblocking(fd: RawFd) -> Result<(), Error> {
    let flag = fcntl(fd, FcntlArg::F_GETFL)
        .map(OFlag::from_bits_retain)
        .map_err(|e| Error::IO(e.into()))?;
    let flag = OFlag::O_NONBLOCK | flag;
    fcntl(fd, FcntlArg::F_SETFL(flag)).map_err(|e| Error::IO(e.into()))?;
    Ok(())
}
