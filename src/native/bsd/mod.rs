mod sys;

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use libc::c_int;
use nix::fcntl::{self, OFlag};
use nix::sys::socket::LinkAddr;
use nix::sys::stat::Mode;
use tracing::debug;

use crate::native::{Attach, Attached, ControlSocket, InterfaceFlags};
use crate::{DeviceName, Error, HwAddr, Kind};

const DEVICE_DIR: &str = "/dev";

/// Each interface has its own device node, opened by path.
pub(crate) struct NamedNode;

impl NamedNode {
    fn device_path(name: &DeviceName) -> String {
        if name.has_separator() {
            name.path().to_owned()
        } else {
            format!("{}/{}", DEVICE_DIR, name.basename())
        }
    }
}

impl Attach for NamedNode {
    fn attach(name: &DeviceName) -> Result<Attached, Error> {
        let path = Self::device_path(name);
        let fd = fcntl::open(path.as_str(), OFlag::O_RDWR | OFlag::O_CLOEXEC, Mode::empty())
            .map(|fd| unsafe { OwnedFd::from_raw_fd(fd) })
            .map_err(|source| Error::OpenFailed {
                path: path.clone(),
                source,
            })?;

        if name.kind() == Kind::Tun {
            enable_multiaf(&fd).map_err(|source| Error::AttachFailed {
                name: name.basename().to_owned(),
                source,
            })?;
        }
        let bound = bound_name(&fd, name).map_err(|source| Error::AttachFailed {
            name: name.basename().to_owned(),
            source,
        })?;
        debug!("opened {} as {}", path, bound);

        Ok(Attached { fd, name: bound })
    }
}

/// Cloning nodes (`/dev/tun`, `/dev/tap`) bind the next free unit; ask the
/// driver which one.
#[cfg(target_os = "freebsd")]
fn bound_name(fd: &OwnedFd, _name: &DeviceName) -> nix::Result<String> {
    let mut ifr = sys::ifreq::new("");
    unsafe { sys::ioctl_tun_get_name(fd.as_raw_fd(), &mut ifr) }?;
    Ok(ifr.name())
}

#[cfg(not(target_os = "freebsd"))]
fn bound_name(_fd: &OwnedFd, name: &DeviceName) -> nix::Result<String> {
    Ok(name.basename().to_owned())
}

/// Prefix every TUN frame with its 4-byte address family.
#[cfg(all(
    feature = "multiaf",
    any(target_os = "freebsd", target_os = "dragonfly")
))]
fn enable_multiaf(fd: &OwnedFd) -> nix::Result<()> {
    let on: c_int = 1;
    unsafe { sys::ioctl_tun_set_head(fd.as_raw_fd(), &on) }?;
    debug!("multi-af mode enabled");
    Ok(())
}

#[cfg(not(all(
    feature = "multiaf",
    any(target_os = "freebsd", target_os = "dragonfly")
)))]
fn enable_multiaf(_fd: &OwnedFd) -> nix::Result<()> {
    Ok(())
}

impl InterfaceFlags for ControlSocket {
    fn flags(&self, name: &str) -> nix::Result<c_int> {
        let mut ifr = sys::ifreq::new(name);
        unsafe { sys::ioctl_get_flags(self.as_raw_fd(), &mut ifr) }?;
        Ok(ifr.flags())
    }

    fn set_flags(&self, name: &str, flags: c_int) -> nix::Result<()> {
        let mut ifr = sys::ifreq::new(name);
        ifr.set_flags(flags);
        unsafe { sys::ioctl_set_flags(self.as_raw_fd(), &ifr) }?;
        Ok(())
    }
}

/// `AF_LINK` entry: copy `sdl_alen` bytes following the name in `sdl_data`.
pub(crate) fn link_hwaddr(link: &LinkAddr) -> HwAddr {
    let octets = link.addr().unwrap_or_default();
    HwAddr::from_prefix(&octets[..link.alen().min(HwAddr::LEN)])
}
