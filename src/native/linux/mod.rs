mod sys;

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use libc::{c_int, IFF_NO_PI, IFF_TAP, IFF_TUN};
use nix::fcntl::{self, OFlag};
use nix::sys::socket::LinkAddr;
use nix::sys::stat::Mode;
use tracing::debug;

use crate::native::{Attach, Attached, ControlSocket, InterfaceFlags};
use crate::{DeviceName, Error, HwAddr, Kind};

const DEVICE_PATH: &str = "/dev/net/tun";

/// Every interface is created through the shared clone device with `TUNSETIFF`.
pub(crate) struct CloneDevice;

impl Attach for CloneDevice {
    fn attach(name: &DeviceName) -> Result<Attached, Error> {
        let fd = fcntl::open(DEVICE_PATH, OFlag::O_RDWR | OFlag::O_CLOEXEC, Mode::empty())
            .map(|fd| unsafe { OwnedFd::from_raw_fd(fd) })
            .map_err(|source| Error::OpenFailed {
                path: DEVICE_PATH.to_owned(),
                source,
            })?;

        // An empty name lets the kernel pick the next free tunN / tapN.
        let mut ifr = sys::new_ifreq(name.unit().map_or("", |_| name.basename()));
        let kind = match name.kind() {
            Kind::Tun => IFF_TUN,
            Kind::Tap => IFF_TAP,
        };
        sys::set_flags(&mut ifr, kind | IFF_NO_PI);

        unsafe { sys::ioctl_tun_set_iff(fd.as_raw_fd(), &mut ifr) }.map_err(|source| {
            Error::AttachFailed {
                name: name.basename().to_owned(),
                source,
            }
        })?;

        let bound = sys::ifreq_name(&ifr);
        debug!("attached {} as {}", name.basename(), bound);

        Ok(Attached { fd, name: bound })
    }
}

impl InterfaceFlags for ControlSocket {
    fn flags(&self, name: &str) -> nix::Result<c_int> {
        let mut ifr = sys::new_ifreq(name);
        unsafe { sys::ioctl_get_flags(self.as_raw_fd(), &mut ifr) }?;
        Ok(sys::get_flags(&ifr))
    }

    fn set_flags(&self, name: &str, flags: c_int) -> nix::Result<()> {
        let mut ifr = sys::new_ifreq(name);
        sys::set_flags(&mut ifr, flags);
        unsafe { sys::ioctl_set_flags(self.as_raw_fd(), &ifr) }?;
        Ok(())
    }
}

/// `AF_PACKET` entry: copy `sll_halen` bytes of `sll_addr`.
pub(crate) fn link_hwaddr(link: &LinkAddr) -> HwAddr {
    let octets = link.addr().unwrap_or_default();
    HwAddr::from_prefix(&octets[..link.halen().min(HwAddr::LEN)])
}
