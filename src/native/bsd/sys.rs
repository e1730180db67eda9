use std::mem;

use libc::{c_char, c_int, c_short, c_void, sockaddr, IFNAMSIZ};
#[cfg(target_os = "freebsd")]
use nix::ioctl_read;
use nix::{ioctl_readwrite, ioctl_write_ptr};

#[repr(C)]
#[derive(Copy, Clone)]
pub union ifru {
    pub addr: sockaddr,
    pub dstaddr: sockaddr,
    pub broadaddr: sockaddr,

    /// FreeBSD and DragonFly keep the high half of the flag word in `flags[1]`.
    pub flags: [c_short; 2],
    pub metric: c_int,
    pub mtu: c_int,
    pub data: *mut c_void,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ifreq {
    pub ifr_name: [c_char; IFNAMSIZ],
    pub ifr_ifru: ifru,
}

ioctl_write_ptr!(ioctl_set_flags, b'i', 16, ifreq);
ioctl_readwrite!(ioctl_get_flags, b'i', 17, ifreq);
#[cfg(target_os = "freebsd")]
ioctl_read!(ioctl_tun_get_name, b't', 93, ifreq);
#[cfg(all(
    feature = "multiaf",
    any(target_os = "freebsd", target_os = "dragonfly")
))]
ioctl_write_ptr!(ioctl_tun_set_head, b't', 96, c_int);

impl ifreq {
    pub fn new(name: &str) -> Self {
        let mut me: Self = unsafe { mem::zeroed() };
        let len = name.len().min(IFNAMSIZ - 1);
        for (dst, src) in me.ifr_name.iter_mut().zip(&name.as_bytes()[..len]) {
            *dst = *src as c_char;
        }
        me
    }

    #[cfg_attr(not(target_os = "freebsd"), allow(dead_code))]
    pub fn name(&self) -> String {
        let bytes: Vec<u8> = self
            .ifr_name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn flags(&self) -> c_int {
        let [lo, hi] = unsafe { self.ifr_ifru.flags };
        let lo = lo as u16 as c_int;
        if cfg!(any(target_os = "freebsd", target_os = "dragonfly")) {
            lo | ((hi as u16 as c_int) << 16)
        } else {
            lo
        }
    }

    pub fn set_flags(&mut self, flags: c_int) {
        let hi = if cfg!(any(target_os = "freebsd", target_os = "dragonfly")) {
            (flags >> 16) as u16 as c_short
        } else {
            0
        };
        self.ifr_ifru.flags = [flags as u16 as c_short, hi];
    }
}
