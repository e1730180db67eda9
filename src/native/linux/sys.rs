use std::mem;

use libc::{c_char, c_int, ifreq};
use nix::{ioctl_read_bad, ioctl_readwrite_bad, ioctl_write_ptr_bad, request_code_write};

ioctl_readwrite_bad!(
    ioctl_tun_set_iff,
    request_code_write!(b'T', 202, mem::size_of::<c_int>()),
    ifreq
);
ioctl_read_bad!(ioctl_get_flags, libc::SIOCGIFFLAGS, ifreq);
ioctl_write_ptr_bad!(ioctl_set_flags, libc::SIOCSIFFLAGS, ifreq);

/// Zeroed `ifreq` carrying `name`. The name must leave room for the terminator.
pub fn new_ifreq(name: &str) -> ifreq {
    let mut ifr: ifreq = unsafe { mem::zeroed() };
    let ifr_name: Vec<c_char> = name.as_bytes().iter().map(|c| *c as _).collect();
    let len = ifr_name.len().min(ifr.ifr_name.len() - 1);
    ifr.ifr_name[..len].copy_from_slice(&ifr_name[..len]);
    ifr
}

pub fn ifreq_name(ifr: &ifreq) -> String {
    let bytes: Vec<u8> = ifr
        .ifr_name
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn get_flags(ifr: &ifreq) -> c_int {
    unsafe { ifr.ifr_ifru.ifru_flags as u16 as c_int }
}

pub fn set_flags(ifr: &mut ifreq, flags: c_int) {
    ifr.ifr_ifru.ifru_flags = flags as u16 as _;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ifreq_name() {
        let cases = ["", "tun0", "tap", "tap012345678901"];

        for name in cases {
            assert_eq!(ifreq_name(&new_ifreq(name)), name);
        }

        let ifr = new_ifreq("tun0123456789012345");
        assert_eq!(ifreq_name(&ifr).len(), libc::IFNAMSIZ - 1);
    }

    #[test]
    fn test_flags() {
        let mut ifr = new_ifreq("tap0");
        assert_eq!(get_flags(&ifr), 0);

        set_flags(&mut ifr, libc::IFF_UP | libc::IFF_BROADCAST | libc::IFF_MULTICAST);
        assert_eq!(
            get_flags(&ifr),
            libc::IFF_UP | libc::IFF_BROADCAST | libc::IFF_MULTICAST
        );
        assert_eq!(ifreq_name(&ifr), "tap0");
    }

    #[test]
    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    fn test_tun_set_iff_request() {
        assert_eq!(request_code_write!(b'T', 202, mem::size_of::<c_int>()), 0x400454ca);
    }
}
