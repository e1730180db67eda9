//! Host-side access to kernel TUN/TAP interfaces.
//!
//! ```no_run
//! use tuntap::Interface;
//!
//! let mut tap = Interface::open("tap0")?;
//! tap.set_timeout_secs(1.0);
//! let frame = tap.recv(None)?;
//! tap.send(&frame)?;
//! # Ok::<(), tuntap::Error>(())
//! ```

#[cfg(feature = "async")]
mod async_interface;
pub mod config;
mod error;
mod hwaddr;
mod interface;
mod name;
mod native;

#[cfg(feature = "async")]
pub use async_interface::AsyncInterface;
pub use error::Error;
pub use hwaddr::HwAddr;
pub use interface::{Interface, MAX_FRAME_LEN};
pub use name::{DeviceName, Kind, MAX_NAME_LEN};
