use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::Error;

/// Interface names are stored in a fixed `IFNAMSIZ` buffer, terminator included.
pub const MAX_NAME_LEN: usize = libc::IFNAMSIZ - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Layer 3: raw IP packets.
    Tun,
    /// Layer 2: Ethernet frames, carries a hardware address.
    Tap,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Tun => "tun",
            Kind::Tap => "tap",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated open request: the caller's path plus the classified basename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceName {
    path: String,
    basename: String,
    kind: Kind,
}

impl DeviceName {
    /// Classifies `path` by the prefix of its final segment.
    ///
    /// Accepted basenames are `tun[0-9]*` and `tap[0-9]*`, short enough to fit
    /// the kernel's interface name buffer.
    pub fn parse(path: &str) -> Result<Self, Error> {
        let basename = match path.rfind('/') {
            Some(i) => &path[i + 1..],
            None => path,
        };

        let kind = if basename.starts_with("tun") {
            Kind::Tun
        } else if basename.starts_with("tap") {
            Kind::Tap
        } else {
            return Err(Error::InvalidKind(basename.to_owned()));
        };

        if !name_regex().is_match(basename) {
            return Err(Error::InvalidName(basename.to_owned()));
        }
        if basename.len() > MAX_NAME_LEN {
            return Err(Error::NameTooLong(basename.to_owned()));
        }

        Ok(Self {
            path: path.to_owned(),
            basename: basename.to_owned(),
            kind,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Numeric suffix after the prefix, if the caller asked for a specific unit.
    pub fn unit(&self) -> Option<&str> {
        match &self.basename[3..] {
            "" => None,
            unit => Some(unit),
        }
    }

    pub fn has_separator(&self) -> bool {
        self.path.contains('/')
    }
}

#[inline]
fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:tun|tap)[0-9]*$").expect("name pattern is valid"))
}
