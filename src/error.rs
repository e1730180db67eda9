use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("neither a TUN nor TAP device specified: \"{0}\"")]
    InvalidKind(String),
    #[error("the name \"{0}\" is invalid")]
    InvalidName(String),
    #[error("the interface name \"{0}\" is too long")]
    NameTooLong(String),
    #[error("could not open device \"{path}\": {source}")]
    OpenFailed { path: String, source: nix::Error },
    #[error("failed to configure {name} tunnel: {source}")]
    AttachFailed { name: String, source: nix::Error },
    #[error("socket failed: {0}")]
    SocketFailed(nix::Error),
    #[error("getting up flag on interface {name} failed: {source}")]
    FlagQueryFailed { name: String, source: nix::Error },
    #[error("setting up flag on interface {name} failed: {source}")]
    FlagSetFailed { name: String, source: nix::Error },
    #[error("get interface information failed: {0}")]
    EnumerationFailed(nix::Error),
    #[error("closed")]
    Closed,
    #[error("timeout")]
    Timeout,
    #[error("read failed: {0}")]
    ReadFailed(io::Error),
    #[error("write failed: {0}")]
    WriteFailed(io::Error),
    #[error("system call failed: {0}")]
    IO(#[from] io::Error),
}
