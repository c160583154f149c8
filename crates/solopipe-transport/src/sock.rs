use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::linux::net::SocketAddrExt;
use std::os::unix::net::{SocketAddr, UnixStream};

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Pending-connection backlog for the single-shot accept.
const BACKLOG: libc::c_int = 32;

const SUN_PATH_OFFSET: usize = std::mem::offset_of!(libc::sockaddr_un, sun_path);

/// Longest representable abstract name: `sun_path` minus the leading NUL.
pub const MAX_NAME_LEN: usize =
    std::mem::size_of::<libc::sockaddr_un>() - SUN_PATH_OFFSET - 1;

/// Bind `name` in the abstract namespace, accept exactly one peer, then stop
/// listening.
///
/// Blocks until a peer connects. The listening socket is closed as soon as
/// the connection is accepted (or on any failure), so no further connection
/// is ever accepted under this name from this call. Abstract names have no
/// filesystem presence; nothing is left behind to clean up.
pub fn serve_once(name: &str) -> Result<UnixStream> {
    let (addr, addr_len) = abstract_addr(name)?;

    // SAFETY: plain socket(2) call; the result is checked before use.
    let raw = unsafe { libc::socket(libc::AF_UNIX, libc::SOCK_STREAM | libc::SOCK_CLOEXEC, 0) };
    if raw < 0 {
        return Err(TransportError::Socket(io::Error::last_os_error()));
    }
    // SAFETY: `raw` was just returned by socket(2) and is owned by nobody else.
    // Wrapping it here makes every later exit path close it exactly once.
    let listener = unsafe { OwnedFd::from_raw_fd(raw) };

    let optval: libc::c_int = 1;
    // SAFETY: `optval` is a valid c_int and the option length matches it.
    let rc = unsafe {
        libc::setsockopt(
            listener.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            (&optval as *const libc::c_int).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        // Not fatal for an abstract address; the bind itself will arbitrate.
        debug!(name, err = %io::Error::last_os_error(), "SO_REUSEADDR not applied");
    }

    // SAFETY: `addr` is fully initialized and `addr_len` covers the family
    // field plus the NUL-prefixed name.
    let rc = unsafe {
        libc::bind(
            listener.as_raw_fd(),
            (&addr as *const libc::sockaddr_un).cast::<libc::sockaddr>(),
            addr_len,
        )
    };
    if rc != 0 {
        return Err(TransportError::Bind {
            name: name.to_string(),
            source: io::Error::last_os_error(),
        });
    }

    // SAFETY: `listener` is a bound socket descriptor.
    let rc = unsafe { libc::listen(listener.as_raw_fd(), BACKLOG) };
    if rc != 0 {
        return Err(TransportError::Listen {
            name: name.to_string(),
            source: io::Error::last_os_error(),
        });
    }
    info!(name, backlog = BACKLOG, "listening on abstract socket");

    // SAFETY: accept4(2) with no peer-address out-parameters.
    let conn = unsafe {
        libc::accept4(
            listener.as_raw_fd(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            libc::SOCK_CLOEXEC,
        )
    };
    if conn < 0 {
        return Err(TransportError::Accept(io::Error::last_os_error()));
    }
    info!(name, "peer connected, closing listener");

    // SAFETY: `conn` was just returned by accept4(2) as a connected descriptor.
    let stream = unsafe { UnixStream::from_raw_fd(conn) };
    Ok(stream)
    // `listener` drops here: the name stops accepting connections for good.
}

/// Connect to a pipe another process is serving under `name`.
pub fn connect(name: &str) -> Result<UnixStream> {
    if name.len() > MAX_NAME_LEN {
        return Err(TransportError::NameTooLong {
            name: name.to_string(),
            len: name.len(),
            max: MAX_NAME_LEN,
        });
    }

    let addr = SocketAddr::from_abstract_name(name.as_bytes()).map_err(|source| {
        TransportError::Connect {
            name: name.to_string(),
            source,
        }
    })?;
    let stream = UnixStream::connect_addr(&addr).map_err(|source| TransportError::Connect {
        name: name.to_string(),
        source,
    })?;
    debug!(name, "connected to abstract socket");
    Ok(stream)
}

/// Build a `sockaddr_un` whose path is `name` prefixed by a NUL byte, the
/// Linux abstract-namespace convention. The returned length covers only the
/// family field, the NUL, and the name, so trailing path bytes are not part
/// of the address.
fn abstract_addr(name: &str) -> Result<(libc::sockaddr_un, libc::socklen_t)> {
    let bytes = name.as_bytes();
    if bytes.len() > MAX_NAME_LEN {
        return Err(TransportError::NameTooLong {
            name: name.to_string(),
            len: bytes.len(),
            max: MAX_NAME_LEN,
        });
    }

    // SAFETY: sockaddr_un is plain old data; all-zeroes is a valid value.
    let mut addr: libc::sockaddr_un = unsafe { std::mem::zeroed() };
    addr.sun_family = libc::AF_UNIX as libc::sa_family_t;
    for (dst, src) in addr.sun_path[1..=bytes.len()].iter_mut().zip(bytes) {
        *dst = *src as libc::c_char;
    }

    let len = (SUN_PATH_OFFSET + 1 + bytes.len()) as libc::socklen_t;
    Ok((addr, len))
}
