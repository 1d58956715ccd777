//! SIGINT handling
//!
//! The handler only records that an interrupt arrived. Long-running steps
//! poll [`check`] and unwind with [`FetchError::Interrupted`], so scratch
//! directories and temp files are removed by their guards on the way out.
//! Child processes (git, svn) share our process group and receive the
//! signal themselves.

use super::error::{FetchError, Result};
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_sigint(_signum: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install the SIGINT handler. Called once by the binaries.
#[cfg(unix)]
pub fn install() -> std::io::Result<()> {
    let handler = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: the handler only performs an atomic store, which is async-signal-safe.
    let previous = unsafe { libc::signal(libc::SIGINT, handler) };
    if previous == libc::SIG_ERR {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn install() -> std::io::Result<()> {
    Ok(())
}

pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Return `Err(Interrupted)` if SIGINT has been received.
pub fn check() -> Result<()> {
    if is_interrupted() {
        Err(FetchError::Interrupted)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_interrupted_by_default() {
        assert!(!is_interrupted());
        assert!(check().is_ok());
    }
}
