//! I/O error descriptions.
//! Enriches io::Error with the operation, the path and a platform-aware hint so a failed move
//! in the final report is diagnosable without re-running.

use std::io;
use std::path::Path;

/// Hint for a raw OS error code, if we know one.
fn os_hint(code: i32) -> Option<&'static str> {
    #[cfg(unix)]
    {
        match code {
            libc::EACCES | libc::EPERM => Some("permission denied; check ownership and write permissions"),
            libc::EXDEV => Some("cross-filesystem; destination must be on the same filesystem"),
            libc::EBUSY => Some("resource busy; ensure no other process is using the file"),
            libc::ENOENT => Some("path not found; the file may have been moved or deleted"),
            libc::EEXIST => Some("already exists"),
            libc::ENOSPC => Some("no space left on device"),
            libc::EROFS => Some("read-only filesystem"),
            libc::ENAMETOOLONG => Some("filename or path too long"),
            libc::EMFILE | libc::ENFILE => Some("too many open files"),
            _ => None,
        }
    }
    #[cfg(windows)]
    {
        match code {
            5 => Some("access denied; check permissions"),
            17 => Some("not same device; destination must be on the same volume"),
            32 => Some("sharing violation; file is in use"),
            2 | 3 => Some("path not found"),
            80 | 183 => Some("already exists"),
            112 => Some("insufficient disk space"),
            19 => Some("write protected media"),
            206 => Some("filename or path too long"),
            _ => None,
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = code;
        None
    }
}

fn kind_hint(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::PermissionDenied => Some("permission denied; check ownership and write permissions"),
        io::ErrorKind::NotFound => Some("path not found"),
        io::ErrorKind::AlreadyExists => Some("already exists"),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Some("busy or timed out"),
        _ => None,
    }
}

/// `"<op> '<path>': <error> - <hint> [os code: N]"`
pub fn describe_io_error(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    let hint = match e.raw_os_error() {
        Some(code) => os_hint(code),
        None => kind_hint(e.kind()),
    };
    if let Some(h) = hint {
        msg.push_str(" - ");
        msg.push_str(h);
    }
    if let Some(code) = e.raw_os_error() {
        msg.push_str(&format!(" [os code: {code}]"));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_op_path_and_hint() {
        let e = io::Error::from(io::ErrorKind::PermissionDenied);
        let msg = describe_io_error("rename file", Path::new("/x/y.jpg"), &e);
        assert!(msg.starts_with("rename file '/x/y.jpg'"));
        assert!(msg.contains("permission denied"));
    }

    #[cfg(unix)]
    #[test]
    fn raw_codes_get_os_hint() {
        let e = io::Error::from_raw_os_error(libc::EXDEV);
        let msg = describe_io_error("rename file", Path::new("/x"), &e);
        assert!(msg.contains("cross-filesystem"));
        assert!(msg.contains(&format!("[os code: {}]", libc::EXDEV)));
    }
}
