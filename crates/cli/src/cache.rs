// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text cache files read by the shell hook.
//!
//! `suggestion` holds the last top suggestion (ghost text), `last_output`
//! the last rendered result, and the presence of `off` disables the
//! suggestion path entirely.

use std::path::PathBuf;

fn cache_dir() -> PathBuf {
    clai_daemon::env::cache_dir()
}

/// True when the user switched suggestions off (`clai off`).
pub fn is_off() -> bool {
    cache_dir().join("off").exists()
}

pub fn set_off(off: bool) -> std::io::Result<()> {
    let path = cache_dir().join("off");
    if off {
        std::fs::create_dir_all(cache_dir())?;
        std::fs::write(path, b"")
    } else {
        match std::fs::remove_file(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Persist the top suggestion for the hook's ghost-text renderer.
pub fn write_suggestion(text: &str) {
    if std::fs::create_dir_all(cache_dir()).is_ok() {
        let _ = std::fs::write(cache_dir().join("suggestion"), text);
    }
}

/// Persist the last rendered output.
pub fn write_last_output(text: &str) {
    if std::fs::create_dir_all(cache_dir()).is_ok() {
        let _ = std::fs::write(cache_dir().join("last_output"), text);
    }
}

pub fn read_suggestion() -> Option<String> {
    std::fs::read_to_string(cache_dir().join("suggestion")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn off_toggle_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("CLAI_CACHE", dir.path());

        assert!(!is_off());
        set_off(true).unwrap();
        assert!(is_off());
        set_off(false).unwrap();
        assert!(!is_off());
        // Idempotent.
        set_off(false).unwrap();

        std::env::remove_var("CLAI_CACHE");
    }

    #[test]
    #[serial]
    fn suggestion_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("CLAI_CACHE", dir.path());

        write_suggestion("git push");
        assert_eq!(read_suggestion().as_deref(), Some("git push"));
        write_last_output("output");
        assert!(dir.path().join("last_output").exists());

        std::env::remove_var("CLAI_CACHE");
    }
}
