use fs2::FileExt;
use std::fs::File;
use std::path::Path;

const LOCK_NAME: &str = "wlankeepd.lock";

/// Takes the single-instance lock in the local data directory.
pub fn acquire_app_lock() -> Result<File, String> {
    let dir = dirs::data_local_dir().unwrap_or(std::env::temp_dir());
    acquire_lock_in(&dir)
}

pub(crate) fn acquire_lock_in(dir: &Path) -> Result<File, String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("Failed to create lock directory: {e}"))?;
    let file = File::create(dir.join(LOCK_NAME))
        .map_err(|e| format!("Failed to create lock file: {e}"))?;

    // Exclusive lock; fails if another instance holds it
    file.try_lock_exclusive()
        .map_err(|_| "Another instance is already running".to_string())?;

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lock_is_refused_until_released() {
        let dir = tempfile::tempdir().unwrap();

        let first = acquire_lock_in(dir.path()).unwrap();
        let err = acquire_lock_in(dir.path()).unwrap_err();
        assert_eq!(err, "Another instance is already running");

        drop(first);
        assert!(acquire_lock_in(dir.path()).is_ok());
    }
}
