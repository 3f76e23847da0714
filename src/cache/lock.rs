//! Advisory file locks for cache entries.
//!
//! Two `vic` processes installing the same package version into the same store
//! directory would otherwise race and leave a half-written entry behind. Every
//! install therefore holds an exclusive OS-level lock on
//!
//! ```text
//! {store_dir}/.locks/{lock_name}.lock
//! ```
//!
//! where `lock_name` is derived from the cache entry (`{prefix}@{version}`).
//! Locks on different entries never block each other. The lock is released when
//! the [`CacheLock`] is dropped; lock files themselves are left in place and are
//! pruned by [`cleanup_stale_locks`] after each install.

use crate::constants::{LOCKS_DIR_NAME, MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS};
use crate::core::{Result, VicError};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, warn};

/// An exclusive lock on one cache entry.
#[derive(Debug)]
pub struct CacheLock {
    file: Arc<File>,
    path: PathBuf,
}

impl CacheLock {
    /// Acquires the lock named `lock_name` under `store_dir`, waiting at most `timeout`.
    ///
    /// Polls with exponential backoff (10ms, capped at 500ms) so the async
    /// runtime is never blocked on the OS lock call.
    ///
    /// # Errors
    ///
    /// [`VicError::CacheDirUnwritable`] if the locks directory or lock file
    /// cannot be created, [`VicError::CacheLockTimeout`] if another holder keeps
    /// the lock past `timeout`.
    pub async fn acquire(store_dir: &Path, lock_name: &str, timeout: Duration) -> Result<Self> {
        let locks_dir = store_dir.join(LOCKS_DIR_NAME);
        tokio::fs::create_dir_all(&locks_dir).await.map_err(|e| VicError::CacheDirUnwritable {
            path: locks_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let lock_path = locks_dir.join(format!("{}.lock", sanitize_lock_name(lock_name)));
        let open_path = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&open_path)
        })
        .await
        .map_err(|e| VicError::Other {
            message: format!("Lock task failed: {e}"),
        })?
        .map_err(|e| VicError::CacheDirUnwritable {
            path: lock_path.display().to_string(),
            reason: e.to_string(),
        })?;
        let file = Arc::new(file);

        let start = std::time::Instant::now();
        let backoff = ExponentialBackoff::from_millis(2)
            .factor(STARTING_BACKOFF_DELAY_MS / 2)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));
        let mut contended = false;

        for delay in backoff {
            let candidate = Arc::clone(&file);
            let locked = tokio::task::spawn_blocking(move || candidate.try_lock_exclusive())
                .await
                .map_err(|e| VicError::Other {
                    message: format!("Lock task failed: {e}"),
                })?;

            if let Ok(true) = locked {
                debug!(
                    lock = %lock_path.display(),
                    wait_ms = start.elapsed().as_millis(),
                    "Cache lock acquired"
                );
                return Ok(Self {
                    file,
                    path: lock_path,
                });
            }

            if !contended {
                contended = true;
                debug!("Waiting for cache lock {}", lock_path.display());
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(delay.min(remaining)).await;
        }

        Err(VicError::CacheLockTimeout {
            path: lock_path.display().to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(self.file.as_ref()) {
            warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}

/// Lock names end up as file names; keep them to one path segment.
fn sanitize_lock_name(name: &str) -> String {
    name.chars().map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c }).collect()
}

/// Removes lock files older than `ttl` from the store's locks directory.
///
/// Lock files outlive the processes that created them. A file is only removed
/// if nobody holds its lock at the time of the check.
///
/// # Errors
///
/// Returns an error if the locks directory exists but cannot be read.
pub async fn cleanup_stale_locks(store_dir: &Path, ttl: Duration) -> anyhow::Result<usize> {
    use anyhow::Context;
    use std::time::SystemTime;
    use tokio::fs;

    let locks_dir = store_dir.join(LOCKS_DIR_NAME);
    if !crate::utils::fs::is_dir(&locks_dir).await {
        return Ok(0);
    }

    let mut removed_count = 0;
    let now = SystemTime::now();

    let mut entries = fs::read_dir(&locks_dir).await.context("Failed to read locks directory")?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        if path.extension().and_then(|s| s.to_str()) != Some("lock") {
            continue;
        }

        let Ok(modified) = entry.metadata().await.and_then(|m| m.modified()) else {
            continue;
        };

        if let Ok(age) = now.duration_since(modified)
            && age > ttl
            && remove_if_unheld(path.clone()).await
        {
            debug!("Removed stale lock {}", path.display());
            removed_count += 1;
        }
    }

    Ok(removed_count)
}

/// Delete the lock file at `path` while holding its lock, if it is free.
async fn remove_if_unheld(path: PathBuf) -> bool {
    tokio::task::spawn_blocking(move || {
        let Ok(file) = OpenOptions::new().write(true).open(&path) else {
            return false;
        };
        if !matches!(file.try_lock_exclusive(), Ok(true)) {
            return false;
        }
        if cfg!(windows) {
            // open files cannot be deleted on Windows
            drop(file);
            return std::fs::remove_file(&path).is_ok();
        }
        let removed = std::fs::remove_file(&path).is_ok();
        let _ = FileExt::unlock(&file);
        removed
    })
    .await
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn test_cache_lock_acquire_and_release() {
        let temp_dir = TempDir::new().unwrap();
        let store = temp_dir.path();

        let lock = CacheLock::acquire(store, "_scope_pkg@1.2.3", Duration::from_secs(5))
            .await
            .unwrap();

        let lock_path = store.join(".locks").join("_scope_pkg@1.2.3.lock");
        assert_eq!(lock.path(), lock_path);
        assert!(lock_path.exists());

        drop(lock);

        // the lock file stays, only the OS lock is released
        assert!(lock_path.exists());
        let _again = CacheLock::acquire(store, "_scope_pkg@1.2.3", Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cache_lock_name_is_single_segment() {
        let temp_dir = TempDir::new().unwrap();
        let lock = CacheLock::acquire(temp_dir.path(), "scope/pkg@1.0.0", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(lock.path().file_name().unwrap(), "scope_pkg@1.0.0.lock");
    }

    #[tokio::test]
    async fn test_cache_lock_exclusive_blocking() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(temp_dir.path().to_path_buf());
        let barrier = Arc::new(Barrier::new(2));

        let store1 = Arc::clone(&store);
        let barrier1 = Arc::clone(&barrier);
        let holder = tokio::spawn(async move {
            let _lock = CacheLock::acquire(&store1, "entry", Duration::from_secs(5)).await.unwrap();
            barrier1.wait().await;
            tokio::time::sleep(Duration::from_millis(150)).await;
        });

        let store2 = Arc::clone(&store);
        let waiter = tokio::spawn(async move {
            barrier.wait().await;
            let start = Instant::now();
            let _lock = CacheLock::acquire(&store2, "entry", Duration::from_secs(5)).await.unwrap();
            assert!(start.elapsed() >= Duration::from_millis(50));
        });

        holder.await.unwrap();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_cache_lock_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let _held = CacheLock::acquire(temp_dir.path(), "busy", Duration::from_secs(5))
            .await
            .unwrap();

        let err = CacheLock::acquire(temp_dir.path(), "busy", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, VicError::CacheLockTimeout { .. }));
    }

    #[tokio::test]
    async fn test_different_entries_do_not_block() {
        let temp_dir = TempDir::new().unwrap();
        let _a = CacheLock::acquire(temp_dir.path(), "a@1.0.0", Duration::from_secs(5))
            .await
            .unwrap();

        let start = Instant::now();
        let _b = CacheLock::acquire(temp_dir.path(), "a@2.0.0", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    fn age_lock_file(path: &Path, age: Duration) {
        let file = OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(std::time::SystemTime::now() - age).unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_stale_locks() {
        let temp_dir = TempDir::new().unwrap();
        let ttl = Duration::from_secs(60);
        assert_eq!(cleanup_stale_locks(temp_dir.path(), ttl).await.unwrap(), 0);

        let locks = temp_dir.path().join(".locks");
        std::fs::create_dir_all(&locks).unwrap();
        for name in ["old.lock", "fresh.lock", "keep.txt"] {
            std::fs::write(locks.join(name), "").unwrap();
        }
        age_lock_file(&locks.join("old.lock"), Duration::from_secs(3600));
        age_lock_file(&locks.join("keep.txt"), Duration::from_secs(3600));

        let removed = cleanup_stale_locks(temp_dir.path(), ttl).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!locks.join("old.lock").exists());
        assert!(locks.join("fresh.lock").exists());
        assert!(locks.join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_cleanup_skips_held_locks() {
        let temp_dir = TempDir::new().unwrap();
        let held = CacheLock::acquire(temp_dir.path(), "held@1.0.0", Duration::from_secs(5))
            .await
            .unwrap();
        age_lock_file(held.path(), Duration::from_secs(3600));

        let removed = cleanup_stale_locks(temp_dir.path(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(removed, 0);
        assert!(held.path().exists());

        let path = held.path().to_path_buf();
        drop(held);
        assert_eq!(cleanup_stale_locks(temp_dir.path(), Duration::from_secs(60)).await.unwrap(), 1);
        assert!(!path.exists());
    }
}
