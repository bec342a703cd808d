//! 运行锁 - 防止多个监控进程同时读写去重状态
//!
//! 正常情况下 cron 串行调用，锁只是兜底。使用 fs2 的建议锁，
//! 进程退出（包括崩溃）时操作系统自动释放。

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 持有期间独占的运行锁
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// 尝试获取锁
    ///
    /// 已被其他进程持有时返回 `Ok(None)`
    pub fn try_acquire(path: &Path) -> Result<Option<Self>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(path = %path.display(), "Acquired run lock");
                Ok(Some(Self {
                    file,
                    path: path.to_path_buf(),
                }))
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to lock {}", path.display())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_is_rejected_until_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.lock");

        let first = RunLock::try_acquire(&path).unwrap();
        assert!(first.is_some());
        assert!(RunLock::try_acquire(&path).unwrap().is_none());

        drop(first);
        assert!(RunLock::try_acquire(&path).unwrap().is_some());
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.lock");

        let lock = RunLock::try_acquire(&path).unwrap().unwrap();
        assert_eq!(lock.path(), path.as_path());
        assert!(path.exists());
    }
}
