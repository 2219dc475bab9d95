//! Globally unique id allocation
//!
//! Region and peer ids share one id space. Ids start at 1 and are never
//! handed out twice, including across restarts of the file-backed allocator.

use crate::common::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const WATERMARK_FILE: &str = "alloc_id";

/// Issues one unique id per call.
#[async_trait]
pub trait IdAllocator: Send + Sync {
    async fn alloc(&self) -> Result<u64>;
}

/// Process-local allocator; ids restart at 1 with the process.
#[derive(Debug, Default)]
pub struct MemIdAllocator {
    last: AtomicU64,
}

impl MemIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue after `last` (the next id handed out is `last + 1`).
    pub fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }
}

#[async_trait]
impl IdAllocator for MemIdAllocator {
    async fn alloc(&self) -> Result<u64> {
        self.last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| last.checked_add(1))
            .map(|prev| prev + 1)
            .map_err(|_| Error::AllocationFailed("id space exhausted".into()))
    }
}

#[derive(Debug)]
struct Batch {
    /// Last id handed out
    base: u64,
    /// Persisted watermark; ids up to and including `end` are reserved
    end: u64,
}

/// Batch allocator persisting its high watermark to disk.
///
/// A whole batch is reserved on disk before any id from it is returned, so
/// a crash can only skip ids, never reuse them.
#[derive(Debug)]
pub struct FileIdAllocator {
    path: PathBuf,
    batch_size: u64,
    batch: Mutex<Batch>,
}

impl FileIdAllocator {
    pub async fn open(dir: impl AsRef<Path>, batch_size: u64) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("id batch size must be non-zero".into()));
        }

        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(WATERMARK_FILE);

        let end = match tokio::fs::read_to_string(&path).await {
            Ok(s) => s.trim().parse::<u64>().map_err(|e| {
                Error::AllocationFailed(format!("corrupted watermark {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Id allocator watermark at {} ({})", end, path.display());

        Ok(Self {
            path,
            batch_size,
            batch: Mutex::new(Batch { base: end, end }),
        })
    }

    /// Durably replace the watermark file with `end`.
    async fn persist(&self, end: u64) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(end.to_string().as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        sync_dir(&self.path).await
    }
}

/// Flush the directory holding `path` after a rename.
#[cfg(unix)]
async fn sync_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::File::open(dir).await?.sync_all().await?;
    }
    Ok(())
}

#[cfg(not(unix))]
async fn sync_dir(_path: &Path) -> Result<()> {
    Ok(())
}

#[async_trait]
impl IdAllocator for FileIdAllocator {
    async fn alloc(&self) -> Result<u64> {
        let mut batch = self.batch.lock().await;

        if batch.base == batch.end {
            let end = batch
                .end
                .checked_add(self.batch_size)
                .ok_or_else(|| Error::AllocationFailed("id space exhausted".into()))?;
            self.persist(end)
                .await
                .map_err(|e| Error::AllocationFailed(format!("persist watermark: {}", e)))?;
            tracing::debug!("Reserved ids {}..={}", batch.end + 1, end);
            batch.end = end;
        }

        batch.base += 1;
        Ok(batch.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_mem_allocator_is_monotonic() {
        let alloc = MemIdAllocator::new();
        assert_eq!(alloc.alloc().await.unwrap(), 1);
        assert_eq!(alloc.alloc().await.unwrap(), 2);

        let alloc = MemIdAllocator::starting_after(100);
        assert_eq!(alloc.alloc().await.unwrap(), 101);
    }

    #[tokio::test]
    async fn test_mem_allocator_exhaustion() {
        let alloc = MemIdAllocator::starting_after(u64::MAX - 1);
        assert_eq!(alloc.alloc().await.unwrap(), u64::MAX);

        // Stays exhausted instead of wrapping back to 1
        for _ in 0..2 {
            assert!(matches!(alloc.alloc().await, Err(Error::AllocationFailed(_))));
        }
    }

    #[tokio::test]
    async fn test_file_allocator_survives_restart() {
        let dir = tempdir().unwrap();

        {
            let alloc = FileIdAllocator::open(dir.path(), 10).await.unwrap();
            for expected in 1..=3 {
                assert_eq!(alloc.alloc().await.unwrap(), expected);
            }
        }

        let watermark = std::fs::read_to_string(dir.path().join(WATERMARK_FILE)).unwrap();
        assert_eq!(watermark, "10");

        // The rest of the first batch is skipped after a restart
        let alloc = FileIdAllocator::open(dir.path(), 10).await.unwrap();
        assert_eq!(alloc.alloc().await.unwrap(), 11);
    }

    #[tokio::test]
    async fn test_file_allocator_crosses_batches() {
        let dir = tempdir().unwrap();
        let alloc = FileIdAllocator::open(dir.path(), 2).await.unwrap();

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(alloc.alloc().await.unwrap());
        }
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        let watermark = std::fs::read_to_string(dir.path().join(WATERMARK_FILE)).unwrap();
        assert_eq!(watermark, "6");
    }

    #[tokio::test]
    async fn test_file_allocator_concurrent_callers() {
        let dir = tempdir().unwrap();
        let alloc = Arc::new(FileIdAllocator::open(dir.path(), 7).await.unwrap());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let alloc = alloc.clone();
            handles.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                for _ in 0..25 {
                    ids.push(alloc.alloc().await.unwrap());
                }
                ids
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(seen.insert(id), "id {} issued twice", id);
            }
        }
        assert_eq!(seen.len(), 200);
    }

    #[tokio::test]
    async fn test_file_allocator_persists_before_issuing() {
        let dir = tempdir().unwrap();
        let alloc = FileIdAllocator::open(dir.path(), 4).await.unwrap();

        assert_eq!(alloc.alloc().await.unwrap(), 1);
        let watermark = std::fs::read_to_string(dir.path().join(WATERMARK_FILE)).unwrap();
        assert_eq!(watermark, "4");
        assert!(!dir.path().join(WATERMARK_FILE).with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_file_allocator_rejects_corrupted_watermark() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(WATERMARK_FILE), "not-a-number").unwrap();
        let res = FileIdAllocator::open(dir.path(), 10).await;
        assert!(matches!(res, Err(Error::AllocationFailed(_))));
    }
}
