// src/sink.rs
// =============================================================================
// This module stores crawled pages.
//
// The output is one append-only file. Each page's rendered HTML is added to
// the end, with no separators or record format. Think of it as a log of
// everything the crawler visited.
//
// Several tasks in a layer can finish at the same time, so writes go through
// a lock: one page is written completely before the next one starts.
//
// Rust concepts:
// - tokio::fs: async file I/O that doesn't block the runtime
// - tokio::sync::Mutex: a lock that can be held across .await
// =============================================================================

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::CrawlError;

// Somewhere to put a page's rendered content
#[async_trait]
pub trait PageSink: Send + Sync {
    async fn append(&self, content: &str) -> Result<(), CrawlError>;
}

pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    // Opens (or creates) `path` for appending
    //
    // Fails right away if the destination isn't writable, so a bad --out
    // path is reported before any page is fetched.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, CrawlError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| CrawlError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(FileSink {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PageSink for FileSink {
    async fn append(&self, content: &str) -> Result<(), CrawlError> {
        let mut file = self.file.lock().await;

        let written = async {
            file.write_all(content.as_bytes()).await?;
            file.flush().await
        }
        .await;

        written.map_err(|source| CrawlError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
