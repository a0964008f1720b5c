use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{TagCount, TagService};

/// Tag counts of scanned directories,
/// kept for the lifetime of the index.
#[derive(Debug, Default)]
pub struct TagIndex {
    cache: Mutex<FxHashMap<(PathBuf, bool), TagCount>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count tags in the names of files and directories in `start_dir`,
    /// and below it if `recursive`.
    ///
    /// Each directory is walked at most once.
    pub fn scan<S>(
        &self,
        service: &S,
        start_dir: &Path,
        recursive: bool,
    ) -> std::io::Result<TagCount>
    where
        S: TagService + ?Sized,
    {
        let key = (start_dir.to_owned(), recursive);
        if let Some(count) = self.lock().get(&key) {
            debug!("Using cached tags of `{}`", start_dir.display());
            return Ok(count.clone());
        }

        let mut count = TagCount::new();
        for entry in service.walk(start_dir, recursive)? {
            count.add_all(service.extract_tags(&entry.name()));
        }
        self.lock().insert(key, count.clone());
        Ok(count)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<(PathBuf, bool), TagCount>> {
        // A poisoned cache is still a valid cache.
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
