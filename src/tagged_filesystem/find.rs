use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::{TagCount, TagRef, CONTROLLED_VOCABULARY_FILENAME};

use super::*;

impl<S> TaggedFilesystem<S>
where
    S: TagService,
{
    /// Files in `dir`,
    /// and below it if `recursive`,
    /// excluding directories and vocabulary files.
    pub fn files(&self, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, Error> {
        if !self.service.is_dir(dir) {
            return Err(UserInputError::NotADirectory(dir.to_owned()).into());
        }
        Ok(self
            .service
            .walk(dir, recursive)?
            .into_iter()
            .filter(|entry| !entry.is_dir && entry.name() != CONTROLLED_VOCABULARY_FILENAME)
            .map(|entry| entry.path)
            .collect())
    }

    /// Files of `files` with every tag of `required`,
    /// in their original order.
    ///
    /// Only the file name is considered,
    /// not tags of parent directories.
    pub fn filter_by_tags<T>(&self, files: &[PathBuf], required: &[T]) -> Vec<PathBuf>
    where
        T: AsRef<TagRef>,
    {
        files
            .iter()
            .filter(|file| {
                let tags = file
                    .file_name()
                    .map(|name| self.service.extract_tags(&name.to_string_lossy()))
                    .unwrap_or_default();
                required
                    .iter()
                    .all(|tag| tags.iter().any(|x| x == tag.as_ref().as_str()))
            })
            .cloned()
            .collect()
    }

    /// Tags of every file and directory name in `start_dir`,
    /// and below it if `recursive`.
    pub fn list_tags(&self, start_dir: &Path, recursive: bool) -> Result<TagCount, Error> {
        if !self.service.is_dir(start_dir) {
            return Err(UserInputError::NotADirectory(start_dir.to_owned()).into());
        }
        Ok(self.index.scan(&self.service, start_dir, recursive)?)
    }

    /// Tags every file of `files` has,
    /// in the order of the first file.
    pub fn common_tags(&self, files: &[PathBuf]) -> Vec<String> {
        let mut tag_sets = files.iter().map(|file| {
            file.file_name()
                .map(|name| self.service.extract_tags(&name.to_string_lossy()))
                .unwrap_or_default()
        });
        let Some(first) = tag_sets.next() else {
            return Vec::new();
        };
        let rest = tag_sets.collect_vec();
        first
            .into_iter()
            .unique()
            .filter(|tag| rest.iter().all(|tags| tags.contains(tag)))
            .collect()
    }
}
