use std::path::{Path, PathBuf};

use crate::{
    link::{self, remove_link, RemoveLinkError},
    tagged_name,
    walk::{walk, Entry},
    LinkError, LinkRecord, LinkStatus, LinkStrategy, Vocabulary,
    CONTROLLED_VOCABULARY_FILENAME,
};

/// Everything tagging needs from a storage backend.
///
/// Name handling has default implementations;
/// backends only provide filesystem primitives.
pub trait TagService: Send + Sync {
    fn add_tag(&self, filename: &str, tag: &str) -> String {
        tagged_name::add_tag(filename, tag)
    }

    fn remove_tag(&self, filename: &str, tag: &str) -> String {
        tagged_name::remove_tag(filename, tag)
    }

    fn extract_tags(&self, filename: &str) -> Vec<String> {
        tagged_name::extract_tags(filename)
    }

    /// How this backend makes links.
    fn link_strategy(&self) -> LinkStrategy;

    /// Entries of `dir`,
    /// and of every directory below it if `recursive`,
    /// sorted by path.
    fn walk(&self, dir: &Path, recursive: bool) -> std::io::Result<Vec<Entry>>;

    /// Whether anything exists at `path`,
    /// without following links.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is a directory,
    /// following links.
    fn is_dir(&self, path: &Path) -> bool;

    /// Succeeds if the directory already exists.
    fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    fn remove_dir_all(&self, path: &Path) -> std::io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()>;

    fn create_link(
        &self,
        source: &Path,
        destination: &Path,
        overwrite: bool,
    ) -> Result<LinkRecord, LinkError>;

    fn resolve_link(&self, path: &Path) -> std::io::Result<LinkStatus>;

    fn remove_link(&self, path: &Path) -> std::io::Result<()>;

    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;

    /// The vocabulary file in `start`,
    /// or in the directory of `start` if it is not a directory,
    /// or in the nearest parent directory.
    fn locate_vocabulary(&self, start: &Path) -> Option<PathBuf> {
        let dir = if self.is_dir(start) {
            start
        } else {
            start.parent()?
        };
        dir.ancestors()
            .map(|dir| dir.join(CONTROLLED_VOCABULARY_FILENAME))
            .find(|path| self.exists(path) && !self.is_dir(path))
    }

    fn load_vocabulary(&self, start: &Path) -> std::io::Result<Option<Vocabulary>> {
        self.locate_vocabulary(start)
            .map(|path| -> std::io::Result<Vocabulary> {
                Ok(Vocabulary::parse(&self.read_to_string(&path)?).with_path(path))
            })
            .transpose()
    }
}

/// The local filesystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalFilesystem {
    strategy: LinkStrategy,
}

impl LocalFilesystem {
    pub fn new(strategy: LinkStrategy) -> Self {
        Self { strategy }
    }
}

impl Default for LocalFilesystem {
    fn default() -> Self {
        Self::new(LinkStrategy::select(false))
    }
}

impl TagService for LocalFilesystem {
    fn link_strategy(&self) -> LinkStrategy {
        self.strategy
    }

    fn walk(&self, dir: &Path, recursive: bool) -> std::io::Result<Vec<Entry>> {
        walk(dir, recursive)
    }

    fn exists(&self, path: &Path) -> bool {
        std::fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        // `rename` silently replaces files on most platforms.
        if from != to && self.exists(to) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!(
                    "cannot move `{}` to `{}`, destination already exists",
                    from.display(),
                    to.display()
                ),
            ));
        }
        std::fs::rename(from, to)
    }

    fn create_link(
        &self,
        source: &Path,
        destination: &Path,
        overwrite: bool,
    ) -> Result<LinkRecord, LinkError> {
        link::create_link(source, destination, self.strategy, overwrite)
    }

    fn resolve_link(&self, path: &Path) -> std::io::Result<LinkStatus> {
        link::resolve_link(path)
    }

    fn remove_link(&self, path: &Path) -> std::io::Result<()> {
        remove_link(path).map_err(|e| match e {
            RemoveLinkError::NotALink => std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("`{}` is not a link", path.display()),
            ),
            RemoveLinkError::Filesystem(e) => e,
        })
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// `path` relative to the working directory,
/// without resolving links.
pub(crate) fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_owned())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{create_files_relative_to, with_temp_dir};

    use super::*;

    #[test]
    fn locate_vocabulary_searches_parent_directories() {
        with_temp_dir(|dir| {
            create_files_relative_to(dir, [".filetags", "a/b/x.txt"]);
            let service = LocalFilesystem::default();
            assert_eq!(
                service.locate_vocabulary(&dir.join("a/b/x.txt")),
                Some(dir.join(".filetags"))
            );
            assert_eq!(
                service.locate_vocabulary(&dir.join("a/b")),
                Some(dir.join(".filetags"))
            );
        })
    }

    #[test]
    fn locate_vocabulary_prefers_nearest_file() {
        with_temp_dir(|dir| {
            create_files_relative_to(dir, [".filetags", "a/.filetags"]);
            assert_eq!(
                LocalFilesystem::default().locate_vocabulary(&dir.join("a")),
                Some(dir.join("a/.filetags"))
            );
        })
    }

    #[test]
    fn load_vocabulary_reads_the_file() {
        with_temp_dir(|dir| {
            std::fs::write(dir.join(".filetags"), "x y\nz\n").unwrap();
            let vocabulary = LocalFilesystem::default()
                .load_vocabulary(dir)
                .unwrap()
                .unwrap();
            assert_eq!(vocabulary.path(), Some(dir.join(".filetags").as_path()));
            assert_eq!(vocabulary.tags(), ["x", "y", "z"]);
        })
    }

    #[test]
    fn rename_does_not_replace_existing_files() {
        with_temp_dir(|dir| {
            create_files_relative_to(dir, ["a", "b"]);
            let service = LocalFilesystem::default();
            assert!(service.rename(&dir.join("a"), &dir.join("b")).is_err());
            assert!(service.exists(&dir.join("a")));
        })
    }

    #[test]
    fn absolute_keeps_absolute_paths() {
        with_temp_dir(|dir| {
            assert_eq!(absolute(dir).unwrap(), dir);
        })
    }
}
