use std::{
    fs::{create_dir_all, read_dir, symlink_metadata, File},
    path::{Path, PathBuf},
};

use crate::Tag;

pub fn with_temp_dir<F, R>(f: F) -> R
where
    F: FnOnce(&Path) -> R,
{
    let dir = tempfile::tempdir().unwrap();
    f(dir.path())
}

pub fn tag(s: &str) -> Tag {
    Tag::new(s.to_owned()).unwrap()
}

pub fn create_files_relative_to<P, Q>(dir: P, paths: impl IntoIterator<Item = Q>)
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    for path in paths {
        make_file_and_parent(dir.as_ref().join(path));
    }
}

pub fn make_file_and_parent<P>(path: P)
where
    P: AsRef<Path>,
{
    if let Some(parent) = path.as_ref().parent() {
        create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap();
}

/// Every leaf under `dir`,
/// relative to `dir`.
///
/// Links are leaves,
/// even when they point to directories.
pub fn list_files<P>(dir: P) -> Vec<PathBuf>
where
    P: AsRef<Path>,
{
    let root = dir.as_ref();
    let mut queue = vec![root.to_owned()];
    let mut files = Vec::new();
    while let Some(path) = queue.pop() {
        let is_dir = symlink_metadata(&path).unwrap().is_dir();
        if is_dir && read_dir(&path).unwrap().next().is_some() {
            queue.extend(read_dir(&path).unwrap().map(|entry| entry.unwrap().path()));
        } else if path != root {
            files.push(path.strip_prefix(root).unwrap().to_owned());
        }
    }
    files.sort();
    files
}
