use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;

/// A path found by [`walk`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entry {
    pub path: PathBuf,
    /// Also true for links to directories,
    /// which are never descended into.
    pub is_dir: bool,
}

impl Entry {
    pub fn new<P>(path: P, is_dir: bool) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            path: path.into(),
            is_dir,
        }
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Every file and directory in `dir`,
/// and below it if `recursive`,
/// sorted by path.
///
/// Directories are read in parallel.
pub fn walk<P>(dir: P, recursive: bool) -> std::io::Result<Vec<Entry>>
where
    P: AsRef<Path>,
{
    let (sender, receiver) = crossbeam_channel::unbounded();
    let root = dir.as_ref().to_owned();
    rayon::scope(|scope| walk_inner(scope, root, recursive, sender));
    let mut entries = receiver
        .into_iter()
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_unstable();
    Ok(entries)
}

fn walk_inner<'scope>(
    scope: &rayon::Scope<'scope>,
    dir: PathBuf,
    recursive: bool,
    sender: Sender<std::io::Result<Entry>>,
) {
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            // The receiver outlives every sender.
            let _ = sender.send(Err(e));
            return;
        }
    };

    for entry in entries {
        let res = entry.and_then(|entry| {
            let path = entry.path();
            let file_type = entry.file_type()?;
            if recursive && file_type.is_dir() {
                let sender = sender.clone();
                let path = path.clone();
                scope.spawn(move |scope| walk_inner(scope, path, recursive, sender));
            }
            let is_dir = file_type.is_dir() || (file_type.is_symlink() && path.is_dir());
            Ok(Entry { path, is_dir })
        });
        let _ = sender.send(res);
    }
}
