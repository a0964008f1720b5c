use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use crate::{
    Entry, LinkError, LinkKind, LinkRecord, LinkStatus, LinkStrategy, TagService,
    TaggedFilesystem, TaggedFilesystemBuilder,
};

pub fn tagged_filesystem() -> TaggedFilesystem {
    TaggedFilesystemBuilder::new().build()
}

pub fn memory_filesystem<P>(files: impl IntoIterator<Item = P>) -> TaggedFilesystem<MemoryService>
where
    P: AsRef<Path>,
{
    TaggedFilesystemBuilder::with_service(MemoryService::with_files(files)).build()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    File(String),
    Dir,
    Link(PathBuf),
}

/// A filesystem held in memory.
///
/// Paths should be absolute.
#[derive(Debug)]
pub struct MemoryService {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new([(PathBuf::from("/"), Node::Dir)].into_iter().collect()),
        }
    }

    pub fn with_files<P>(files: impl IntoIterator<Item = P>) -> Self
    where
        P: AsRef<Path>,
    {
        let service = Self::new();
        for file in files {
            service.write(file, "");
        }
        service
    }

    pub fn write<P>(&self, path: P, content: &str)
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent).unwrap();
        }
        self.lock()
            .insert(path.to_owned(), Node::File(content.to_owned()));
    }

    pub fn node<P>(&self, path: P) -> Option<Node>
    where
        P: AsRef<Path>,
    {
        self.lock().get(path.as_ref()).cloned()
    }

    /// Every non-directory below `dir`,
    /// relative to `dir`.
    pub fn list_files<P>(&self, dir: P) -> Vec<PathBuf>
    where
        P: AsRef<Path>,
    {
        let dir = dir.as_ref();
        self.lock()
            .iter()
            .filter(|(path, node)| *node != &Node::Dir && path.starts_with(dir))
            .map(|(path, _)| path.strip_prefix(dir).unwrap().to_owned())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        self.nodes.lock().unwrap()
    }

    fn is_dir_node(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> bool {
        match nodes.get(path) {
            Some(Node::Dir) => true,
            Some(Node::Link(target)) => nodes.get(target) == Some(&Node::Dir),
            _ => false,
        }
    }

    fn require_parent(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> std::io::Result<()> {
        match path.parent() {
            Some(parent) if Self::is_dir_node(nodes, parent) => Ok(()),
            _ => Err(not_found(path)),
        }
    }
}

fn not_found(path: &Path) -> std::io::Error {
    std::io::Error::new(ErrorKind::NotFound, path.display().to_string())
}

impl TagService for MemoryService {
    fn link_strategy(&self) -> LinkStrategy {
        LinkStrategy::Symbolic
    }

    fn walk(&self, dir: &Path, recursive: bool) -> std::io::Result<Vec<Entry>> {
        let nodes = self.lock();
        if nodes.get(dir) != Some(&Node::Dir) {
            return Err(not_found(dir));
        }
        Ok(nodes
            .keys()
            .filter(|path| *path != dir && path.starts_with(dir))
            .filter(|path| recursive || path.parent() == Some(dir))
            .map(|path| Entry::new(path.clone(), Self::is_dir_node(&nodes, path)))
            .collect())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        Self::is_dir_node(&self.lock(), path)
    }

    fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        let mut nodes = self.lock();
        for dir in path.ancestors().collect::<Vec<_>>().into_iter().rev() {
            match nodes.get(dir) {
                Some(Node::Dir) => {}
                Some(_) => {
                    return Err(std::io::Error::new(
                        ErrorKind::AlreadyExists,
                        dir.display().to_string(),
                    ))
                }
                None => {
                    nodes.insert(dir.to_owned(), Node::Dir);
                }
            }
        }
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> std::io::Result<()> {
        let mut nodes = self.lock();
        if nodes.get(path) != Some(&Node::Dir) {
            return Err(not_found(path));
        }
        nodes.retain(|x, _| !x.starts_with(path));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        let mut nodes = self.lock();
        if from == to {
            return Ok(());
        }
        if !nodes.contains_key(from) {
            return Err(not_found(from));
        }
        if nodes.contains_key(to) {
            return Err(std::io::Error::new(
                ErrorKind::AlreadyExists,
                to.display().to_string(),
            ));
        }
        Self::require_parent(&nodes, to)?;
        let moved = nodes
            .keys()
            .filter(|x| x.starts_with(from))
            .cloned()
            .collect::<Vec<_>>();
        for path in moved {
            if let Some(node) = nodes.remove(&path) {
                let new_path = match path.strip_prefix(from) {
                    Ok(rest) if !rest.as_os_str().is_empty() => to.join(rest),
                    _ => to.to_owned(),
                };
                nodes.insert(new_path, node);
            }
        }
        Ok(())
    }

    fn create_link(
        &self,
        source: &Path,
        destination: &Path,
        overwrite: bool,
    ) -> Result<LinkRecord, LinkError> {
        let mut nodes = self.lock();
        Self::require_parent(&nodes, destination)?;
        if nodes.contains_key(destination) {
            if overwrite {
                nodes.remove(destination);
            } else {
                return Err(LinkError::DestinationExists(destination.to_owned()));
            }
        }
        nodes.insert(destination.to_owned(), Node::Link(source.to_owned()));
        Ok(LinkRecord {
            source: source.to_owned(),
            destination: destination.to_owned(),
            kind: LinkKind::Symbolic,
        })
    }

    fn resolve_link(&self, path: &Path) -> std::io::Result<LinkStatus> {
        let nodes = self.lock();
        match nodes.get(path) {
            None => Err(not_found(path)),
            Some(Node::Link(target)) if nodes.contains_key(target) => {
                Ok(LinkStatus::Healthy(target.clone()))
            }
            Some(Node::Link(target)) => Ok(LinkStatus::Broken(target.clone())),
            Some(_) => Ok(LinkStatus::NotALink),
        }
    }

    fn remove_link(&self, path: &Path) -> std::io::Result<()> {
        let mut nodes = self.lock();
        match nodes.get(path) {
            Some(Node::Link(_)) => {
                nodes.remove(path);
                Ok(())
            }
            _ => Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                path.display().to_string(),
            )),
        }
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        match self.lock().get(path) {
            Some(Node::File(content)) => Ok(content.clone()),
            _ => Err(not_found(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::LocalFilesystem;

    use super::*;

    #[test]
    fn memory_service_walks_like_a_filesystem() {
        let service = MemoryService::with_files(["/a/x.txt", "/a/b/y.txt"]);
        assert_eq!(
            service.walk(Path::new("/a"), false).unwrap(),
            [
                Entry::new("/a/b", true),
                Entry::new("/a/x.txt", false)
            ]
        );
        assert_eq!(service.walk(Path::new("/a"), true).unwrap().len(), 3);
    }

    #[test]
    fn memory_service_renames_files() {
        let service = MemoryService::with_files(["/a/x.txt", "/a/y.txt"]);
        service
            .rename(Path::new("/a/x.txt"), Path::new("/a/z.txt"))
            .unwrap();
        assert!(service
            .rename(Path::new("/a/z.txt"), Path::new("/a/y.txt"))
            .is_err());
        assert_eq!(service.list_files("/a"), ["y.txt", "z.txt"].map(PathBuf::from));
    }

    #[test]
    fn local_filesystem_is_the_default_backend() {
        let _: TaggedFilesystem<LocalFilesystem> = tagged_filesystem();
    }
}
