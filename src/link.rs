use std::{
    fs::{hard_link, read_link, remove_file, symlink_metadata, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{is_shortcut_name, SHORTCUT_SUFFIX};

const SHORTCUT_HEADER: &str = "[Shortcut]";
const SHORTCUT_TARGET: &str = "Target=";
const SHORTCUT_WORKING_DIRECTORY: &str = "WorkingDirectory=";

#[cfg(target_family = "unix")]
const CROSS_DEVICE_ERROR: i32 = 18; // EXDEV
#[cfg(target_family = "windows")]
const CROSS_DEVICE_ERROR: i32 = 17; // ERROR_NOT_SAME_DEVICE

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Symbolic,
    Hard,
    Shortcut,
}

/// How links are made for a whole run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkStrategy {
    Symbolic,
    /// Hard links,
    /// falling back to symbolic links across devices.
    Hard,
    Shortcut,
}

impl LinkStrategy {
    /// Hard links are ignored where shortcuts are needed.
    pub fn select(allow_hardlink: bool) -> Self {
        if cfg!(target_family = "windows") {
            LinkStrategy::Shortcut
        } else if allow_hardlink {
            LinkStrategy::Hard
        } else {
            LinkStrategy::Symbolic
        }
    }

    /// The path a link for `destination` will actually occupy.
    pub fn destination_for(self, destination: &Path) -> PathBuf {
        match self {
            LinkStrategy::Shortcut
                if !is_shortcut_name(&destination.to_string_lossy()) =>
            {
                let mut s = destination.as_os_str().to_owned();
                s.push(SHORTCUT_SUFFIX);
                PathBuf::from(s)
            }
            _ => destination.to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkRecord {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: LinkKind,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub enum LinkError {
    #[error("`{}` already exists", .0.display())]
    DestinationExists(PathBuf),
    Filesystem(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    NotALink,
    Healthy(PathBuf),
    /// The link exists,
    /// but its target does not.
    Broken(PathBuf),
}

impl LinkStatus {
    pub fn is_link(&self) -> bool {
        !matches!(self, LinkStatus::NotALink)
    }
}

/// Link `destination` to `source`.
///
/// With `overwrite`,
/// an existing file at `destination` is replaced.
pub fn create_link(
    source: &Path,
    destination: &Path,
    strategy: LinkStrategy,
    overwrite: bool,
) -> Result<LinkRecord, LinkError> {
    let destination = strategy.destination_for(destination);

    if symlink_metadata(&destination).is_ok() {
        if overwrite {
            debug!("Replacing `{}`", destination.display());
            remove_file(&destination)?;
        } else {
            return Err(LinkError::DestinationExists(destination));
        }
    }

    let kind = match strategy {
        LinkStrategy::Symbolic => {
            symlink(source, &destination)?;
            LinkKind::Symbolic
        }
        LinkStrategy::Hard => {
            hard_link_or_symlink(hard_link(source, &destination), source, &destination)?
        }
        LinkStrategy::Shortcut => {
            write_shortcut(source, &destination)?;
            LinkKind::Shortcut
        }
    };

    Ok(LinkRecord {
        source: source.to_owned(),
        destination,
        kind,
    })
}

/// Fall back to a symbolic link
/// if a hard link failed across devices.
fn hard_link_or_symlink(
    res: std::io::Result<()>,
    source: &Path,
    destination: &Path,
) -> Result<LinkKind, LinkError> {
    match res {
        Ok(()) => Ok(LinkKind::Hard),
        Err(e) if is_cross_device(&e) => {
            debug!(
                "`{}` is on another device, using a symbolic link",
                source.display()
            );
            symlink(source, destination)?;
            Ok(LinkKind::Symbolic)
        }
        Err(e) => Err(map_already_exists(e, destination)),
    }
}

fn symlink(source: &Path, destination: &Path) -> Result<(), LinkError> {
    let res = if source.is_dir() {
        symlink_dir(source, destination)
    } else {
        symlink_file(source, destination)
    };
    res.map_err(|e| map_already_exists(e, destination))
}

// Another thread may create the same destination
// between our check and our link.
fn map_already_exists(e: std::io::Error, destination: &Path) -> LinkError {
    if e.kind() == std::io::ErrorKind::AlreadyExists {
        LinkError::DestinationExists(destination.to_owned())
    } else {
        LinkError::Filesystem(e)
    }
}

fn is_cross_device(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(CROSS_DEVICE_ERROR)
}

pub fn symlink_file<P, Q>(original: P, link: Q) -> std::io::Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    #[cfg(target_family = "unix")]
    {
        std::os::unix::fs::symlink(original, link)
    }

    #[cfg(target_family = "windows")]
    {
        std::os::windows::fs::symlink_file(original, link)
    }
}

pub fn symlink_dir<P, Q>(original: P, link: Q) -> std::io::Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    #[cfg(target_family = "unix")]
    {
        std::os::unix::fs::symlink(original, link)
    }

    #[cfg(target_family = "windows")]
    {
        std::os::windows::fs::symlink_dir(original, link)
    }
}

/// Write a shortcut descriptor at `shortcut` pointing to `target`.
///
/// Fails if `shortcut` already exists.
pub fn write_shortcut(target: &Path, shortcut: &Path) -> Result<(), LinkError> {
    let working_directory = shortcut.parent().unwrap_or_else(|| Path::new(""));
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(shortcut)
        .map_err(|e| map_already_exists(e, shortcut))?;
    write!(
        file,
        "{SHORTCUT_HEADER}\n{SHORTCUT_TARGET}{}\n{SHORTCUT_WORKING_DIRECTORY}{}\n",
        target.display(),
        working_directory.display()
    )?;
    Ok(())
}

/// Target recorded in a shortcut descriptor.
pub fn read_shortcut(shortcut: &Path) -> std::io::Result<PathBuf> {
    std::fs::read_to_string(shortcut)?
        .lines()
        .find_map(|line| line.strip_prefix(SHORTCUT_TARGET))
        .map(PathBuf::from)
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("`{}` has no shortcut target", shortcut.display()),
            )
        })
}

/// Follow one level of link.
pub fn resolve_link(path: &Path) -> std::io::Result<LinkStatus> {
    let metadata = symlink_metadata(path)?;
    let target = if metadata.is_symlink() {
        let target = read_link(path)?;
        if target.is_relative() {
            path.parent().unwrap_or_else(|| Path::new("")).join(target)
        } else {
            target
        }
    } else if metadata.is_file() && is_shortcut_name(&path.to_string_lossy()) {
        read_shortcut(path)?
    } else {
        return Ok(LinkStatus::NotALink);
    };

    Ok(if target.try_exists()? {
        LinkStatus::Healthy(target)
    } else {
        LinkStatus::Broken(target)
    })
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub enum RemoveLinkError {
    #[error("Not a link")]
    NotALink,
    Filesystem(#[from] std::io::Error),
}

/// Remove a symbolic link or shortcut,
/// never a regular file.
pub fn remove_link<P>(path: P) -> Result<(), RemoveLinkError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if symlink_metadata(path)?.is_symlink() {
        #[cfg(target_family = "unix")]
        {
            remove_file(path)?;
        }

        #[cfg(target_family = "windows")]
        {
            if path.is_dir() {
                std::fs::remove_dir(path)?;
            } else {
                remove_file(path)?;
            }
        }

        Ok(())
    } else if is_shortcut_name(&path.to_string_lossy()) && read_shortcut(path).is_ok() {
        remove_file(path)?;
        Ok(())
    } else {
        Err(RemoveLinkError::NotALink)
    }
}
