use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard,
    },
    time::{Duration, Instant},
};

use itertools::Itertools;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::{
    service::absolute, LinkError, Tag, DEFAULT_TAGTREES_MAXDEPTH, MISSING_MUTUAL_PREFIX,
    MISSING_MUTUAL_SEPARATOR, TAGTREES_DEPTH_WARNING,
};

use super::*;

const UNTAGGED_IGNORE: &str = "ignore";
const UNTAGGED_TREE_ROOT: &str = "treeroot";

const SLOW_RUN: Duration = Duration::from_secs(3);

/// Where files without tags are linked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UntaggedPolicy {
    Ignore,
    #[default]
    TreeRoot,
    /// A directory directly below the tree root.
    Subdir(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ParseUntaggedPolicyError {
    #[error(
        "Expected `{}`, `{}`, or a directory name",
        UNTAGGED_TREE_ROOT,
        UNTAGGED_IGNORE
    )]
    Empty,
    #[error("`{0}` is not a single directory name")]
    NotADirectoryName(String),
}

impl FromStr for UntaggedPolicy {
    type Err = ParseUntaggedPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(ParseUntaggedPolicyError::Empty),
            UNTAGGED_IGNORE => Ok(UntaggedPolicy::Ignore),
            UNTAGGED_TREE_ROOT => Ok(UntaggedPolicy::TreeRoot),
            "." | ".." => Err(ParseUntaggedPolicyError::NotADirectoryName(s.to_owned())),
            s if s.chars().any(std::path::is_separator) => {
                Err(ParseUntaggedPolicyError::NotADirectoryName(s.to_owned()))
            }
            s => Ok(UntaggedPolicy::Subdir(s.to_owned())),
        }
    }
}

impl TryFrom<String> for UntaggedPolicy {
    type Error = ParseUntaggedPolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UntaggedPolicy> for String {
    fn from(value: UntaggedPolicy) -> Self {
        value.to_string()
    }
}

impl fmt::Display for UntaggedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UntaggedPolicy::Ignore => f.write_str(UNTAGGED_IGNORE),
            UntaggedPolicy::TreeRoot => f.write_str(UNTAGGED_TREE_ROOT),
            UntaggedPolicy::Subdir(dir) => f.write_str(dir),
        }
    }
}

/// What to do with files
/// missing every tag of a mutual-exclusion group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MutualExclusionPolicy {
    #[default]
    Ignore,
    /// Link them into `no-<tag>-<tag>...`.
    LinkMissing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagTreeOptions {
    pub source_dir: PathBuf,
    /// Replaced on every run.
    pub root: PathBuf,
    pub max_depth: usize,
    pub recursive: bool,
    pub untagged: UntaggedPolicy,
    pub mutual_exclusion: MutualExclusionPolicy,
    /// Only files with every tag are linked.
    pub filter: Vec<Tag>,
}

impl TagTreeOptions {
    pub fn new<P, Q>(source_dir: P, root: Q) -> Self
    where
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
    {
        Self {
            source_dir: source_dir.into(),
            root: root.into(),
            max_depth: DEFAULT_TAGTREES_MAXDEPTH,
            recursive: false,
            untagged: UntaggedPolicy::default(),
            mutual_exclusion: MutualExclusionPolicy::default(),
            filter: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagTreeReport {
    pub files: usize,
    pub links: usize,
    /// Links not made because another file
    /// already took their place.
    pub conflicts: usize,
    pub elapsed: Duration,
}

/// Tag directories one file is linked into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagPermutationPlan {
    paths: Vec<SmallVec<[String; TAGTREES_DEPTH_WARNING]>>,
}

impl TagPermutationPlan {
    /// Every ordered permutation of `tags`
    /// of every length from 1 to `max_depth`,
    /// shortest first.
    ///
    /// Duplicate tags,
    /// and tags that cannot name a directory,
    /// are dropped first.
    pub fn new<I, T>(tags: I, max_depth: usize) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let tags = tags
            .into_iter()
            .map(|tag| tag.as_ref().to_owned())
            .filter(|tag| !tag.trim().is_empty() && !tag.chars().all(|c| c == '.'))
            .unique()
            .collect_vec();
        Self {
            paths: (1..=max_depth.min(tags.len()))
                .flat_map(|depth| {
                    tags.iter()
                        .permutations(depth)
                        .map(|permutation| {
                            permutation.into_iter().cloned().collect::<SmallVec<_>>()
                        })
                })
                .collect(),
        }
    }

    /// Relative directory paths,
    /// one per permutation.
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.paths.iter().map(|tags| tags.iter().collect::<PathBuf>())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// State shared by every file of one run.
struct RunContext<'a, S> {
    service: &'a S,
    dry_run: bool,
    created_dirs: Mutex<FxHashSet<PathBuf>>,
    /// Links a dry run would have made.
    planned: Mutex<FxHashSet<PathBuf>>,
    links: AtomicUsize,
    conflicts: AtomicUsize,
}

impl<'a, S> RunContext<'a, S>
where
    S: TagService,
{
    fn new(service: &'a S, dry_run: bool) -> Self {
        Self {
            service,
            dry_run,
            created_dirs: Mutex::default(),
            planned: Mutex::default(),
            links: AtomicUsize::new(0),
            conflicts: AtomicUsize::new(0),
        }
    }

    fn ensure_dir(&self, dir: &Path) -> std::io::Result<()> {
        if lock(&self.created_dirs).contains(dir) {
            return Ok(());
        }
        if self.dry_run {
            let planned = lock(&self.planned);
            if let Some(link) = dir.ancestors().find(|x| planned.contains(*x)) {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    link.display().to_string(),
                ));
            }
        } else {
            self.service.create_dir_all(dir)?;
        }
        lock(&self.created_dirs).insert(dir.to_owned());
        Ok(())
    }

    /// Link `source` into `dir` under its own name,
    /// counting the link.
    fn link(&self, source: &Path, dir: &Path) -> Result<(), Error> {
        if self.try_link(source, dir)? {
            self.links.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Whether the link was made.
    /// A taken destination is a conflict,
    /// not an error.
    fn try_link(&self, source: &Path, dir: &Path) -> Result<bool, Error> {
        let Some(name) = source.file_name() else {
            return Ok(false);
        };
        match self.ensure_dir(dir) {
            Ok(()) => {}
            // A link already occupies the path of a tag directory.
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::AlreadyExists | std::io::ErrorKind::NotADirectory
                ) =>
            {
                warn!(
                    "`{}` is taken by a file, not linking `{}`. The first file wins.",
                    dir.display(),
                    source.display()
                );
                self.conflicts.fetch_add(1, Ordering::Relaxed);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }
        let destination = dir.join(name);

        let result = if self.dry_run {
            let destination = self.service.link_strategy().destination_for(&destination);
            let is_dir = lock(&self.created_dirs).contains(&destination);
            if !is_dir && lock(&self.planned).insert(destination.clone()) {
                Ok(())
            } else {
                Err(LinkError::DestinationExists(destination))
            }
        } else {
            self.service
                .create_link(source, &destination, false)
                .map(|_| ())
        };

        match result {
            Ok(()) => Ok(true),
            Err(LinkError::DestinationExists(path)) => {
                warn!(
                    "`{}` is already taken, not linking `{}`. The first file wins.",
                    path.display(),
                    source.display()
                );
                self.conflicts.fetch_add(1, Ordering::Relaxed);
                Ok(false)
            }
            Err(LinkError::Filesystem(e)) => Err(e.into()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn missing_mutual_dir(group: &[String]) -> String {
    format!(
        "{MISSING_MUTUAL_PREFIX}{}",
        group.join(MISSING_MUTUAL_SEPARATOR)
    )
}

impl<S> TaggedFilesystem<S>
where
    S: TagService,
{
    /// Link every file of `options.source_dir`
    /// into a directory for every permutation of its tags
    /// below `options.root`.
    ///
    /// `options.root` must be empty,
    /// unless overwriting,
    /// in which case it is removed first.
    pub fn generate_tag_tree(&self, options: &TagTreeOptions) -> Result<TagTreeReport, Error> {
        let start = Instant::now();
        let source_dir = absolute(&options.source_dir)?;
        let root = absolute(&options.root)?;

        if options.max_depth == 0 {
            return Err(UserInputError::ZeroDepth.into());
        }
        if !self.service.is_dir(&source_dir) {
            return Err(UserInputError::NotADirectory(source_dir).into());
        }
        if source_dir.starts_with(&root) {
            return Err(UserInputError::SourceInsideTarget {
                dir: source_dir,
                root,
            }
            .into());
        }
        if options.max_depth > TAGTREES_DEPTH_WARNING {
            warn!(
                "A depth of {} may create a very large number of links",
                options.max_depth
            );
        }
        self.check_root(&root)?;

        let files = self
            .files(&source_dir, options.recursive)?
            .into_iter()
            .filter(|file| !file.starts_with(&root))
            .collect_vec();
        let files = if options.filter.is_empty() {
            files
        } else {
            self.filter_by_tags(&files, &options.filter)
        };
        if files.is_empty() && !options.recursive {
            return Err(NoInputFilesError(source_dir).into());
        }

        let loaded;
        let vocabulary = match self.vocabulary.as_ref() {
            Some(vocabulary) => Some(vocabulary),
            None => {
                loaded = self.service.load_vocabulary(&source_dir)?;
                loaded.as_ref()
            }
        };
        let groups: &[Vec<String>] = match (options.mutual_exclusion, vocabulary) {
            (MutualExclusionPolicy::LinkMissing, Some(vocabulary)) => vocabulary.unique_groups(),
            _ => &[],
        };

        self.clear_root(&root)?;
        let context = RunContext::new(&self.service, self.dry_run);
        context.ensure_dir(&root)?;
        if let Some(path) = vocabulary.and_then(|vocabulary| vocabulary.path()) {
            debug!("Linking vocabulary `{}`", path.display());
            context.try_link(path, &root)?;
        }

        let link_file = |file: &PathBuf| self.link_file(&context, &root, file, options, groups);
        if self.parallel {
            files.par_iter().try_for_each(link_file)?;
        } else {
            files.iter().try_for_each(link_file)?;
        }

        let report = TagTreeReport {
            files: files.len(),
            links: context.links.into_inner(),
            conflicts: context.conflicts.into_inner(),
            elapsed: start.elapsed(),
        };
        info!(
            "Linked {} files with {} links into `{}`",
            report.files,
            report.links,
            root.display()
        );
        if report.conflicts > 0 {
            warn!("{} links were already taken", report.conflicts);
        }
        if report.elapsed > SLOW_RUN {
            info!("Generating the tag tree took {:.1?}", report.elapsed);
        }
        Ok(report)
    }

    fn check_root(&self, root: &Path) -> Result<(), Error> {
        if !self.service.exists(root) {
            return Ok(());
        }
        if !self.service.is_dir(root) {
            return Err(UserInputError::NotADirectory(root.to_owned()).into());
        }
        if !self.overwrite && !self.service.walk(root, false)?.is_empty() {
            return Err(TargetNotEmptyError(root.to_owned()).into());
        }
        Ok(())
    }

    fn clear_root(&self, root: &Path) -> std::io::Result<()> {
        if !self.overwrite || !self.service.exists(root) {
            return Ok(());
        }
        info!("Removing previous tag tree `{}`", root.display());
        if self.dry_run {
            Ok(())
        } else {
            self.service.remove_dir_all(root)
        }
    }

    fn link_file(
        &self,
        context: &RunContext<'_, S>,
        root: &Path,
        file: &Path,
        options: &TagTreeOptions,
        groups: &[Vec<String>],
    ) -> Result<(), Error> {
        let tags = file
            .file_name()
            .map(|name| self.service.extract_tags(&name.to_string_lossy()))
            .unwrap_or_default();
        let plan = TagPermutationPlan::new(&tags, options.max_depth);

        if plan.is_empty() {
            return match &options.untagged {
                UntaggedPolicy::Ignore => {
                    debug!("Ignoring untagged `{}`", file.display());
                    Ok(())
                }
                UntaggedPolicy::TreeRoot => context.link(file, root),
                UntaggedPolicy::Subdir(dir) => context.link(file, &root.join(dir)),
            };
        }

        debug!(
            "Linking `{}` into {} tag directories",
            file.display(),
            plan.len()
        );
        for path in plan.paths() {
            context.link(file, &root.join(path))?;
        }
        for group in groups {
            if !group.iter().any(|tag| tags.contains(tag)) {
                context.link(file, &root.join(missing_mutual_dir(group)))?;
            }
        }
        Ok(())
    }
}
