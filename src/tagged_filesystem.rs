mod errors;
mod find;
mod retag;
mod tag_tree;

#[cfg(test)]
pub(crate) mod testing;

use crate::{LinkStrategy, LocalFilesystem, TagIndex, TagService, Vocabulary};

pub use self::{
    errors::{
        Error, NoInputFilesError, TargetNotEmptyError, UserInputError, FATAL_EXIT_CODE,
        NO_INPUT_FILES_EXIT_CODE, PER_ITEM_EXIT_CODE, TARGET_STATE_EXIT_CODE,
        USER_INPUT_EXIT_CODE,
    },
    retag::{Rename, RetagOutcome},
    tag_tree::{
        MutualExclusionPolicy, ParseUntaggedPolicyError, TagPermutationPlan, TagTreeOptions,
        TagTreeReport, UntaggedPolicy,
    },
};

/// Tagging operations over a storage backend.
#[derive(Debug)]
pub struct TaggedFilesystem<S = LocalFilesystem> {
    service: S,
    dry_run: bool,
    overwrite: bool,
    parallel: bool,
    vocabulary: Option<Vocabulary>,
    index: TagIndex,
}

#[derive(Debug)]
pub struct TaggedFilesystemBuilder<S = LocalFilesystem> {
    service: S,
    dry_run: bool,
    overwrite: bool,
    parallel: bool,
    vocabulary: Option<Vocabulary>,
}

impl TaggedFilesystemBuilder {
    pub fn new() -> Self {
        Self::with_service(LocalFilesystem::default())
    }

    /// Prefer hard links to symbolic links where supported.
    pub fn hardlinks(self, allow: bool) -> Self {
        self.service(LocalFilesystem::new(LinkStrategy::select(allow)))
    }
}

impl Default for TaggedFilesystemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> TaggedFilesystemBuilder<S>
where
    S: TagService,
{
    pub fn with_service(service: S) -> Self {
        Self {
            service,
            dry_run: false,
            overwrite: false,
            parallel: false,
            vocabulary: None,
        }
    }

    pub fn service<T>(self, service: T) -> TaggedFilesystemBuilder<T>
    where
        T: TagService,
    {
        TaggedFilesystemBuilder {
            service,
            dry_run: self.dry_run,
            overwrite: self.overwrite,
            parallel: self.parallel,
            vocabulary: self.vocabulary,
        }
    }

    /// Report changes without making them.
    pub fn dry_run(mut self, value: bool) -> Self {
        self.dry_run = value;
        self
    }

    /// Replace existing tag trees.
    pub fn overwrite(mut self, value: bool) -> Self {
        self.overwrite = value;
        self
    }

    /// Link files into tag trees in parallel.
    ///
    /// Which of two conflicting files wins is then unspecified.
    pub fn parallel(mut self, value: bool) -> Self {
        self.parallel = value;
        self
    }

    /// Use `vocabulary` instead of the nearest vocabulary file.
    pub fn vocabulary(mut self, vocabulary: Option<Vocabulary>) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn build(self) -> TaggedFilesystem<S> {
        TaggedFilesystem {
            service: self.service,
            dry_run: self.dry_run,
            overwrite: self.overwrite,
            parallel: self.parallel,
            vocabulary: self.vocabulary,
            index: TagIndex::new(),
        }
    }
}

impl<S> TaggedFilesystem<S>
where
    S: TagService,
{
    pub fn service(&self) -> &S {
        &self.service
    }
}
