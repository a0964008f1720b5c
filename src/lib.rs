mod config;
mod link;
mod service;
mod tag;
mod tag_count;
mod tag_index;
mod tagged_filesystem;
mod tagged_name;
mod vocabulary;
mod walk;

#[cfg(test)]
mod testing;

pub use crate::{
    config::{Config, ConfigError},
    link::{
        create_link, read_shortcut, resolve_link, write_shortcut, LinkError, LinkKind, LinkRecord,
        LinkStatus, LinkStrategy,
    },
    service::{LocalFilesystem, TagService},
    tag::{Tag, TagEdit, TagError, TagRef},
    tag_count::TagCount,
    tag_index::TagIndex,
    tagged_filesystem::{
        Error, MutualExclusionPolicy, NoInputFilesError, ParseUntaggedPolicyError, Rename,
        RetagOutcome, TagPermutationPlan, TagTreeOptions, TagTreeReport, TaggedFilesystem,
        TaggedFilesystemBuilder, TargetNotEmptyError, UntaggedPolicy, UserInputError,
        FATAL_EXIT_CODE, NO_INPUT_FILES_EXIT_CODE, PER_ITEM_EXIT_CODE, TARGET_STATE_EXIT_CODE,
        USER_INPUT_EXIT_CODE,
    },
    tagged_name::{
        add_tag, contains_tag, extract_tags, extract_tags_from_path, is_shortcut_name, remove_tag,
        TaggedName,
    },
    vocabulary::Vocabulary,
    walk::Entry,
};

pub const FILENAME_TAG_SEPARATOR: &str = " -- ";
pub const BETWEEN_TAG_SEPARATOR: &str = " ";
pub const EXTENSION_SEPARATOR: &str = ".";
pub const REMOVE_TAG_PREFIX: char = '-';

/// Appended to shortcut descriptors,
/// the stand-in for links where symbolic links are unavailable.
pub const SHORTCUT_SUFFIX: &str = ".lnk";

pub const CONTROLLED_VOCABULARY_FILENAME: &str = ".filetags";
pub const DONOTSUGGEST_PREFIX: &str = "#donotsuggest ";

/// Prefix of directories collecting files
/// that have no tag of a mutual-exclusion group.
pub const MISSING_MUTUAL_PREFIX: &str = "no-";
pub const MISSING_MUTUAL_SEPARATOR: &str = "-";

pub const DEFAULT_TAGTREES_MAXDEPTH: usize = 2;

// Permutations grow factorially with depth.
pub const TAGTREES_DEPTH_WARNING: usize = 4;
