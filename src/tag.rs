use std::{borrow::Borrow, cmp::Ordering, ops::Deref, str::FromStr};

use derive_more::Display;
use ref_cast::{ref_cast_custom, RefCastCustom};

use crate::{BETWEEN_TAG_SEPARATOR, REMOVE_TAG_PREFIX};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("Tags cannot be empty or consist only of whitespace")]
    Blank,
    #[error(
        "Invalid tag: `{0}`. Tags cannot contain `{sep}` or path separators.",
        sep = BETWEEN_TAG_SEPARATOR
    )]
    Separator(String),
    #[error(
        "Invalid tag: `{0}`. Tags cannot start with `{prefix}`.",
        prefix = REMOVE_TAG_PREFIX
    )]
    RemovePrefix(String),
    #[error("Invalid tag: `{0}`. Tags cannot consist of only `.`.")]
    Dots(String),
}

/// A single validated tag,
/// safe to use as a file name component
/// and to join into a tag-list.
#[derive(Clone, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(String);

#[derive(Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, RefCastCustom)]
#[repr(transparent)]
pub struct TagRef(str);

impl Tag {
    pub fn new(s: String) -> Result<Tag, TagError> {
        if s.trim().is_empty() {
            Err(TagError::Blank)
        } else if s.contains(BETWEEN_TAG_SEPARATOR) || s.chars().any(std::path::is_separator) {
            Err(TagError::Separator(s))
        } else if s.starts_with(REMOVE_TAG_PREFIX) {
            Err(TagError::RemovePrefix(s))
        // Paths like `.` and `..` have special meanings in filesystems.
        } else if s.chars().all(|c| c == '.') {
            Err(TagError::Dots(s))
        } else {
            Ok(Tag(s))
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Tag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl TagRef {
    #[ref_cast_custom]
    pub(crate) const fn new(s: &str) -> &Self;

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialOrd<&TagRef> for Tag {
    fn partial_cmp(&self, other: &&TagRef) -> Option<Ordering> {
        self.deref().partial_cmp(other)
    }
}

impl PartialEq<&TagRef> for Tag {
    fn eq(&self, other: &&TagRef) -> bool {
        self.deref().eq(other)
    }
}

impl PartialEq<Tag> for &TagRef {
    fn eq(&self, other: &Tag) -> bool {
        self.eq(&other.deref())
    }
}

impl From<Tag> for String {
    fn from(value: Tag) -> Self {
        value.0
    }
}

impl Deref for Tag {
    type Target = TagRef;

    fn deref(&self) -> &Self::Target {
        self.borrow()
    }
}

impl AsRef<TagRef> for Tag {
    fn as_ref(&self) -> &TagRef {
        self.borrow()
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<TagRef> for TagRef {
    fn as_ref(&self) -> &TagRef {
        self
    }
}

impl Borrow<TagRef> for Tag {
    fn borrow(&self) -> &TagRef {
        TagRef::new(self.0.as_str())
    }
}

impl<'a> From<&'a TagRef> for Tag {
    fn from(value: &'a TagRef) -> Self {
        value.to_owned()
    }
}

impl ToOwned for TagRef {
    type Owned = Tag;

    fn to_owned(&self) -> Self::Owned {
        Tag(self.0.to_owned())
    }
}

/// One instruction from the user:
/// add a tag,
/// or remove it when written with a leading `-`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagEdit {
    Add(Tag),
    Remove(Tag),
}

impl TagEdit {
    pub fn tag(&self) -> &TagRef {
        match self {
            TagEdit::Add(tag) | TagEdit::Remove(tag) => tag.deref(),
        }
    }

    /// Parse every tag token in `s`.
    ///
    /// Tokens are split on the between-tag separator.
    /// Blank tokens are skipped.
    pub fn parse_all(s: &str) -> Result<Vec<TagEdit>, TagError> {
        s.split(BETWEEN_TAG_SEPARATOR)
            .filter(|token| !token.trim().is_empty())
            .map(TagEdit::from_str)
            .collect()
    }
}

impl FromStr for TagEdit {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(REMOVE_TAG_PREFIX) {
            Some(rest) => Tag::from_str(rest).map(TagEdit::Remove),
            None => Tag::from_str(s).map(TagEdit::Add),
        }
    }
}
