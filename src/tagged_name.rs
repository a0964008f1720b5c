//! Tags embedded in file names.
//!
//! A tagged name looks like `<stem> -- <tag1> <tag2>.<ext>`.
//! Parsing never fails:
//! a name without the separator simply has no tags.

use std::{fmt, path::Path};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{BETWEEN_TAG_SEPARATOR, EXTENSION_SEPARATOR, FILENAME_TAG_SEPARATOR, SHORTCUT_SUFFIX};

/// Greedy stem,
/// so the last separator wins,
/// and a lazy tag-list,
/// so a trailing extension is captured when present.
static TAGGED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?s)^(.+){}(.+?)(?:{}(\w+))??$",
        regex::escape(FILENAME_TAG_SEPARATOR),
        regex::escape(EXTENSION_SEPARATOR),
    ))
    .expect("tagged name pattern should be valid")
});

static NAME_WITH_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?s)^(.+){}(\w+)$",
        regex::escape(EXTENSION_SEPARATOR)
    ))
    .expect("extension pattern should be valid")
});

/// A file name split into its stem, tags, and extension.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TaggedName {
    pub stem: String,
    /// Tags in the order they appear.
    /// Duplicates and blank entries are kept as written.
    pub tags: Vec<String>,
    pub extension: Option<String>,
    /// The name ended with the shortcut suffix,
    /// which is stripped before parsing
    /// and appended again when rendering.
    pub is_shortcut: bool,
}

impl TaggedName {
    pub fn new<S, T, I>(stem: S, tags: I, extension: Option<String>, is_shortcut: bool) -> Self
    where
        S: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = T>,
    {
        Self {
            stem: stem.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            extension,
            is_shortcut,
        }
    }

    /// Decompose a base name.
    ///
    /// Directory components are not special here;
    /// use the free functions in this module for paths.
    pub fn parse(name: &str) -> Self {
        let (body, is_shortcut) = strip_shortcut(name);
        if let Some(captures) = TAGGED_NAME.captures(body) {
            Self {
                stem: captures[1].to_owned(),
                tags: captures[2]
                    .split(BETWEEN_TAG_SEPARATOR)
                    .map(str::to_owned)
                    .collect(),
                extension: captures.get(3).map(|ext| ext.as_str().to_owned()),
                is_shortcut,
            }
        } else if let Some(captures) = NAME_WITH_EXTENSION.captures(body) {
            Self {
                stem: captures[1].to_owned(),
                tags: Vec::new(),
                extension: Some(captures[2].to_owned()),
                is_shortcut,
            }
        } else {
            Self {
                stem: body.to_owned(),
                tags: Vec::new(),
                extension: None,
                is_shortcut,
            }
        }
    }

    pub fn render(&self) -> String {
        let mut name = self.stem.clone();
        if !self.tags.is_empty() {
            name.push_str(FILENAME_TAG_SEPARATOR);
            name.push_str(&self.tags.join(BETWEEN_TAG_SEPARATOR));
        }
        if let Some(ext) = &self.extension {
            name.push_str(EXTENSION_SEPARATOR);
            name.push_str(ext);
        }
        if self.is_shortcut {
            name.push_str(SHORTCUT_SUFFIX);
        }
        name
    }

    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|x| x == tag)
    }

    /// Append `tag` unless it is already present.
    pub fn with_tag(mut self, tag: &str) -> Self {
        if !self.contains(tag) {
            self.tags.push(tag.to_owned());
        }
        self
    }

    /// Remove every occurrence of `tag`,
    /// keeping the order of the rest.
    pub fn without_tag(mut self, tag: &str) -> Self {
        self.tags.retain(|x| x != tag);
        self
    }
}

impl fmt::Display for TaggedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for TaggedName {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

pub fn is_shortcut_name(name: &str) -> bool {
    strip_shortcut(name).1
}

fn strip_shortcut(name: &str) -> (&str, bool) {
    match name
        .len()
        .checked_sub(SHORTCUT_SUFFIX.len())
        .and_then(|i| Some((i, name.get(i..)?)))
    {
        Some((i, suffix)) if suffix.eq_ignore_ascii_case(SHORTCUT_SUFFIX) => (&name[..i], true),
        _ => (name, false),
    }
}

/// Split `filename` into its directory prefix,
/// including the trailing separator,
/// and its base name.
fn split_dir(filename: &str) -> (&str, &str) {
    match filename.rfind(std::path::is_separator) {
        // Path separators are ASCII.
        Some(i) => filename.split_at(i + 1),
        None => ("", filename),
    }
}

/// Without a tag,
/// whether the name has any tag-list at all.
pub fn contains_tag(filename: &str, tag: Option<&str>) -> bool {
    let name = TaggedName::parse(split_dir(filename).1);
    match tag {
        Some(tag) => name.contains(tag),
        None => name.has_tags(),
    }
}

pub fn extract_tags(filename: &str) -> Vec<String> {
    TaggedName::parse(split_dir(filename).1).tags
}

/// Tags of every component of `path`,
/// from root to leaf,
/// without duplicates and in first-seen order.
pub fn extract_tags_from_path(path: &Path) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for component in path.iter() {
        for tag in TaggedName::parse(&component.to_string_lossy()).tags {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

/// Add `tag` to the name part of `filename`.
///
/// Returns `filename` unchanged
/// if the tag is already present
/// or blank.
pub fn add_tag(filename: &str, tag: &str) -> String {
    let (dir, base) = split_dir(filename);
    let name = TaggedName::parse(base);
    if tag.trim().is_empty() || name.contains(tag) {
        filename.to_owned()
    } else {
        format!("{dir}{}", name.with_tag(tag))
    }
}

/// Remove `tag` from the name part of `filename`.
///
/// Removing the last tag also removes the separator.
pub fn remove_tag(filename: &str, tag: &str) -> String {
    let (dir, base) = split_dir(filename);
    let name = TaggedName::parse(base);
    if name.contains(tag) {
        format!("{dir}{}", name.without_tag(tag))
    } else {
        filename.to_owned()
    }
}
