//! Controlled vocabulary,
//! the companion file listing known tags.
//!
//! Each line holds one tag,
//! or several tags separated by spaces
//! forming a group of mutually exclusive tags.
//! Everything after `#` is a comment,
//! except on lines starting with `#donotsuggest`,
//! which list tags never to suggest.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{TagRef, BETWEEN_TAG_SEPARATOR, DONOTSUGGEST_PREFIX};

const COMMENT: char = '#';

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Vocabulary {
    tags: Vec<String>,
    unique_groups: Vec<Vec<String>>,
    do_not_suggest: Vec<String>,
    path: Option<PathBuf>,
}

impl Vocabulary {
    pub fn parse(content: &str) -> Self {
        let mut vocabulary = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line
                .get(..DONOTSUGGEST_PREFIX.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(DONOTSUGGEST_PREFIX))
            {
                vocabulary.do_not_suggest.extend(
                    line[DONOTSUGGEST_PREFIX.len()..]
                        .to_lowercase()
                        .split(BETWEEN_TAG_SEPARATOR)
                        .filter(|tag| !tag.is_empty())
                        .map(str::to_owned),
                );
                continue;
            }

            let line = line.split(COMMENT).next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            if line.contains(BETWEEN_TAG_SEPARATOR) {
                let group = line
                    .split(BETWEEN_TAG_SEPARATOR)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_owned)
                    .collect::<Vec<_>>();
                vocabulary.tags.extend(group.iter().cloned());
                vocabulary.unique_groups.push(group);
            } else {
                vocabulary.tags.push(line.to_owned());
            }
        }
        vocabulary
    }

    pub(crate) fn with_path(mut self, path: PathBuf) -> Self {
        debug!(
            "Read {} tags and {} groups from `{}`",
            self.tags.len(),
            self.unique_groups.len(),
            path.display()
        );
        self.path = Some(path);
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Every listed tag,
    /// including members of groups,
    /// in file order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn unique_groups(&self) -> &[Vec<String>] {
        &self.unique_groups
    }

    pub fn do_not_suggest(&self) -> &[String] {
        &self.do_not_suggest
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|x| x == tag)
    }

    pub fn is_do_not_suggest(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.do_not_suggest.iter().any(|x| *x == tag)
    }

    /// Other members of every group containing `tag`.
    pub fn exclusive_with<'a>(&'a self, tag: &'a TagRef) -> impl Iterator<Item = &'a str> + 'a {
        let tag = tag.as_str();
        self.unique_groups
            .iter()
            .filter(move |group| group.iter().any(|x| x == tag))
            .flatten()
            .map(String::as_str)
            .filter(move |x| *x != tag)
    }
}
