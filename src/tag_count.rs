use std::collections::BTreeSet;

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::Vocabulary;

/// Number of occurrences of each tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagCount(FxHashMap<String, usize>);

impl TagCount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every tag in `tags`.
    /// Blank tags are ignored.
    pub fn add_all<I, T>(&mut self, tags: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for tag in tags {
            let tag = tag.as_ref();
            if !tag.trim().is_empty() {
                *self.0.entry(tag.to_owned()).or_default() += 1;
            }
        }
    }

    pub fn get(&self, tag: &str) -> usize {
        self.0.get(tag).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Most frequent first,
    /// ties broken by tag.
    pub fn by_count(&self) -> Vec<(&str, usize)> {
        self.0
            .iter()
            .map(|(tag, count)| (tag.as_str(), *count))
            .sorted_by(|(x_tag, x_count), (y_tag, y_count)| {
                y_count.cmp(x_count).then_with(|| x_tag.cmp(y_tag))
            })
            .collect()
    }

    pub fn by_name(&self) -> Vec<(&str, usize)> {
        self.0
            .iter()
            .map(|(tag, count)| (tag.as_str(), *count))
            .sorted()
            .collect()
    }

    /// The `limit` most frequent tags
    /// not in `omit`
    /// and not marked do-not-suggest,
    /// returned in lexicographic order.
    pub fn suggestions<'a>(
        &'a self,
        limit: usize,
        omit: &[&str],
        vocabulary: Option<&Vocabulary>,
    ) -> Vec<&'a str> {
        self.by_count()
            .into_iter()
            .map(|(tag, _)| tag)
            .filter(|tag| !omit.contains(tag))
            .filter(|tag| vocabulary.map_or(true, |v| !v.is_do_not_suggest(tag)))
            .take(limit)
            .sorted()
            .collect()
    }

    /// Tags present here
    /// that `vocabulary` does not list.
    pub fn unknown_to(&self, vocabulary: &Vocabulary) -> BTreeSet<&str> {
        self.tags().filter(|tag| !vocabulary.contains(tag)).collect()
    }
}

impl<S> FromIterator<S> for TagCount
where
    S: AsRef<str>,
{
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut count = Self::new();
        count.add_all(iter);
        count
    }
}
