use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::{is_shortcut_name, LinkError, LinkStatus, TagEdit, TagRef, SHORTCUT_SUFFIX};

use super::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rename {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetagOutcome {
    /// Files whose names changed,
    /// in the order they were handled.
    pub renamed: Vec<Rename>,
    /// Files that could not be handled.
    pub errors: usize,
}

impl RetagOutcome {
    pub fn is_success(&self) -> bool {
        self.errors == 0
    }
}

impl<S> TaggedFilesystem<S>
where
    S: TagService,
{
    pub fn add_tags(&self, files: &[PathBuf], edits: &[TagEdit]) -> Result<RetagOutcome, Error> {
        self.retag(files, edits)
    }

    pub fn remove_tags<T>(&self, files: &[PathBuf], tags: &[T]) -> Result<RetagOutcome, Error>
    where
        T: AsRef<TagRef>,
    {
        self.retag(
            files,
            &tags
                .iter()
                .map(|tag| TagEdit::Remove(tag.as_ref().to_owned()))
                .collect::<Vec<_>>(),
        )
    }

    /// Apply `edits`,
    /// in order,
    /// to the name of every file.
    ///
    /// Missing files,
    /// broken links,
    /// and files that cannot be renamed
    /// are counted as errors and skipped.
    /// Directories are skipped.
    pub fn retag(&self, files: &[PathBuf], edits: &[TagEdit]) -> Result<RetagOutcome, Error> {
        if files.is_empty() {
            return Err(UserInputError::NoFiles.into());
        }
        if edits.is_empty() {
            return Err(UserInputError::NoTags.into());
        }

        let mut outcome = RetagOutcome::default();
        for file in files {
            self.retag_file(file, edits, &mut outcome)?;
        }
        Ok(outcome)
    }

    /// `name` after applying `edits`.
    ///
    /// Adding a tag of a mutual-exclusion group
    /// first removes the other tags of that group,
    /// so the last of several conflicting tags wins.
    pub fn apply_edits(&self, name: &str, edits: &[TagEdit]) -> String {
        let mut name = name.to_owned();
        for edit in edits {
            let tag = edit.tag();
            match edit {
                TagEdit::Add(_) => {
                    if let Some(vocabulary) = &self.vocabulary {
                        for other in vocabulary.exclusive_with(tag) {
                            name = self.service.remove_tag(&name, other);
                        }
                    }
                    name = self.service.add_tag(&name, tag.as_str());
                }
                TagEdit::Remove(_) => {
                    name = self.service.remove_tag(&name, tag.as_str());
                }
            }
        }
        name
    }

    /// The new path of `file`,
    /// if it was handled.
    fn retag_file(
        &self,
        file: &Path,
        edits: &[TagEdit],
        outcome: &mut RetagOutcome,
    ) -> Result<Option<PathBuf>, Error> {
        if self.service.is_dir(file) {
            warn!(
                "Skipping directory `{}`, only file names are changed",
                file.display()
            );
            return Ok(None);
        }

        let file = if self.service.exists(file) {
            file.to_owned()
        } else {
            match self.unique_alternative(file)? {
                Some(alternative) => {
                    info!(
                        "`{}` does not exist, using `{}`",
                        file.display(),
                        alternative.display()
                    );
                    alternative
                }
                None => {
                    error!("`{}` does not exist", file.display());
                    outcome.errors += 1;
                    return Ok(None);
                }
            }
        };

        match self.service.resolve_link(&file)? {
            LinkStatus::Broken(target) => {
                error!(
                    "`{}` is a broken link to `{}`",
                    file.display(),
                    target.display()
                );
                outcome.errors += 1;
                Ok(None)
            }
            LinkStatus::Healthy(target) if same_name_as_target(&file, &target) => {
                self.retag_link_and_original(&file, &target, edits, outcome)
            }
            _ => self.rename_with_edits(&file, edits, outcome),
        }
    }

    /// A link named like its target
    /// keeps that name after both are retagged.
    fn retag_link_and_original(
        &self,
        link: &Path,
        target: &Path,
        edits: &[TagEdit],
        outcome: &mut RetagOutcome,
    ) -> Result<Option<PathBuf>, Error> {
        debug!(
            "`{}` links to `{}`, retagging both",
            link.display(),
            target.display()
        );
        let new_target = match self.retag_file(target, edits, outcome)? {
            Some(new_target) => new_target,
            None => return Ok(None),
        };
        if new_target == target {
            return Ok(Some(link.to_owned()));
        }

        let Some(target_name) = new_target.file_name() else {
            return Ok(Some(link.to_owned()));
        };
        let new_link = self
            .service
            .link_strategy()
            .destination_for(&link.with_file_name(target_name));
        info!("`{}` → `{}`", link.display(), new_link.display());
        if !self.dry_run {
            self.service.remove_link(link)?;
            match self.service.create_link(&new_target, &new_link, false) {
                Ok(_) => {}
                Err(LinkError::DestinationExists(path)) => {
                    error!("Cannot relink, `{}` already exists", path.display());
                    outcome.errors += 1;
                    return Ok(None);
                }
                Err(LinkError::Filesystem(e)) => return Err(e.into()),
            }
        }
        outcome.renamed.push(Rename {
            from: link.to_owned(),
            to: new_link.clone(),
        });
        Ok(Some(new_link))
    }

    fn rename_with_edits(
        &self,
        file: &Path,
        edits: &[TagEdit],
        outcome: &mut RetagOutcome,
    ) -> Result<Option<PathBuf>, Error> {
        let Some(name) = file.file_name().and_then(|name| name.to_str()) else {
            error!("`{}` is not a valid Unicode name", file.display());
            outcome.errors += 1;
            return Ok(None);
        };

        let new_name = self.apply_edits(name, edits);
        if new_name == name {
            debug!("`{}` is unchanged", file.display());
            return Ok(Some(file.to_owned()));
        }

        let new_file = file.with_file_name(&new_name);
        info!("`{name}` → `{new_name}`");
        if !self.dry_run {
            if let Err(e) = self.service.rename(file, &new_file) {
                match e.kind() {
                    std::io::ErrorKind::AlreadyExists | std::io::ErrorKind::NotFound => {
                        error!("Cannot rename `{}`: {e}", file.display());
                        outcome.errors += 1;
                        return Ok(None);
                    }
                    _ => return Err(e.into()),
                }
            }
        }
        outcome.renamed.push(Rename {
            from: file.to_owned(),
            to: new_file.clone(),
        });
        Ok(Some(new_file))
    }

    /// The only file in the directory of `file`
    /// whose name starts with the longest prefix of its name
    /// shared with any file.
    fn unique_alternative(&self, file: &Path) -> std::io::Result<Option<PathBuf>> {
        let Some(name) = file.file_name().and_then(|name| name.to_str()) else {
            return Ok(None);
        };
        let dir = match file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        if !self.service.is_dir(dir) {
            return Ok(None);
        }

        let names = self
            .service
            .walk(dir, false)?
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .map(|entry| entry.name())
            .collect::<Vec<_>>();
        let prefix_lens = std::iter::once(name.len())
            .chain(name.char_indices().rev().map(|(i, _)| i))
            .filter(|i| *i > 0);
        for len in prefix_lens {
            let prefix = &name[..len];
            let mut matches = names.iter().filter(|x| x.starts_with(prefix));
            match (matches.next(), matches.next()) {
                (Some(x), None) => return Ok(Some(dir.join(x))),
                (Some(_), Some(_)) => {
                    debug!("Several files start with `{prefix}`");
                    return Ok(None);
                }
                _ => {}
            }
        }
        Ok(None)
    }
}

fn same_name_as_target(link: &Path, target: &Path) -> bool {
    let Some(link_name) = link.file_name().map(|x| x.to_string_lossy()) else {
        return false;
    };
    let link_name = if is_shortcut_name(&link_name) {
        &link_name[..link_name.len() - SHORTCUT_SUFFIX.len()]
    } else {
        &link_name[..]
    };
    target
        .file_name()
        .is_some_and(|target_name| target_name.to_string_lossy() == link_name)
}

#[cfg(test)]
mod tests {
    use std::fs::{read_link, symlink_metadata};

    use crate::{
        link::symlink_file,
        tagged_filesystem::testing::{memory_filesystem, tagged_filesystem, MemoryService, Node},
        testing::{create_files_relative_to, list_files, tag, with_temp_dir},
        Vocabulary,
    };

    use super::*;

    fn add(s: &str) -> TagEdit {
        TagEdit::Add(tag(s))
    }

    fn remove(s: &str) -> TagEdit {
        TagEdit::Remove(tag(s))
    }

    #[test]
    fn add_tags_renames_files() {
        with_temp_dir(|dir| {
            create_files_relative_to(dir, ["img -- a b.jpg", "Report.pdf"]);
            let outcome = tagged_filesystem()
                .add_tags(
                    &[dir.join("img -- a b.jpg"), dir.join("Report.pdf")],
                    &[add("c")],
                )
                .unwrap();
            assert!(outcome.is_success());
            assert_eq!(outcome.renamed.len(), 2);
            assert_eq!(
                list_files(dir),
                ["Report -- c.pdf", "img -- a b c.jpg"].map(PathBuf::from)
            );
        })
    }

    #[test]
    fn remove_tags_removes_separator_with_last_tag() {
        with_temp_dir(|dir| {
            create_files_relative_to(dir, ["Report -- draft.pdf"]);
            tagged_filesystem()
                .remove_tags(&[dir.join("Report -- draft.pdf")], &[tag("draft")])
                .unwrap();
            assert_eq!(list_files(dir), [PathBuf::from("Report.pdf")]);
        })
    }

    #[test]
    fn retag_leaves_files_with_tag_unchanged() {
        with_temp_dir(|dir| {
            create_files_relative_to(dir, ["img -- a b.jpg"]);
            let outcome = tagged_filesystem()
                .add_tags(&[dir.join("img -- a b.jpg")], &[add("a")])
                .unwrap();
            assert_eq!(outcome, RetagOutcome::default());
        })
    }

    #[test]
    fn retag_applies_removals_from_minus_prefixed_tokens() {
        with_temp_dir(|dir| {
            create_files_relative_to(dir, ["x -- a b.txt"]);
            tagged_filesystem()
                .add_tags(
                    &[dir.join("x -- a b.txt")],
                    &TagEdit::parse_all("-a c").unwrap(),
                )
                .unwrap();
            assert_eq!(list_files(dir), [PathBuf::from("x -- b c.txt")]);
        })
    }

    #[test]
    fn retag_counts_missing_files_and_continues() {
        with_temp_dir(|dir| {
            create_files_relative_to(dir, ["x.txt"]);
            let outcome = tagged_filesystem()
                .add_tags(&[dir.join("missing.pdf"), dir.join("x.txt")], &[add("a")])
                .unwrap();
            assert_eq!(outcome.errors, 1);
            assert_eq!(list_files(dir), [PathBuf::from("x -- a.txt")]);
        })
    }

    #[test]
    fn retag_uses_unique_alternative_for_missing_file() {
        with_temp_dir(|dir| {
            create_files_relative_to(dir, ["2024-01-01 Report.pdf", "other.txt"]);
            let outcome = tagged_filesystem()
                .add_tags(&[dir.join("2024-01-01 Rep")], &[add("a")])
                .unwrap();
            assert!(outcome.is_success());
            assert_eq!(
                list_files(dir),
                ["2024-01-01 Report -- a.pdf", "other.txt"].map(PathBuf::from)
            );
        })
    }

    #[test]
    fn retag_does_not_guess_between_several_alternatives() {
        with_temp_dir(|dir| {
            create_files_relative_to(dir, ["ab.txt", "ac.txt"]);
            let outcome = tagged_filesystem()
                .add_tags(&[dir.join("ax")], &[add("t")])
                .unwrap();
            assert_eq!(outcome.errors, 1);
            assert_eq!(list_files(dir), ["ab.txt", "ac.txt"].map(PathBuf::from));
        })
    }

    #[test]
    fn retag_skips_directories() {
        with_temp_dir(|dir| {
            create_files_relative_to(dir, ["d/x.txt"]);
            let outcome = tagged_filesystem()
                .add_tags(&[dir.join("d")], &[add("a")])
                .unwrap();
            assert_eq!(outcome, RetagOutcome::default());
        })
    }

    #[test]
    fn retag_without_files_or_tags_is_user_error() {
        assert!(matches!(
            tagged_filesystem().add_tags(&[], &[add("a")]),
            Err(Error::UserInput(UserInputError::NoFiles))
        ));
        assert!(matches!(
            tagged_filesystem().add_tags(&[PathBuf::from("x")], &[]),
            Err(Error::UserInput(UserInputError::NoTags))
        ));
    }

    #[test]
    fn dry_run_does_not_rename() {
        with_temp_dir(|dir| {
            create_files_relative_to(dir, ["x.txt"]);
            let outcome = TaggedFilesystemBuilder::new()
                .dry_run(true)
                .build()
                .add_tags(&[dir.join("x.txt")], &[add("a")])
                .unwrap();
            assert_eq!(
                outcome.renamed,
                [Rename {
                    from: dir.join("x.txt"),
                    to: dir.join("x -- a.txt")
                }]
            );
            assert_eq!(list_files(dir), [PathBuf::from("x.txt")]);
        })
    }

    #[test]
    fn apply_edits_lets_last_exclusive_tag_win() {
        let filesystem = TaggedFilesystemBuilder::new()
            .vocabulary(Some(Vocabulary::parse("draft final\n")))
            .build();
        assert_eq!(
            filesystem.apply_edits("x -- draft a.txt", &[add("final")]),
            "x -- a final.txt"
        );
        assert_eq!(
            filesystem.apply_edits("x.txt", &[add("draft"), add("final")]),
            "x -- final.txt"
        );
        assert_eq!(
            filesystem.apply_edits("x -- final.txt", &[add("final")]),
            "x -- final.txt"
        );
    }

    #[test]
    fn apply_edits_without_vocabulary_keeps_both_tags() {
        assert_eq!(
            tagged_filesystem().apply_edits("x.txt", &[add("draft"), add("final"), remove("y")]),
            "x -- draft final.txt"
        );
    }

    #[test]
    #[cfg(target_family = "unix")]
    fn retag_renames_link_and_original_with_same_name() {
        with_temp_dir(|dir| {
            create_files_relative_to(dir, ["files/x.txt", "links/.keep"]);
            symlink_file(dir.join("files/x.txt"), dir.join("links/x.txt")).unwrap();
            let outcome = tagged_filesystem()
                .add_tags(&[dir.join("links/x.txt")], &[add("a")])
                .unwrap();
            assert_eq!(outcome.renamed.len(), 2);
            assert!(symlink_metadata(dir.join("links/x -- a.txt"))
                .unwrap()
                .is_symlink());
            assert_eq!(
                read_link(dir.join("links/x -- a.txt")).unwrap(),
                dir.join("files/x -- a.txt")
            );
            assert!(!dir.join("files/x.txt").exists());
        })
    }

    #[test]
    #[cfg(target_family = "unix")]
    fn retag_renames_only_link_with_different_name() {
        with_temp_dir(|dir| {
            create_files_relative_to(dir, ["x.txt"]);
            symlink_file(dir.join("x.txt"), dir.join("y.txt")).unwrap();
            tagged_filesystem()
                .add_tags(&[dir.join("y.txt")], &[add("a")])
                .unwrap();
            assert_eq!(list_files(dir), ["x.txt", "y -- a.txt"].map(PathBuf::from));
        })
    }

    #[test]
    fn retag_counts_broken_links() {
        let service = MemoryService::with_files(["/d/keep.txt"]);
        service
            .create_link(Path::new("/d/gone.txt"), Path::new("/d/l.txt"), false)
            .unwrap();
        let filesystem = TaggedFilesystemBuilder::with_service(service).build();
        let outcome = filesystem
            .add_tags(&[PathBuf::from("/d/l.txt")], &[add("a")])
            .unwrap();
        assert_eq!(outcome.errors, 1);
        assert_eq!(
            filesystem.service().node("/d/l.txt"),
            Some(Node::Link(PathBuf::from("/d/gone.txt")))
        );
    }

    #[test]
    fn retag_works_with_memory_service() {
        let filesystem = memory_filesystem(["/d/x -- a.txt"]);
        filesystem
            .remove_tags(&[PathBuf::from("/d/x -- a.txt")], &[TagRef::new("a")])
            .unwrap();
        assert_eq!(
            filesystem.service().list_files("/d"),
            [PathBuf::from("x.txt")]
        );
    }
}
