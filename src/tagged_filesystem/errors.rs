use std::path::PathBuf;

use crate::TagError;

#[derive(Debug, thiserror::Error)]
pub enum UserInputError {
    #[error("No files given")]
    NoFiles,
    #[error("No tags given")]
    NoTags,
    #[error("{0}")]
    InvalidTag(#[from] TagError),
    #[error("`{}` is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("Tag tree depth must be at least 1")]
    ZeroDepth,
    #[error(
        "`{}` is inside the tag tree `{}`, which is replaced on every run. Please choose another tag tree directory.",
        .dir.display(),
        .root.display()
    )]
    SourceInsideTarget { dir: PathBuf, root: PathBuf },
}

#[derive(Debug, thiserror::Error)]
#[error(
    "`{}` is not empty. Please choose an empty directory or use `--overwrite` to replace its contents.",
    .0.display()
)]
pub struct TargetNotEmptyError(pub PathBuf);

#[derive(Debug, thiserror::Error)]
#[error("No files found in `{}`", .0.display())]
pub struct NoInputFilesError(pub PathBuf);

/// An error that stops an operation.
///
/// Failures of single files are counted in outcomes instead.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub enum Error {
    UserInput(#[from] UserInputError),
    NoInputFiles(#[from] NoInputFilesError),
    TargetState(#[from] TargetNotEmptyError),
    Fatal(#[from] std::io::Error),
}

/// Some files could not be handled.
pub const PER_ITEM_EXIT_CODE: u8 = 1;
pub const USER_INPUT_EXIT_CODE: u8 = 2;
pub const NO_INPUT_FILES_EXIT_CODE: u8 = 10;
pub const TARGET_STATE_EXIT_CODE: u8 = 13;
pub const FATAL_EXIT_CODE: u8 = 20;

impl Error {
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::UserInput(_) => USER_INPUT_EXIT_CODE,
            Error::NoInputFiles(_) => NO_INPUT_FILES_EXIT_CODE,
            Error::TargetState(_) => TARGET_STATE_EXIT_CODE,
            Error::Fatal(_) => FATAL_EXIT_CODE,
        }
    }
}

impl From<TagError> for Error {
    fn from(value: TagError) -> Self {
        Error::UserInput(value.into())
    }
}
