use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use filetags::{
    Config, LocalFilesystem, MutualExclusionPolicy, RetagOutcome, Tag, TagEdit, TagService,
    TagTreeOptions, TaggedFilesystemBuilder, UntaggedPolicy, PER_ITEM_EXIT_CODE,
    USER_INPUT_EXIT_CODE,
};
use tracing::{error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SUGGESTIONS: usize = 10;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Make no changes to the filesystem
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print every decision taken by the program
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Print only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Read configuration from this file
    /// instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add tags to files
    ///
    /// Tags are separated by spaces.
    /// A tag starting with `-` is removed instead.
    /// Adding a tag of a group in the vocabulary file
    /// removes the other tags of that group.
    Add {
        /// Tags to add
        #[clap(required = true, value_name = "TAGS")]
        tags: String,

        /// Files to tag
        #[clap(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// Remove tags from files
    Remove {
        /// Tags to remove
        #[clap(required = true, value_name = "TAGS")]
        tags: String,

        /// Files to remove tags from
        #[clap(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// Link files into a directory for every permutation of their tags
    ///
    /// The tree directory is replaced on every run.
    Tagtrees {
        /// Directory of files to link
        #[arg(default_value = ".")]
        source: PathBuf,

        /// Directory to generate the tree in
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Maximum number of nested tag directories
        #[arg(long, value_name = "N")]
        depth: Option<usize>,

        /// `treeroot`, `ignore`, or a directory for untagged files
        #[arg(long, value_name = "POLICY")]
        untagged: Option<UntaggedPolicy>,

        /// Link files without any tag of a vocabulary group
        /// into `no-<tag>-<tag>...`
        #[arg(long)]
        link_missing_mutual: bool,

        /// Only link files with every one of these tags
        #[arg(long = "filter", value_name = "TAG")]
        filter: Vec<Tag>,

        /// Include files below the source directory
        #[arg(short, long)]
        recursive: bool,

        /// Prefer hard links to symbolic links
        #[arg(long)]
        hardlinks: bool,

        /// Replace the contents of an existing tree directory
        #[arg(long)]
        overwrite: bool,

        /// Link files in parallel
        #[arg(long)]
        parallel: bool,
    },
    /// List tags in file and directory names by frequency
    List {
        /// Directory to list tags of
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Include names below the directory
        #[arg(short, long)]
        recursive: bool,

        /// Print only the most frequent tags worth suggesting
        #[arg(long)]
        suggest: bool,
    },
    /// Print files with every given tag
    Filter {
        /// Tag files must have
        #[arg(long = "tag", required = true, value_name = "TAG")]
        tags: Vec<Tag>,

        /// Files to filter
        #[clap(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// Print tags every given file has
    Common {
        /// Files to compare
        #[clap(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match run(args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e:#}");
            // Anything else is a bad configuration.
            ExitCode::from(
                e.downcast_ref::<filetags::Error>()
                    .map_or(USER_INPUT_EXIT_CODE, filetags::Error::exit_code),
            )
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "filetags=debug"
    } else if quiet {
        "filetags=warn"
    } else {
        "filetags=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: Args) -> anyhow::Result<u8> {
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Commands::Add { tags, files } => {
            let edits = TagEdit::parse_all(&tags).map_err(filetags::Error::from)?;
            let outcome = TaggedFilesystemBuilder::new()
                .dry_run(args.dry_run)
                .vocabulary(nearest_vocabulary(&files)?)
                .build()
                .add_tags(&files, &edits)?;
            Ok(outcome_code(&outcome))
        }
        Commands::Remove { tags, files } => {
            let tags = TagEdit::parse_all(&tags)
                .map_err(filetags::Error::from)?
                .into_iter()
                .map(|edit| edit.tag().to_owned())
                .collect::<Vec<_>>();
            let outcome = TaggedFilesystemBuilder::new()
                .dry_run(args.dry_run)
                .build()
                .remove_tags(&files, &tags)?;
            Ok(outcome_code(&outcome))
        }
        Commands::Tagtrees {
            source,
            root,
            depth,
            untagged,
            link_missing_mutual,
            filter,
            recursive,
            hardlinks,
            overwrite,
            parallel,
        } => {
            let options = TagTreeOptions {
                max_depth: depth.unwrap_or(config.tagtrees_depth),
                recursive: recursive || config.recursive,
                untagged: untagged.unwrap_or_else(|| config.untagged.clone()),
                mutual_exclusion: if link_missing_mutual || config.link_missing_mutual {
                    MutualExclusionPolicy::LinkMissing
                } else {
                    MutualExclusionPolicy::Ignore
                },
                filter,
                ..TagTreeOptions::new(source, root.unwrap_or_else(|| config.tagtrees_dir()))
            };
            let report = TaggedFilesystemBuilder::new()
                .hardlinks(hardlinks || config.hardlinks)
                .dry_run(args.dry_run)
                .overwrite(overwrite)
                .parallel(parallel)
                .build()
                .generate_tag_tree(&options)?;
            println!("{}", report.links);
            Ok(0)
        }
        Commands::List {
            dir,
            recursive,
            suggest,
        } => {
            let filesystem = TaggedFilesystemBuilder::new().build();
            let count = filesystem.list_tags(&dir, recursive)?;
            let vocabulary = filesystem.service().load_vocabulary(&dir)?;
            if suggest {
                for tag in count.suggestions(SUGGESTIONS, &[], vocabulary.as_ref()) {
                    println!("{tag}");
                }
            } else {
                for (tag, n) in count.by_count() {
                    println!("{n}\t{tag}");
                }
            }
            if let Some(vocabulary) = &vocabulary {
                for tag in count.unknown_to(vocabulary) {
                    warn!("`{tag}` is not in the vocabulary");
                }
            }
            Ok(0)
        }
        Commands::Filter { tags, files } => {
            for file in TaggedFilesystemBuilder::new()
                .build()
                .filter_by_tags(&files, &tags)
            {
                println!("{}", file.display());
            }
            Ok(0)
        }
        Commands::Common { files } => {
            for tag in TaggedFilesystemBuilder::new().build().common_tags(&files) {
                println!("{tag}");
            }
            Ok(0)
        }
    }
}

/// Vocabulary of the directory of the first file.
fn nearest_vocabulary(files: &[PathBuf]) -> anyhow::Result<Option<filetags::Vocabulary>> {
    let Some(file) = files.first() else {
        return Ok(None);
    };
    let start = std::env::current_dir()
        .context("Failed to read the working directory")?
        .join(file);
    let start = if start.exists() {
        start
    } else {
        start.parent().map(Path::to_owned).unwrap_or(start)
    };
    Ok(LocalFilesystem::default().load_vocabulary(&start)?)
}

fn outcome_code(outcome: &RetagOutcome) -> u8 {
    if outcome.is_success() {
        0
    } else {
        PER_ITEM_EXIT_CODE
    }
}
