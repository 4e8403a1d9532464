use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gitsieve::areas::database::Database;
use gitsieve::areas::refs::Refs;
use gitsieve::artifacts::expand::expand_commit;
use gitsieve::artifacts::filter::compose::OrFilter;
use gitsieve::artifacts::filter::loader::load_patterns_from_str;
use gitsieve::artifacts::filter::{Filter, TrueFilter};
use gitsieve::artifacts::objects::commit::Commit;
use gitsieve::artifacts::objects::object::Object;
use gitsieve::artifacts::objects::object_id::ObjectId;
use gitsieve::artifacts::rewrite::history::{filter_linear_history, get_linear_history};
use gitsieve::artifacts::rewrite::sign_strip::remove_signatures_for_linear_history;
use gitsieve::artifacts::rewrite::tree_dump::dump_tree;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "gitsieve",
    version = "0.1.0",
    about = "Deterministic filtering and rewriting of linear git histories",
    long_about = "gitsieve rewrites a linear git history so that every tree contains \
    only paths admitted by a set of patterns. The rewrite is deterministic: as long \
    as the parameters stay the same, every run produces exactly the same commits. \
    The input history must be linear, submodules are silently ignored, and GPG \
    signatures are dropped."
)]
struct Cli {
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase log verbosity (-v for debug, -vv for trace)"
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "filter-hist",
        about = "Filter files and recreate a linear history",
        long_about = "Reads the linear history of the input repository, keeps only \
        the paths admitted by the patterns, and writes the rewritten blobs, trees \
        and commits into the output repository. Commits left with an empty tree \
        restart the output chain; commits whose filtered tree equals their \
        parent's are collapsed away."
    )]
    FilterHist {
        #[arg(short = 'i', long, help = "Input .git directory")]
        input_dir: PathBuf,
        #[arg(short = 'o', long, help = "Output .git directory (an empty .git is sufficient)")]
        output_dir: PathBuf,
        #[command(flatten)]
        history: HistoryArgs,
        #[command(flatten)]
        patterns: PatternArgs,
        #[command(flatten)]
        branch: BranchArgs,
    },
    #[command(
        name = "expand-commit",
        about = "Add changes in a filtered commit back onto an unfiltered commit",
        long_about = "Takes the diff between a filtered commit and its parent and \
        re-applies it onto a commit of the unfiltered repository, producing a new \
        commit there. The target commit, filtered down by the same prefixes, must \
        match the filtered commit's parent tree."
    )]
    ExpandCommit {
        #[arg(short = 'i', long, help = "Input .git directory containing the filtered repo")]
        input_dir: PathBuf,
        #[arg(short = 'o', long, help = "Output .git directory containing the unfiltered repo")]
        output_dir: PathBuf,
        #[arg(short = 'c', long, help = "Commit in the filtered repo whose change to re-apply")]
        input_commit: String,
        #[arg(short = 't', long, help = "Commit in the unfiltered repo to apply the change onto")]
        target_commit: String,
        #[arg(short = 'p', long = "prefix", required = true, help = "Path prefixes the filtered repo was produced with")]
        prefixes: Vec<String>,
        #[command(flatten)]
        branch: BranchArgs,
    },
    #[command(
        name = "remove-gpg",
        about = "Rebuild a linear history with GPG signatures removed"
    )]
    RemoveGpg {
        #[arg(short = 'i', long, help = "Input .git directory")]
        input_dir: PathBuf,
        #[arg(short = 'o', long, help = "Output .git directory")]
        output_dir: PathBuf,
        #[command(flatten)]
        history: HistoryArgs,
        #[command(flatten)]
        branch: BranchArgs,
    },
    #[command(
        name = "dump-tree",
        about = "Print the filtered file listing of a commit's tree"
    )]
    DumpTree {
        #[arg(short = 'i', long, help = "Input .git directory")]
        input_dir: PathBuf,
        #[arg(short = 'c', long, help = "Commit to list (defaults to HEAD)")]
        commit: Option<String>,
        #[command(flatten)]
        patterns: PatternArgs,
    },
}

#[derive(Args)]
struct HistoryArgs {
    #[arg(
        short = 'n',
        long,
        default_value_t = 0,
        help = "Number of commits to seek back (0 = to the root)"
    )]
    num_commits: usize,
    #[arg(short = 'e', long, help = "End commit hash (defaults to HEAD)")]
    end_commit: Option<String>,
    #[arg(short = 's', long, help = "Commit hash the walk stops at, inclusive")]
    start_commit: Option<String>,
}

impl HistoryArgs {
    fn collect(
        &self,
        cancel: &CancellationToken,
        database: &Database,
        refs: &Refs,
    ) -> anyhow::Result<Vec<Commit>> {
        let end_oid = match &self.end_commit {
            Some(hex) => ObjectId::try_parse(hex.clone())?,
            None => refs
                .read_head()?
                .context("repository has no HEAD commit")?,
        };
        let head = database
            .parse_object_as_commit(&end_oid)
            .with_context(|| format!("failed to obtain head commit {end_oid}"))?;

        let start = self
            .start_commit
            .as_ref()
            .map(|hex| ObjectId::try_parse(hex.clone()))
            .transpose()?;

        get_linear_history(cancel, database, &head, start.as_ref(), self.num_commits)
    }
}

#[derive(Args)]
struct PatternArgs {
    #[arg(short = 'p', long = "pattern", help = "Patterns used to filter the repository")]
    patterns: Vec<String>,
    #[arg(long, help = "A .gitignore-like file of patterns")]
    pattern_file: Option<PathBuf>,
    #[arg(long, help = "Silently drop unsupported patterns such as '!'")]
    allow_unsupported_pattern: bool,
}

impl PatternArgs {
    fn build_filter(&self, required: bool) -> anyhow::Result<Box<dyn Filter>> {
        let mut lines = self.patterns.clone();
        if let Some(pattern_file) = &self.pattern_file {
            let content = std::fs::read_to_string(pattern_file).with_context(|| {
                format!("failed to read pattern file {}", pattern_file.display())
            })?;
            lines.extend(load_patterns_from_str(
                &content,
                self.allow_unsupported_pattern,
            )?);
        }

        if lines.is_empty() {
            if required {
                return Err(anyhow::anyhow!(
                    "at least one pattern is required (--pattern or --pattern-file)"
                ));
            }
            return Ok(Box::new(TrueFilter));
        }

        Ok(Box::new(OrFilter::for_patterns(&lines)?))
    }
}

#[derive(Args)]
struct BranchArgs {
    #[arg(short = 'b', long, help = "Branch name to point at the rewritten head")]
    branch: Option<String>,
    #[arg(long, help = "Also point HEAD at the branch")]
    set_head: bool,
}

impl BranchArgs {
    fn apply(&self, refs: &Refs, new_head: Option<&Commit>) -> anyhow::Result<()> {
        let Some(branch) = &self.branch else {
            if self.set_head {
                tracing::warn!("empty branch name, head will not be set");
            }
            return Ok(());
        };
        let Some(new_head) = new_head else {
            tracing::warn!("no commits generated, branch will not be set");
            return Ok(());
        };

        refs.update_branch(branch, &new_head.object_id()?)?;
        if self.set_head {
            refs.set_head_to_branch(branch)?;
        }

        Ok(())
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn objects_database(git_dir: &Path) -> Database {
    Database::new(git_dir.join("objects").into_boxed_path())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancellationToken::new();

    match &cli.command {
        Commands::FilterHist {
            input_dir,
            output_dir,
            history,
            patterns,
            branch,
        } => {
            let input = objects_database(input_dir);
            let input_refs = Refs::new(input_dir.clone().into_boxed_path());
            let output = objects_database(output_dir);
            let output_refs = Refs::new(output_dir.clone().into_boxed_path());

            let hist = history.collect(&cancel, &input, &input_refs)?;
            let filter = patterns.build_filter(true)?;

            let new_hist =
                filter_linear_history(&cancel, &input, &hist, &output, filter.as_ref())?;

            println!(
                "From {} commits, generated {} commits.",
                hist.len(),
                new_hist.len()
            );
            if let Some(head) = new_hist.last() {
                println!("Head commit is:\n{}", head.display());
            }

            branch.apply(&output_refs, new_hist.last())?;
        }
        Commands::ExpandCommit {
            input_dir,
            output_dir,
            input_commit,
            target_commit,
            prefixes,
            branch,
        } => {
            let input = objects_database(input_dir);
            let output = objects_database(output_dir);
            let output_refs = Refs::new(output_dir.clone().into_boxed_path());

            let input_oid = ObjectId::try_parse(input_commit.clone())?;
            let filtered_new = input
                .parse_object_as_commit(&input_oid)
                .with_context(|| format!("failed to obtain input commit {input_oid}"))?;
            let parent_oid = filtered_new
                .parent()
                .context("input commit has no parent to diff against")?;
            let filtered_orig = input
                .parse_object_as_commit(parent_oid)
                .with_context(|| format!("failed to obtain parent commit {parent_oid}"))?;

            let target_oid = ObjectId::try_parse(target_commit.clone())?;
            let target = output
                .parse_object_as_commit(&target_oid)
                .with_context(|| format!("failed to obtain target commit {target_oid}"))?;

            let filter = OrFilter::for_prefixes(prefixes);

            let new_commit = expand_commit(
                &cancel,
                &input,
                &filtered_orig,
                &filtered_new,
                &target,
                &output,
                &filter,
            )?;

            println!("Generated commit {}", new_commit.object_id()?);

            branch.apply(&output_refs, Some(&new_commit))?;
        }
        Commands::RemoveGpg {
            input_dir,
            output_dir,
            history,
            branch,
        } => {
            let input = objects_database(input_dir);
            let input_refs = Refs::new(input_dir.clone().into_boxed_path());
            let output = objects_database(output_dir);
            let output_refs = Refs::new(output_dir.clone().into_boxed_path());

            let hist = history.collect(&cancel, &input, &input_refs)?;

            // trees and blobs are shared verbatim with the input repo
            for commit in &hist {
                let tree = input.parse_object_as_tree(commit.tree_oid())?;
                gitsieve::artifacts::rewrite::tree_copy::copy_tree(
                    &cancel, &input, &tree, &output,
                )?;
            }

            let new_hist = remove_signatures_for_linear_history(&cancel, &hist, &output)?;

            println!(
                "From {} commits, rebuilt {} commits without signatures.",
                hist.len(),
                new_hist.len()
            );

            branch.apply(&output_refs, new_hist.last())?;
        }
        Commands::DumpTree {
            input_dir,
            commit,
            patterns,
        } => {
            let input = objects_database(input_dir);
            let input_refs = Refs::new(input_dir.clone().into_boxed_path());

            let commit_oid = match commit {
                Some(hex) => ObjectId::try_parse(hex.clone())?,
                None => input_refs
                    .read_head()?
                    .context("repository has no HEAD commit")?,
            };
            let commit = input
                .parse_object_as_commit(&commit_oid)
                .with_context(|| format!("failed to obtain commit {commit_oid}"))?;
            let tree = input
                .parse_object_as_tree(commit.tree_oid())
                .with_context(|| format!("failed to obtain tree for commit {commit_oid}"))?;

            let filter = patterns.build_filter(false)?;

            let mut stdout = std::io::stdout();
            dump_tree(&cancel, &input, &tree, &[], filter.as_ref(), &mut stdout)?;
        }
    }

    Ok(())
}
