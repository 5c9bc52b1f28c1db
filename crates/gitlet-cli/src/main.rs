//! gitlet CLI: the command-line front end to gitlet-core.

use std::path::Path;
use std::process;

use chrono::Local;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use gitlet_core::{Commit, GitletResult, MergeOutcome, Repository};
use tracing::debug;

/// Environment variable holding the log filter (e.g. `debug`, `gitlet_core=trace`).
const LOG_ENV: &str = "GITLET_LOG";

const DATE_FORMAT: &str = "%a %b %-d %H:%M:%S %Y %z";

#[derive(Parser, Debug)]
#[command(name = "gitlet", about = "gitlet: a tiny version-control system", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new repository in the current directory.
    Init,

    /// Stage a file for the next commit.
    Add {
        path: String,
    },

    /// Record the staged changes.
    Commit {
        #[arg(allow_hyphen_values = true)]
        message: String,
    },

    /// Unstage a file, or stage its removal if it is tracked.
    Rm {
        path: String,
    },

    /// Show the current branch's history.
    Log,

    /// Show every commit ever made.
    GlobalLog,

    /// Print the ids of commits with the given message.
    Find {
        #[arg(allow_hyphen_values = true)]
        message: String,
    },

    /// Show branches, staged, removed, modified and untracked files.
    Status,

    /// Restore a file (`-- <path>`, `<commit> -- <path>`) or switch branch.
    Checkout {
        /// Branch name, or commit id when a path follows.
        target: Option<String>,

        /// File to restore.
        #[arg(last = true)]
        path: Option<String>,
    },

    /// Create a branch at the current commit.
    Branch {
        name: String,
    },

    /// Delete a branch pointer.
    RmBranch {
        name: String,
    },

    /// Move the current branch to a commit and check it out.
    Reset {
        commit_id: String,
    },

    /// Merge a branch into the current branch.
    Merge {
        branch: String,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                fail("Please enter a command.")
            }
            ErrorKind::InvalidSubcommand => fail("No command with that name exists."),
            _ => fail("Incorrect operands."),
        },
    };

    init_tracing();

    let cwd = std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("internal error: cannot determine current directory: {e}");
        process::exit(1);
    });
    debug!(cwd = %cwd.display(), command = ?cli.command, "dispatching");

    let result = match cli.command {
        Commands::Init => cmd_init(&cwd),
        Commands::Add { path } => cmd_add(&cwd, &path),
        Commands::Commit { message } => cmd_commit(&cwd, &message),
        Commands::Rm { path } => cmd_rm(&cwd, &path),
        Commands::Log => cmd_log(&cwd),
        Commands::GlobalLog => cmd_global_log(&cwd),
        Commands::Find { message } => cmd_find(&cwd, &message),
        Commands::Status => cmd_status(&cwd),
        Commands::Checkout { target, path } => match (target, path) {
            (target, Some(path)) => cmd_checkout_file(&cwd, target.as_deref(), &path),
            (Some(branch), None) => cmd_checkout_branch(&cwd, &branch),
            (None, None) => fail("Incorrect operands."),
        },
        Commands::Branch { name } => cmd_branch(&cwd, &name),
        Commands::RmBranch { name } => cmd_rm_branch(&cwd, &name),
        Commands::Reset { commit_id } => cmd_reset(&cwd, &commit_id),
        Commands::Merge { branch } => cmd_merge(&cwd, &branch),
    };

    if let Err(e) = result {
        if e.is_user_error() {
            println!("{e}");
        } else {
            eprintln!("internal error: {e}");
        }
        process::exit(1);
    }
}

/// Print a usage message and exit abnormally.
fn fail(message: &str) -> ! {
    println!("{message}");
    process::exit(1);
}

/// Log to stderr, filtered by `GITLET_LOG` (default `warn`).
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn cmd_init(cwd: &Path) -> GitletResult<()> {
    Repository::init(cwd)?;
    Ok(())
}

fn cmd_add(cwd: &Path, path: &str) -> GitletResult<()> {
    Repository::open(cwd)?.add(path)
}

fn cmd_commit(cwd: &Path, message: &str) -> GitletResult<()> {
    Repository::open(cwd)?.commit(message)?;
    Ok(())
}

fn cmd_rm(cwd: &Path, path: &str) -> GitletResult<()> {
    Repository::open(cwd)?.rm(path)
}

fn cmd_log(cwd: &Path) -> GitletResult<()> {
    let repo = Repository::open(cwd)?;
    for commit in repo.log()? {
        print_commit(&repo, &commit);
    }
    Ok(())
}

fn cmd_global_log(cwd: &Path) -> GitletResult<()> {
    let repo = Repository::open(cwd)?;
    for commit in repo.global_log()? {
        print_commit(&repo, &commit);
    }
    Ok(())
}

fn print_commit(repo: &Repository, commit: &Commit) {
    println!("===");
    println!("commit {}", commit.id);
    if let (Some(first), Some(second)) = (&commit.parent, &commit.second_parent) {
        let config = repo.config();
        println!("Merge: {} {}", config.abbrev(first), config.abbrev(second));
    }
    let date = commit.timestamp.with_timezone(&Local);
    println!("Date: {}", date.format(DATE_FORMAT));
    println!("{}", commit.message);
    println!();
}

fn cmd_find(cwd: &Path, message: &str) -> GitletResult<()> {
    let repo = Repository::open(cwd)?;
    for id in repo.find(message)? {
        println!("{id}");
    }
    Ok(())
}

fn cmd_status(cwd: &Path) -> GitletResult<()> {
    let repo = Repository::open(cwd)?;
    let report = repo.status()?;

    println!("=== Branches ===");
    for branch in &report.branches {
        if *branch == report.current_branch {
            println!("*{branch}");
        } else {
            println!("{branch}");
        }
    }
    println!();

    print_section("Staged Files", &report.status.staged);
    print_section("Removed Files", &report.status.removed);
    print_section("Modifications Not Staged For Commit", &report.status.not_staged);
    print_section("Untracked Files", &report.status.untracked);
    Ok(())
}

fn print_section<T: std::fmt::Display>(title: &str, items: &[T]) {
    println!("=== {title} ===");
    for item in items {
        println!("{item}");
    }
    println!();
}

fn cmd_checkout_file(cwd: &Path, commit_id: Option<&str>, path: &str) -> GitletResult<()> {
    Repository::open(cwd)?.checkout_file(commit_id, path)
}

fn cmd_checkout_branch(cwd: &Path, branch: &str) -> GitletResult<()> {
    Repository::open(cwd)?.checkout_branch(branch)
}

fn cmd_branch(cwd: &Path, name: &str) -> GitletResult<()> {
    Repository::open(cwd)?.create_branch(name)
}

fn cmd_rm_branch(cwd: &Path, name: &str) -> GitletResult<()> {
    Repository::open(cwd)?.remove_branch(name)
}

fn cmd_reset(cwd: &Path, commit_id: &str) -> GitletResult<()> {
    Repository::open(cwd)?.reset(commit_id)?;
    Ok(())
}

fn cmd_merge(cwd: &Path, branch: &str) -> GitletResult<()> {
    let mut repo = Repository::open(cwd)?;
    match repo.merge(branch)? {
        MergeOutcome::AlreadyAncestor => {
            println!("Given branch is an ancestor of the current branch.")
        }
        MergeOutcome::FastForwarded => println!("Current branch fast-forwarded."),
        MergeOutcome::Merged { conflicted: true, .. } => {
            println!("Encountered a merge conflict.")
        }
        MergeOutcome::Merged { .. } => {}
    }
    Ok(())
}
