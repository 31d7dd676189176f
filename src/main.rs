//! cascade command-line interface

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cascade::concurrent::ExecMode;
use cascade::config::Settings;
use cascade::engine::Engine;
use cascade::error::{Error, Result};
use cascade::host::GitHubHost;
use cascade::state_file;
use cascade::vcs::{self, GitCli};
use cascade::{merge, update};

#[derive(Parser)]
#[command(name = "cascade", version, about = "Stacked pull requests for Git")]
struct Cli {
    /// Path to the repository (defaults to the current directory)
    #[arg(long, global = true)]
    path: Option<PathBuf>,

    /// Run all remote operations serially instead of in parallel
    #[arg(long, global = true, hide = true)]
    serial: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile local commits and PR sets with the remote
    Update {
        /// Selector choosing commits and their destination PR set,
        /// e.g. "s0:1-3" or "s0+4"
        selector: Option<String>,
    },
    /// Merge a PR set, e.g. "s0"
    Merge {
        /// PR set to merge
        prset: String,
    },
    /// Show the status of all commits and PR sets
    Status {
        /// Print the column legend
        #[arg(long)]
        detail: bool,
    },
    /// Cherry-pick the newest PR's commits onto the local branch
    Sync,
    /// Amend a commit in the middle of the stack
    Amend,
    /// Run the configured merge check and record the result
    Check,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        if std::env::var("SPR_DEBUG").as_deref() == Ok("1") {
            panic!("{err:?}");
        }
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = match cli.path {
        Some(path) => path,
        None => std::env::current_dir()
            .map_err(|e| Error::Internal(format!("getting current dir: {e}")))?,
    };
    let root = vcs::git::discover_root(&cwd)?;

    let mut settings = Settings::load(&root)?;
    let bootstrap = GitCli::new(settings.clone(), root.clone());
    if let Ok(url) = bootstrap.remote_url() {
        settings.infer_repo_from_remote_url(&url);
    }
    if settings.repo.github_repo_owner.is_empty() || settings.repo.github_repo_name.is_empty() {
        return Err(Error::ConfigMissing(
            "unable to determine the repository owner and name; set them in .cascade.yml"
                .to_string(),
        ));
    }

    let token = std::env::var("GITHUB_TOKEN")
        .or_else(|_| std::env::var("GH_TOKEN"))
        .map_err(|_| {
            Error::ConfigMissing("set GITHUB_TOKEN (or GH_TOKEN) to authenticate".to_string())
        })?;

    let api_host = if settings.repo.github_host == "github.com" {
        None
    } else {
        Some(settings.repo.github_host.clone())
    };
    let host = Arc::new(GitHubHost::new(
        &token,
        settings.repo.github_repo_owner.clone(),
        settings.repo.github_repo_name.clone(),
        api_host,
    )?);
    let git = Arc::new(GitCli::new(settings.clone(), root.clone()));

    let mode = if cli.serial {
        ExecMode::Serial
    } else {
        ExecMode::Parallel
    };
    let mut engine = Engine::new(
        settings,
        state_file::default_state_path(),
        root,
        host,
        git,
        mode,
    )?;

    let width = crossterm::terminal::size()
        .ok()
        .map(|(cols, _)| cols as usize);

    match cli.cmd {
        Command::Update { selector } => {
            let rendered =
                update::run(&mut engine, selector.as_deref().unwrap_or(""), width).await?;
            print!("{rendered}");
        }
        Command::Merge { prset } => merge::run(&mut engine, &prset).await?,
        Command::Status { detail } => {
            let rendered = engine.status(width, detail).await?;
            print!("{rendered}");
        }
        Command::Sync => {
            if !engine.sync().await? {
                println!("pull request stack is empty");
            }
        }
        Command::Amend => amend(&mut engine).await?,
        Command::Check => println!("{}", engine.check().await?),
    }

    Ok(())
}

async fn amend(engine: &mut Engine) -> Result<()> {
    let state = engine.read_state().await?;
    if state.commits.is_empty() {
        println!("no commits to amend");
        return Ok(());
    }

    for cm in &state.commits {
        let id = if cm.commit.commit_id.is_empty() {
            cm.commit.commit_hash.get(..8).unwrap_or(&cm.commit.commit_hash)
        } else {
            &cm.commit.commit_id
        };
        println!(" {} : {} : {}", cm.index + 1, id, cm.commit.subject);
    }

    let count = state.commits.len();
    let prompt = if count == 1 {
        "Commit to amend (1)".to_string()
    } else {
        format!("Commit to amend (1-{count})")
    };
    let chosen: usize = dialoguer::Input::new()
        .with_prompt(prompt)
        .validate_with(|input: &usize| {
            if (1..=count).contains(input) {
                Ok(())
            } else {
                Err("invalid commit number")
            }
        })
        .interact_text()
        .map_err(|e| Error::Internal(format!("failed to read input: {e}")))?;

    let Some(target) = state.commits.iter().find(|cm| cm.index + 1 == chosen) else {
        return Err(Error::Internal(format!("no commit numbered {chosen}")));
    };
    engine.amend(&target.commit.commit_hash).await
}
