//! Thin argument-parsing/dispatch shell over [`crate::orchestrator`] (§6
//! "CLI surface"). Out of scope for correctness per the spec's Non-goals;
//! present because the rest of the crate needs an external interface.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use crate::config;
use crate::git::{OpenOpts, Repo, normalize_remote_url};
use crate::orchestrator::{self, CancellationToken};
use crate::registry::{ProjectPath, RegistryCache};
use crate::workspace::{Directories, Workspace, WorkspaceConfig};
use crate::{Error, Result};

#[derive(Debug, Parser)]
#[command(name = "protato", version, about = "Distributed registry for Protocol Buffer source files")]
struct Cli {
    /// Registry Git remote URL. Falls back to PROTATO_REGISTRY_URL.
    #[arg(long, global = true, env = "PROTATO_REGISTRY_URL")]
    registry_url: Option<String>,

    /// Local cache root for registry mirrors. Falls back to
    /// PROTATO_REGISTRY_CACHE, then an OS-conventional cache directory.
    #[arg(long, global = true, env = "PROTATO_REGISTRY_CACHE")]
    cache_dir: Option<PathBuf>,

    /// Increase verbosity (repeatable: -v, -vv, -vvv).
    #[arg(short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Run as if started in <dir> instead of the current directory.
    #[arg(short = 'C', global = true, value_name = "dir")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Initialize a workspace (write protato.yaml) in the current directory.
    Init {
        /// Registry namespace this workspace publishes under.
        service: String,
        #[arg(long, default_value = "proto")]
        owned_dir: String,
        #[arg(long, default_value = "vendor")]
        vendor_dir: String,
        #[arg(long)]
        no_auto_discover: bool,
        #[arg(long = "project")]
        projects: Vec<String>,
        #[arg(long = "ignore")]
        ignores: Vec<String>,
        /// Overwrite (deep-merging over) an existing protato.yaml.
        #[arg(long)]
        force: bool,
    },

    /// Scaffold a new owned project directory under ownedDir.
    New {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Pull the transitive closure of the given (or all previously pulled) projects.
    Pull {
        paths: Vec<String>,
        /// Skip refreshing the registry cache before resolving.
        #[arg(long)]
        offline: bool,
        /// Pull exactly the named projects, without their dependencies.
        #[arg(long)]
        no_deps: bool,
        /// Allow local files with no registry counterpart to be deleted.
        #[arg(long)]
        force: bool,
        #[arg(long)]
        include_prefix: Option<String>,
    },

    /// Publish every owned project.
    Push {
        /// Skip compiling the about-to-be-published closure with protox.
        #[arg(long)]
        no_validate: bool,
        #[arg(long)]
        include_prefix: Option<String>,
    },

    /// Check local drift and ownership claims without writing anything.
    Verify,

    /// List projects: --local for this workspace's own view, else the registry's.
    List {
        #[arg(long)]
        local: bool,
        #[arg(long)]
        prefix: Option<String>,
    },

    /// List this workspace's owned projects or files.
    Mine {
        #[arg(long)]
        projects: bool,
        #[arg(long)]
        absolute: bool,
    },
}

/// Parse `argv`, dispatch, and return the process exit code (§6 "Exit
/// codes"). Never panics on a handled error; an `Err` here means a bug in
/// argument wiring, not a user-facing failure.
pub async fn run(args: impl IntoIterator<Item = String>) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            e.print().ok();
            return if e.use_stderr() { 1 } else { 0 };
        }
    };

    init_logging(cli.verbose);

    match dispatch(&cli).await {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{e}");
            e.exit_code()
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => config::verbosity_from_env(),
        n => n,
    };
    let filter = match level {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(filter).init();
}

async fn dispatch(cli: &Cli) -> Result<()> {
    let root = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    match &cli.command {
        Command::Init { service, owned_dir, vendor_dir, no_auto_discover, projects, ignores, force } => {
            let config = WorkspaceConfig {
                service: service.clone(),
                directories: Directories { owned: owned_dir.clone(), vendor: vendor_dir.clone() },
                auto_discover: !no_auto_discover,
                projects: projects.clone(),
                ignores: ignores.clone(),
            };
            let workspace = Workspace::init(&root, config, *force)?;
            println!("initialized workspace '{}' at {}", workspace.config().service, root.display());
            Ok(())
        }

        Command::New { paths } => {
            let workspace = Workspace::open(&root)?;
            for raw in paths {
                let path = ProjectPath::parse(raw.clone()).map_err(crate::workspace::WorkspaceError::from)?;
                let dir = workspace.owned_dir().join(path.as_str());
                std::fs::create_dir_all(&dir)?;
                println!("created {}", dir.display());
            }
            Ok(())
        }

        Command::Pull { paths, offline, no_deps, force, include_prefix } => {
            let workspace = Workspace::open(&root)?;
            let cache = open_cache(cli, &root)?;
            let cancel = install_cancel_handler();

            let roots = paths
                .iter()
                .map(|p| ProjectPath::parse(p.clone()).map_err(crate::workspace::WorkspaceError::from))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let outcome = orchestrator::pull(
                &workspace,
                &cache,
                &cancel,
                &roots,
                *offline,
                *no_deps,
                *force,
                include_prefix.as_deref(),
            )
            .await?;

            println!(
                "pulled {} project(s): {} file(s) changed, {} deleted",
                outcome.projects.len(),
                outcome.files_changed,
                outcome.files_deleted
            );
            for project in &outcome.projects {
                println!("  {project}");
            }
            Ok(())
        }

        Command::Push { no_validate, include_prefix } => {
            let workspace = Workspace::open(&root)?;
            let cache = open_cache(cli, &root)?;
            let producer_repo = Repo::open(&root, OpenOpts { bare: false })?;
            let cancel = install_cancel_handler();
            let retry = config::retry_policy_from_env();

            let outcome = orchestrator::push(
                &workspace,
                &producer_repo,
                &cache,
                retry,
                &cancel,
                !*no_validate,
                include_prefix.as_deref(),
            )
            .await?;

            match outcome.snapshot {
                Some(snapshot) => {
                    println!(
                        "pushed {} project(s) at {}",
                        outcome.projects_updated.len(),
                        orchestrator::short_hash(&snapshot)
                    );
                    for project in &outcome.projects_updated {
                        println!("  {project}");
                    }
                }
                None => println!("nothing to push: no owned projects found"),
            }
            Ok(())
        }

        Command::Verify => {
            let workspace = Workspace::open(&root)?;
            let cache = open_cache(cli, &root)?;
            let producer_repo = Repo::open(&root, OpenOpts { bare: false })?;
            let remote_url = normalize_remote_url(&producer_repo.get_remote_url("origin")?);

            let report = orchestrator::verify(&workspace, &cache, &remote_url)?;

            for diff in &report.file_diffs {
                println!("{:?}: {}/{}", diff.verdict, diff.project, diff.path);
            }
            for conflict in &report.ownership_conflicts {
                println!("ownership conflict: '{}' is owned by '{}'", conflict.project, conflict.owner);
            }
            for orphan in &report.orphans {
                println!("orphan: {}", orphan.0);
            }

            if report.has_errors() {
                Err(crate::orchestrator::OrchestratorError::ConflictOwner {
                    path: report.ownership_conflicts[0].project.clone(),
                    owner: report.ownership_conflicts[0].owner.clone(),
                }
                .into())
            } else {
                Ok(())
            }
        }

        Command::List { local, prefix } => {
            let workspace = Workspace::open(&root)?;
            if *local {
                for entry in orchestrator::local_projects(&workspace)? {
                    match entry.snapshot_prefix {
                        Some(prefix) => println!("{} ({:?}, {prefix})", entry.registry_path, entry.kind),
                        None => println!("{} ({:?})", entry.registry_path, entry.kind),
                    }
                }
            } else {
                let cache = open_cache(cli, &root)?;
                let snapshot = cache.snapshot()?;
                for project in orchestrator::registry_projects(&cache, &snapshot, prefix.as_deref())? {
                    println!("{project}");
                }
            }
            Ok(())
        }

        Command::Mine { projects, absolute } => {
            let workspace = Workspace::open(&root)?;
            if *projects {
                for path in orchestrator::mine_projects(&workspace)? {
                    println!("{path}");
                }
            } else {
                for file in orchestrator::mine_files(&workspace, *absolute)? {
                    println!("{file}");
                }
            }
            Ok(())
        }
    }
}

fn open_cache(cli: &Cli, _root: &Path) -> Result<RegistryCache> {
    let registry_url = cli
        .registry_url
        .clone()
        .or_else(config::registry_url_from_env)
        .ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "no registry URL: pass --registry-url or set PROTATO_REGISTRY_URL",
            ))
        })?;
    let cache_dir = cli
        .cache_dir
        .clone()
        .or_else(config::cache_dir_from_env)
        .unwrap_or_else(config::default_cache_dir);

    Ok(RegistryCache::open(&cache_dir, &registry_url, config::DEFAULT_BRANCH)?)
}

fn install_cancel_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let forwarded = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            forwarded.cancel();
        }
    });
    cancel
}
