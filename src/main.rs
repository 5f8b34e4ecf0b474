use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use release_tasks::cli::{Check, ReleaseContext, WorkflowResult};
use release_tasks::cli::orchestration::{apply_version_transition, require_release_version};
use release_tasks::config::{self, Config, ModeFlags};
use release_tasks::git::Git2Repository;
use release_tasks::preconditions::{self, BranchContext};
use release_tasks::ui;
use release_tasks::{ReleaseTarget, Transition};

#[derive(Parser)]
#[command(
    name = "release-tasks",
    version,
    about = "Cut releases by rewriting a VERSION declaration and driving git, build and upload steps"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Version file to operate on (overrides config)")]
    version_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Treat this run as CI on the release branch")]
    ci: bool,

    #[arg(long, global = true, help = "Skip branch checks")]
    ignore_branch: bool,

    #[arg(long, global = true, help = "Commit and tag locally without pushing")]
    no_push: bool,

    #[arg(short, long, global = true, help = "Skip confirmation prompts")]
    yes: bool,

    #[arg(short, long, global = true, help = "Enable debug logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Print the current version
    Show,
    /// Drop a pre-release tag, or advance the patch of a released version
    SetReleaseVersion,
    /// Advance the patch and drop any pre-release tag
    IncrementReleaseVersion,
    /// Drop a pre-release tag without incrementing
    StripPreTag,
    /// Advance a released version to the next .pre version
    SetDevelopmentVersion,
    /// Fail unless the version file holds a release version
    IsReleaseVersion,
    /// Check the tree is clean, on the release branch and up to date
    Check,
    /// Run the checks and cut the release version
    PrepareReleasePush,
    /// Cut the release version, commit and push it
    OnlyPushRelease,
    /// Start the next development version, commit and push it
    NextDevCycle,
    /// Push a release commit for CI, then start the next development version
    PushRelease,
    /// Tag the current release version and push the tag
    Release,
    /// Push, tag and start the next development version from this machine
    LocalRelease,
    /// Validate, test, build and upload the package
    Up,
}

impl Command {
    fn transition(self) -> Option<Transition> {
        match self {
            Command::SetReleaseVersion => Some(Transition::Release),
            Command::IncrementReleaseVersion => Some(Transition::IncrementRelease),
            Command::StripPreTag => Some(Transition::StripPreTag),
            Command::SetDevelopmentVersion => Some(Transition::Development),
            _ => None,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "release_tasks=debug,info" } else { "warn" })
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(&args) {
        ui::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = config::load_config(args.config.as_deref())?;
    if let Some(path) = &args.version_file {
        config.version_file = Some(path.clone());
    }

    let mut flags = ModeFlags::from_env(&config.release_branch);
    flags.ci_mode |= args.ci;
    flags.ignore_branch |= args.ignore_branch;

    // Version-file tasks need no repository.
    match args.command {
        Command::Show => {
            let target = ReleaseTarget::setup(config.version_file()?, config.match_policy())?;
            println!("{}", target.current_value);
            return Ok(());
        }
        Command::IsReleaseVersion => {
            let mut target = ReleaseTarget::setup(config.version_file()?, config.match_policy())?;
            let version = require_release_version(&mut target)?;
            ui::display_success(&format!("On release version {}", version));
            return Ok(());
        }
        command => {
            if let Some(transition) = command.transition() {
                let mut target =
                    ReleaseTarget::setup(config.version_file()?, config.match_policy())?;
                apply_version_transition(&mut target, transition)?;
                return Ok(());
            }
        }
    }

    let repo = Git2Repository::open(".")?;

    if args.command == Command::Check {
        return run_checks(&config, flags, &repo);
    }

    if args.command == Command::LocalRelease
        && !args.yes
        && !ui::confirm_action("Release, tag and push from this machine?")?
    {
        println!("Operation cancelled by user.");
        return Ok(());
    }

    let mut ctx = ReleaseContext::new(config, flags, &repo)?.with_push(!args.no_push);
    let result = match args.command {
        Command::PrepareReleasePush => {
            ctx.prepare_release_push()?;
            None
        }
        Command::OnlyPushRelease => Some(ctx.only_push_release()?),
        Command::NextDevCycle => Some(ctx.next_dev_cycle()?),
        Command::PushRelease => Some(ctx.push_release()?),
        Command::Release => Some(ctx.release()?),
        Command::LocalRelease => Some(ctx.local_release()?),
        Command::Up => Some(ctx.up()?),
        _ => None,
    };

    if let Some(result) = result {
        display_result(&result);
    }
    Ok(())
}

fn run_checks(config: &Config, flags: ModeFlags, repo: &Git2Repository) -> Result<()> {
    let branch = BranchContext::new(config.release_branch.clone(), config.remote.clone());
    for check in [Check::Clean, Check::OnBranch, Check::UpToDate] {
        let status = preconditions::check(repo, check, &branch, flags)?;
        ui::display_check(check.name(), status);
    }
    Ok(())
}

fn display_result(result: &WorkflowResult) {
    if let Some(released) = &result.released {
        ui::display_success(&format!("Released version {}", released));
    }
    if let Some(tag) = &result.tag {
        ui::display_success(&format!("Tag {}", tag));
    }
    ui::display_status(&format!("Version file now at {}", result.version));
}
