use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};

use release_flow::archive::{ArchiveVerifier, HttpArchiveSource, RetryPolicy};
use release_flow::cli::{parse_literal, Orchestrator, ReleaseArgs, RunOptions, VersionTarget};
use release_flow::config;
use release_flow::domain::{BumpKind, SkipFlags, Version};
use release_flow::git::{Git2Repository, Repository};
use release_flow::packages::{ConanUpdater, VcpkgUpdater};
use release_flow::ui;

#[derive(Parser)]
#[command(
    name = "release-flow",
    version,
    about = "Bump versions, tag releases and update package recipes for cargs"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Preview what would happen without making changes"
    )]
    dry_run: bool,

    #[arg(short, long, global = true, help = "Show detailed progress")]
    verbose: bool,

    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current version
    Get,

    /// Bump the version and commit the change
    Bump {
        #[arg(value_enum)]
        kind: BumpKind,
    },

    /// Set an explicit version and commit the change
    Set {
        #[arg(value_name = "X.Y.Z")]
        version: String,
    },

    /// Run the full release pipeline
    Release(ReleaseCommand),
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .args(["bump", "exact_version"])
))]
struct ReleaseCommand {
    #[arg(long, value_enum, help = "Bump kind for the new release")]
    bump: Option<BumpKind>,

    #[arg(long = "version", value_name = "X.Y.Z", help = "Explicit release version")]
    exact_version: Option<String>,

    #[arg(long, help = "Skip tag creation and everything that needs the tag")]
    skip_tag: bool,

    #[arg(long, help = "Skip Conan and vcpkg updates")]
    skip_packages: bool,

    #[arg(long, help = "Skip the CHANGELOG.md update")]
    skip_changelog: bool,

    #[arg(long, help = "Skip the GitHub release")]
    skip_github_release: bool,

    #[arg(long, help = "Path to a conan-center-index checkout")]
    conan_path: Option<PathBuf>,

    #[arg(long, help = "Path to a vcpkg checkout")]
    vcpkg_path: Option<PathBuf>,
}

impl ReleaseCommand {
    fn skip_flags(&self) -> SkipFlags {
        SkipFlags {
            tag: self.skip_tag,
            packages: self.skip_packages,
            changelog: self.skip_changelog,
            github_release: self.skip_github_release,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        ui::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Parse a literal version, warning when a suffix gets dropped
fn literal_version(text: &str) -> Result<Version> {
    let (version, warning) = parse_literal(text)?;
    if let Some(warning) = warning {
        ui::display_warning(&warning);
    }
    Ok(version)
}

fn run(cli: Cli) -> Result<()> {
    let options = RunOptions {
        dry_run: cli.dry_run,
        verbose: cli.verbose,
    };

    let repo = Git2Repository::open(".").context("Not inside a git repository")?;
    let config = config::load_config(cli.config.as_deref(), repo.root())
        .context("Error loading config")?;

    if options.dry_run {
        ui::display_status("Running in dry-run mode, no changes will be made");
    }

    let verifier = ArchiveVerifier::new(
        HttpArchiveSource::new()?,
        config.project.repository.clone(),
        RetryPolicy::from(&config.archive),
    );
    let mut orchestrator = Orchestrator::new(&repo, &config, verifier, options);

    match cli.command {
        Command::Get => {
            orchestrator.get()?;
        }
        Command::Bump { kind } => {
            orchestrator.bump(kind)?;
        }
        Command::Set { version } => {
            orchestrator.set(literal_version(&version)?)?;
        }
        Command::Release(release) => {
            let target = match (&release.bump, &release.exact_version) {
                (_, Some(text)) => VersionTarget::Set(literal_version(text)?),
                (Some(kind), None) => VersionTarget::Bump(*kind),
                (None, None) => anyhow::bail!("either --bump or --version is required"),
            };

            let project = &config.project;
            let conan = ConanUpdater::new(
                config.packages.conan_checkout(release.conan_path.as_deref()),
                project.package.clone(),
                project.repository.clone(),
            );
            let vcpkg = VcpkgUpdater::new(
                config.packages.vcpkg_checkout(release.vcpkg_path.as_deref()),
                project.package.clone(),
            );

            orchestrator
                .with_package_updater(Box::new(conan))
                .with_package_updater(Box::new(vcpkg))
                .release(ReleaseArgs {
                    target,
                    skip: release.skip_flags(),
                })?;
        }
    }

    Ok(())
}
