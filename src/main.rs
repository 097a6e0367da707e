use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use prscan::{
    analyzer::{analyze_files, SourceFile},
    archive::extension_filter,
    config::Config,
    git,
    github::{GitHubClient, PullRequestRef},
    lockfile::{LockFileChange, LockFormat},
    model::{DependencyKey, ScanResult, Severity},
    output::{format_result_to_string, format_usage_to_string, print_result, OutputFormat},
    registry::NpmRegistry,
    scanner::{BatchMode, Scanner},
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const HIGH_RISK: u8 = 2;
    pub const MEDIUM_RISK: u8 = 3;
    pub const LOW_RISK: u8 = 4;
    pub const ERROR: u8 = 1;
}

#[derive(Parser)]
#[command(name = "prscan")]
#[command(
    author,
    version,
    about = "Triage the npm dependencies a change introduces for supply-chain risk"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (table, json)
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Write output to file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Record failing dependencies and keep scanning instead of aborting
    #[arg(long, global = true)]
    skip_failed: bool,

    /// Exit with error if findings at or above this severity are found
    #[arg(long, value_enum, global = true)]
    fail_on: Option<FailLevel>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the lock files changed by a GitHub pull request
    Pr {
        owner: String,
        repo: String,
        number: u64,
    },

    /// Scan the difference between two revisions of a local lock file
    Diff {
        /// New revision of the lock file
        #[arg(long)]
        new: PathBuf,

        /// Old revision; omit to treat the lock file as newly added
        #[arg(long)]
        old: Option<PathBuf>,

        /// Lock file format (yarn, pnpm); detected from the file name by default
        #[arg(long)]
        lock_format: Option<String>,
    },

    /// Scan the lock files changed between two revisions of a local git checkout
    Branch {
        /// Base revision
        base: String,

        /// Head revision
        head: String,

        /// Path to the git checkout
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,
    },

    /// Scan a single package version
    Package { name: String, version: String },

    /// Report the globals used by local JavaScript files or directories
    Analyze {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FailLevel {
    High,
    Medium,
    Low,
}

impl FailLevel {
    fn threshold(self) -> Severity {
        match self {
            FailLevel::High => Severity::High,
            FailLevel::Medium => Severity::Medium,
            FailLevel::Low => Severity::Low,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "prscan=debug" } else { "prscan=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<u8> {
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "ignoring unreadable config file");
        Config::default()
    });
    if cli.skip_failed {
        config.batch_mode = BatchMode::SkipFailed;
    }

    let format_str = cli.format.unwrap_or_else(|| config.default_format.clone());
    let format = OutputFormat::from_str(&format_str).map_err(|e| anyhow::anyhow!(e))?;
    let output = Output {
        format,
        file: cli.output,
    };

    match cli.command {
        Commands::Pr { owner, repo, number } => {
            let pr = PullRequestRef::new(owner, repo, number);
            let host = GitHubClient::from_config(&config.github);
            let scanner = scanner(&config);

            let spinner = spinner(&output, format!("Scanning {}...", pr));
            let result = scanner.scan_pull_request(&host, &pr).await;
            finish(spinner, &result);

            output.write_result(&result?, cli.fail_on)
        }
        Commands::Diff { new, old, lock_format } => {
            let change = read_lock_files(&new, old.as_deref(), lock_format.as_deref())?;
            let scanner = scanner(&config);

            let spinner = spinner(&output, format!("Scanning {}...", change.path));
            let result = scanner.scan_lock_files(&[change]).await;
            finish(spinner, &result);

            output.write_result(&result?, cli.fail_on)
        }
        Commands::Branch { base, head, repo } => {
            let locks = git::changed_lock_files(&repo, &base, &head)?;
            let scanner = scanner(&config);

            let spinner = spinner(&output, format!("Scanning {}..{}...", base, head));
            let result = scanner.scan_lock_files(&locks).await;
            finish(spinner, &result);

            output.write_result(&result?, cli.fail_on)
        }
        Commands::Package { name, version } => {
            let key = DependencyKey::new(name, version);
            let scanner = scanner(&config);

            let spinner = spinner(&output, format!("Scanning {}...", key));
            let result = scanner
                .scan_package(&key)
                .await
                .map(|scanned| ScanResult::new(vec![scanned]));
            finish(spinner, &result);

            output.write_result(&result?, cli.fail_on)
        }
        Commands::Analyze { paths } => {
            let files = collect_sources(&paths, &config.extraction.extensions)?;
            let analysis = analyze_files(&files);
            for skipped in &analysis.skipped {
                eprintln!("Skipped {}: {}", skipped.path, skipped.reason);
            }

            output.write(&format_usage_to_string(&analysis.usage, output.format)?)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

fn scanner(config: &Config) -> Scanner {
    Scanner::from_config(Arc::new(NpmRegistry::from_config(&config.registry)), config)
}

struct Output {
    format: OutputFormat,
    file: Option<PathBuf>,
}

impl Output {
    fn is_interactive(&self) -> bool {
        self.format == OutputFormat::Table
    }

    fn write_result(&self, result: &ScanResult, fail_on: Option<FailLevel>) -> Result<u8> {
        match &self.file {
            Some(_) => self.write(&format_result_to_string(result, self.format)?)?,
            None => print_result(result, self.format)?,
        }
        Ok(determine_exit_code(result, fail_on))
    }

    fn write(&self, rendered: &str) -> Result<()> {
        match &self.file {
            Some(path) => {
                std::fs::write(path, rendered)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                if self.is_interactive() {
                    println!("Results written to: {}", path.display());
                }
            }
            None => print!("{}", rendered),
        }
        Ok(())
    }
}

fn spinner(output: &Output, message: String) -> Option<ProgressBar> {
    if !output.is_interactive() {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    Some(pb)
}

fn finish(spinner: Option<ProgressBar>, result: &prscan::Result<ScanResult>) {
    let Some(pb) = spinner else {
        return;
    };
    match result {
        Ok(result) => pb.finish_with_message(format!(
            "Scanned {} dependencies, {} findings",
            result.dependencies.len(),
            result.total_findings()
        )),
        Err(_) => pb.finish_and_clear(),
    }
}

fn read_lock_files(new: &Path, old: Option<&Path>, lock_format: Option<&str>) -> Result<LockFileChange> {
    let format = match lock_format {
        Some(name) => LockFormat::from_str(name).map_err(|e| anyhow::anyhow!(e))?,
        None => LockFormat::from_path(new).with_context(|| {
            format!(
                "Cannot detect the lock format of {}. Pass --lock-format yarn|pnpm",
                new.display()
            )
        })?,
    };

    let new_content = std::fs::read_to_string(new)
        .with_context(|| format!("Failed to read {}", new.display()))?;
    let old_content = old
        .map(|path| {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        })
        .transpose()?;

    Ok(LockFileChange::new(
        new.display().to_string(),
        format,
        old_content,
        new_content,
    ))
}

/// Reads every file under `paths` whose extension is in `extensions`.
/// Files named explicitly are read regardless of extension.
fn collect_sources(paths: &[PathBuf], extensions: &[String]) -> Result<Vec<SourceFile>> {
    let keep = extension_filter(extensions);
    let mut files = Vec::new();

    for root in paths {
        if root.is_file() {
            files.push(read_source(root)?);
            continue;
        }

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            let path = entry.path();
            if entry.file_type().is_file() && keep(path.to_string_lossy().as_ref()) {
                files.push(read_source(path)?);
            }
        }
    }

    Ok(files)
}

fn read_source(path: &Path) -> Result<SourceFile> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(SourceFile::new(
        path.display().to_string(),
        String::from_utf8_lossy(&bytes),
    ))
}

/// Determine the exit code based on findings and the --fail-on setting
fn determine_exit_code(result: &ScanResult, fail_on: Option<FailLevel>) -> u8 {
    let Some(fail_on) = fail_on else {
        return exit_codes::SUCCESS;
    };

    match result.highest_severity() {
        Some(highest) if highest >= fail_on.threshold() => match highest {
            Severity::High => exit_codes::HIGH_RISK,
            Severity::Medium => exit_codes::MEDIUM_RISK,
            Severity::Low => exit_codes::LOW_RISK,
        },
        _ => exit_codes::SUCCESS,
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'prscan config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
