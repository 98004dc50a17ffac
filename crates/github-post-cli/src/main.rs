//! github-post - file GitHub issues for failed stress-test runs
//!
//! Runs as the last step of a TeamCity stress build. Build metadata comes
//! from the environment TeamCity exports:
//!
//! - `BUILD_VCS_NUMBER`: commit SHA
//! - `TC_SERVER_URL`, `TC_BUILD_ID`: where the build log lives
//! - `PKG`: the stressed package
//! - `COCKROACH_PROPOSER_EVALUATED_KV`, `TAGS`, `GOFLAGS`: echoed build parameters
//! - `GITHUB_API_TOKEN`: credentials for filing the issue

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{bail, ensure, Context, Result};
use clap::{Args, Parser, ValueEnum};
use github_issues::{GithubClient, GithubConfig, DEFAULT_API_URL};
use github_post_core::{
    post_failures, BuildContext, FormatterConfig, IssueSink, MarkerPolicy, PostConfig,
    PostReport,
};
use tracing::{info, warn, Level};

mod dry_run;

use dry_run::DryRunSink;

const PROPOSER_EVALUATED_KV_ENV: &str = "COCKROACH_PROPOSER_EVALUATED_KV";
const TAGS_ENV: &str = "TAGS";
const GOFLAGS_ENV: &str = "GOFLAGS";

#[derive(Parser)]
#[command(name = "github-post")]
#[command(author = "The Cockroach Authors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "File GitHub issues for failed stress-test runs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Stress log to scan (default: stdin)
    log: Option<PathBuf>,

    #[command(flatten)]
    build: BuildArgs,

    /// Whether failures after the first keep the running test's attribution
    #[arg(long, value_enum, default_value_t = MarkerPolicyArg::Shared)]
    marker_policy: MarkerPolicyArg,

    /// Print rendered issues as JSON lines instead of posting them
    #[arg(long)]
    dry_run: bool,

    /// Exit with an error when no issue was created
    #[arg(long)]
    require_failure: bool,

    /// GitHub API token
    #[arg(long, env = "GITHUB_API_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    github_api_url: String,
}

#[derive(Args, Clone, Debug)]
struct BuildArgs {
    /// Commit SHA the build ran against
    #[arg(long, env = "BUILD_VCS_NUMBER")]
    sha: String,

    /// TeamCity server base URL
    #[arg(long, env = "TC_SERVER_URL")]
    server_url: String,

    /// TeamCity build ID
    #[arg(long, env = "TC_BUILD_ID")]
    build_id: u64,

    /// Package the stress run exercised
    #[arg(long = "pkg", env = "PKG")]
    package: String,

    /// Proposer-evaluated KV setting of the run
    #[arg(long, env = PROPOSER_EVALUATED_KV_ENV)]
    proposer_evaluated_kv: Option<String>,

    /// Go build tags of the run
    #[arg(long, env = TAGS_ENV)]
    tags: Option<String>,

    /// Go build flags of the run
    #[arg(long, env = GOFLAGS_ENV)]
    goflags: Option<String>,
}

impl BuildArgs {
    /// Validate and convert into the core's build metadata.
    fn into_context(self) -> Result<BuildContext> {
        ensure!(!self.sha.trim().is_empty(), "commit SHA is empty");
        ensure!(!self.package.trim().is_empty(), "package name is empty");

        let url = reqwest::Url::parse(&self.server_url)
            .with_context(|| format!("invalid server URL '{}'", self.server_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("server URL '{}' must use http or https", self.server_url);
        }

        let mut ctx = BuildContext::new(self.sha, self.server_url, self.build_id, self.package);
        for (key, value) in [
            (PROPOSER_EVALUATED_KV_ENV, self.proposer_evaluated_kv),
            (TAGS_ENV, self.tags),
            (GOFLAGS_ENV, self.goflags),
        ] {
            if let Some(value) = value {
                ctx = ctx.with_parameter(key, value);
            }
        }
        Ok(ctx)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum MarkerPolicyArg {
    /// Every failure under a marker is filed against that test
    Shared,
    /// Only the first failure under a marker is attributed
    ConsumeOnce,
}

impl From<MarkerPolicyArg> for MarkerPolicy {
    fn from(arg: MarkerPolicyArg) -> Self {
        match arg {
            MarkerPolicyArg::Shared => MarkerPolicy::Shared,
            MarkerPolicyArg::ConsumeOnce => MarkerPolicy::ConsumeOnce,
        }
    }
}

fn open_log(path: Option<&PathBuf>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open stress log {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(std::io::stdin().lock())),
    }
}

fn build_sink(cli: &Cli) -> Result<Box<dyn IssueSink>> {
    if cli.dry_run {
        info!("Dry run: issues are printed, not posted");
        return Ok(Box::new(DryRunSink::new()));
    }
    let mut config = GithubConfig::new(&cli.github_api_url);
    if let Some(token) = cli.github_token.as_deref() {
        config = config.with_token(token);
    }
    let client = GithubClient::new(config).context("Failed to create GitHub client")?;
    Ok(Box::new(client))
}

async fn run(cli: Cli) -> Result<PostReport> {
    let input = open_log(cli.log.as_ref())?;
    let sink = build_sink(&cli)?;
    let ctx = cli
        .build
        .clone()
        .into_context()
        .context("Invalid build configuration")?;
    let config = PostConfig {
        formatter: FormatterConfig::default(),
        marker_policy: cli.marker_policy.into(),
    };

    let report = post_failures(input, &ctx, &config, sink.as_ref())
        .await
        .context("Failed to post stress failures")?;

    if report.created_count() == 0 {
        if cli.require_failure {
            bail!(
                "no attributable test failure found in stress log ({} unattributed)",
                report.unattributed
            );
        }
        warn!("No attributable test failure found; nothing posted");
    }
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    github_post_core::init_tracing(cli.json, level);

    let report = run(cli).await?;
    info!(
        created = report.created_count(),
        unattributed = report.unattributed,
        "Done"
    );
    Ok(())
}
