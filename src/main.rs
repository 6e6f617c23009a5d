use anyhow::Result;
use clap::Parser;
use magisk_channel::config::{Config, ConfigOptions, DEFAULT_OWNER, DEFAULT_REPO};
use magisk_channel::provider::{DEFAULT_API_URL, RepoId};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// magisk-channel - Update channel generator
///
/// Downloads the apk and release notes of the latest GitHub release and
/// writes a channel file (stable.json) pointing at them.
///
/// The access token is read from APP_GITHUB_TOKEN, falling back to
/// GITHUB_TOKEN. A .env file in the base directory is loaded first.
#[derive(Parser, Debug)]
#[command(author, version = env!("MAGISK_CHANNEL_VERSION"), about)]
struct Cli {
    /// Directory holding .env and the dist output (defaults to the current directory)
    #[arg(
        long = "base-dir",
        short = 'b',
        env = "MAGISK_CHANNEL_BASE_DIR",
        value_name = "PATH"
    )]
    base_dir: Option<PathBuf>,

    /// Repository owner
    #[arg(long, default_value = DEFAULT_OWNER, conflicts_with = "source")]
    owner: String,

    /// Repository name
    #[arg(long, default_value = DEFAULT_REPO, conflicts_with = "source")]
    repo: String,

    /// Repository as "owner/repo" (overrides --owner and --repo)
    #[arg(long, value_name = "OWNER/REPO")]
    source: Option<RepoId>,

    /// GitHub API URL
    #[arg(long = "api-url", value_name = "URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Request timeout in seconds (no timeout by default)
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Channel name; written as <NAME>.json
    #[arg(long, value_name = "NAME", default_value = magisk_channel::channel::DEFAULT_CHANNEL)]
    channel: String,
}

impl Cli {
    fn into_options(self) -> ConfigOptions {
        let repo = self
            .source
            .unwrap_or_else(|| RepoId::new(self.owner, self.repo));
        ConfigOptions {
            base_dir: self.base_dir,
            repo,
            api_url: self.api_url,
            timeout: self.timeout.map(Duration::from_secs),
            channel: self.channel,
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let runtime = magisk_channel::runtime::RealRuntime;
    let config = Config::load(&runtime, cli.into_options())?;
    let summary = magisk_channel::run(&runtime, &config).await?;

    println!(
        "       wrote {} for {} ({:.2} MB downloaded)",
        summary.channel_path.display(),
        summary.tag,
        summary.downloaded_bytes() as f64 / (1024.0 * 1024.0)
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            let code = magisk_channel::error::exit_code_for(&e);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
