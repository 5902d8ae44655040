use clap::{CommandFactory, FromArgMatches, Parser};
use std::ffi::{OsStr, OsString};
use std::path::Path;

pub const DEFAULT_UPSTREAM_URL: &str = "https://geographiclib.sourceforge.io/cgi-bin/GeoidEval";

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "geoid-gateway")]
#[command(about = "Rate limited JSON gateway for geoid height lookups")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    // Max admitted requests per client per window
    #[arg(long, env = "REQUEST_LIMIT", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub request_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "REQUEST_WINDOW", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub request_window: u64,

    // Geoid calculator page to scrape
    #[arg(long, env = "UPSTREAM_URL", default_value = DEFAULT_UPSTREAM_URL)]
    pub upstream_url: String,

    // Upstream request timeout in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub upstream_timeout: u64,

    // Seconds between sweeps of expired rate limit entries (0 = never sweep)
    #[arg(long, env = "SWEEP_INTERVAL", default_value_t = 0)]
    pub sweep_interval: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
    #[error(transparent)]
    Cli(#[from] clap::Error),
}

impl Args {
    // Parse argv with `env_file` (a .env file) filling in variables the process
    // environment doesn't set. Precedence: flags, process env, env file, defaults.
    pub fn load_from<I, T>(env_file: &Path, argv: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let file_vars = read_env_file(env_file)?;
        let mut cmd = Args::command().args_override_self(true);

        let mut argv = argv.into_iter().map(Into::<OsString>::into);
        let mut full: Vec<OsString> = argv.next().into_iter().collect();

        // file values go first as flags so anything given later on the command line wins
        for (key, value) in file_vars {
            if std::env::var_os(&key).is_some() {
                continue;
            }
            let long = cmd
                .get_arguments()
                .find(|arg| arg.get_env() == Some(OsStr::new(&key)))
                .and_then(|arg| arg.get_long());
            if let Some(long) = long {
                full.push(format!("--{}={}", long, value).into());
            }
        }
        full.extend(argv);

        let matches = cmd.try_get_matches_from_mut(full)?;
        Ok(Args::from_arg_matches(&matches)?)
    }
}

fn read_env_file(path: &Path) -> Result<Vec<(String, String)>, dotenvy::Error> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter.collect(),
        Err(e) if e.not_found() => {
            tracing::info!("No env file at {}, using environment and flags only", path.display());
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}
