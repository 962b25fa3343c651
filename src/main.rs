use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use atd_submit::appliance::AtdClient;
use atd_submit::config::{Credentials, FileConfig, Mode, Overrides, Settings};
use atd_submit::console::Console;
use atd_submit::errors::AtdError;
use atd_submit::prompt::{TerminalPrompt, resolve_password};
use atd_submit::workflow::{Outcome, Stage, TokioSleeper, Workflow};

#[derive(Parser)]
#[command(name = "atd-submit")]
#[command(about = "Submit a file to an analysis appliance and exit with its verdict severity")]
#[command(long_about = "Uploads a file to the analysis appliance, waits for the analysis to finish and \
                       exits with the verdict severity (0-5). Negative exit codes report failures: \
                       -1 connect, -2 upload, -3 analysis, -4 report, -5 profile listing.")]
struct Cli {
    /// Appliance IP address or host name
    #[arg(short = 'i', long = "atd-ip", env = "ATD_HOST")]
    atd_ip: Option<String>,

    /// Do not verify the appliance's TLS certificate
    #[arg(
        short = 'n',
        long = "skip-ssl",
        env = "ATD_SKIP_TLS",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    skip_ssl: Option<bool>,

    /// User name
    #[arg(short, long, env = "ATD_USER")]
    user: Option<String>,

    /// Password, prompted for when omitted
    #[arg(short, long, env = "ATD_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// File to upload
    #[arg(short, long, value_name = "FILE")]
    sample: Option<PathBuf>,

    /// Analyzer profile id
    #[arg(short = 'a', long, env = "ATD_PROFILE")]
    profile: Option<String>,

    /// Output detail, 0 (dots only) to 3
    #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
    verbosity: u8,

    /// Suppress the progress dots
    #[arg(short, long)]
    quiet: bool,

    /// List the analyzer profiles instead of submitting a file
    #[arg(long)]
    list_profiles: bool,

    /// TOML config file with host, user, password, skip_tls, profile, timeout_secs
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            host: self.atd_ip.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            skip_tls: self.skip_ssl,
            profile: self.profile.clone(),
            sample: self.sample.clone(),
            timeout_secs: self.timeout,
            list_profiles: self.list_profiles,
        }
    }
}

fn usage_error(kind: ErrorKind, err: AtdError) -> ! {
    Cli::command().error(kind, err).exit()
}

/// A missing `.env` is normal; anything else is worth telling the user.
fn dotenv_warning(result: Result<PathBuf, dotenvy::Error>) -> Option<String> {
    match result {
        Ok(_) => None,
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => Some(format!("⚠️  Warning: Could not load .env file: {}", e)),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // ATD_* variables may come from a local .env file.
    if let Some(warning) = dotenv_warning(dotenvy::dotenv()) {
        eprintln!("{}", warning);
    }
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));

    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => FileConfig::load(path),
        None => FileConfig::load_default(),
    }
    .unwrap_or_else(|e| usage_error(ErrorKind::Io, e));
    let settings = Settings::resolve(cli.overrides(), file)
        .unwrap_or_else(|e| usage_error(ErrorKind::MissingRequiredArgument, e));

    let mut console = Console::stdout(cli.verbosity, cli.quiet);

    let password = match resolve_password(settings.password.clone(), &TerminalPrompt) {
        Ok(password) => password,
        Err(e) => {
            console.always(format_args!("Could not read password: {}", e));
            std::process::exit(Stage::Connect.exit_code());
        }
    };
    let credentials = Credentials {
        user: settings.user.clone(),
        password,
    };

    let mut client = match AtdClient::new(settings.appliance.clone()) {
        Ok(client) => client,
        Err(e) => {
            console.always(format_args!("{}", e));
            std::process::exit(Stage::Connect.exit_code());
        }
    };

    let outcome: Outcome = {
        let mut workflow = Workflow::new(&mut client, &TokioSleeper, &mut console);
        match &settings.mode {
            Mode::Submit { sample, profile } => workflow.submit(&credentials, sample, profile).await,
            Mode::ListProfiles => workflow.list_profiles(&credentials).await,
        }
    };

    std::process::exit(outcome.exit_code());
}
