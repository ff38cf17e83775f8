//! Profile session CLI
//!
//! Operator tool for the profile API session core:
//! 1. Loads config (TOML + env) and opens the persisted token slot
//! 2. Builds one `SessionManager`
//! 3. Runs a single command through it and prints the API's JSON to stdout
//!
//! Logs go to stderr as JSON so stdout stays pipeable.

mod config;

use anyhow::{Context, Result, bail};
use session::{Error as SessionError, SessionManager, SignUp};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

const USAGE: &str = "usage: profile-session [--config PATH] <command>

commands:
  sign-in <email> <password>
  sign-up <name> <email> <password>
  sign-out
  me
  get <path>
  refresh
  status";

/// One CLI invocation.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    SignIn { email: String, password: String },
    SignUp(SignUpArgs),
    SignOut,
    Me,
    Get { path: String },
    Refresh,
    Status,
}

#[derive(Debug, PartialEq, Eq)]
struct SignUpArgs {
    name: String,
    email: String,
    password: String,
}

/// Split `--config PATH` out of the arguments and parse the command.
fn parse_args(args: &[String]) -> Result<(Option<String>, Command)> {
    let mut config = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let Some(path) = iter.next() else {
                bail!("--config needs a path\n\n{USAGE}");
            };
            config = Some(path.clone());
        } else {
            rest.push(arg.as_str());
        }
    }

    let command = match rest.as_slice() {
        ["sign-in", email, password] => Command::SignIn {
            email: email.to_string(),
            password: password.to_string(),
        },
        ["sign-up", name, email, password] => Command::SignUp(SignUpArgs {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }),
        ["sign-out"] => Command::SignOut,
        ["me"] => Command::Me,
        ["get", path] => Command::Get {
            path: path.to_string(),
        },
        ["refresh"] => Command::Refresh,
        ["status"] => Command::Status,
        [] => bail!("missing command\n\n{USAGE}"),
        other => bail!("unrecognized command: {}\n\n{USAGE}", other.join(" ")),
    };

    Ok((config, command))
}

/// Attach a sign-in hint to errors that mean the session is gone.
fn session_error(err: SessionError) -> anyhow::Error {
    if err.is_session_invalid() {
        anyhow::Error::new(err).context("session expired, run `profile-session sign-in` again")
    } else {
        anyhow::Error::new(err)
    }
}

async fn run(manager: &SessionManager, command: Command) -> Result<serde_json::Value> {
    let output = match command {
        Command::SignIn { email, password } => {
            manager
                .sign_in(&email, &password)
                .await
                .map_err(session_error)?;
            serde_json::json!({ "signed_in": true, "email": email })
        }
        Command::SignUp(args) => {
            let account = SignUp {
                name: args.name,
                email: args.email,
                password: args.password,
            };
            manager.sign_up(&account).await.map_err(session_error)?;
            serde_json::json!({ "signed_up": true, "email": account.email })
        }
        Command::SignOut => {
            manager.sign_out().await;
            serde_json::json!({ "signed_out": true })
        }
        Command::Me => manager.current_user().await.map_err(session_error)?,
        Command::Get { path } => manager
            .get_json::<serde_json::Value>(&path)
            .await
            .map_err(session_error)?,
        Command::Refresh => {
            manager
                .refresh()
                .await
                .map_err(|e| session_error(e.into()))?;
            serde_json::json!({ "refreshed": true })
        }
        Command::Status => serde_json::json!({
            "base_url": manager.endpoints().base_url(),
            "authenticated": manager.is_authenticated(),
        }),
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr, LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (cli_config_path, command) = parse_args(&args)?;

    let (config_path, required) = Config::resolve_path(cli_config_path.as_deref());
    let config = Config::load(&config_path, required)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        token_path = %config.storage.token_path.display(),
        persist = config.storage.persist,
        "configuration loaded"
    );

    let manager = SessionManager::new(config.session_config(), config.token_store())
        .context("failed to initialize session")?;

    let output = run(&manager, command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
