use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{Duration, Utc};
use herald_core::HeraldConfig;
use herald_core::app::{AppBuilder, LoginAlertRequest};
use herald_core::domain::{DeviceRecord, PushToken, ScheduledNotification, UserId, UserProfile};
use herald_core::error::HeraldError;
use herald_core::impls::{InMemoryGateway, InMemoryStore, StoreSnapshot};
use herald_core::ports::GatewayError;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: herald [--config <file.toml>] [--seed <snapshot.json>] [--dump] <run-once | serve | login-alert <userId>>";

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}\n{usage}", usage = USAGE)]
    Usage(String),

    #[error("failed to read seed {path}: {source}")]
    SeedRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed: {0}")]
    SeedParse(#[source] serde_json::Error),

    #[error("failed to write output: {0}")]
    Output(#[source] serde_json::Error),

    #[error(transparent)]
    Herald(#[from] HeraldError),
}

#[derive(Debug)]
enum Command {
    RunOnce,
    Serve,
    LoginAlert(String),
}

#[derive(Debug)]
struct Cli {
    config: Option<PathBuf>,
    seed: Option<PathBuf>,
    dump: bool,
    command: Command,
}

impl Cli {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, CliError> {
        let mut config = None;
        let mut seed = None;
        let mut dump = false;
        let mut command = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args
                        .next()
                        .ok_or_else(|| CliError::Usage("--config needs a path".to_string()))?;
                    config = Some(PathBuf::from(path));
                }
                "--seed" => {
                    let path = args
                        .next()
                        .ok_or_else(|| CliError::Usage("--seed needs a path".to_string()))?;
                    seed = Some(PathBuf::from(path));
                }
                "--dump" => dump = true,
                "run-once" => command = Some(Command::RunOnce),
                "serve" => command = Some(Command::Serve),
                "login-alert" => {
                    let user = args
                        .next()
                        .ok_or_else(|| CliError::Usage("login-alert needs a userId".to_string()))?;
                    command = Some(Command::LoginAlert(user));
                }
                other => return Err(CliError::Usage(format!("unknown argument: {other}"))),
            }
        }

        let command = command.ok_or_else(|| CliError::Usage("missing command".to_string()))?;
        Ok(Self {
            config,
            seed,
            dump,
            command,
        })
    }
}

/// 何も渡されなかったときのデモデータ（送信成功・トークンなし・登録解除済み）
async fn seed_demo(store: &InMemoryStore, gateway: &InMemoryGateway) {
    let due = Utc::now() - Duration::minutes(1);
    store
        .insert_notification(ScheduledNotification::new(
            "n-1", "alice", "standup", "Standup", "Starts in 10 minutes", due,
        ))
        .await;
    store
        .insert_notification(ScheduledNotification::new(
            "n-2", "bob", "standup", "Standup", "Starts in 10 minutes", due,
        ))
        .await;
    store
        .insert_notification(ScheduledNotification::new(
            "n-3", "carol", "retro", "Retro", "Starts in 10 minutes", due,
        ))
        .await;
    store
        .upsert_user(UserProfile::new("alice", Some(PushToken::new("tok-alice"))))
        .await;
    store.upsert_user(UserProfile::new("bob", None)).await;
    store
        .upsert_user(UserProfile::new("carol", Some(PushToken::new("tok-carol-stale"))))
        .await;
    store
        .add_device(
            UserId::new("alice"),
            DeviceRecord::new("phone", Some(PushToken::new("tok-alice"))),
        )
        .await;
    gateway
        .fail_token_always("tok-carol-stale", GatewayError::token_not_registered())
        .await;
}

fn load_config(cli: &Cli) -> Result<HeraldConfig, CliError> {
    match &cli.config {
        Some(path) => Ok(HeraldConfig::load(path).map_err(HeraldError::from)?),
        None => Ok(HeraldConfig::default()),
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(CliError::Output)?;
    println!("{out}");
    Ok(())
}

async fn run(cli: Cli, config: HeraldConfig) -> Result<(), CliError> {
    let gateway = Arc::new(InMemoryGateway::new());
    let store = match &cli.seed {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|source| CliError::SeedRead {
                path: path.clone(),
                source,
            })?;
            let snapshot: StoreSnapshot =
                serde_json::from_str(&raw).map_err(CliError::SeedParse)?;
            Arc::new(InMemoryStore::from_snapshot(snapshot))
        }
        None => {
            let store = Arc::new(InMemoryStore::new());
            seed_demo(&store, &gateway).await;
            store
        }
    };

    let app = AppBuilder::new()
        .with_config(config)
        .with_store(store.clone())
        .with_gateway(gateway)
        .build()
        .map_err(HeraldError::from)?;

    match cli.command {
        Command::RunOnce => {
            let response = app.trigger_now().await;
            print_json(&response, false)?;
        }
        Command::Serve => {
            let trigger = app.spawn_scheduled()?;
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down");
            trigger.shutdown_and_join().await;
        }
        Command::LoginAlert(user_id) => {
            let response = app
                .send_login_alert(LoginAlertRequest::for_user(user_id))
                .await?;
            print_json(&response, false)?;
        }
    }

    if cli.dump {
        print_json(&store.snapshot().await, true)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::parse(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            // subscriber はまだないので直接出す
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // stdout は結果の JSON 用。ログは stderr に出す
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "herald failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, CliError> {
        Cli::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_flags_and_command() {
        let cli = parse(&["--config", "h.toml", "--dump", "login-alert", "u-1"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("h.toml")));
        assert!(cli.dump);
        assert!(matches!(cli.command, Command::LoginAlert(ref u) if u == "u-1"));
    }

    #[test]
    fn missing_command_is_usage_error() {
        assert!(matches!(parse(&["--dump"]), Err(CliError::Usage(_))));
        assert!(matches!(parse(&["login-alert"]), Err(CliError::Usage(_))));
        assert!(matches!(parse(&["bogus"]), Err(CliError::Usage(_))));
    }

    #[tokio::test]
    async fn demo_run_once_succeeds() {
        let cli = parse(&["run-once"]).unwrap();
        let config = load_config(&cli).unwrap();
        run(cli, config).await.unwrap();
    }

    #[test]
    fn unreadable_config_is_reported_once_up_front() {
        let cli = parse(&["--config", "/nonexistent/herald.toml", "run-once"]).unwrap();
        let err = load_config(&cli).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[tokio::test]
    async fn bad_seed_is_a_parse_error() {
        let path = std::env::temp_dir().join(format!("herald-seed-{}.json", std::process::id()));
        std::fs::write(&path, "not json").unwrap();
        let cli = parse(&["--seed", path.to_str().unwrap(), "run-once"]).unwrap();

        let err = run(cli, HeraldConfig::default()).await.unwrap_err();
        assert!(matches!(err, CliError::SeedParse(_)));
        let _ = std::fs::remove_file(&path);
    }
}
