use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use kibitz_client::{
    events::{self, PayloadSink},
    login, Runner, Session, UciEngine,
};
use kibitz_node::{dashboard, Config, ValidatedConfig};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{error, info, warn};

fn main() {
    if let Err(err) = main_result() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn main_result() -> Result<()> {
    // Parse arguments
    let matches = Command::new("kibitz")
        .about("Chess bot for the kurnik.pl lobby.")
        .arg(Arg::new("config").long("config").required(true))
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Validate config and exit without connecting")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Emit structured JSON logs")
                .action(ArgAction::SetTrue),
        )
        .get_matches();
    let dry_run = matches.get_flag("dry-run");
    let json_logs = matches.get_flag("json-logs");

    // Load config
    let config_file = matches
        .get_one::<String>("config")
        .context("missing --config")?;
    let config_file = std::fs::read_to_string(config_file)
        .with_context(|| format!("Could not read config file {config_file}"))?;
    let config: Config =
        serde_yaml::from_str(&config_file).context("Could not parse config file")?;

    if dry_run {
        println!("{:#?}", config.redacted_debug());
        config.validate().context("Invalid config")?;
        println!("config ok");
        return Ok(());
    }

    let redacted = format!("{:?}", config.redacted_debug());
    let config = config.validate().context("Invalid config")?;

    // Configure logging
    let subscriber = tracing_subscriber::fmt().with_max_level(config.log_level);
    if json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    info!(config = %redacted, "loaded config file");

    // Start runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: ValidatedConfig) -> Result<()> {
    let mut rng = StdRng::from_entropy();
    let session_id = match &config.account {
        Some(account) => {
            login::fetch_session_id(&config.login_url, &account.login, &account.password)
                .await
                .context("Login failed")?
        }
        None => {
            info!("no account configured, playing as guest");
            login::guest_session(&mut rng)
        }
    };

    let engine = UciEngine::spawn(&config.engine_path, &config.engine_options)
        .await
        .with_context(|| format!("Could not start engine {}", config.engine_path.display()))?;

    let (mut writer, stream) = events::connect(
        &config.server_url,
        login::USER_AGENT,
        &config.origin,
        config.mailbox_size,
    )
    .await
    .context("Could not connect to lobby")?;
    let greeting = login::login_payload(&mut rng, &session_id, &config.lobby_url);
    writer
        .send(greeting.to_payload())
        .await
        .context("Could not send login")?;

    let session = Session::new(engine, config.policy);
    let (runner, handle) = Runner::new(session, stream, writer, config.mailbox_size);

    if let Some(port) = config.dashboard_port {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(err) = dashboard::serve(port, handle).await {
                error!(?err, "dashboard stopped");
            }
        });
    }

    {
        let handle = handle.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("interrupt received");
                    handle.shutdown().await;
                }
                Err(err) => warn!(?err, "could not listen for interrupt"),
            }
        });
    }

    runner.run().await.context("Session ended")?;
    info!("stopped");
    Ok(())
}
