use clap::{Parser, Subcommand};
use relay::config::{load_config, Settings};
use relay::gateway::{run_gateway, GatewayState};

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Relay CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the event gateway (webhook intake, health, and service metadata on one port).
    Serve {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from PORT, config, or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Print the health report for the resolved configuration without starting the server.
    Health {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Compute the request signature for a body, as the platform would send it.
    Sign {
        /// Signing secret (default: SLACK_SIGNING_SECRET)
        #[arg(long, env = "SLACK_SIGNING_SECRET")]
        secret: String,

        /// Unix timestamp in seconds (default: now)
        #[arg(long)]
        timestamp: Option<String>,

        /// Raw request body
        body: String,
    },

    /// Post a signed mention event to a running gateway.
    Simulate {
        /// Gateway base URL
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        url: String,

        /// Signing secret; the request is sent unsigned when absent
        #[arg(long, env = "SLACK_SIGNING_SECRET")]
        secret: Option<String>,

        /// Message text (a leading bot mention is added)
        #[arg(long, default_value = "hello")]
        text: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("relay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Health { config }) => {
            if let Err(e) = run_health(config) {
                log::error!("health failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Sign {
            secret,
            timestamp,
            body,
        }) => {
            let ts = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp().to_string());
            println!("X-Slack-Request-Timestamp: {}", ts);
            println!(
                "X-Slack-Signature: {}",
                relay::signature::sign(&secret, &ts, body.as_bytes())
            );
        }
        Some(Commands::Simulate { url, secret, text }) => {
            if let Err(e) = run_simulate(&url, secret.as_deref(), &text).await {
                log::error!("simulate failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn resolve_settings(config_path: Option<std::path::PathBuf>) -> anyhow::Result<Settings> {
    let (config, path) = load_config(config_path)?;
    log::debug!("configuration from {}", path.display());
    Ok(Settings::resolve(&config)?)
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let mut settings = resolve_settings(config_path)?;
    if let Some(p) = port {
        settings.port = p;
    }
    log::info!("starting gateway on {}:{}", settings.bind, settings.port);
    run_gateway(settings).await
}

fn run_health(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let settings = resolve_settings(config_path)?;
    let report = GatewayState::new(settings).health_report();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_simulate(url: &str, secret: Option<&str>, text: &str) -> anyhow::Result<()> {
    let ts = chrono::Utc::now().timestamp().to_string();
    let body = serde_json::json!({
        "type": "event_callback",
        "event": {
            "type": "app_mention",
            "user": "USIMULATED",
            "channel": "CSIMULATED",
            "text": format!("<@URELAY> {}", text),
            "ts": format!("{}.000100", ts),
        },
        "event_id": format!("EvSim{}", ts),
        "event_time": chrono::Utc::now().timestamp(),
    });
    let raw = serde_json::to_vec(&body)?;

    let mut req = reqwest::Client::new()
        .post(format!("{}/events", url.trim_end_matches('/')))
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        req = req
            .header("X-Slack-Request-Timestamp", &ts)
            .header("X-Slack-Signature", relay::signature::sign(secret, &ts, &raw));
    }
    let resp = req.body(raw).send().await?;
    let status = resp.status();
    let text = resp.text().await?;
    println!("{} {}", status, text);
    if !status.is_success() {
        anyhow::bail!("gateway answered {}", status);
    }
    Ok(())
}
