//! Capture Classify CLI
//!
//! Captures a frame from the video device, sends it to the classification
//! service and prints the category. Also wraps the register, login, profile
//! and history endpoints.

use capture_classify::{
    api::{AccessToken, ApiError, AuthClient, HistoryClient, HistorySnapshot, Registration},
    capture::FrameCapturer,
    classify::{
        ClassificationClient, ClassifyError, HttpClassificationClient, MockClassificationClient,
    },
    config::{AppConfig, ConfigError, BASE_URL_ENV},
    device::{DeviceResource, MockDevice},
    mapper::Category,
    metrics::{MetricsRegistry, MetricsSnapshot},
    session::{CaptureSession, SessionError},
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "capture-classify", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the classification service.
    #[arg(long, env = BASE_URL_ENV, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Capture frames and classify them.
    Classify(ClassifyArgs),
    /// Create an account.
    Register {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "API_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in and print an access token.
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "API_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print the profile of the token's user.
    Profile {
        #[arg(long, env = "API_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Print today's and yesterday's category counts.
    History {
        #[arg(long, env = "API_TOKEN", hide_env_values = true)]
        token: String,
    },
}

#[derive(Debug, Args)]
struct ClassifyArgs {
    /// Number of frames to capture and classify.
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u32,

    /// Use the synthetic test-pattern device instead of a camera.
    #[arg(long)]
    mock_device: bool,

    /// Skip the service and answer every upload with this code.
    #[arg(long, value_name = "CODE")]
    offline: Option<String>,

    /// Directory to write each captured PNG to.
    #[arg(long, value_name = "DIR")]
    save: Option<PathBuf>,

    /// Print Prometheus metrics for the session on exit.
    #[arg(long)]
    print_metrics: bool,

    /// Serve metrics on this port while running (0 to disable).
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to write frame: {0}")]
    Io(#[from] std::io::Error),
    #[error("metrics: {0}")]
    Metrics(#[from] capture_classify::metrics::MetricsError),
}

#[tokio::main]
async fn main() {
    // Load .env before clap reads environment fallbacks
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
        config.validate()?;
    }

    match cli.command {
        Command::Classify(args) => classify(config, args).await,
        Command::Register {
            email,
            username,
            password,
        } => {
            let registration = Registration {
                email: &email,
                username: &username,
                password: &password,
            };
            AuthClient::new(&config.api.base_url)
                .register(&registration)
                .await?;
            println!("Registered {}", username);
            Ok(())
        }
        Command::Login { username, password } => {
            let token = AuthClient::new(&config.api.base_url)
                .login(&username, &password)
                .await?;
            println!("{} {}", token.token_type(), token.secret());
            Ok(())
        }
        Command::Profile { token } => {
            let profile = AuthClient::new(&config.api.base_url)
                .profile(&AccessToken::new(token))
                .await?;
            println!("username:             {}", profile.username);
            println!("age:                  {}", profile.age.as_deref().unwrap_or("-"));
            println!("gender:               {}", profile.gender.as_deref().unwrap_or("-"));
            println!(
                "congenital disorders: {}",
                profile.congenital_disorders.as_deref().unwrap_or("-")
            );
            Ok(())
        }
        Command::History { token } => history(&config, &AccessToken::new(token)).await,
    }
}

async fn classify(config: AppConfig, args: ClassifyArgs) -> Result<(), CliError> {
    info!("Capture Classify v{}", capture_classify::VERSION);

    let client: Arc<dyn ClassificationClient> = match args.offline {
        Some(code) => {
            info!(%code, "Offline mode, uploads are answered locally");
            Arc::new(MockClassificationClient::new(code))
        }
        None => Arc::new(HttpClassificationClient::new(
            &config.api.base_url,
            config.api.classifier.clone(),
        )?),
    };

    let session = Arc::new(CaptureSession::new(
        open_device(args.mock_device),
        client,
        config.device.clone(),
        FrameCapturer::new(config.capture.clone()),
    ));

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || shutdown.cancel()) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }
    {
        let session = Arc::clone(&session);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            info!("Shutting down session");
            session.stop();
        });
    }

    let metrics_port = args.metrics_port.unwrap_or(config.metrics.port);
    if metrics_port != 0 {
        serve_metrics(&session, metrics_port, &shutdown)?;
    }

    let outcome = classify_frames(&session, args.count, args.save.as_deref()).await;
    session.stop();

    if args.print_metrics {
        let registry = MetricsRegistry::new()?;
        registry.update(&MetricsSnapshot::from_session(&session));
        print!("{}", registry.encode()?);
    }

    shutdown.cancel();
    outcome
}

#[cfg(feature = "camera")]
fn open_device(mock: bool) -> DeviceResource {
    if mock {
        DeviceResource::new(MockDevice::new())
    } else {
        DeviceResource::new(capture_classify::device::NativeDevice::new())
    }
}

#[cfg(not(feature = "camera"))]
fn open_device(mock: bool) -> DeviceResource {
    if !mock {
        warn!("Built without the `camera` feature, using the test-pattern device");
    }
    DeviceResource::new(MockDevice::new())
}

async fn classify_frames(
    session: &CaptureSession,
    count: u32,
    save: Option<&std::path::Path>,
) -> Result<(), CliError> {
    let handle = session.start().await?;
    info!(%handle, "Streaming");

    for i in 1..=count {
        let frame = session.capture()?;
        if let Some(dir) = save {
            let path = dir.join(frame.file_name());
            std::fs::write(&path, frame.data())?;
            info!(path = %path.display(), "Saved frame");
        }

        let result = session.submit().await?;
        if count > 1 {
            println!("[{}/{}] {}", i, count, result);
        } else {
            println!("{}", result);
        }
    }
    Ok(())
}

#[cfg(feature = "metrics")]
fn serve_metrics(
    session: &Arc<CaptureSession>,
    port: u16,
    shutdown: &CancellationToken,
) -> Result<(), CliError> {
    use capture_classify::metrics::{MetricsServer, MetricsServerConfig};

    let server = MetricsServer::new(
        MetricsServerConfig::with_port(port),
        MetricsRegistry::new()?,
    );
    let state = server.state();

    let mut changes = session.subscribe();
    let watched = Arc::clone(session);
    tokio::spawn(async move {
        loop {
            state
                .write()
                .await
                .update(MetricsSnapshot::from_session(&watched));
            if changes.changed().await.is_err() {
                break;
            }
        }
    });

    let stop = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = server.run(async move { stop.cancelled().await }).await {
            warn!("Metrics server failed: {}", e);
        }
    });
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn serve_metrics(
    _session: &Arc<CaptureSession>,
    port: u16,
    _shutdown: &CancellationToken,
) -> Result<(), CliError> {
    warn!(port, "Built without the `metrics` feature, not serving metrics");
    Ok(())
}

async fn history(config: &AppConfig, token: &AccessToken) -> Result<(), CliError> {
    let records = HistoryClient::new(&config.api.base_url).recent(token).await?;
    let snapshot = HistorySnapshot::from_records(&records, chrono::Local::now().date_naive());

    for (label, day) in [("Today", &snapshot.today), ("Yesterday", &snapshot.yesterday)] {
        match day {
            Some(counts) => {
                println!("{} ({}): {} total", label, counts.date, counts.total);
                for category in Category::ALL {
                    if category != Category::Unknown {
                        println!("  {:<8} {}", category.label(), counts.count(category));
                    }
                }
            }
            None => println!("{}: no records", label),
        }
    }
    Ok(())
}
