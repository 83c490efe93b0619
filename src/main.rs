use quicksight_kiosk::errors::{KioskError, KioskResult};
use quicksight_kiosk::supervisor;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

fn init_tracing() -> KioskResult<()> {
    let log_dir = std::env::temp_dir().join("quicksight-kiosk").join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "kiosk.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .try_init()
        .map_err(|error| KioskError::Internal(error.to_string()))
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    if let Err(error) = init_tracing() {
        eprintln!("failed to initialize logging: {}", error);
    }

    let code = match supervisor::run().await {
        Ok(()) => 0,
        Err(KioskError::DriverFatal(message)) => {
            tracing::error!(%message, "no compatible rendering engine");
            2
        }
        Err(error) => {
            tracing::error!(error = %error, "kiosk controller failed");
            1
        }
    };
    std::process::exit(code);
}
