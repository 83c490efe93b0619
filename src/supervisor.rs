use crate::auth::AuthFlow;
use crate::config::SessionConfig;
use crate::driver::chrome::ChromeSession;
use crate::driver::UiDriver;
use crate::errors::{KioskError, KioskResult};
use crate::keepalive::{dismiss_if_present, KeepAlive, LoopExit, INTERSTITIAL_TIMEOUT};
use crate::models::DashboardTarget;
use crate::policy::{policy_for, CallSite, FailurePolicy};
use crate::target::{resolve_target, resolve_theme};
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

const DASHBOARD_SETTLE: Duration = Duration::from_secs(2);

/// Outer supervising loop. A scheduled restart re-initializes a fresh
/// session in place instead of replacing the process image; the browser
/// profile directory on disk is the only state that survives.
pub async fn run() -> KioskResult<()> {
    let shutdown = Arc::new(Notify::new());
    let signal_target = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            // notify_one stores a permit, so an interrupt that lands while
            // the loop is mid-tick is still observed at the next wait.
            signal_target.notify_one();
        }
    });

    loop {
        // Fresh config, theme, and target each iteration: this is the only
        // point where theme/target are ever recomputed.
        let config = SessionConfig::resolve();
        let now = Local::now();
        let theme = resolve_theme(&config, now);
        let target = resolve_target(theme, &config);
        tracing::info!(
            theme = theme.as_str(),
            mode = config.mode.as_str(),
            city = %config.city,
            "starting kiosk session"
        );

        let driver = ChromeSession::launch(&config).await?;
        match run_session(&driver, &config, &target, &shutdown).await? {
            LoopExit::Restart => {
                tracing::info!("re-initializing session after scheduled restart");
                continue;
            }
            LoopExit::Shutdown => return Ok(()),
        }
    }
}

async fn run_session(
    driver: &dyn UiDriver,
    config: &SessionConfig,
    target: &DashboardTarget,
    shutdown: &Notify,
) -> KioskResult<LoopExit> {
    // One-time handshake; failure is logged inside the flow and the
    // controller proceeds optimistically.
    AuthFlow::new(driver, config).run().await?;

    tracing::info!(url = %target.url, "opening dashboard");
    if let Err(error) = driver.navigate(&target.url).await {
        match policy_for(CallSite::InitialNavigation) {
            FailurePolicy::Escalate => {
                return Err(KioskError::Navigation(format!(
                    "initial dashboard navigation failed: {}",
                    error
                )));
            }
            _ => tracing::warn!(error = %error, "initial navigation failed; continuing"),
        }
    }
    tokio::time::sleep(DASHBOARD_SETTLE).await;
    dismiss_if_present(driver, INTERSTITIAL_TIMEOUT).await;

    report_status(driver).await;

    let mut keepalive = KeepAlive::new(driver, config, target, Local::now());
    Ok(keepalive.run(shutdown).await)
}

/// Post-navigation status report: page title and final address.
async fn report_status(driver: &dyn UiDriver) {
    match driver.title().await {
        Ok(title) => tracing::info!(%title, "dashboard visible"),
        Err(error) => tracing::debug!(error = %error, "could not read page title"),
    }
    if let Ok(url) = driver.current_url().await {
        tracing::info!(%url, "current address");
    }
}
