use crate::config::SessionConfig;
use crate::driver::{locate_any, DriverResult, Locator, UiDriver};
use crate::models::{DashboardTarget, RestartSchedule};
use crate::policy::{policy_for, CallSite, FailurePolicy};
use chrono::{DateTime, Local, NaiveTime};
use std::time::Duration;
use tokio::sync::Notify;

const TICK: Duration = Duration::from_secs(2);
const RELOAD_SETTLE: Duration = Duration::from_secs(2);
const DISMISS_SETTLE: Duration = Duration::from_secs(1);
pub const INTERSTITIAL_TIMEOUT: Duration = Duration::from_secs(6);

const SHOW_ME_MORE: &[Locator] = &[Locator::XPath("//button[contains(., 'Show me more')]")];

/// Runtime state owned by the keep-alive loop; discarded on restart.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub last_reload: DateTime<Local>,
    pub next_restart: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickAction {
    Restart,
    Reload,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Scheduled restart reached; the supervisor re-initializes a fresh
    /// session.
    Restart,
    /// Interrupt received; the process exits.
    Shutdown,
}

/// Soonest scheduled wall-clock instant strictly after `now`, rolling to
/// the next day once today's instances have passed.
pub fn next_restart_at(now: DateTime<Local>, schedule: &RestartSchedule) -> DateTime<Local> {
    schedule
        .times()
        .iter()
        .map(|time| upcoming(now, *time))
        .min()
        .unwrap_or_else(|| upcoming(now, NaiveTime::MIN))
}

fn upcoming(now: DateTime<Local>, time: NaiveTime) -> DateTime<Local> {
    let mut date = now.date_naive();
    loop {
        // Skipped DST instants resolve to the next calendar day.
        if let Some(candidate) = date.and_time(time).and_local_timezone(Local).earliest() {
            if candidate > now {
                return candidate;
            }
        }
        date = date.succ_opt().expect("calendar does not end");
    }
}

fn tick_action(now: DateTime<Local>, state: &SessionState, refresh_interval: Duration) -> TickAction {
    if now >= state.next_restart {
        return TickAction::Restart;
    }
    let elapsed = now.signed_duration_since(state.last_reload);
    let due = chrono::Duration::from_std(refresh_interval).unwrap_or(chrono::Duration::MAX);
    if elapsed >= due {
        TickAction::Reload
    } else {
        TickAction::Idle
    }
}

/// Keeps the dashboard visibly fresh forever: periodic full re-navigation,
/// interstitial dismissal, and a scheduled daily restart handoff.
pub struct KeepAlive<'a> {
    driver: &'a dyn UiDriver,
    config: &'a SessionConfig,
    target: &'a DashboardTarget,
    state: SessionState,
    pub tick: Duration,
    pub interstitial_timeout: Duration,
}

impl<'a> KeepAlive<'a> {
    pub fn new(
        driver: &'a dyn UiDriver,
        config: &'a SessionConfig,
        target: &'a DashboardTarget,
        now: DateTime<Local>,
    ) -> Self {
        let state = SessionState {
            last_reload: now,
            next_restart: next_restart_at(now, &RestartSchedule::default()),
        };
        Self {
            driver,
            config,
            target,
            state,
            tick: TICK,
            interstitial_timeout: INTERSTITIAL_TIMEOUT,
        }
    }

    pub async fn run(&mut self, shutdown: &Notify) -> LoopExit {
        tracing::info!(
            refresh_secs = self.config.refresh_interval.as_secs(),
            next_restart = %self.state.next_restart.format("%Y-%m-%d %H:%M"),
            "keep-alive loop started"
        );

        loop {
            let now = Local::now();
            match tick_action(now, &self.state, self.config.refresh_interval) {
                TickAction::Restart => {
                    tracing::info!(at = %now.format("%H:%M"), "scheduled restart reached");
                    self.shutdown_driver().await;
                    return LoopExit::Restart;
                }
                TickAction::Reload => match self.reload().await {
                    Ok(()) => {
                        self.state.last_reload = Local::now();
                        tracing::info!("dashboard reloaded");
                    }
                    Err(error) => match policy_for(CallSite::RefreshNavigation) {
                        FailurePolicy::Retry | FailurePolicy::LogAndContinue => {
                            tracing::warn!(error = %error, "reload failed; retrying next tick");
                        }
                        FailurePolicy::Escalate => {
                            tracing::error!(error = %error, "reload failed");
                            self.shutdown_driver().await;
                            return LoopExit::Restart;
                        }
                    },
                },
                TickAction::Idle => {}
            }

            tokio::select! {
                _ = shutdown.notified() => {
                    tracing::info!("interrupt received; shutting down");
                    self.shutdown_driver().await;
                    return LoopExit::Shutdown;
                }
                _ = tokio::time::sleep(self.tick) => {}
            }
        }
    }

    /// Full navigation rather than a soft refresh so the theme and city
    /// URL fragment are reasserted even if the page drifted.
    async fn reload(&self) -> DriverResult<()> {
        self.driver.navigate(&self.target.url).await?;
        tokio::time::sleep(RELOAD_SETTLE).await;
        dismiss_if_present(self.driver, self.interstitial_timeout).await;
        Ok(())
    }

    async fn shutdown_driver(&self) {
        if let Err(error) = self.driver.quit().await {
            match policy_for(CallSite::DriverShutdown) {
                FailurePolicy::Escalate => {
                    tracing::error!(error = %error, "driver shutdown failed");
                }
                _ => {
                    tracing::warn!(error = %error, "driver shutdown failed; continuing");
                }
            }
        }
    }
}

/// Clicks the known transient "Show me more" dialog if it is present.
/// Absence is expected and only worth a debug line.
pub async fn dismiss_if_present(driver: &dyn UiDriver, timeout: Duration) -> bool {
    match locate_any(driver, SHOW_ME_MORE, timeout).await {
        Ok(element) => match driver.click(&element).await {
            Ok(()) => {
                tracing::info!("dismissed interstitial dialog");
                tokio::time::sleep(DISMISS_SETTLE).await;
                true
            }
            Err(error) => {
                tracing::warn!(
                    site = CallSite::InterstitialDismiss.as_str(),
                    error = %error,
                    "interstitial click failed; continuing"
                );
                false
            }
        },
        Err(error) if error.is_locator_miss() => {
            tracing::debug!("no interstitial present");
            false
        }
        Err(error) => {
            tracing::warn!(
                site = CallSite::InterstitialDismiss.as_str(),
                error = %error,
                "interstitial probe failed; continuing"
            );
            false
        }
    }
}
