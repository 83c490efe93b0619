use crate::config::SessionConfig;
use crate::driver::{locate_any, Element, Locator, UiDriver};
use crate::errors::{KioskError, KioskResult};
use crate::policy::{policy_for, CallSite, FailurePolicy};
use crate::target::SIGNIN_URL;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

/// Candidate chains for the sign-in form. The account/identity/secret
/// variants differ between QuickSight UI revisions; first visible match
/// wins.
const ACCOUNT_FIELD: &[Locator] = &[Locator::Css("#account-name-input")];
const IDENTITY_FIELD: &[Locator] = &[
    Locator::Css("#username-input"),
    Locator::Css("input#username"),
    Locator::Css("input[name='username']"),
    Locator::Css("input[type='email']"),
];
const SECRET_FIELD: &[Locator] = &[
    Locator::Css("input#awsui-input-0"),
    Locator::Css("input[id^='awsui-input']"),
    Locator::Css("input[type='password']"),
    Locator::Css("input.awsui-input-type-password"),
    Locator::Css("#password"),
];
const NEXT_BUTTON: &[Locator] = &[Locator::XPath(
    "//button[contains(., 'Next') or contains(., 'Neste') or @type='submit']",
)];
const SIGNIN_BUTTON: &[Locator] =
    &[Locator::XPath("//button[contains(., 'Sign in') or @type='submit']")];

static SIGNIN_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new("(?i)signin").expect("valid signin address pattern"));

/// True when an address still looks like the sign-in page.
pub fn looks_like_signin(url: &str) -> bool {
    SIGNIN_ADDRESS.is_match(url)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthState {
    StartingNav,
    DetectingSession,
    AlreadyAuthenticated,
    EnteringAccount,
    EnteringIdentity,
    EnteringSecret,
    Submitting,
    AwaitingRedirect,
    Authenticated,
    AuthFailed,
}

impl AuthState {
    fn as_str(self) -> &'static str {
        match self {
            Self::StartingNav => "starting-nav",
            Self::DetectingSession => "detecting-session",
            Self::AlreadyAuthenticated => "already-authenticated",
            Self::EnteringAccount => "entering-account",
            Self::EnteringIdentity => "entering-identity",
            Self::EnteringSecret => "entering-secret",
            Self::Submitting => "submitting",
            Self::AwaitingRedirect => "awaiting-redirect",
            Self::Authenticated => "authenticated",
            Self::AuthFailed => "auth-failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Sign-in confirmed, or the persisted profile already carried a session.
    Authenticated,
    /// Redirect away from sign-in never happened; the caller proceeds
    /// optimistically.
    AuthFailed,
    /// No credentials configured; the flow never ran.
    Skipped,
}

/// One-shot authentication handshake. Runs once per process start; every
/// entry step is best-effort because account variants skip steps.
pub struct AuthFlow<'a> {
    driver: &'a dyn UiDriver,
    config: &'a SessionConfig,
    state: AuthState,
    pub settle_delay: Duration,
    pub field_timeout: Duration,
    pub next_timeout: Duration,
    pub signin_timeout: Duration,
    pub redirect_timeout: Duration,
    pub redirect_poll: Duration,
}

impl<'a> AuthFlow<'a> {
    pub fn new(driver: &'a dyn UiDriver, config: &'a SessionConfig) -> Self {
        Self {
            driver,
            config,
            state: AuthState::StartingNav,
            settle_delay: Duration::from_secs(1),
            field_timeout: Duration::from_secs(15),
            next_timeout: Duration::from_secs(5),
            signin_timeout: Duration::from_secs(10),
            redirect_timeout: Duration::from_secs(60),
            redirect_poll: Duration::from_millis(500),
        }
    }

    fn advance(&mut self, next: AuthState) {
        tracing::debug!(from = self.state.as_str(), to = next.as_str(), "auth transition");
        self.state = next;
    }

    pub async fn run(mut self) -> KioskResult<AuthOutcome> {
        if !self.config.has_credentials() {
            tracing::info!("no credentials configured; relying on persisted profile session");
            return Ok(AuthOutcome::Skipped);
        }

        tracing::info!("navigating to sign-in page");
        if let Err(error) = self.driver.navigate(SIGNIN_URL).await {
            match policy_for(CallSite::InitialNavigation) {
                FailurePolicy::Escalate => {
                    return Err(KioskError::Navigation(format!(
                        "sign-in navigation failed: {}",
                        error
                    )));
                }
                _ => self.log_site_failure(CallSite::InitialNavigation, &error.to_string()),
            }
        }
        tokio::time::sleep(self.settle_delay).await;

        self.advance(AuthState::DetectingSession);
        match self.driver.current_url().await {
            Ok(url) if !looks_like_signin(&url) => {
                self.advance(AuthState::AlreadyAuthenticated);
                tracing::info!("already authenticated via persisted profile");
                return Ok(AuthOutcome::Authenticated);
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(error = %error, "could not read address; assuming sign-in page");
            }
        }

        self.advance(AuthState::EnteringAccount);
        if self
            .enter_field(CallSite::AccountEntry, ACCOUNT_FIELD, &self.config.account)
            .await
            .is_some()
        {
            self.click_if_present(NEXT_BUTTON, self.next_timeout).await;
        }

        self.advance(AuthState::EnteringIdentity);
        if self
            .enter_field(CallSite::IdentityEntry, IDENTITY_FIELD, &self.config.username)
            .await
            .is_some()
        {
            self.click_if_present(NEXT_BUTTON, self.next_timeout).await;
        }

        self.advance(AuthState::EnteringSecret);
        let secret_element = self
            .enter_field(CallSite::SecretEntry, SECRET_FIELD, &self.config.password)
            .await;

        self.advance(AuthState::Submitting);
        if !self.click_if_present(SIGNIN_BUTTON, self.signin_timeout).await {
            tracing::info!("no sign-in control found; submitting secret field directly");
            let fallback = match secret_element {
                Some(element) => Some(element),
                None => locate_any(self.driver, SECRET_FIELD, self.next_timeout)
                    .await
                    .ok(),
            };
            if let Some(element) = fallback {
                if let Err(error) = self.driver.press_enter(&element).await {
                    self.log_site_failure(CallSite::Submit, &error.to_string());
                }
            }
        }

        self.advance(AuthState::AwaitingRedirect);
        let authenticated = self.await_redirect().await;
        if authenticated {
            self.advance(AuthState::Authenticated);
            tracing::info!("sign-in confirmed");
            Ok(AuthOutcome::Authenticated)
        } else {
            self.advance(AuthState::AuthFailed);
            tracing::warn!(
                timeout_secs = self.redirect_timeout.as_secs(),
                "still on sign-in address; MFA or bad credentials? continuing anyway"
            );
            Ok(AuthOutcome::AuthFailed)
        }
    }

    /// Locates one of the candidate targets and types `text` into it.
    /// A miss is non-fatal: some account variants skip entry steps, so the
    /// flow proceeds regardless.
    async fn enter_field(
        &self,
        site: CallSite,
        candidates: &[Locator],
        text: &str,
    ) -> Option<Element> {
        let element = match locate_any(self.driver, candidates, self.field_timeout).await {
            Ok(element) => element,
            Err(error) => {
                self.log_site_failure(site, &error.to_string());
                return None;
            }
        };
        if let Err(error) = self.driver.fill(&element, text).await {
            self.log_site_failure(site, &error.to_string());
            return None;
        }
        Some(element)
    }

    async fn click_if_present(&self, candidates: &[Locator], timeout: Duration) -> bool {
        match locate_any(self.driver, candidates, timeout).await {
            Ok(element) => match self.driver.click(&element).await {
                Ok(()) => true,
                Err(error) => {
                    self.log_site_failure(CallSite::Submit, &error.to_string());
                    false
                }
            },
            Err(_) => false,
        }
    }

    /// Bounded cooperative wait for the address to stop looking like the
    /// sign-in page.
    async fn await_redirect(&self) -> bool {
        let deadline = tokio::time::Instant::now() + self.redirect_timeout;
        loop {
            match self.driver.current_url().await {
                Ok(url) if !looks_like_signin(&url) => return true,
                Ok(_) => {}
                Err(error) => {
                    self.log_site_failure(CallSite::RedirectWait, &error.to_string());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(self.redirect_poll).await;
        }
    }

    fn log_site_failure(&self, site: CallSite, message: &str) {
        match policy_for(site) {
            FailurePolicy::LogAndContinue | FailurePolicy::Retry => {
                tracing::warn!(site = site.as_str(), error = %message, "step failed; continuing");
            }
            FailurePolicy::Escalate => {
                tracing::error!(site = site.as_str(), error = %message, "step failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::looks_like_signin;

    #[test]
    fn signin_detection_is_case_insensitive() {
        assert!(looks_like_signin(
            "https://eu-central-1.quicksight.aws.amazon.com/sn/auth/signin?redirect_uri=x"
        ));
        assert!(looks_like_signin("https://example.com/SignIn"));
        assert!(!looks_like_signin(
            "https://eu-central-1.quicksight.aws.amazon.com/sn/account/ryde-tech/dashboards/abc"
        ));
    }
}
