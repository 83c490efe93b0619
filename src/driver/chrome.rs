use super::{DriverError, DriverResult, Element, Locator, UiDriver};
use crate::config::SessionConfig;
use crate::errors::{KioskError, KioskResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::time::Instant;
use wait_timeout::ChildExt;

const CHROMEDRIVER_PORT: u16 = 9515;
const STARTUP_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const STARTUP_PROBE_INTERVAL: Duration = Duration::from_millis(200);
const EARLY_EXIT_GRACE: Duration = Duration::from_millis(300);
const LOCATE_POLL_INTERVAL: Duration = Duration::from_millis(250);

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const ENTER_KEY: &str = "\u{e007}";

const BROWSER_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "chromium",
    "chromium-browser",
];

/// WebDriver session over a locally spawned chromedriver, configured for
/// unattended kiosk rendering with a persistent profile directory.
pub struct ChromeSession {
    http: reqwest::Client,
    base: String,
    session_id: String,
    child: StdMutex<Option<Child>>,
}

impl ChromeSession {
    /// Locates a browser and chromedriver, spawns the driver, and opens a
    /// kiosk session. Failures here are driver-fatal: the process should
    /// exit with code 2 before entering the session state machine.
    pub async fn launch(config: &SessionConfig) -> KioskResult<Self> {
        let browser = resolve_browser_binary().ok_or_else(|| {
            KioskError::DriverFatal(
                "no Chrome/Chromium executable found; install Google Chrome or chromium".to_string(),
            )
        })?;
        let chromedriver = find_in_path("chromedriver").ok_or_else(|| {
            KioskError::DriverFatal("chromedriver not found on PATH".to_string())
        })?;

        let mut child = Command::new(&chromedriver)
            .arg(format!("--port={}", CHROMEDRIVER_PORT))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|error| {
                KioskError::DriverFatal(format!("failed to spawn chromedriver: {}", error))
            })?;

        // A bad flag or occupied port kills chromedriver immediately; catch
        // that before probing the endpoint.
        if let Ok(Some(status)) = child.wait_timeout(EARLY_EXIT_GRACE) {
            return Err(KioskError::DriverFatal(format!(
                "chromedriver exited during startup with {}",
                status
            )));
        }

        let http = reqwest::Client::new();
        let base = format!("http://127.0.0.1:{}", CHROMEDRIVER_PORT);
        if let Err(error) = wait_until_ready(&http, &base).await {
            let _ = child.kill();
            let _ = child.wait();
            return Err(KioskError::DriverFatal(format!(
                "chromedriver did not become ready: {}",
                error
            )));
        }

        let capabilities = session_capabilities(&browser, config);
        let response = http
            .post(format!("{}/session", base))
            .json(&json!({ "capabilities": { "alwaysMatch": capabilities } }))
            .send()
            .await
            .map_err(|error| KioskError::DriverFatal(format!("session create failed: {}", error)))?;
        let body: Value = response
            .json()
            .await
            .map_err(|error| KioskError::DriverFatal(format!("session create failed: {}", error)))?;
        let session_id = body["value"]["sessionId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                let message = body["value"]["message"].as_str().unwrap_or("no session id");
                KioskError::DriverFatal(format!("session create rejected: {}", message))
            })?;

        tracing::info!(browser = %browser.display(), session_id = %session_id, "chrome session opened");

        let session = Self {
            http,
            base,
            session_id,
            child: StdMutex::new(Some(child)),
        };
        if let Err(error) = session.fullscreen().await {
            tracing::debug!(error = %error, "fullscreen request failed; kiosk flags still apply");
        }
        Ok(session)
    }

    fn session_url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base, self.session_id, path)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> DriverResult<Value> {
        let response = request
            .send()
            .await
            .map_err(|error| DriverError::Transport(error.to_string()))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|error| DriverError::Transport(error.to_string()))?;
        if status.is_success() {
            return Ok(body);
        }
        let code = body["value"]["error"].as_str().unwrap_or_default();
        let message = body["value"]["message"].as_str().unwrap_or("unknown error");
        if code == "no such element" {
            return Err(DriverError::LocatorMiss {
                locator: String::new(),
                timeout_ms: 0,
            });
        }
        if code == "invalid session id" || code == "session not created" {
            return Err(DriverError::Session(message.to_string()));
        }
        Err(DriverError::Transport(format!("{}: {}", code, message)))
    }

    async fn find_once(&self, locator: Locator) -> DriverResult<Option<Element>> {
        let (using, value) = match locator {
            Locator::Css(value) => ("css selector", value),
            Locator::XPath(value) => ("xpath", value),
        };
        let request = self
            .http
            .post(self.session_url("/element"))
            .json(&json!({ "using": using, "value": value }));
        match self.execute(request).await {
            Ok(body) => Ok(body["value"][ELEMENT_KEY]
                .as_str()
                .map(|id| Element { id: id.to_string() })),
            Err(error) if error.is_locator_miss() => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn is_displayed(&self, element: &Element) -> bool {
        let request = self
            .http
            .get(self.session_url(&format!("/element/{}/displayed", element.id)));
        match self.execute(request).await {
            Ok(body) => body["value"].as_bool().unwrap_or(true),
            Err(_) => true,
        }
    }

    fn reap_child(&self) {
        let mut guard = match self.child.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if let Some(mut child) = guard.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[async_trait]
impl UiDriver for ChromeSession {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        let request = self
            .http
            .post(self.session_url("/url"))
            .json(&json!({ "url": url }));
        self.execute(request).await.map(|_| ())
    }

    async fn current_url(&self) -> DriverResult<String> {
        let request = self.http.get(self.session_url("/url"));
        let body = self.execute(request).await?;
        Ok(body["value"].as_str().unwrap_or_default().to_string())
    }

    async fn title(&self) -> DriverResult<String> {
        let request = self.http.get(self.session_url("/title"));
        let body = self.execute(request).await?;
        Ok(body["value"].as_str().unwrap_or_default().to_string())
    }

    async fn locate(&self, locator: Locator, timeout: Duration) -> DriverResult<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.find_once(locator).await? {
                if self.is_displayed(&element).await {
                    return Ok(element);
                }
            }
            if Instant::now() >= deadline {
                return Err(DriverError::LocatorMiss {
                    locator: locator.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(LOCATE_POLL_INTERVAL).await;
        }
    }

    async fn click(&self, element: &Element) -> DriverResult<()> {
        let request = self
            .http
            .post(self.session_url(&format!("/element/{}/click", element.id)))
            .json(&json!({}));
        self.execute(request).await.map(|_| ())
    }

    async fn fill(&self, element: &Element, text: &str) -> DriverResult<()> {
        let clear = self
            .http
            .post(self.session_url(&format!("/element/{}/clear", element.id)))
            .json(&json!({}));
        if let Err(error) = self.execute(clear).await {
            tracing::debug!(error = %error, "clear before fill failed; typing anyway");
        }
        let request = self
            .http
            .post(self.session_url(&format!("/element/{}/value", element.id)))
            .json(&json!({ "text": text }));
        self.execute(request).await.map(|_| ())
    }

    async fn press_enter(&self, element: &Element) -> DriverResult<()> {
        let request = self
            .http
            .post(self.session_url(&format!("/element/{}/value", element.id)))
            .json(&json!({ "text": ENTER_KEY }));
        self.execute(request).await.map(|_| ())
    }

    async fn refresh(&self) -> DriverResult<()> {
        let request = self
            .http
            .post(self.session_url("/refresh"))
            .json(&json!({}));
        self.execute(request).await.map(|_| ())
    }

    async fn fullscreen(&self) -> DriverResult<()> {
        let request = self
            .http
            .post(self.session_url("/window/fullscreen"))
            .json(&json!({}));
        self.execute(request).await.map(|_| ())
    }

    async fn quit(&self) -> DriverResult<()> {
        let request = self.http.delete(self.session_url(""));
        let result = self.execute(request).await.map(|_| ());
        self.reap_child();
        result
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.reap_child();
    }
}

async fn wait_until_ready(http: &reqwest::Client, base: &str) -> Result<(), String> {
    let deadline = Instant::now() + STARTUP_PROBE_TIMEOUT;
    loop {
        match http.get(format!("{}/status", base)).send().await {
            Ok(response) => {
                if let Ok(body) = response.json::<Value>().await {
                    if body["value"]["ready"].as_bool().unwrap_or(false) {
                        return Ok(());
                    }
                }
            }
            Err(error) => {
                if Instant::now() >= deadline {
                    return Err(error.to_string());
                }
            }
        }
        if Instant::now() >= deadline {
            return Err("status endpoint never reported ready".to_string());
        }
        tokio::time::sleep(STARTUP_PROBE_INTERVAL).await;
    }
}

fn session_capabilities(browser: &Path, config: &SessionConfig) -> Value {
    let mut args = vec![
        format!("--user-data-dir={}", config.profile_dir.display()),
        "--window-position=0,0".to_string(),
        "--window-size=1920,1080".to_string(),
        "--disable-infobars".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-session-crashed-bubble".to_string(),
        "--overscroll-history-navigation=0".to_string(),
        "--hide-scrollbars".to_string(),
        "--start-maximized".to_string(),
        "--start-fullscreen".to_string(),
        "--kiosk".to_string(),
        "--disable-gpu".to_string(),
        "--disable-extensions".to_string(),
        "--disable-background-networking".to_string(),
        "--disable-component-update".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        "--password-store=basic".to_string(),
        "--disable-save-password-bubble".to_string(),
        "--noerrdialogs".to_string(),
    ];
    if config.headless {
        args.push("--headless=new".to_string());
    }
    json!({
        "browserName": "chrome",
        "goog:chromeOptions": {
            "binary": browser.to_string_lossy(),
            "args": args,
            "excludeSwitches": ["enable-automation"],
        }
    })
}

fn resolve_browser_binary() -> Option<PathBuf> {
    for candidate in BROWSER_CANDIDATES {
        let path = Path::new(candidate);
        if path.is_absolute() {
            if path.is_file() {
                return Some(path.to_path_buf());
            }
            continue;
        }
        if let Some(found) = find_in_path(candidate) {
            return Some(found);
        }
    }
    None
}

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join(binary);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{find_in_path, session_capabilities};
    use crate::config::SessionConfig;
    use std::path::Path;

    #[test]
    fn capabilities_carry_profile_and_kiosk_flags() {
        let mut config = SessionConfig::resolve_with(|_| None);
        config.headless = true;
        let capabilities = session_capabilities(Path::new("/usr/bin/chromium"), &config);
        let args: Vec<&str> = capabilities["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|value| value.as_str())
            .collect();
        assert!(args.contains(&"--user-data-dir=/tmp/qschrome-profile"));
        assert!(args.contains(&"--kiosk"));
        assert!(args.contains(&"--headless=new"));
    }

    #[test]
    fn path_lookup_misses_nonexistent_binary() {
        assert!(find_in_path("definitely-not-a-real-binary-name").is_none());
    }
}
