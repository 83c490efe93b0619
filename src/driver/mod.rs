pub mod chrome;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("LOCATOR_MISS: no visible match for {locator} within {timeout_ms}ms")]
    LocatorMiss { locator: String, timeout_ms: u64 },
    #[error("TRANSPORT: {0}")]
    Transport(String),
    #[error("SESSION: {0}")]
    Session(String),
}

impl DriverError {
    pub fn is_locator_miss(&self) -> bool {
        matches!(self, Self::LocatorMiss { .. })
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Matcher strategy for locating a page element. Candidate chains are
/// ordered slices of these, evaluated in sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    Css(&'static str),
    XPath(&'static str),
}

impl Locator {
    pub fn value(self) -> &'static str {
        match self {
            Self::Css(value) | Self::XPath(value) => value,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(value) => write!(f, "css={}", value),
            Self::XPath(value) => write!(f, "xpath={}", value),
        }
    }
}

/// Handle to a located element, opaque outside the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: String,
}

/// Capability surface the session controller uses to drive the rendered
/// page. The controller owns exactly one driver for its whole lifetime.
#[async_trait]
pub trait UiDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> DriverResult<()>;
    async fn current_url(&self) -> DriverResult<String>;
    async fn title(&self) -> DriverResult<String>;
    /// Waits up to `timeout` for a visible element matching the locator.
    async fn locate(&self, locator: Locator, timeout: Duration) -> DriverResult<Element>;
    async fn click(&self, element: &Element) -> DriverResult<()>;
    async fn fill(&self, element: &Element, text: &str) -> DriverResult<()>;
    /// Submits the field the element belongs to by sending Enter.
    async fn press_enter(&self, element: &Element) -> DriverResult<()>;
    async fn refresh(&self) -> DriverResult<()>;
    async fn fullscreen(&self) -> DriverResult<()>;
    async fn quit(&self) -> DriverResult<()>;
}

/// Evaluates candidate locators in order with a bounded per-strategy
/// timeout; the first visible match wins. Sign-in page variants render
/// different input ids, so callers pass every known shape.
pub async fn locate_any(
    driver: &dyn UiDriver,
    candidates: &[Locator],
    per_candidate_timeout: Duration,
) -> DriverResult<Element> {
    let mut last_error = None;
    for candidate in candidates {
        match driver.locate(*candidate, per_candidate_timeout).await {
            Ok(element) => return Ok(element),
            Err(error) if error.is_locator_miss() => {
                last_error = Some(error);
            }
            Err(error) => return Err(error),
        }
    }
    Err(last_error.unwrap_or(DriverError::LocatorMiss {
        locator: "<empty candidate list>".to_string(),
        timeout_ms: per_candidate_timeout.as_millis() as u64,
    }))
}
