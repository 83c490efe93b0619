use async_trait::async_trait;
use quicksight_kiosk::driver::{DriverError, DriverResult, Element, Locator, UiDriver};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate(String),
    Fill { locator: String, text: String },
    Click(String),
    PressEnter(String),
    Refresh,
    Fullscreen,
    Quit,
}

struct ScriptedState {
    actions: Vec<Action>,
    current_url: String,
    submitted: bool,
}

/// Scripted UI driver double: a fixed set of visible locators, a scripted
/// address trajectory, and a full action recording.
pub struct ScriptedDriver {
    /// Locator values that resolve to a visible element.
    visible: Vec<&'static str>,
    /// Where navigating to a sign-in address actually lands (a persisted
    /// profile session redirects straight to the dashboard).
    signin_lands_on: Option<String>,
    /// Address reported once a submit has happened.
    post_submit_url: Option<String>,
    state: Mutex<ScriptedState>,
}

impl ScriptedDriver {
    pub fn new(visible: Vec<&'static str>) -> Self {
        Self {
            visible,
            signin_lands_on: None,
            post_submit_url: None,
            state: Mutex::new(ScriptedState {
                actions: Vec::new(),
                current_url: String::new(),
                submitted: false,
            }),
        }
    }

    pub fn with_persisted_session(mut self, dashboard_url: &str) -> Self {
        self.signin_lands_on = Some(dashboard_url.to_string());
        self
    }

    pub fn with_redirect_after_submit(mut self, dashboard_url: &str) -> Self {
        self.post_submit_url = Some(dashboard_url.to_string());
        self
    }

    pub fn actions(&self) -> Vec<Action> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn fill_count(&self) -> usize {
        self.actions()
            .iter()
            .filter(|action| matches!(action, Action::Fill { .. }))
            .count()
    }

    fn record(&self, action: Action) {
        self.state.lock().unwrap().actions.push(action);
    }
}

#[async_trait]
impl UiDriver for ScriptedDriver {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(Action::Navigate(url.to_string()));
        state.current_url = match (&self.signin_lands_on, url.contains("signin")) {
            (Some(landing), true) => landing.clone(),
            _ => url.to_string(),
        };
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        let state = self.state.lock().unwrap();
        if state.submitted {
            if let Some(url) = &self.post_submit_url {
                return Ok(url.clone());
            }
        }
        Ok(state.current_url.clone())
    }

    async fn title(&self) -> DriverResult<String> {
        Ok("Operations Dashboard".to_string())
    }

    async fn locate(&self, locator: Locator, timeout: Duration) -> DriverResult<Element> {
        if self.visible.contains(&locator.value()) {
            return Ok(Element {
                id: locator.value().to_string(),
            });
        }
        Err(DriverError::LocatorMiss {
            locator: locator.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    async fn click(&self, element: &Element) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(Action::Click(element.id.clone()));
        if element.id.contains("Sign in") {
            state.submitted = true;
        }
        Ok(())
    }

    async fn fill(&self, element: &Element, text: &str) -> DriverResult<()> {
        self.record(Action::Fill {
            locator: element.id.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn press_enter(&self, element: &Element) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(Action::PressEnter(element.id.clone()));
        state.submitted = true;
        Ok(())
    }

    async fn refresh(&self) -> DriverResult<()> {
        self.record(Action::Refresh);
        Ok(())
    }

    async fn fullscreen(&self) -> DriverResult<()> {
        self.record(Action::Fullscreen);
        Ok(())
    }

    async fn quit(&self) -> DriverResult<()> {
        self.record(Action::Quit);
        Ok(())
    }
}
