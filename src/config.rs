use crate::models::{DashboardMode, Theme};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_ACCOUNT: &str = "ryde-tech";
const DEFAULT_CITY: &str = "bergen";
const DEFAULT_REFRESH_SECS: u64 = 300;
const DEFAULT_PROFILE_DIR: &str = "/tmp/qschrome-profile";

/// Immutable session configuration, resolved once at (re)start from the
/// process environment and passed explicitly into every component.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub account: String,
    pub username: String,
    pub password: String,
    pub city: String,
    pub mode: DashboardMode,
    pub theme_override: Option<Theme>,
    pub refresh_interval: Duration,
    pub headless: bool,
    pub profile_dir: PathBuf,
}

impl SessionConfig {
    /// Reads the documented environment inputs. Never fails; absent or
    /// invalid values fall back to defaults.
    pub fn resolve() -> Self {
        Self::resolve_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let account = lookup("ACCOUNT_NAME")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ACCOUNT.to_string());
        let username = lookup("USERNAME")
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        let password = lookup("PASSWORD")
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        let city = lookup("CITY")
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_CITY.to_string());
        let mode = lookup("DASHBOARD_MODE")
            .map(|value| DashboardMode::parse(&value))
            .unwrap_or(DashboardMode::Operations);
        let theme_override = lookup("THEME").and_then(|value| Theme::parse(&value));
        let refresh_interval = lookup("REFRESH_SECS")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_REFRESH_SECS));
        let headless = lookup("HEADLESS")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);
        let profile_dir = lookup("QS_USER_PROFILE")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROFILE_DIR));

        Self {
            account,
            username,
            password,
            city,
            mode,
            theme_override,
            refresh_interval,
            headless,
            profile_dir,
        }
    }

    /// True when the config carries a usable credential pair. Without one
    /// the authentication flow is skipped and the persisted profile is
    /// assumed to hold a valid session.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::SessionConfig;
    use crate::models::{DashboardMode, Theme};
    use std::collections::HashMap;
    use std::time::Duration;

    fn resolve(vars: &[(&str, &str)]) -> SessionConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        SessionConfig::resolve_with(|name| map.get(name).cloned())
    }

    #[test]
    fn empty_environment_yields_documented_defaults() {
        let config = resolve(&[]);
        assert_eq!(config.account, "ryde-tech");
        assert_eq!(config.city, "bergen");
        assert_eq!(config.mode, DashboardMode::Operations);
        assert_eq!(config.theme_override, None);
        assert_eq!(config.refresh_interval, Duration::from_secs(300));
        assert!(!config.headless);
        assert!(!config.has_credentials());
    }

    #[test]
    fn invalid_values_fall_back_instead_of_failing() {
        let config = resolve(&[
            ("REFRESH_SECS", "five minutes"),
            ("THEME", "sepia"),
            ("DASHBOARD_MODE", "maintenance"),
        ]);
        assert_eq!(config.refresh_interval, Duration::from_secs(300));
        assert_eq!(config.theme_override, None);
        assert_eq!(config.mode, DashboardMode::Operations);
    }

    #[test]
    fn profile_dir_override_is_respected() {
        let dir = tempfile::tempdir().expect("temp profile dir");
        let path = dir.path().to_string_lossy().to_string();
        let config = resolve(&[("QS_USER_PROFILE", &path)]);
        assert_eq!(config.profile_dir, dir.path());
    }

    #[test]
    fn explicit_values_are_honored() {
        let config = resolve(&[
            ("CITY", "Oslo"),
            ("DASHBOARD_MODE", "mechanics"),
            ("THEME", "midnight"),
            ("REFRESH_SECS", "60"),
            ("HEADLESS", "yes"),
            ("USERNAME", "ops@example.com"),
            ("PASSWORD", "secret"),
        ]);
        assert_eq!(config.city, "oslo");
        assert_eq!(config.mode, DashboardMode::Mechanics);
        assert_eq!(config.theme_override, Some(Theme::Midnight));
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert!(config.headless);
        assert!(config.has_credentials());
    }
}
