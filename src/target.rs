use crate::config::SessionConfig;
use crate::models::{DashboardMode, DashboardTarget, Theme};
use chrono::{DateTime, Local, NaiveTime};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

const BASE_URL: &str = "https://eu-central-1.quicksight.aws.amazon.com/sn/account";

pub const SIGNIN_URL: &str = "https://eu-central-1.quicksight.aws.amazon.com/sn/auth/signin\
?redirect_uri=https%3A%2F%2Feu-central-1.quicksight.aws.amazon.com%2Fsn%2Fauth%2Fsignin%2C%3Fstate%3DhashArgs%2523%26isauthcode%3Dtrue";

const LIGHT_DASHBOARD_ID: &str = "094b6397-67e5-4011-ad16-25e93041060d";
const MIDNIGHT_DASHBOARD_ID: &str = "4c86565f-7e0b-4b6b-bfea-14ca7f307bf7";

const OPERATIONS_SHEET_ID_LIGHT: &str = "b3db0892-09d5-4dcf-8490-e155e0360f16";
const OPERATIONS_SHEET_ID_MIDNIGHT: &str = "b3763094-7789-45e2-809f-293306b55f00";
const MECHANICS_SHEET_ID_LIGHT: &str = "b8858404-f110-4efd-96f9-bf50ccf495be";
const MECHANICS_SHEET_ID_MIDNIGHT: &str = "7913f79f-6d23-4328-9a63-4f8ad50bca36";

const LIGHT_WINDOW_START: &str = "06:30";
const LIGHT_WINDOW_END: &str = "22:30";

/// City key to pre-encoded `p.City` query fragment. Keys are lowercase; an
/// unknown key means the dashboard renders unfiltered.
static CITY_MAPPING: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("asker", "asker%20%26%20bærum"),
        ("bergen", "bergen"),
        ("bodø", "bodø"),
        ("borås", "borås"),
        ("changzhou", "changzhou%20%26%20shanghai"),
        ("drammen", "drammen"),
        ("eskilstuna", "eskilstuna"),
        ("fredrikstad", "fredrikstad%20%26%20sarpsborg"),
        ("göteborg", "göteborg"),
        ("halmstad", "halmstad"),
        ("helsingborg", "helsingborg"),
        ("hämeenlinna", "hämeenlinna"),
        ("helsinki", "helsinki%20%26%20espoo%20%26%20vantaa%20%26%20myyrmäki"),
        ("hq", "hq"),
        ("joensuu", "joensuu"),
        ("jyväskylä", "jyväskylä"),
        ("karlstad", "karlstad"),
        ("kristiansand", "kristiansand"),
        ("kuopio", "kuopio"),
        ("lahti", "lahti"),
        ("lappeenranta", "lappeenranta"),
        ("linköping", "linköping"),
        ("luleå", "luleå"),
        ("malmö", "malmö%20%26%20lund"),
        ("moss", "moss"),
        ("norrköping", "norrköping"),
        ("not used", "not used"),
        ("oslo", "oslo%20%26%20l%C3%B8renskog"),
        ("oulu", "oulu"),
        ("östersund", "östersund"),
        ("örebro", "örebro"),
        ("pori", "pori"),
        ("sandefjord", "sandefjord%20%26%20tønsberg"),
        ("seinäjoki", "seinäjoki"),
        ("shanghai", "shanghai"),
        ("skien", "skien%20%26%20porsgrunn"),
        ("stavanger", "stavanger%20%26%20sandnes%20%26%20sola"),
        ("sundsvall", "sundsvall"),
        ("tampere", "tampere"),
        ("trondheim", "trondheim"),
        ("tromsø", "tromsø"),
        ("turku", "turku%20%26%20raisio"),
        ("umeå", "umeå"),
        ("uppsala", "uppsala"),
        ("vaasa", "vaasa"),
        ("västeräs", "västeräs"),
        ("växjö", "växjö"),
    ])
});

/// Resolves the active theme: an explicit override wins unconditionally,
/// otherwise local wall-clock time inside `[06:30, 22:30)` means light and
/// everything else midnight.
pub fn resolve_theme(config: &SessionConfig, now: DateTime<Local>) -> Theme {
    if let Some(theme) = config.theme_override {
        return theme;
    }
    theme_for_time(now.time())
}

fn theme_for_time(now: NaiveTime) -> Theme {
    let start = NaiveTime::parse_from_str(LIGHT_WINDOW_START, "%H:%M").expect("valid window start");
    let end = NaiveTime::parse_from_str(LIGHT_WINDOW_END, "%H:%M").expect("valid window end");
    if now >= start && now < end {
        Theme::Light
    } else {
        Theme::Midnight
    }
}

/// Composes the fully qualified dashboard target for a theme, mode, and
/// city. Pure and total: an unmapped city yields an unfiltered URL rather
/// than an error.
pub fn resolve_target(theme: Theme, config: &SessionConfig) -> DashboardTarget {
    let dashboard_id = match theme {
        Theme::Light => LIGHT_DASHBOARD_ID,
        Theme::Midnight => MIDNIGHT_DASHBOARD_ID,
    };
    let sheet_id = match (config.mode, theme) {
        (DashboardMode::Operations, Theme::Light) => OPERATIONS_SHEET_ID_LIGHT,
        (DashboardMode::Operations, Theme::Midnight) => OPERATIONS_SHEET_ID_MIDNIGHT,
        (DashboardMode::Mechanics, Theme::Light) => MECHANICS_SHEET_ID_LIGHT,
        (DashboardMode::Mechanics, Theme::Midnight) => MECHANICS_SHEET_ID_MIDNIGHT,
    };

    let city_fragment = CITY_MAPPING
        .get(config.city.as_str())
        .copied()
        .unwrap_or_default()
        .to_string();
    if city_fragment.is_empty() {
        tracing::debug!(city = %config.city, "city has no filter mapping; showing unfiltered view");
    }

    let city_suffix = if city_fragment.is_empty() {
        String::new()
    } else {
        format!("#p.City={}", city_fragment)
    };
    let url = format!(
        "{}/{}/dashboards/{}/sheets/{}_{}{}",
        BASE_URL, config.account, dashboard_id, dashboard_id, sheet_id, city_suffix
    );

    DashboardTarget {
        dashboard_id: dashboard_id.to_string(),
        sheet_id: sheet_id.to_string(),
        city_fragment,
        url,
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_target, resolve_theme, theme_for_time};
    use crate::config::SessionConfig;
    use crate::models::{DashboardMode, Theme};
    use chrono::{Local, NaiveTime, TimeZone};

    fn config_with(city: &str, mode: DashboardMode, theme: Option<Theme>) -> SessionConfig {
        let mut config = SessionConfig::resolve_with(|_| None);
        config.city = city.to_string();
        config.mode = mode;
        config.theme_override = theme;
        config
    }

    fn time(value: &str) -> NaiveTime {
        NaiveTime::parse_from_str(value, "%H:%M").expect("valid test time")
    }

    #[test]
    fn light_window_is_half_open() {
        assert_eq!(theme_for_time(time("06:29")), Theme::Midnight);
        assert_eq!(theme_for_time(time("06:30")), Theme::Light);
        assert_eq!(theme_for_time(time("12:00")), Theme::Light);
        assert_eq!(theme_for_time(time("22:29")), Theme::Light);
        assert_eq!(theme_for_time(time("22:30")), Theme::Midnight);
        assert_eq!(theme_for_time(time("23:59")), Theme::Midnight);
    }

    #[test]
    fn override_wins_even_inside_light_window() {
        let config = config_with("bergen", DashboardMode::Operations, Some(Theme::Midnight));
        let midday = Local.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        assert_eq!(resolve_theme(&config, midday), Theme::Midnight);
    }

    #[test]
    fn mechanics_oslo_light_scenario() {
        let config = config_with("oslo", DashboardMode::Mechanics, None);
        let morning = Local.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        let theme = resolve_theme(&config, morning);
        assert_eq!(theme, Theme::Light);

        let target = resolve_target(theme, &config);
        assert_eq!(target.sheet_id, super::MECHANICS_SHEET_ID_LIGHT);
        assert_eq!(target.city_fragment, "oslo%20%26%20l%C3%B8renskog");
        assert!(target.url.ends_with("#p.City=oslo%20%26%20l%C3%B8renskog"));
    }

    #[test]
    fn unmapped_city_omits_filter_suffix() {
        let config = config_with("atlantis", DashboardMode::Operations, None);
        let target = resolve_target(Theme::Light, &config);
        assert!(target.city_fragment.is_empty());
        assert!(!target.url.contains("#p.City="));
    }

    #[test]
    fn identical_inputs_compose_identical_urls() {
        let config = config_with("bergen", DashboardMode::Operations, None);
        let first = resolve_target(Theme::Midnight, &config);
        let second = resolve_target(Theme::Midnight, &config);
        assert_eq!(first, second);
        assert_eq!(
            first.url,
            format!(
                "https://eu-central-1.quicksight.aws.amazon.com/sn/account/ryde-tech/dashboards/{}/sheets/{}_{}#p.City=bergen",
                super::MIDNIGHT_DASHBOARD_ID,
                super::MIDNIGHT_DASHBOARD_ID,
                super::OPERATIONS_SHEET_ID_MIDNIGHT
            )
        );
    }
}
