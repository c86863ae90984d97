use std::sync::LazyLock;

use config::Config;
use serde::Deserialize;

/// Application configuration (main)
#[derive(Debug, Deserialize)]
#[allow(unused)]
pub struct AppConfig {
    /// IANA name of the timezone used when neither the request nor the
    /// stored event names one
    /// Default is "UTC"
    /// Env var: CALENDAR__DEFAULT_TIMEZONE
    pub default_timezone: String,

    /// CATEGORIES value written into generated ICS files
    /// Default is "Holidays"
    /// Env var: CALENDAR__ICS_CATEGORY
    pub ics_category: String,

    /// How many years before the pivot year a default expansion window covers
    /// Default is 1
    /// Env var: CALENDAR__EXPAND_PAST_YEARS
    pub expand_past_years: i32,

    /// How many years after the pivot year a default expansion window covers
    /// Default is 2
    /// Env var: CALENDAR__EXPAND_FUTURE_YEARS
    pub expand_future_years: i32,
}

/// Parse the configuration from the environment variables
/// and return the configuration object
///
/// This function will panic if the configuration is not valid !
///
/// This called by the `APP_CONFIG` global variable (lazy_static)
fn parse_config() -> AppConfig {
    #[allow(clippy::expect_used)]
    let config = Config::builder()
        .add_source(
            config::Environment::with_prefix("CALENDAR")
                .try_parsing(true)
                .separator("__"),
        )
        .set_default("default_timezone", "UTC")
        .expect("Failed to set default default_timezone")
        .set_default("ics_category", "Holidays")
        .expect("Failed to set default ics_category")
        .set_default("expand_past_years", 1)
        .expect("Failed to set default expand_past_years")
        .set_default("expand_future_years", 2)
        .expect("Failed to set default expand_future_years")
        .build()
        .expect("Failed to build the configuration object");

    #[allow(clippy::expect_used)]
    let config = config
        .try_deserialize()
        .expect("Failed to deserialize the configuration object");

    config
}

/// Global configuration object
pub static APP_CONFIG: LazyLock<AppConfig> = LazyLock::new(parse_config);
