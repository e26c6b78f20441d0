//! Environment-based configuration.
//!
//! Every integration has its own section that is only loaded by the demos
//! needing it, so a missing Twilio token does not get in the way of the
//! weather demo. Secrets never show up in `Debug` output.

use std::env;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use thiserror::Error;
use toolwire_openai_model::{OpenAIConfig, OpenAIConfigBuilder};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_OPENWEATHER_BASE_URL: &str = "http://api.openweathermap.org";
const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com";
const DEFAULT_GOOGLE_MAPS_BASE_URL: &str = "https://maps.googleapis.com";
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
}

type LookupFn = dyn Fn(&str) -> Option<String> + Send + Sync;

/// A source of configuration values, usually the process environment.
#[derive(Clone)]
pub struct Config {
    lookup: Arc<LookupFn>,
}

impl Config {
    /// Reads from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    #[inline]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads from an arbitrary lookup function.
    #[inline]
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            lookup: Arc::new(lookup),
        }
    }

    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn get_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_owned())
    }

    /// Loads the language model section.
    pub fn openai(&self) -> Result<OpenAISettings, ConfigError> {
        Ok(OpenAISettings {
            api_key: self.require("OPENAI_API_KEY")?,
            base_url: self.get_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            model: self.get_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            embedding_model: self.get_or(
                "OPENAI_EMBEDDING_MODEL",
                DEFAULT_OPENAI_EMBEDDING_MODEL,
            ),
        })
    }

    /// Loads the OpenWeatherMap section.
    pub fn weather(&self) -> Result<WeatherSettings, ConfigError> {
        Ok(WeatherSettings {
            api_key: self.require("OPENWEATHER_API_KEY")?,
            base_url: self
                .get_or("OPENWEATHER_BASE_URL", DEFAULT_OPENWEATHER_BASE_URL),
        })
    }

    /// Loads the Slack section.
    pub fn slack(&self) -> Result<SlackSettings, ConfigError> {
        Ok(SlackSettings {
            webhook_url: self.require("SLACK_WEBHOOK_URL")?,
        })
    }

    /// Loads the Jira section.
    pub fn jira(&self) -> Result<JiraSettings, ConfigError> {
        Ok(JiraSettings {
            url: self.require("JIRA_URL")?,
            api_token: self.require("JIRA_API_TOKEN")?,
            email: self.get("JIRA_EMAIL"),
        })
    }

    /// Loads the Twilio section.
    pub fn twilio(&self) -> Result<TwilioSettings, ConfigError> {
        Ok(TwilioSettings {
            account_sid: self.require("TWILIO_ACCOUNT_SID")?,
            auth_token: self.require("TWILIO_AUTH_TOKEN")?,
            from_number: self.require("TWILIO_FROM_NUMBER")?,
            to_number: self.require("TWILIO_TO_NUMBER")?,
            base_url: self.get_or("TWILIO_BASE_URL", DEFAULT_TWILIO_BASE_URL),
        })
    }

    /// Loads the Google Maps section.
    pub fn maps(&self) -> Result<MapsSettings, ConfigError> {
        Ok(MapsSettings {
            api_key: self.require("GOOGLE_MAPS_API_KEY")?,
            base_url: self
                .get_or("GOOGLE_MAPS_BASE_URL", DEFAULT_GOOGLE_MAPS_BASE_URL),
        })
    }

    /// Loads the GitHub section. All of its variables are optional.
    pub fn github(&self) -> GithubSettings {
        GithubSettings {
            token: self.get("GITHUB_PERSONAL_ACCESS_TOKEN"),
            api_url: self.get_or("GITHUB_API_URL", DEFAULT_GITHUB_API_URL),
        }
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config").finish_non_exhaustive()
    }
}

struct Redacted;

impl Debug for Redacted {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Language model settings.
#[derive(Clone)]
pub struct OpenAISettings {
    /// `OPENAI_API_KEY`
    pub api_key: String,
    /// `OPENAI_BASE_URL`
    pub base_url: String,
    /// `OPENAI_MODEL`
    pub model: String,
    /// `OPENAI_EMBEDDING_MODEL`
    pub embedding_model: String,
}

impl OpenAISettings {
    /// Converts into the provider configuration.
    pub fn to_provider_config(&self) -> OpenAIConfig {
        OpenAIConfigBuilder::with_api_key(&self.api_key)
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .with_embedding_model(&self.embedding_model)
            .build()
    }
}

impl Debug for OpenAISettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAISettings")
            .field("api_key", &Redacted)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

/// OpenWeatherMap settings.
#[derive(Clone)]
pub struct WeatherSettings {
    /// `OPENWEATHER_API_KEY`
    pub api_key: String,
    /// `OPENWEATHER_BASE_URL`
    pub base_url: String,
}

impl Debug for WeatherSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherSettings")
            .field("api_key", &Redacted)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Slack incoming webhook settings.
#[derive(Clone)]
pub struct SlackSettings {
    /// `SLACK_WEBHOOK_URL`, which embeds its own secret.
    pub webhook_url: String,
}

impl Debug for SlackSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackSettings")
            .field("webhook_url", &Redacted)
            .finish()
    }
}

/// Jira settings.
#[derive(Clone)]
pub struct JiraSettings {
    /// `JIRA_URL`
    pub url: String,
    /// `JIRA_API_TOKEN`
    pub api_token: String,
    /// `JIRA_EMAIL`, informational only.
    pub email: Option<String>,
}

impl Debug for JiraSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraSettings")
            .field("url", &self.url)
            .field("api_token", &Redacted)
            .field("email", &self.email)
            .finish()
    }
}

/// Twilio settings.
#[derive(Clone)]
pub struct TwilioSettings {
    /// `TWILIO_ACCOUNT_SID`
    pub account_sid: String,
    /// `TWILIO_AUTH_TOKEN`
    pub auth_token: String,
    /// `TWILIO_FROM_NUMBER`
    pub from_number: String,
    /// `TWILIO_TO_NUMBER`
    pub to_number: String,
    /// `TWILIO_BASE_URL`
    pub base_url: String,
}

impl Debug for TwilioSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioSettings")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &Redacted)
            .field("from_number", &self.from_number)
            .field("to_number", &self.to_number)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Google Maps settings.
#[derive(Clone)]
pub struct MapsSettings {
    /// `GOOGLE_MAPS_API_KEY`
    pub api_key: String,
    /// `GOOGLE_MAPS_BASE_URL`
    pub base_url: String,
}

impl Debug for MapsSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapsSettings")
            .field("api_key", &Redacted)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// GitHub settings.
#[derive(Clone)]
pub struct GithubSettings {
    /// `GITHUB_PERSONAL_ACCESS_TOKEN`
    pub token: Option<String>,
    /// `GITHUB_API_URL`
    pub api_url: String,
}

impl Debug for GithubSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubSettings")
            .field("token", &self.token.as_ref().map(|_| Redacted))
            .field("api_url", &self.api_url)
            .finish()
    }
}
