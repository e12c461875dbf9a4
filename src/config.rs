//! Runtime configuration.
//!
//! Everything can be set with CLI flags; generator settings also fall back to
//! environment variables so secrets stay out of shell history.

use std::time::Duration;

use clap::Args;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PROGRESS_CACHE_SECS: u64 = 30;
pub const DEFAULT_CASES_CACHE_SECS: u64 = 300;
pub const DEFAULT_PROGRESS_CACHE_CAPACITY: u64 = 10_000;

/// Line the persona says when the generator is unavailable.
pub const DEFAULT_FALLBACK_REPLY: &str =
    "Sorry, I got distracted for a moment there. Could you say that again?";

/// Persona generator settings.
#[derive(Debug, Clone, Args)]
pub struct GeneratorConfig {
    /// API key for the chat-completions endpoint. Without it the offline
    /// scripted persona is used.
    #[arg(long = "llm-api-key", env = "REHEARSAL_LLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long = "llm-base-url", env = "REHEARSAL_LLM_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long = "llm-model", env = "REHEARSAL_LLM_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long = "llm-temperature", default_value_t = 0.8)]
    pub temperature: f32,

    /// Hard limit on one generator call, in seconds.
    #[arg(
        long = "generator-timeout",
        env = "REHEARSAL_GENERATOR_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub timeout_secs: u64,

    /// Trainee turns after which the offline persona closes the conversation.
    #[arg(long = "scripted-closing-turn", default_value_t = 3)]
    pub scripted_closing_turn: usize,
}

impl GeneratorConfig {
    /// Per-call limit, never below one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            temperature: 0.8,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            scripted_closing_turn: 3,
        }
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct CoachConfig {
    pub generator_timeout: Duration,
    pub fallback_reply: String,
}

impl CoachConfig {
    pub fn from_generator(config: &GeneratorConfig) -> Self {
        Self {
            generator_timeout: config.timeout(),
            ..Self::default()
        }
    }
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            generator_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            fallback_reply: DEFAULT_FALLBACK_REPLY.into(),
        }
    }
}

/// Cache lifetimes for read-only views.
#[derive(Debug, Clone, Args)]
pub struct CacheConfig {
    #[arg(long = "progress-cache-secs", default_value_t = DEFAULT_PROGRESS_CACHE_SECS)]
    pub progress_secs: u64,

    #[arg(long = "cases-cache-secs", default_value_t = DEFAULT_CASES_CACHE_SECS)]
    pub cases_secs: u64,

    /// Most progress views kept at once, one per user.
    #[arg(long = "progress-cache-capacity", default_value_t = DEFAULT_PROGRESS_CACHE_CAPACITY)]
    pub progress_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            progress_secs: DEFAULT_PROGRESS_CACHE_SECS,
            cases_secs: DEFAULT_CASES_CACHE_SECS,
            progress_capacity: DEFAULT_PROGRESS_CACHE_CAPACITY,
        }
    }
}
