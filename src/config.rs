use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::realtime::{ChannelKind, ChannelOptions, ReconnectPolicy};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE", global = true)]
    pub config: Option<String>,

    /// Base URL of the REST API (e.g. http://localhost:8000/api/v1)
    #[arg(long, env = "CHAT_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Base URL of the real-time sockets (e.g. ws://localhost:8000)
    #[arg(long, env = "CHAT_WS_URL", global = true)]
    pub ws_url: Option<String>,

    /// Where credentials and preferences are kept
    #[arg(long, env = "CHAT_STATE_FILE", global = true)]
    pub state_file: Option<String>,

    /// Reconnect real-time channels after a drop
    #[arg(long, env = "CHAT_RECONNECT", global = true)]
    pub reconnect: Option<bool>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Exchange username/password for a session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "CHAT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create a new account (does not log in)
    Signup {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "CHAT_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Show the logged-in user
    Whoami,
    /// Forget the stored session
    Logout,
    /// List conversations
    Conversations,
    /// Print a conversation's messages
    History { conversation_id: String },
    /// Send a message, starting a conversation unless one is given
    Send {
        message: String,
        #[arg(short, long)]
        conversation: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Rename a conversation
    Rename {
        conversation_id: String,
        title: String,
    },
    /// Delete a conversation
    Delete { conversation_id: String },
    /// Interactive chat session against the REST API
    Chat,
    /// Attach to a real-time channel; stdin lines are sent as frames
    Listen {
        #[arg(value_enum)]
        channel: ListenChannel,
    },
    /// Show or change display preferences
    Prefs {
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        toggle_theme: bool,
    },
    /// Models offered by the backend
    Models,
    /// Backend health
    Health,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenChannel {
    Chat,
    Notifications,
    Data,
}

impl From<ListenChannel> for ChannelKind {
    fn from(value: ListenChannel) -> Self {
        match value {
            ListenChannel::Chat => ChannelKind::Chat,
            ListenChannel::Notifications => ChannelKind::Notifications,
            ListenChannel::Data => ChannelKind::Data,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub realtime: RealtimeConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub temperature: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RealtimeConfig {
    /// Socket base; derived from `api.base_url` when unset.
    pub base_url: Option<String>,
    /// Frames kept per channel; 0 keeps everything.
    pub retention: usize,
    pub reconnect: ReconnectConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReconnectConfig {
    pub enabled: bool,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub path: String,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ReconnectConfig {
    pub fn policy(&self) -> ReconnectPolicy {
        if !self.enabled {
            return ReconnectPolicy::disabled();
        }
        ReconnectPolicy::exponential(
            self.max_retries,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

impl RealtimeConfig {
    pub fn channel_options(&self) -> ChannelOptions {
        ChannelOptions {
            retention: (self.retention > 0).then_some(self.retention),
            reconnect: self.reconnect.policy(),
        }
    }
}

impl ClientConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// Layer defaults, the config file, `CHAT_` environment variables and
    /// CLI overrides, in increasing priority.
    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("api.base_url", "http://localhost:8000/api/v1")?
            .set_default("api.timeout_secs", 30)?
            .set_default("api.temperature", 0.7)?
            .set_default("realtime.retention", 1000)?
            .set_default("realtime.reconnect.enabled", false)?
            .set_default("realtime.reconnect.max_retries", 5)?
            .set_default("realtime.reconnect.initial_delay_ms", 500)?
            .set_default("realtime.reconnect.max_delay_ms", 30_000)?
            .set_default("storage.path", ".agent-chat/state.json")?;

        // Explicit file must exist; ./config.{yaml,toml,json} is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // E.g. CHAT_API__BASE_URL=http://example.test/api/v1
        builder = builder.add_source(
            Environment::with_prefix("CHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(url) = &cli.api_url {
            builder = builder.set_override("api.base_url", url.as_str())?;
        }
        if let Some(url) = &cli.ws_url {
            builder = builder.set_override("realtime.base_url", url.as_str())?;
        }
        if let Some(path) = &cli.state_file {
            builder = builder.set_override("storage.path", path.as_str())?;
        }
        if let Some(enabled) = cli.reconnect {
            builder = builder.set_override("realtime.reconnect.enabled", enabled)?;
        }

        builder.build()?.try_deserialize()
    }
}
