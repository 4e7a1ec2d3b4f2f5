use anyhow::Result;
use serde::{Deserialize, Serialize};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Fallback banner shown when a guild has not configured its own image.
pub const DEFAULT_BANNER_URL: &str = "https://media.giphy.com/media/v1.Y2lkPTc5MGI3NjExbjRuaHNvN3hyY2tvaHJkN2E3enYxeG1uYWFnd3h6NnQyZnhidHc3ayZlcD12MV9naWZzX3NlYXJjaCZjdD1n/RlHpuVwtbvdIBXzm2z/giphy.gif";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub env: String,
    pub app: App,
    pub discord: Discord,
    pub storage: Storage,
    pub commands: Commands,
    pub tickets: Tickets,
    pub keepalive: KeepAlive,
    pub logging: Logging,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct App {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Discord {
    pub token: String,
    pub intents: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Storage {
    /// JSON file holding the per-guild panel settings.
    pub config_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Commands {
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tickets {
    pub channel_prefix: String,
    pub close_delay_secs: u64,
    pub default_banner_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeepAlive {
    pub enabled: bool,
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logging {
    pub json: Option<bool>,
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: "development".into(),
            app: App {
                name: "Ticket Panel".into(),
            },
            discord: Discord {
                token: "".into(),
                intents: vec![
                    "GUILDS".into(),
                    "GUILD_MESSAGES".into(),
                    "MESSAGE_CONTENT".into(),
                ],
            },
            storage: Storage {
                config_path: "./ticket_bot_config.json".into(),
            },
            commands: Commands { prefix: "!".into() },
            tickets: Tickets {
                channel_prefix: "ticket-".into(),
                close_delay_secs: 5,
                default_banner_url: DEFAULT_BANNER_URL.into(),
            },
            keepalive: KeepAlive {
                enabled: true,
                bind: "0.0.0.0:3000".into(),
            },
            logging: Logging {
                json: Some(false),
                level: Some("info".into()),
            },
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        // Które środowisko?
        let env = std::env::var("TICKETS_ENV").unwrap_or_else(|_| "development".to_string());

        // Załaduj .env.<env> i .env (jeśli są); dotenvy nie nadpisuje już ustawionych
        let _ = dotenvy::from_filename(format!(".env.{}", env));
        let _ = dotenvy::dotenv();

        // Warstwy: domyślne -> config/<env>.toml -> TICKETS_* (TICKETS_DISCORD__TOKEN => discord.token)
        let figment = Figment::from(Serialized::defaults(Settings {
            env: env.clone(),
            ..Settings::default()
        }))
        .merge(Toml::file(format!("config/{}.toml", env)))
        .merge(Env::prefixed("TICKETS_").split("__"));

        let mut s = Self::from_figment(figment)?;
        s.env = env;

        // stary bot czytał po prostu TOKEN
        if s.discord.token.is_empty() {
            s.discord.token = std::env::var("TOKEN").unwrap_or_default();
        }

        Ok(s)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let mut s: Settings = figment.extract()?;

        if s.commands.prefix.is_empty() {
            s.commands.prefix = "!".into();
        }
        if s.tickets.default_banner_url.trim().is_empty() {
            s.tickets.default_banner_url = DEFAULT_BANNER_URL.into();
        }

        Ok(s)
    }
}
