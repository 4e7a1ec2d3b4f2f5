// src/lib.rs

pub mod closer;
pub mod commands;
pub mod config;
pub mod discord;
pub mod error;
pub mod keepalive;
pub mod logging;
pub mod platform;
pub mod presentation;
pub mod store;
pub mod tickets;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use serenity::all::GatewayIntents;

use closer::CloseScheduler;
use commands::Dispatcher;
use config::Settings;
use platform::TicketPlatform;
use store::{ConfigStore, JsonFileStore};
use tickets::Tickets;

/// Globalny kontekst aplikacji.
/// Konfiguracja, store ustawień gildii i kolejka zamknięć ticketów.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub store: Arc<dyn ConfigStore>,
    pub closer: Arc<CloseScheduler>,
}

impl AppContext {
    /// Bootstrap całej aplikacji:
    /// - logi
    /// - plik z ustawieniami gildii (brak dostępu = koniec procesu)
    pub fn bootstrap(settings: Settings) -> Result<Arc<Self>> {
        // 1) logi
        logging::init(&settings);

        // 2) store
        let store = JsonFileStore::load(&settings.storage.config_path)
            .with_context(|| format!("loading {}", settings.storage.config_path))?;

        Ok(Self::with_store(settings, Arc::new(store)))
    }

    /// Any store will do; tests hand in a `MemoryStore`.
    pub fn with_store(settings: Settings, store: Arc<dyn ConfigStore>) -> Arc<Self> {
        let closer = Arc::new(CloseScheduler::new(Duration::from_secs(
            settings.tickets.close_delay_secs,
        )));
        Arc::new(Self {
            settings,
            store,
            closer,
        })
    }

    pub fn tickets(&self, platform: Arc<dyn TicketPlatform>) -> Tickets {
        Tickets::new(
            platform,
            self.store.clone(),
            self.closer.clone(),
            &self.settings.tickets,
        )
    }

    pub fn dispatcher(&self, platform: Arc<dyn TicketPlatform>) -> Dispatcher {
        Dispatcher::new(
            self.settings.commands.prefix.clone(),
            platform.clone(),
            self.store.clone(),
            self.tickets(platform),
        )
    }
}

/// GUILDS (channel list), GUILD_MESSAGES + MESSAGE_CONTENT (prefix commands).
pub fn default_gateway_intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

/// Keep-alive w tle, klient Discorda na pierwszym planie.
pub async fn run(ctx: Arc<AppContext>) -> Result<()> {
    if ctx.settings.keepalive.enabled {
        let addr: SocketAddr = ctx
            .settings
            .keepalive
            .bind
            .parse()
            .with_context(|| format!("invalid keepalive.bind `{}`", ctx.settings.keepalive.bind))?;
        tokio::spawn(async move {
            if let Err(e) = keepalive::serve(addr).await {
                tracing::error!(error=?e, %addr, "keep-alive server stopped");
            }
        });
    }

    discord::run_bot(ctx).await
}
