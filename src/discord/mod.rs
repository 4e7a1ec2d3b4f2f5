// src/discord/mod.rs
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use futures_util::FutureExt;
use serenity::all::*;
use serenity::async_trait;

use crate::AppContext;
use crate::commands::IncomingMessage;
use crate::platform::{SerenityPlatform, TicketPlatform};
use crate::presentation::TicketButtonKind;
use crate::tickets::TicketUser;

pub struct Handler {
    pub app: Arc<AppContext>,
}

impl Handler {
    fn platform(ctx: &Context) -> Arc<dyn TicketPlatform> {
        Arc::new(SerenityPlatform::new(ctx.http.clone()))
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        tracing::info!(guilds = ready.guilds.len(), "Logged in as {}", ready.user.name);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // boty i DM-y od razu odpadają
        if msg.author.bot || msg.guild_id.is_none() {
            return;
        }
        if !msg.content.starts_with(self.app.settings.commands.prefix.as_str()) {
            return;
        }

        let incoming = incoming_message(&msg);
        let dispatcher = self.app.dispatcher(Self::platform(&ctx));

        let fut = async {
            if let Err(e) = dispatcher.handle(&incoming).await {
                tracing::warn!(
                    error=?e,
                    gid = incoming.guild_id.map(|g| g.get()),
                    channel = incoming.channel_id.get(),
                    "prefix command failed"
                );
            }
        };
        if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
            tracing::error!(channel = msg.channel_id.get(), "prefix command panicked");
        }
    }

    /// Brama interakcji: tylko dwa przyciski ticketów, reszta ignorowana.
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Some(component) = interaction.message_component() else {
            return;
        };
        let Some(button) = TicketButtonKind::from_custom_id(&component.data.custom_id) else {
            return;
        };

        let started = Instant::now();

        let fut = self.on_button(&ctx, &component, button);

        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) => tracing::debug!(
                ?button,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "button handled"
            ),
            Ok(Err(e)) => tracing::warn!(error=?e, ?button, "button handler failed"),
            Err(_) => tracing::error!(?button, "button handler panicked"),
        }
    }
}

impl Handler {
    async fn on_button(
        &self,
        ctx: &Context,
        i: &ComponentInteraction,
        button: TicketButtonKind,
    ) -> Result<()> {
        // Najpierw ACK, tworzenie kanału potrafi przekroczyć 3 s
        defer_ephemeral(ctx, i).await?;

        let user = TicketUser {
            id: i.user.id,
            name: i.user.name.clone(),
        };

        let reply = self
            .app
            .tickets(Self::platform(ctx))
            .press(button, i.guild_id, i.channel_id, &user)
            .await?;

        edit_ephemeral(ctx, i, &reply).await
    }
}

pub fn incoming_message(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        id: msg.id,
        guild_id: msg.guild_id,
        channel_id: msg.channel_id,
        author_id: msg.author.id,
        author_bot: msg.author.bot,
        content: msg.content.clone(),
        mention_roles: msg.mention_roles.clone(),
    }
}

async fn defer_ephemeral(ctx: &Context, i: &ComponentInteraction) -> Result<()> {
    i.create_response(
        &ctx.http,
        CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new().ephemeral(true)),
    )
    .await?;
    Ok(())
}

async fn edit_ephemeral(ctx: &Context, i: &ComponentInteraction, msg: &str) -> Result<()> {
    i.edit_response(&ctx.http, EditInteractionResponse::new().content(msg))
        .await?;
    Ok(())
}

fn intents_from_settings(names: &[String]) -> GatewayIntents {
    let mut i = GatewayIntents::empty();
    for n in names {
        match n.as_str() {
            "GUILDS" => i |= GatewayIntents::GUILDS,
            "GUILD_MEMBERS" => i |= GatewayIntents::GUILD_MEMBERS,
            "GUILD_MESSAGES" => i |= GatewayIntents::GUILD_MESSAGES,
            "MESSAGE_CONTENT" => i |= GatewayIntents::MESSAGE_CONTENT,
            other => tracing::warn!(intent = other, "unknown intent in settings, skipped"),
        }
    }
    if i.is_empty() {
        crate::default_gateway_intents()
    } else {
        i
    }
}

pub async fn run_bot(ctx: Arc<AppContext>) -> Result<()> {
    let token = &ctx.settings.discord.token;
    if token.is_empty() {
        anyhow::bail!("Missing Discord token (TOKEN or TICKETS_DISCORD__TOKEN).");
    }

    let intents = intents_from_settings(&ctx.settings.discord.intents);

    let handler = Handler { app: ctx.clone() };

    let mut client = serenity::Client::builder(token, intents)
        .event_handler(handler)
        .await?;

    // ctrl+c: porzuć czekające zamknięcia, potem zatrzymaj shardy
    let shard_manager = client.shard_manager.clone();
    let closer = ctx.closer.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error=?e, "could not register ctrl+c handler");
            return;
        }
        let dropped = closer.cancel_all();
        tracing::info!(dropped, "shutting down");
        shard_manager.shutdown_all().await;
    });

    tracing::info!(app=%ctx.settings.app.name, "Discord client starting…");
    client.start().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_parse_known_names_and_fall_back() {
        let i = intents_from_settings(&["GUILDS".into(), "MESSAGE_CONTENT".into()]);
        assert!(i.contains(GatewayIntents::GUILDS));
        assert!(i.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(!i.contains(GatewayIntents::GUILD_MESSAGES));

        assert_eq!(intents_from_settings(&[]), crate::default_gateway_intents());
        assert_eq!(
            intents_from_settings(&["NOPE".into()]),
            crate::default_gateway_intents()
        );
    }
}
