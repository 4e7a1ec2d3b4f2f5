// src/tickets.rs
use std::sync::Arc;

use serenity::all::{
    ChannelId, GuildId, PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId, UserId,
};

use crate::closer::CloseScheduler;
use crate::config;
use crate::error::{TicketError, TicketResult};
use crate::platform::{ChannelSummary, TicketPlatform};
use crate::presentation::{Outgoing, TicketButtonKind, TicketCard, pick_quote};
use crate::store::ConfigStore;

pub const CLOSE_ACK_REPLY: &str = "Ticket will close soon.";
pub const OUTSIDE_GUILD_REPLY: &str = "This only works inside a server.";

/// Whoever pressed the button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketUser {
    pub id: UserId,
    pub name: String,
}

/// `ticket-<lowercased handle>`. Two handles that lowercase the same share a channel.
pub fn ticket_channel_name(prefix: &str, username: &str) -> String {
    format!("{prefix}{}", username.to_lowercase())
}

pub fn is_ticket_channel(prefix: &str, name: &str) -> bool {
    name.starts_with(prefix)
}

pub fn count_tickets(prefix: &str, channels: &[ChannelSummary]) -> usize {
    channels
        .iter()
        .filter(|ch| is_ticket_channel(prefix, &ch.name))
        .count()
}

/// @everyone: DENY VIEW; staff + opener: ALLOW VIEW + SEND.
pub fn ticket_overwrites(guild: GuildId, staff: RoleId, user: UserId) -> Vec<PermissionOverwrite> {
    let talk = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;
    vec![
        PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            // the @everyone role shares the guild's id
            kind: PermissionOverwriteType::Role(RoleId::new(guild.get())),
        },
        PermissionOverwrite {
            allow: talk,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Role(staff),
        },
        PermissionOverwrite {
            allow: talk,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(user),
        },
    ]
}

/// Opens and closes ticket channels.
#[derive(Clone)]
pub struct Tickets {
    platform: Arc<dyn TicketPlatform>,
    store: Arc<dyn ConfigStore>,
    closer: Arc<CloseScheduler>,
    channel_prefix: String,
    default_banner: String,
}

impl Tickets {
    pub fn new(
        platform: Arc<dyn TicketPlatform>,
        store: Arc<dyn ConfigStore>,
        closer: Arc<CloseScheduler>,
        settings: &config::Tickets,
    ) -> Self {
        Self {
            platform,
            store,
            closer,
            channel_prefix: settings.channel_prefix.clone(),
            default_banner: settings.default_banner_url.clone(),
        }
    }

    pub fn channel_prefix(&self) -> &str {
        &self.channel_prefix
    }

    pub fn default_banner(&self) -> &str {
        &self.default_banner
    }

    /// Create-ticket button. Returns the new channel.
    pub async fn open(&self, guild: GuildId, user: &TicketUser) -> TicketResult<ChannelId> {
        let quote = pick_quote(&mut rand::rng());
        self.open_with_quote(guild, user, quote).await
    }

    pub async fn open_with_quote(
        &self,
        guild: GuildId,
        user: &TicketUser,
        quote: &str,
    ) -> TicketResult<ChannelId> {
        let Some(conf) = self.store.get(guild) else {
            return Err(TicketError::PanelNotSetUp);
        };

        let name = ticket_channel_name(&self.channel_prefix, &user.name);

        // no lock between this lookup and the create below; a fast double click can race
        let channels = self.platform.guild_channels(guild).await?;
        if channels.iter().any(|ch| ch.name == name) {
            return Err(TicketError::AlreadyOpen);
        }

        let channel = self
            .platform
            .create_text_channel(
                guild,
                &name,
                ticket_overwrites(guild, conf.role_id, user.id),
            )
            .await?;

        tracing::info!(
            gid = guild.get(),
            uid = user.id.get(),
            channel = channel.get(),
            %name,
            "ticket opened"
        );

        let card = TicketCard::welcome(&conf, &user.name, quote, &self.default_banner);
        self.platform
            .send(
                channel,
                Outgoing::Card {
                    content: Some(format!("<@{}>", user.id.get())),
                    card,
                },
            )
            .await?;

        Ok(channel)
    }

    /// Number of channels that look like tickets.
    pub async fn count_open(&self, guild: GuildId) -> TicketResult<usize> {
        let channels = self.platform.guild_channels(guild).await?;
        Ok(count_tickets(&self.channel_prefix, &channels))
    }

    /// Posts the warning and schedules the delete. A channel that is already
    /// closing is left alone and `false` comes back.
    pub async fn close(&self, channel: ChannelId) -> TicketResult<bool> {
        // claimed before the warning goes out, so concurrent presses see it
        let Some(claim) = self.closer.claim(channel) else {
            tracing::debug!(channel = channel.get(), "close already pending");
            return Ok(false);
        };

        if let Err(e) = self
            .platform
            .send(channel, Outgoing::Text(self.closing_notice()))
            .await
        {
            self.closer.release(claim);
            return Err(e.into());
        }

        let platform = self.platform.clone();
        let scheduled = self
            .closer
            .arm(claim, async move { platform.delete_channel(channel).await });

        if scheduled {
            tracing::info!(
                channel = channel.get(),
                delay_secs = self.closer.delay().as_secs(),
                "ticket close scheduled"
            );
        }
        Ok(scheduled)
    }

    /// Ephemeral answer for a panel or ticket button press.
    /// User-facing refusals become the answer; transport errors come back as `Err`.
    pub async fn press(
        &self,
        button: TicketButtonKind,
        guild: Option<GuildId>,
        channel: ChannelId,
        user: &TicketUser,
    ) -> TicketResult<String> {
        let outcome = match button {
            TicketButtonKind::Create => match guild {
                Some(guild) => self
                    .open(guild, user)
                    .await
                    .map(|ch| format!("Your ticket: <#{}>", ch.get())),
                None => return Ok(OUTSIDE_GUILD_REPLY.to_string()),
            },
            TicketButtonKind::Close => self
                .close(channel)
                .await
                .map(|_| CLOSE_ACK_REPLY.to_string()),
        };

        match outcome {
            Err(e) if e.is_user_facing() => Ok(e.to_string()),
            other => other,
        }
    }

    pub fn cancel_close(&self, channel: ChannelId) -> bool {
        self.closer.cancel(channel)
    }

    pub fn closing_notice(&self) -> String {
        format!("Closing in {} seconds...", self.closer.delay().as_secs())
    }
}
