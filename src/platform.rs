// src/platform.rs
use std::sync::Arc;

use anyhow::{Result, anyhow};
use serenity::all::{
    ChannelId, ChannelType, CreateChannel, CreateMessage, GuildId, Http, MessageId,
    PermissionOverwrite, UserId,
};
use serenity::async_trait;

use crate::presentation::Outgoing;

/// A guild channel as far as tickets care: id and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub id: ChannelId,
    pub name: String,
}

/// Effective rights of a member inside one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberAccess {
    pub administrator: bool,
    pub view_channel: bool,
}

/// The handful of chat-platform calls the ticket flow needs.
///
/// Every method is a network round trip in production; the fake in
/// `tests/common` records calls instead.
#[async_trait]
pub trait TicketPlatform: Send + Sync {
    async fn guild_channels(&self, guild: GuildId) -> Result<Vec<ChannelSummary>>;

    async fn channel_name(&self, channel: ChannelId) -> Result<Option<String>>;

    async fn member_access(
        &self,
        guild: GuildId,
        channel: ChannelId,
        user: UserId,
    ) -> Result<MemberAccess>;

    async fn create_text_channel(
        &self,
        guild: GuildId,
        name: &str,
        overwrites: Vec<PermissionOverwrite>,
    ) -> Result<ChannelId>;

    async fn send(&self, channel: ChannelId, message: Outgoing) -> Result<()>;

    /// Reply threaded onto an existing message.
    async fn reply(&self, channel: ChannelId, to: MessageId, text: &str) -> Result<()>;

    async fn delete_channel(&self, channel: ChannelId) -> Result<()>;
}

/// REST-backed implementation on top of serenity's `Http`.
#[derive(Clone)]
pub struct SerenityPlatform {
    http: Arc<Http>,
}

impl SerenityPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl TicketPlatform for SerenityPlatform {
    async fn guild_channels(&self, guild: GuildId) -> Result<Vec<ChannelSummary>> {
        let map = guild.channels(&self.http).await?;
        Ok(map
            .into_values()
            .map(|ch| ChannelSummary {
                id: ch.id,
                name: ch.name,
            })
            .collect())
    }

    async fn channel_name(&self, channel: ChannelId) -> Result<Option<String>> {
        let ch = channel.to_channel(&self.http).await?;
        Ok(ch.guild().map(|g| g.name))
    }

    async fn member_access(
        &self,
        guild: GuildId,
        channel: ChannelId,
        user: UserId,
    ) -> Result<MemberAccess> {
        let member = guild.member(&self.http, user).await?;
        let partial = guild.to_partial_guild(&self.http).await?;
        let channel = channel
            .to_channel(&self.http)
            .await?
            .guild()
            .ok_or_else(|| anyhow!("channel {} is not a guild channel", channel.get()))?;

        let perms = partial.user_permissions_in(&channel, &member);
        Ok(MemberAccess {
            administrator: perms.administrator(),
            view_channel: perms.view_channel(),
        })
    }

    async fn create_text_channel(
        &self,
        guild: GuildId,
        name: &str,
        overwrites: Vec<PermissionOverwrite>,
    ) -> Result<ChannelId> {
        let created = guild
            .create_channel(
                &self.http,
                CreateChannel::new(name)
                    .kind(ChannelType::Text)
                    .permissions(overwrites),
            )
            .await?;
        Ok(created.id)
    }

    async fn send(&self, channel: ChannelId, message: Outgoing) -> Result<()> {
        channel
            .send_message(&self.http, message.into_message())
            .await?;
        Ok(())
    }

    async fn reply(&self, channel: ChannelId, to: MessageId, text: &str) -> Result<()> {
        channel
            .send_message(
                &self.http,
                CreateMessage::new()
                    .content(text)
                    .reference_message((channel, to)),
            )
            .await?;
        Ok(())
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<()> {
        channel.delete(&self.http).await?;
        Ok(())
    }
}
