#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use serenity::all::{ChannelId, GuildId, MessageId, PermissionOverwrite, RoleId, UserId};
use serenity::async_trait;

use ticket_panel::AppContext;
use ticket_panel::commands::IncomingMessage;
use ticket_panel::config::Settings;
use ticket_panel::platform::{ChannelSummary, MemberAccess, TicketPlatform};
use ticket_panel::presentation::Outgoing;
use ticket_panel::store::MemoryStore;

pub const GUILD: u64 = 500;
pub const ADMIN: u64 = 1;
pub const MEMBER: u64 = 2;
pub const STAFF_ROLE: u64 = 77;

#[derive(Debug, Clone)]
pub struct Created {
    pub guild: GuildId,
    pub name: String,
    pub overwrites: Vec<PermissionOverwrite>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    channels: HashMap<GuildId, Vec<ChannelSummary>>,
    access: HashMap<UserId, MemberAccess>,
    sent: Vec<(ChannelId, Outgoing)>,
    replies: Vec<(ChannelId, MessageId, String)>,
    created: Vec<Created>,
    deleted: Vec<ChannelId>,
    send_delay: Option<Duration>,
    fail_sends: bool,
}

/// Records every call; channels live in memory.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        let p = Self::default();
        p.state.lock().unwrap().next_id = 1_000;
        Arc::new(p)
    }

    pub fn add_channel(&self, guild: u64, name: &str) -> ChannelId {
        let mut s = self.state.lock().unwrap();
        s.next_id += 1;
        let id = ChannelId::new(s.next_id);
        s.channels
            .entry(GuildId::new(guild))
            .or_default()
            .push(ChannelSummary {
                id,
                name: name.into(),
            });
        id
    }

    pub fn grant(&self, user: u64, access: MemberAccess) {
        self.state
            .lock()
            .unwrap()
            .access
            .insert(UserId::new(user), access);
    }

    pub fn channel_names(&self, guild: u64) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .channels
            .get(&GuildId::new(guild))
            .map(|v| v.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    /// `send` sleeps this long before recording, like a slow REST call.
    pub fn set_send_delay(&self, delay: Duration) {
        self.state.lock().unwrap().send_delay = Some(delay);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().unwrap().fail_sends = fail;
    }

    pub fn sent(&self) -> Vec<(ChannelId, Outgoing)> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn replies(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .replies
            .iter()
            .map(|r| r.2.clone())
            .collect()
    }

    pub fn created(&self) -> Vec<Created> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn deleted(&self) -> Vec<ChannelId> {
        self.state.lock().unwrap().deleted.clone()
    }
}

#[async_trait]
impl TicketPlatform for FakePlatform {
    async fn guild_channels(&self, guild: GuildId) -> Result<Vec<ChannelSummary>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .channels
            .get(&guild)
            .cloned()
            .unwrap_or_default())
    }

    async fn channel_name(&self, channel: ChannelId) -> Result<Option<String>> {
        let s = self.state.lock().unwrap();
        Ok(s.channels
            .values()
            .flatten()
            .find(|c| c.id == channel)
            .map(|c| c.name.clone()))
    }

    async fn member_access(
        &self,
        _guild: GuildId,
        _channel: ChannelId,
        user: UserId,
    ) -> Result<MemberAccess> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .access
            .get(&user)
            .copied()
            .unwrap_or_default())
    }

    async fn create_text_channel(
        &self,
        guild: GuildId,
        name: &str,
        overwrites: Vec<PermissionOverwrite>,
    ) -> Result<ChannelId> {
        let id = self.add_channel(guild.get(), name);
        self.state.lock().unwrap().created.push(Created {
            guild,
            name: name.into(),
            overwrites,
        });
        Ok(id)
    }

    async fn send(&self, channel: ChannelId, message: Outgoing) -> Result<()> {
        let delay = self.state.lock().unwrap().send_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut s = self.state.lock().unwrap();
        if s.fail_sends {
            return Err(anyhow!("Missing Access"));
        }
        s.sent.push((channel, message));
        Ok(())
    }

    async fn reply(&self, channel: ChannelId, to: MessageId, text: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .replies
            .push((channel, to, text.to_string()));
        Ok(())
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        let before: usize = s.channels.values().map(Vec::len).sum();
        for list in s.channels.values_mut() {
            list.retain(|c| c.id != channel);
        }
        let after: usize = s.channels.values().map(Vec::len).sum();
        if before == after {
            return Err(anyhow!("Unknown Channel {}", channel.get()));
        }
        s.deleted.push(channel);
        Ok(())
    }
}

pub struct Harness {
    pub app: Arc<AppContext>,
    pub store: Arc<MemoryStore>,
    pub platform: Arc<FakePlatform>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let app = AppContext::with_store(Settings::default(), store.clone());
    let platform = FakePlatform::new();
    platform.grant(
        ADMIN,
        MemberAccess {
            administrator: true,
            view_channel: true,
        },
    );
    Harness {
        app,
        store,
        platform,
    }
}

pub fn message(channel: ChannelId, author: u64, content: &str) -> IncomingMessage {
    IncomingMessage {
        id: MessageId::new(9_000),
        guild_id: Some(GuildId::new(GUILD)),
        channel_id: channel,
        author_id: UserId::new(author),
        author_bot: false,
        content: content.into(),
        mention_roles: vec![],
    }
}

pub fn staff_role() -> RoleId {
    RoleId::new(STAFF_ROLE)
}
