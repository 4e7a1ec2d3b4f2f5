// src/commands.rs
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serenity::all::{ChannelId, GuildId, MessageId, RoleId, UserId};

use crate::error::{TicketError, TicketResult};
use crate::platform::TicketPlatform;
use crate::presentation::{Outgoing, TicketCard};
use crate::store::{ConfigStore, GuildConfig};
use crate::tickets::{Tickets, is_ticket_channel};

static COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#?[0-9A-Fa-f]{6}$").unwrap());
static IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?:.*\.(?:gif|png|jpe?g)$").unwrap());
static ROLE_MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<@&(\d+)>$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Setup,
    Panel,
    Status,
    Close,
}

impl CommandKind {
    /// Case-sensitive, like the rest of the parser.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "setup" => Some(Self::Setup),
            "panel" => Some(Self::Panel),
            "status" => Some(Self::Status),
            "close" => Some(Self::Close),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub kind: CommandKind,
    pub args: Vec<&'a str>,
}

/// `!name arg arg ...` → command; anything else → `None`.
pub fn parse<'a>(prefix: &str, content: &'a str) -> Option<ParsedCommand<'a>> {
    let rest = content.strip_prefix(prefix)?;
    let mut tokens = rest.split_whitespace();
    let kind = CommandKind::from_name(tokens.next()?)?;
    Some(ParsedCommand {
        kind,
        args: tokens.collect(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupArgs {
    pub role: RoleId,
    pub color: String,
    pub gif: Option<String>,
}

/// Role: first `<@&id>` token, else the first role the platform saw mentioned.
/// Colour and image: first token that matches.
pub fn parse_setup_args(args: &[&str], mentioned_roles: &[RoleId]) -> Option<SetupArgs> {
    let role = args
        .iter()
        .find_map(|a| {
            ROLE_MENTION_RE
                .captures(a)
                .and_then(|c| c[1].parse::<u64>().ok())
                .filter(|id| *id != 0)
                .map(RoleId::new)
        })
        .or_else(|| mentioned_roles.first().copied())?;

    let color = args.iter().find(|a| COLOR_RE.is_match(a))?.to_string();

    let gif = args
        .iter()
        .find(|a| IMAGE_RE.is_match(a) && url::Url::parse(a).is_ok())
        .map(|a| a.to_string());

    Some(SetupArgs { role, color, gif })
}

/// Platform-neutral view of a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_bot: bool,
    pub content: String,
    pub mention_roles: Vec<RoleId>,
}

/// Routes prefix commands. Unknown commands are ignored without a reply.
pub struct Dispatcher {
    prefix: String,
    platform: Arc<dyn TicketPlatform>,
    store: Arc<dyn ConfigStore>,
    tickets: Tickets,
}

impl Dispatcher {
    pub fn new(
        prefix: impl Into<String>,
        platform: Arc<dyn TicketPlatform>,
        store: Arc<dyn ConfigStore>,
        tickets: Tickets,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            platform,
            store,
            tickets,
        }
    }

    /// Returns the command that ran (successfully or with a user-facing
    /// reply). Only store/transport failures come back as `Err`.
    pub async fn handle(&self, msg: &IncomingMessage) -> TicketResult<Option<CommandKind>> {
        if msg.author_bot {
            return Ok(None);
        }
        let Some(guild) = msg.guild_id else {
            return Ok(None);
        };
        let Some(cmd) = parse(&self.prefix, &msg.content) else {
            return Ok(None);
        };

        tracing::debug!(gid = guild.get(), uid = msg.author_id.get(), kind=?cmd.kind, "prefix command");

        let res = match cmd.kind {
            CommandKind::Setup => self.setup(guild, msg, &cmd.args).await,
            CommandKind::Panel => self.panel(guild, msg).await,
            CommandKind::Status => self.status(guild, msg).await,
            CommandKind::Close => self.close(guild, msg).await,
        };

        match res {
            Ok(()) => Ok(Some(cmd.kind)),
            Err(e) if e.is_user_facing() => {
                self.platform
                    .reply(msg.channel_id, msg.id, &e.to_string())
                    .await?;
                Ok(Some(cmd.kind))
            }
            Err(e) => Err(e),
        }
    }

    async fn is_admin(&self, guild: GuildId, msg: &IncomingMessage) -> TicketResult<bool> {
        let access = self
            .platform
            .member_access(guild, msg.channel_id, msg.author_id)
            .await?;
        Ok(access.administrator)
    }

    async fn setup(&self, guild: GuildId, msg: &IncomingMessage, args: &[&str]) -> TicketResult<()> {
        if !self.is_admin(guild, msg).await? {
            return Err(TicketError::SetupForbidden);
        }

        let Some(parsed) = parse_setup_args(args, &msg.mention_roles) else {
            return Err(TicketError::Usage {
                prefix: self.prefix.clone(),
            });
        };

        let conf = GuildConfig::new(
            parsed.role,
            &parsed.color,
            parsed.gif.as_deref(),
            self.tickets.default_banner(),
        );
        self.store.set(guild, conf.clone())?;

        tracing::info!(gid = guild.get(), role = conf.role_id.get(), color=%conf.color, "ticket panel configured");

        let text = format!(
            "Setup saved! Staff: <@&{}>, Color: {}, GIF: {}",
            conf.role_id.get(),
            conf.color,
            conf.gif
        );
        self.platform.reply(msg.channel_id, msg.id, &text).await?;
        Ok(())
    }

    async fn panel(&self, guild: GuildId, msg: &IncomingMessage) -> TicketResult<()> {
        if !self.is_admin(guild, msg).await? {
            return Err(TicketError::PanelForbidden);
        }

        let Some(conf) = self.store.get(guild) else {
            return Err(TicketError::SetupMissing {
                prefix: self.prefix.clone(),
            });
        };

        let card = TicketCard::panel(&conf, self.tickets.default_banner());
        self.platform
            .send(msg.channel_id, Outgoing::Card { content: None, card })
            .await?;
        Ok(())
    }

    async fn status(&self, guild: GuildId, msg: &IncomingMessage) -> TicketResult<()> {
        let count = self.tickets.count_open(guild).await?;
        self.platform
            .reply(
                msg.channel_id,
                msg.id,
                &format!("Currently {count} open ticket(s)."),
            )
            .await?;
        Ok(())
    }

    async fn close(&self, guild: GuildId, msg: &IncomingMessage) -> TicketResult<()> {
        let name = self.platform.channel_name(msg.channel_id).await?;
        let in_ticket = name
            .as_deref()
            .is_some_and(|n| is_ticket_channel(self.tickets.channel_prefix(), n));
        if !in_ticket {
            return Err(TicketError::NotATicket);
        }

        let access = self
            .platform
            .member_access(guild, msg.channel_id, msg.author_id)
            .await?;
        if !access.administrator && !access.view_channel {
            return Err(TicketError::CloseForbidden);
        }

        self.tickets.close(msg.channel_id).await?;
        Ok(())
    }
}
