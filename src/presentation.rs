// src/presentation.rs
use rand::Rng;
use serenity::all::{ButtonStyle, Colour, CreateActionRow, CreateButton, CreateEmbed, CreateMessage};

use crate::store::GuildConfig;

pub const CREATE_TICKET_ID: &str = "create_ticket";
pub const CLOSE_TICKET_ID: &str = "close_ticket";

/// The two buttons this bot puts on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketButtonKind {
    Create,
    Close,
}

impl TicketButtonKind {
    pub fn from_custom_id(id: &str) -> Option<Self> {
        match id {
            CREATE_TICKET_ID => Some(Self::Create),
            CLOSE_TICKET_ID => Some(Self::Close),
            _ => None,
        }
    }
}

pub const QUOTES: [&str; 5] = [
    "Believe in yourself. Not in the you who believes in me. Believe in the you who believes in yourself. – Kamina",
    "A lesson without pain is meaningless. That’s because no one can gain without sacrificing something. – Edward Elric",
    "The moment you think of giving up, think of the reason why you held on so long. – Natsu Dragneel",
    "If you don’t take risks, you can’t create a future! – Monkey D. Luffy",
    "We each need to find our own inspiration. Sometimes, it’s not easy. – Kikyō",
];

/// Uniform pick, nothing remembered between calls.
pub fn pick_quote<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    QUOTES[rng.random_range(0..QUOTES.len())]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketButton {
    pub custom_id: &'static str,
    pub label: &'static str,
    pub style: ButtonStyle,
}

/// Embed + single button, before it is turned into a serenity builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketCard {
    pub title: String,
    pub description: String,
    pub colour: Colour,
    pub image_url: String,
    pub button: TicketButton,
}

impl TicketCard {
    /// The "open a ticket" panel posted by `panel`.
    pub fn panel(conf: &GuildConfig, default_banner: &str) -> Self {
        Self {
            title: "🎫 Need Help?".into(),
            description: "Click below to open a support ticket!".into(),
            colour: conf.accent(),
            image_url: conf.banner_or(default_banner).to_string(),
            button: TicketButton {
                custom_id: CREATE_TICKET_ID,
                label: "🎟 Create Ticket",
                style: ButtonStyle::Primary,
            },
        }
    }

    /// First message inside a fresh ticket channel.
    pub fn welcome(conf: &GuildConfig, username: &str, quote: &str, default_banner: &str) -> Self {
        Self {
            title: format!("Hi {username}, how can we help?"),
            description: quote.to_string(),
            colour: conf.accent(),
            image_url: conf.banner_or(default_banner).to_string(),
            button: TicketButton {
                custom_id: CLOSE_TICKET_ID,
                label: "🗑 Close Ticket",
                style: ButtonStyle::Danger,
            },
        }
    }

    pub fn embed(&self) -> CreateEmbed {
        CreateEmbed::new()
            .title(&self.title)
            .description(&self.description)
            .colour(self.colour)
            .image(&self.image_url)
    }

    pub fn action_row(&self) -> CreateActionRow {
        CreateActionRow::Buttons(vec![
            CreateButton::new(self.button.custom_id)
                .label(self.button.label)
                .style(self.button.style),
        ])
    }
}

/// What the bot posts into a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    Card {
        content: Option<String>,
        card: TicketCard,
    },
}

impl Outgoing {
    pub fn into_message(self) -> CreateMessage {
        match self {
            Outgoing::Text(text) => CreateMessage::new().content(text),
            Outgoing::Card { content, card } => {
                let mut m = CreateMessage::new()
                    .embed(card.embed())
                    .components(vec![card.action_row()]);
                if let Some(content) = content {
                    m = m.content(content);
                }
                m
            }
        }
    }
}
