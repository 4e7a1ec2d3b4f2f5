// src/store.rs
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serenity::all::{Colour, GuildId, RoleId};

use crate::error::StoreError;

/// Ticket panel settings of a single guild.
///
/// Field names on disk follow the original file format:
/// `{ "roleId": "...", "color": "#rrggbb", "gif": "https://..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    #[serde(rename = "roleId", with = "snowflake")]
    pub role_id: RoleId,
    pub color: String,
    pub gif: String,
}

impl GuildConfig {
    /// Builds a record the way `setup` stores it: colour gets its `#`,
    /// a missing banner falls back to `default_banner`.
    pub fn new(role_id: RoleId, color: &str, gif: Option<&str>, default_banner: &str) -> Self {
        Self {
            role_id,
            color: normalize_color(color),
            gif: gif
                .filter(|g| !g.trim().is_empty())
                .unwrap_or(default_banner)
                .to_string(),
        }
    }

    /// Embed colour; a hand-edited, unparsable value renders as the default colour.
    pub fn accent(&self) -> Colour {
        parse_hex_colour(&self.color)
            .map(Colour::new)
            .unwrap_or_default()
    }

    pub fn banner_or<'a>(&'a self, default_banner: &'a str) -> &'a str {
        if self.gif.trim().is_empty() { default_banner } else { &self.gif }
    }
}

/// Prepends `#` when missing. Idempotent.
pub fn normalize_color(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with('#') {
        raw.to_string()
    } else {
        format!("#{raw}")
    }
}

pub fn parse_hex_colour(color: &str) -> Option<u32> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// Per-guild configuration storage.
///
/// `get` never fails; `set` replaces the whole record and has persisted it
/// by the time it returns.
pub trait ConfigStore: Send + Sync {
    fn get(&self, guild: GuildId) -> Option<GuildConfig>;
    fn set(&self, guild: GuildId, config: GuildConfig) -> Result<(), StoreError>;
}

/// Single JSON file, read once at startup and rewritten in full on every `set`.
pub struct JsonFileStore {
    path: PathBuf,
    guilds: Mutex<BTreeMap<String, GuildConfig>>,
}

impl JsonFileStore {
    /// Reads the file, or creates it as `{}` when it does not exist yet.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let guilds = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?
        } else {
            std::fs::write(&path, "{}").map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            tracing::info!(path=%path.display(), "created empty ticket config file");
            BTreeMap::new()
        };

        tracing::info!(path=%path.display(), guilds = guilds.len(), "ticket config loaded");
        Ok(Self {
            path,
            guilds: Mutex::new(guilds),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, GuildConfig>> {
        self.guilds.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ConfigStore for JsonFileStore {
    fn get(&self, guild: GuildId) -> Option<GuildConfig> {
        self.lock().get(&guild.get().to_string()).cloned()
    }

    fn set(&self, guild: GuildId, config: GuildConfig) -> Result<(), StoreError> {
        // blocking write under a std lock, on the caller's task: only `setup` writes
        let mut guilds = self.lock();

        // memory only changes once the file write went through
        let mut next = guilds.clone();
        next.insert(guild.get().to_string(), config);

        let body = serde_json::to_string_pretty(&next).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, body).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        *guilds = next;
        tracing::debug!(gid = guild.get(), path=%self.path.display(), "ticket config persisted");
        Ok(())
    }
}

/// In-memory store. Counts writes so callers can assert nothing was persisted.
#[derive(Default)]
pub struct MemoryStore {
    guilds: Mutex<HashMap<GuildId, GuildConfig>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, guild: GuildId) -> Option<GuildConfig> {
        self.guilds
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&guild)
            .cloned()
    }

    fn set(&self, guild: GuildId, config: GuildConfig) -> Result<(), StoreError> {
        self.guilds
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(guild, config);
        *self.writes.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        Ok(())
    }
}

/// Discord ids are kept as decimal strings in the file.
mod snowflake {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use serenity::all::RoleId;

    pub fn serialize<S: Serializer>(id: &RoleId, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&id.get().to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<RoleId, D::Error> {
        let raw = String::deserialize(d)?;
        match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(D::Error::custom(format!("invalid role id `{raw}`"))),
            Ok(id) => Ok(RoleId::new(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    const FALLBACK: &str = "https://example.com/fallback.gif";

    fn sample() -> GuildConfig {
        GuildConfig::new(RoleId::new(42), "1abc9c", None, FALLBACK)
    }

    #[test]
    fn new_normalizes_colour_and_falls_back_to_default_banner() {
        let c = sample();
        assert_eq!(c.role_id, RoleId::new(42));
        assert_eq!(c.color, "#1abc9c");
        assert_eq!(c.gif, FALLBACK);

        let c = GuildConfig::new(RoleId::new(1), "#FFAA00", Some("https://x.io/a.png"), FALLBACK);
        assert_eq!(c.color, "#FFAA00");
        assert_eq!(c.gif, "https://x.io/a.png");
        assert_eq!(c.accent(), Colour::new(0xFFAA00));
    }

    #[test]
    fn broken_colour_renders_as_default() {
        let mut c = sample();
        c.color = "teal".into();
        assert_eq!(c.accent(), Colour::default());
    }

    #[test]
    fn load_creates_empty_file_when_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ticket_bot_config.json");

        let store = JsonFileStore::load(&path).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.path(), path.as_path());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn set_rewrites_whole_file_in_original_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cfg.json");
        let store = JsonFileStore::load(&path).unwrap();

        store.set(GuildId::new(7), sample()).unwrap();
        store
            .set(GuildId::new(8), GuildConfig::new(RoleId::new(9), "#000000", None, FALLBACK))
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["7"]["roleId"], "42");
        assert_eq!(json["7"]["color"], "#1abc9c");
        assert_eq!(json["7"]["gif"], FALLBACK);
        assert_eq!(json["8"]["roleId"], "9");
        // pretty-printed
        assert!(raw.contains("\n  \"7\": {"));

        let reloaded = JsonFileStore::load(&path).unwrap();
        assert_eq!(reloaded.get(GuildId::new(7)), Some(sample()));
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn set_replaces_instead_of_merging() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::load(dir.path().join("cfg.json")).unwrap();
        let gid = GuildId::new(3);

        store
            .set(gid, GuildConfig::new(RoleId::new(1), "111111", Some("https://a.b/c.gif"), FALLBACK))
            .unwrap();
        store.set(gid, GuildConfig::new(RoleId::new(2), "222222", None, FALLBACK)).unwrap();

        let got = store.get(gid).unwrap();
        assert_eq!(got.role_id, RoleId::new(2));
        assert_eq!(got.gif, FALLBACK);
    }

    #[test]
    fn get_unknown_guild_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get(GuildId::new(99)), None);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(JsonFileStore::load(&path), Err(StoreError::Json { .. })));

        std::fs::write(&path, r##"{"1":{"roleId":"0","color":"#000000","gif":"x"}}"##).unwrap();
        assert!(matches!(JsonFileStore::load(&path), Err(StoreError::Json { .. })));
    }

    #[test]
    fn failed_write_leaves_memory_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cfg.json");
        let store = JsonFileStore::load(&path).unwrap();

        // a directory in place of the file makes the write fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(matches!(
            store.set(GuildId::new(1), sample()),
            Err(StoreError::Io { .. })
        ));
        assert_eq!(store.get(GuildId::new(1)), None);
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(hex in "#?[0-9A-Fa-f]{6}") {
            let once = normalize_color(&hex);
            prop_assert_eq!(normalize_color(&once), once.clone());
            prop_assert!(once.starts_with('#'));
            prop_assert_eq!(once.len(), 7);
            prop_assert!(once[1..].chars().all(|c| c.is_ascii_hexdigit()));
            prop_assert!(parse_hex_colour(&once).is_some());
        }
    }
}
