//! The closed catalog of webhook event kinds and their payloads.
//!
//! Each kind has a discriminator string on the wire, a variant in
//! [`EventKind`], a payload type, and a variant in [`Event`] wrapping that
//! payload. New kinds are added by extending the `event_catalog!`
//! invocation at the bottom of this file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use time::OffsetDateTime;

use super::user::{Snowflake, User};

/// Errors produced when looking up or decoding an event payload.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The discriminator is not part of the catalog.
    #[error("unknown event kind: {0}")]
    UnknownKind(String),
    /// The data block does not match the payload shape for its kind.
    #[error("malformed {kind} payload: {source}")]
    Malformed {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },
}

/// A payload type that belongs to exactly one [`EventKind`].
///
/// Used for typed handler registration: the kind is selected by the type.
pub trait EventPayload: Sized + Send + 'static {
    const KIND: EventKind;

    /// Unwrap the payload from an [`Event`] of the matching kind.
    fn from_event(event: Event) -> Option<Self>;
}

// ---------------------------------------------------------------------------
// Payload shapes
// ---------------------------------------------------------------------------

/// Where an application was installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum IntegrationType {
    GuildInstall,
    UserInstall,
}

impl TryFrom<u8> for IntegrationType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::GuildInstall),
            1 => Ok(Self::UserInstall),
            other => Err(format!("unknown integration type {other}")),
        }
    }
}

impl From<IntegrationType> for u8 {
    fn from(value: IntegrationType) -> Self {
        match value {
            IntegrationType::GuildInstall => 0,
            IntegrationType::UserInstall => 1,
        }
    }
}

/// `APPLICATION_AUTHORIZED`: the app was added to a server or user account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApplicationAuthorized {
    #[serde(default)]
    pub integration_type: Option<IntegrationType>,
    pub user: User,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub guild: Option<Value>,
}

impl ApplicationAuthorized {
    pub fn is_guild_install(&self) -> bool {
        self.integration_type == Some(IntegrationType::GuildInstall)
    }

    pub fn is_user_install(&self) -> bool {
        self.integration_type == Some(IntegrationType::UserInstall)
    }
}

/// `APPLICATION_DEAUTHORIZED`: a user deauthorized the app.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApplicationDeauthorized {
    pub user: User,
}

/// `ENTITLEMENT_CREATE`: a user purchased or was granted one of the app's
/// SKUs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntitlementCreate {
    pub id: Snowflake,
    pub sku_id: Snowflake,
    pub application_id: Snowflake,
    #[serde(default)]
    pub user_id: Option<Snowflake>,
    #[serde(rename = "type")]
    pub entitlement_type: i64,
    pub deleted: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub starts_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub consumed: Option<bool>,
}

/// A message sent in a lobby.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LobbyMessage {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub message_type: i64,
    pub content: String,
    pub lobby_id: Snowflake,
    pub channel_id: Snowflake,
    pub author: User,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    pub flags: u64,
    #[serde(default)]
    pub application_id: Option<Snowflake>,
}

/// `LOBBY_MESSAGE_CREATE`: a message was created in a lobby.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct LobbyMessageCreate(pub LobbyMessage);

/// `LOBBY_MESSAGE_UPDATE`: a message was edited in a lobby.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LobbyMessageUpdate {
    #[serde(flatten)]
    pub message: LobbyMessage,
    #[serde(rename = "edited_timestamp", with = "time::serde::rfc3339")]
    pub edited_at: OffsetDateTime,
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// `LOBBY_MESSAGE_DELETE`: a message was deleted from a lobby.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LobbyMessageDelete {
    #[serde(rename = "id")]
    pub message_id: Snowflake,
    pub lobby_id: Snowflake,
}

/// A direct message, left as raw JSON.
///
/// It is either a regular message or a passthrough message. Passthrough
/// messages are exchanged when both users are provisional accounts and are
/// only visible in-game.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct DirectMessage(pub Map<String, Value>);

impl DirectMessage {
    /// `recipient_id` only appears on passthrough messages.
    pub fn is_passthrough(&self) -> bool {
        self.0.contains_key("recipient_id")
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

/// `GAME_DIRECT_MESSAGE_CREATE`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct GameDirectMessageCreate(pub DirectMessage);

/// `GAME_DIRECT_MESSAGE_UPDATE`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct GameDirectMessageUpdate(pub DirectMessage);

/// `GAME_DIRECT_MESSAGE_DELETE`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct GameDirectMessageDelete(pub DirectMessage);

impl Deref for LobbyMessageCreate {
    type Target = LobbyMessage;

    fn deref(&self) -> &LobbyMessage {
        &self.0
    }
}

impl Deref for LobbyMessageUpdate {
    type Target = LobbyMessage;

    fn deref(&self) -> &LobbyMessage {
        &self.message
    }
}

impl Deref for GameDirectMessageCreate {
    type Target = DirectMessage;

    fn deref(&self) -> &DirectMessage {
        &self.0
    }
}

impl Deref for GameDirectMessageUpdate {
    type Target = DirectMessage;

    fn deref(&self) -> &DirectMessage {
        &self.0
    }
}

impl Deref for GameDirectMessageDelete {
    type Target = DirectMessage;

    fn deref(&self) -> &DirectMessage {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

macro_rules! event_catalog {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Discriminator of a supported event kind.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum EventKind {
            $(
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl EventKind {
            /// Every kind in the catalog.
            pub const ALL: &'static [EventKind] = &[$(EventKind::$variant),+];

            /// The wire discriminator.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(EventKind::$variant => $name,)+
                }
            }
        }

        impl FromStr for EventKind {
            type Err = CatalogError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(EventKind::$variant),)+
                    other => Err(CatalogError::UnknownKind(other.to_owned())),
                }
            }
        }

        /// A decoded event, one variant per [`EventKind`].
        #[derive(Debug, Clone, PartialEq)]
        pub enum Event {
            $($variant($variant),)+
        }

        impl Event {
            pub fn kind(&self) -> EventKind {
                match self {
                    $(Event::$variant(_) => EventKind::$variant,)+
                }
            }

            /// Decode the data block of an event whose kind is already known.
            pub fn decode(kind: EventKind, data: Value) -> Result<Self, serde_json::Error> {
                match kind {
                    $(EventKind::$variant => serde_json::from_value(data).map(Event::$variant),)+
                }
            }
        }

        $(
            impl EventPayload for $variant {
                const KIND: EventKind = EventKind::$variant;

                fn from_event(event: Event) -> Option<Self> {
                    match event {
                        Event::$variant(payload) => Some(payload),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            }

            impl From<$variant> for Event {
                fn from(payload: $variant) -> Self {
                    Event::$variant(payload)
                }
            }
        )+
    };
}

event_catalog! {
    ApplicationAuthorized => "APPLICATION_AUTHORIZED",
    ApplicationDeauthorized => "APPLICATION_DEAUTHORIZED",
    EntitlementCreate => "ENTITLEMENT_CREATE",
    LobbyMessageCreate => "LOBBY_MESSAGE_CREATE",
    LobbyMessageUpdate => "LOBBY_MESSAGE_UPDATE",
    LobbyMessageDelete => "LOBBY_MESSAGE_DELETE",
    GameDirectMessageCreate => "GAME_DIRECT_MESSAGE_CREATE",
    GameDirectMessageUpdate => "GAME_DIRECT_MESSAGE_UPDATE",
    GameDirectMessageDelete => "GAME_DIRECT_MESSAGE_DELETE",
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode a data block given its raw discriminator.
///
/// Unknown discriminators yield [`CatalogError::UnknownKind`], which callers
/// usually ignore rather than treat as a failure.
pub fn decode_payload(kind: &str, data: Value) -> Result<Event, CatalogError> {
    let kind: EventKind = kind.parse()?;
    Event::decode(kind, data).map_err(|source| CatalogError::Malformed { kind, source })
}
