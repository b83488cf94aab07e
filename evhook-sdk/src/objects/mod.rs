pub mod envelope;
pub mod events;
pub mod user;

pub use envelope::{EventBody, RequestType, WebhookEnvelope};
pub use events::{
    ApplicationAuthorized, ApplicationDeauthorized, CatalogError, DirectMessage,
    EntitlementCreate, Event, EventKind, EventPayload, GameDirectMessageCreate,
    GameDirectMessageDelete, GameDirectMessageUpdate, IntegrationType, LobbyMessage,
    LobbyMessageCreate, LobbyMessageDelete, LobbyMessageUpdate, decode_payload,
};
pub use user::{Snowflake, User};
