//! Realtime room access
//!
//! - `naming`: room names, identities, dispatch matching
//! - `credential`: minting and reading room credentials
//! - `client`: credential providers (in-process issuer, HTTP endpoint)
//! - `transport`: the room connection contract
//! - `media`: local media stream handle

pub mod client;
pub mod credential;
pub mod media;
pub mod naming;
pub mod transport;

pub use client::{CredentialProvider, HttpCredentialClient, TokenRequest, TokenResponse};
pub use credential::{decode_claims, AccessClaims, AccessIssuer, RoomCredential, VideoGrant};
pub use media::{DetachedMedia, LocalMedia};
pub use naming::{AgentDispatch, DispatchRule, WorkerRegistration};
pub use transport::{
    DisconnectReason, ParticipantInfo, RoomConnection, RoomEvent, RoomTransport, TextStreamHeader,
};
