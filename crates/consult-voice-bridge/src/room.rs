//! WebRTC room-service collaborator boundary (§6 `LiveKitRoomAPI`). The
//! media transport itself is out of scope (§1); this module only describes
//! the control-plane operations the bridge and the HTTP surface need.

use async_trait::async_trait;

use consult_core::error::Result;

#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub name: String,
    pub sid: String,
    pub num_participants: u32,
}

/// Room-management control plane (§6). Fails closed on credential issues;
/// implementations should apply a 5 s timeout per call.
#[async_trait]
pub trait RoomService: Send + Sync {
    async fn create_room(&self, room_name: &str, empty_timeout_secs: u32) -> Result<()>;
    async fn list_rooms(&self) -> Result<Vec<RoomInfo>>;
    async fn delete_room(&self, room_name: &str) -> Result<()>;
    async fn update_room_metadata(&self, room_name: &str, metadata: &str) -> Result<()>;
    async fn create_agent_dispatch(&self, room_name: &str, agent_name: &str) -> Result<()>;

    /// Mint a participant token. `ttl_secs` follows the caller's convention
    /// (3600 for a human participant, 7200 for the dispatched agent).
    fn create_token(
        &self,
        room_name: &str,
        participant_name: &str,
        ttl_secs: i64,
        can_publish: bool,
        can_subscribe: bool,
    ) -> Result<String>;
}

/// HS256 token minting shared by every `RoomService` implementation; the
/// room-management calls themselves still need a concrete backend.
pub struct RoomCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl RoomCredentials {
    pub fn create_token(
        &self,
        room_name: &str,
        participant_name: &str,
        ttl_secs: i64,
        can_publish: bool,
        can_subscribe: bool,
    ) -> Result<String> {
        crate::jwt::create_token(
            &self.api_key,
            &self.api_secret,
            room_name,
            participant_name,
            ttl_secs,
            can_publish,
            can_subscribe,
        )
    }
}

/// A normalized conversation turn as the realtime session reports it.
#[derive(Debug, Clone)]
pub struct ConversationItem {
    pub role: String,
    pub content: String,
}

/// Events the bridge reacts to once attached to a room (§4.7 steps 4-6).
#[derive(Debug, Clone)]
pub enum RoomEvent {
    ConversationItemAdded(ConversationItem),
    MetadataChanged(String),
    ParticipantLeft,
}

/// An already-joined room connection emitting [`RoomEvent`]s. The concrete
/// implementation owns the underlying media/data-channel subscription; this
/// workspace only needs the event surface it produces.
#[async_trait]
pub trait RoomConnection: Send + Sync {
    async fn next_event(&mut self) -> Option<RoomEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_delegate_to_jwt_module() {
        let creds = RoomCredentials { api_key: "k".into(), api_secret: "s".into() };
        let token = creds.create_token("room-1", "user-1", 3600, true, true).unwrap();
        assert_eq!(token.matches('.').count(), 2);
    }
}
