pub mod bridge;
pub mod http_service;
pub mod jwt;
pub mod realtime;
pub mod room;

pub use bridge::{session_id_from_room_name, VoiceAgentBridge, DEFAULT_GREETING_LOCK};
pub use http_service::HttpRoomService;
pub use realtime::{BridgeLlmInstructions, RealtimeSpeechSession, VoiceActivityConfig};
pub use room::{ConversationItem, RoomConnection, RoomCredentials, RoomEvent, RoomInfo, RoomService};
