//! HS256 participant-token minting for the WebRTC room service (§4.8
//! "mints a participant token"), grounded on the original LiveKit client's
//! `create_token`. Only the JWT construction is implemented here — the room
//! service itself is an external collaborator (§1 Out of scope) reached
//! through [`crate::room::RoomService`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use consult_core::error::ConsultError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Serialize)]
struct Header {
    alg: &'static str,
    typ: &'static str,
}

#[derive(Serialize)]
struct VideoGrants {
    room: String,
    #[serde(rename = "roomJoin")]
    room_join: bool,
    #[serde(rename = "canPublish")]
    can_publish: bool,
    #[serde(rename = "canSubscribe")]
    can_subscribe: bool,
    #[serde(rename = "canPublishData")]
    can_publish_data: bool,
}

/// Grants for the service-level (non-participant) token used to authorize
/// the room-management REST calls themselves (`create_room`, `list_rooms`,
/// `delete_room`, `update_room_metadata`, `create_agent_dispatch`).
#[derive(Serialize)]
struct AdminGrants {
    #[serde(rename = "roomCreate")]
    room_create: bool,
    #[serde(rename = "roomList")]
    room_list: bool,
    #[serde(rename = "roomAdmin")]
    room_admin: bool,
}

#[derive(Serialize)]
struct AdminClaims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
    nbf: i64,
    video: AdminGrants,
}

#[derive(Serialize)]
struct Claims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
    nbf: i64,
    video: VideoGrants,
    name: String,
}

/// Mint an HS256 room-access token. `ttl_secs` follows the original's
/// defaults: 3600 for a participant, 7200 for the dispatched agent.
pub fn create_token(
    api_key: &str,
    api_secret: &str,
    room_name: &str,
    participant_name: &str,
    ttl_secs: i64,
    can_publish: bool,
    can_subscribe: bool,
) -> Result<String, ConsultError> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        iss: api_key.to_string(),
        sub: participant_name.to_string(),
        iat: now,
        exp: now + ttl_secs,
        nbf: now,
        video: VideoGrants {
            room: room_name.to_string(),
            room_join: true,
            can_publish,
            can_subscribe,
            can_publish_data: true,
        },
        name: participant_name.to_string(),
    };

    let header = Header { alg: "HS256", typ: "JWT" };
    let header_b64 = encode_segment(&header)?;
    let claims_b64 = encode_segment(&claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .map_err(|e| ConsultError::Config(format!("invalid room-service secret: {e}")))?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

/// Mint a short-lived service token authorizing room-management REST calls
/// (room create/list/delete, metadata updates, agent dispatch). Distinct
/// from [`create_token`]'s participant grants: nobody joins a room with it.
pub fn create_admin_token(api_key: &str, api_secret: &str) -> Result<String, ConsultError> {
    let now = chrono::Utc::now().timestamp();
    let claims = AdminClaims {
        iss: api_key.to_string(),
        sub: api_key.to_string(),
        iat: now,
        exp: now + 600,
        nbf: now,
        video: AdminGrants { room_create: true, room_list: true, room_admin: true },
    };

    let header = Header { alg: "HS256", typ: "JWT" };
    let header_b64 = encode_segment(&header)?;
    let claims_b64 = encode_segment(&claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .map_err(|e| ConsultError::Config(format!("invalid room-service secret: {e}")))?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, ConsultError> {
    let json = serde_json::to_vec(value)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_has_three_dot_separated_segments() {
        let token = create_token("key", "secret", "room-1", "user-1", 3600, true, true).unwrap();
        assert_eq!(token.matches('.').count(), 2);
    }

    #[test]
    fn token_is_deterministic_for_same_claims_modulo_time() {
        let t1 = create_token("key", "secret", "room-1", "user-1", 3600, true, true).unwrap();
        let t2 = create_token("key", "secret", "room-1", "user-1", 3600, true, true).unwrap();
        // iat/exp/nbf may legitimately differ by a second; header+payload shape should not.
        assert_eq!(t1.split('.').next(), t2.split('.').next());
    }

    #[test]
    fn admin_token_has_three_dot_separated_segments() {
        let token = create_admin_token("key", "secret").unwrap();
        assert_eq!(token.matches('.').count(), 2);
    }

    #[test]
    fn different_secrets_yield_different_signatures() {
        let t1 = create_token("key", "secret-a", "room-1", "user-1", 3600, true, true).unwrap();
        let t2 = create_token("key", "secret-b", "room-1", "user-1", 3600, true, true).unwrap();
        assert_ne!(t1.rsplit('.').next(), t2.rsplit('.').next());
    }
}
