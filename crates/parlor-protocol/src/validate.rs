//! Field-level validation for inbound messages.
//!
//! Rules are enforced with character-class checks rather than a regex
//! engine; the patterns are simple enough that the checks read as the
//! documentation.

use crate::{ClientEnvelope, ClientEvent, ProtocolError, PROTOCOL_VERSION};

/// Longest accepted game id (`^[a-z0-9-]+$`).
pub const MAX_GAME_ID_LEN: usize = 50;
/// Longest accepted display name (`^[A-Za-z0-9_\- ]{1,50}$`).
pub const MAX_DISPLAY_NAME_LEN: usize = 50;
/// Longest accepted move type inside `submitMove`.
pub const MAX_MOVE_TYPE_LEN: usize = 50;
/// Chat message length bounds.
pub const MAX_CHAT_LEN: usize = 500;
/// Longest accepted leave reason.
pub const MAX_LEAVE_REASON_LEN: usize = 200;

/// Validates a room code: exactly six characters from `[A-Z0-9]`.
pub fn validate_room_code(code: &str) -> Result<(), ProtocolError> {
    if code.len() != crate::RoomCode::LEN
        || !code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(ProtocolError::Validation(format!(
            "invalid room code {code:?}"
        )));
    }
    Ok(())
}

/// Validates a game id: `[a-z0-9-]`, non-empty, at most 50 chars.
pub fn validate_game_id(id: &str) -> Result<(), ProtocolError> {
    if id.is_empty()
        || id.len() > MAX_GAME_ID_LEN
        || !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ProtocolError::Validation(format!(
            "invalid game id {id:?}"
        )));
    }
    Ok(())
}

/// Validates a display name: `[A-Za-z0-9_\- ]`, 1 to 50 chars.
pub fn validate_display_name(name: &str) -> Result<(), ProtocolError> {
    if name.is_empty()
        || name.len() > MAX_DISPLAY_NAME_LEN
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ' ')
    {
        return Err(ProtocolError::Validation(format!(
            "invalid display name {name:?}"
        )));
    }
    Ok(())
}

/// Validates a full inbound envelope: protocol version plus every
/// event-specific payload rule. Called by the connection handler before a
/// message is allowed anywhere near a room.
pub fn validate_envelope(env: &ClientEnvelope) -> Result<(), ProtocolError> {
    check_version(&env.version)?;
    validate_event(&env.payload)
}

fn check_version(client: &str) -> Result<(), ProtocolError> {
    let host_major = PROTOCOL_VERSION.split('.').next().unwrap_or("0");
    let client_major = client.split('.').next().unwrap_or("");
    let well_formed = client.split('.').count() == 3
        && client
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    if !well_formed || client_major != host_major {
        return Err(ProtocolError::VersionMismatch {
            host: PROTOCOL_VERSION.to_string(),
            client: client.to_string(),
        });
    }
    Ok(())
}

fn validate_event(event: &ClientEvent) -> Result<(), ProtocolError> {
    match event {
        ClientEvent::CreateGame {
            game_type,
            room_code,
            min_players,
            max_players,
            ..
        } => {
            validate_game_id(game_type)?;
            if let Some(code) = room_code {
                validate_room_code(code)?;
            }
            if let (Some(min), Some(max)) = (min_players, max_players) {
                if max < min {
                    return Err(ProtocolError::Validation(format!(
                        "maxPlayers {max} < minPlayers {min}"
                    )));
                }
            }
            Ok(())
        }
        ClientEvent::JoinGame { room_code, .. } => validate_room_code(room_code),
        ClientEvent::SubmitMove { kind, .. } => {
            if kind.is_empty() || kind.len() > MAX_MOVE_TYPE_LEN {
                return Err(ProtocolError::Validation(
                    "move type must be 1..=50 chars".into(),
                ));
            }
            Ok(())
        }
        ClientEvent::ChatMessage { message, .. } => {
            if message.is_empty() || message.len() > MAX_CHAT_LEN {
                return Err(ProtocolError::Validation(
                    "chat message must be 1..=500 chars".into(),
                ));
            }
            Ok(())
        }
        ClientEvent::LeaveGame { reason } => {
            if let Some(reason) = reason {
                if reason.len() > MAX_LEAVE_REASON_LEN {
                    return Err(ProtocolError::Validation(
                        "leave reason too long".into(),
                    ));
                }
            }
            Ok(())
        }
        ClientEvent::PlayerReady { .. }
        | ClientEvent::StartGame { .. }
        | ClientEvent::UndoMove { .. }
        | ClientEvent::Ping { .. }
        | ClientEvent::RequestSync { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChatKind, GameMode};
    use serde_json::json;

    fn envelope(payload: ClientEvent) -> ClientEnvelope {
        ClientEnvelope {
            version: "1.0.0".into(),
            seq: 1,
            payload,
        }
    }

    #[test]
    fn test_room_code_rules() {
        assert!(validate_room_code("ABC123").is_ok());
        assert!(validate_room_code("A1B2C3").is_ok());
        assert!(validate_room_code("abc123").is_err());
        assert!(validate_room_code("ABC12").is_err());
        assert!(validate_room_code("ABC1234").is_err());
        assert!(validate_room_code("ABC-12").is_err());
    }

    #[test]
    fn test_game_id_rules() {
        assert!(validate_game_id("texas-holdem").is_ok());
        assert!(validate_game_id("tictactoe").is_ok());
        assert!(validate_game_id("").is_err());
        assert!(validate_game_id("TicTacToe").is_err());
        assert!(validate_game_id(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_display_name_rules() {
        assert!(validate_display_name("Ada Lovelace_9").is_ok());
        assert!(validate_display_name("dash-ok").is_ok());
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("bad!name").is_err());
        assert!(validate_display_name(&"n".repeat(51)).is_err());
    }

    #[test]
    fn test_version_major_must_match() {
        let mut env = envelope(ClientEvent::Ping { client_time: 0 });
        assert!(validate_envelope(&env).is_ok());

        env.version = "1.4.2".into();
        assert!(validate_envelope(&env).is_ok(), "minor/patch ignored");

        env.version = "2.0.0".into();
        assert!(validate_envelope(&env).is_err());

        env.version = "1.0".into();
        assert!(validate_envelope(&env).is_err(), "must be MAJOR.MINOR.PATCH");
    }

    #[test]
    fn test_create_game_player_bounds_checked() {
        let env = envelope(ClientEvent::CreateGame {
            game_type: "checkers".into(),
            mode: GameMode::Lan,
            room_code: None,
            min_players: Some(4),
            max_players: Some(2),
            options: None,
        });
        assert!(validate_envelope(&env).is_err());
    }

    #[test]
    fn test_chat_length_bounds() {
        let ok = envelope(ClientEvent::ChatMessage {
            message: "gg".into(),
            kind: ChatKind::Text,
        });
        assert!(validate_envelope(&ok).is_ok());

        let empty = envelope(ClientEvent::ChatMessage {
            message: String::new(),
            kind: ChatKind::Text,
        });
        assert!(validate_envelope(&empty).is_err());

        let long = envelope(ClientEvent::ChatMessage {
            message: "x".repeat(501),
            kind: ChatKind::Text,
        });
        assert!(validate_envelope(&long).is_err());
    }

    #[test]
    fn test_submit_move_type_bounds() {
        let env = envelope(ClientEvent::SubmitMove {
            kind: "m".repeat(51),
            data: json!({}),
            timestamp: None,
        });
        assert!(validate_envelope(&env).is_err());
    }
}
