//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::loot::LootKind;
use crate::game::simulation::SoundKind;
use crate::game::world::Obstacle;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Enter matchmaking
    Join {
        #[serde(default)]
        name: String,
        /// Stable client-side identity used for score attribution
        #[serde(default)]
        external_id: Option<String>,
    },

    /// Skip the rest of the waiting countdown
    Ready,

    /// Navigate to a world point
    Waypoint { x: f32, y: f32 },

    FireTorpedo,

    LayMine,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Waiting-room status, sent on every roster change and countdown second
    Waiting {
        count: usize,
        countdown: u32,
        names: Vec<String>,
        match_id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        ready_count: Option<usize>,
    },

    /// Match is starting; `slot` is the receiver's own ship
    GameStart {
        slot: u8,
        roster: Vec<RosterEntry>,
        obstacles: Vec<Obstacle>,
        hazards: Vec<HazardState>,
    },

    /// Per-tick world state
    State(StateSnapshot),

    Kill {
        killer: String,
        victim: String,
    },

    Info {
        text: String,
    },

    /// Positional sound, already attenuated for the receiver
    Sound {
        sound: SoundKind,
        volume: f32,
        x: i32,
        y: i32,
    },

    /// Personal result at match end
    GameOver {
        won: bool,
        placement: u32,
        xp: u32,
        kills: u32,
        hits: u32,
        torpedoes_fired: u32,
        /// Seconds
        duration: u32,
    },

    /// Another player dropped; their ship is now AI-controlled
    Disconnect {
        slot: u8,
        name: String,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub slot: u8,
    pub name: String,
    pub ai: bool,
}

/// Quantized world state: integer coordinates, centiradian angles, HP in tenths
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub tick: u64,
    /// Whole seconds since match start
    pub time: u32,
    pub alive: u32,
    pub ships: Vec<ShipState>,
    pub projectiles: Vec<ProjectileState>,
    pub blasts: Vec<BlastState>,
    pub loot: Vec<LootState>,
    pub hazards: Vec<HazardState>,
    pub zone: ZoneState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipState {
    pub slot: u8,
    pub x: i32,
    pub y: i32,
    /// Heading, centiradians
    pub h: i16,
    /// HP tenths (0-100)
    pub hp: u8,
    pub alive: bool,
    pub ai: bool,
    pub torpedoes: u8,
    pub mines: u8,
    pub speed_buff: bool,
    pub fire_buff: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectileTag {
    Cannonball,
    Torpedo,
    Mine,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileState {
    pub id: u32,
    pub kind: ProjectileTag,
    pub x: i32,
    pub y: i32,
    pub h: i16,
    pub armed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlastState {
    pub x: i32,
    pub y: i32,
    pub r: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LootState {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub kind: LootKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HazardState {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub h: i16,
    pub r: u16,
}

/// Zone (shrinking play area) state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneState {
    pub x: i32,
    pub y: i32,
    pub r: u32,
    /// Target circle of the current or upcoming shrink
    pub tx: i32,
    pub ty: i32,
    pub tr: u32,
    pub phase: u8,
    pub shrinking: bool,
    /// Whole seconds until the next zone change
    pub timer: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_messages_parse_by_type_tag() {
        let join: ClientMsg = serde_json::from_str(r#"{"type":"join","name":"Ahab","externalId":"abc"}"#).unwrap();
        assert_eq!(
            join,
            ClientMsg::Join {
                name: "Ahab".into(),
                external_id: Some("abc".into())
            }
        );

        let wp: ClientMsg = serde_json::from_str(r#"{"type":"waypoint","x":10.5,"y":20}"#).unwrap();
        assert_eq!(wp, ClientMsg::Waypoint { x: 10.5, y: 20.0 });

        assert_eq!(serde_json::from_str::<ClientMsg>(r#"{"type":"fireTorpedo"}"#).unwrap(), ClientMsg::FireTorpedo);
        assert_eq!(serde_json::from_str::<ClientMsg>(r#"{"type":"layMine"}"#).unwrap(), ClientMsg::LayMine);
    }

    #[test]
    fn join_tolerates_missing_fields() {
        let join: ClientMsg = serde_json::from_str(r#"{"type":"join"}"#).unwrap();
        assert_eq!(
            join,
            ClientMsg::Join {
                name: String::new(),
                external_id: None
            }
        );
    }

    #[test]
    fn unknown_or_malformed_messages_fail_to_parse() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"teleport"}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"waypoint","x":"left"}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>("not json").is_err());
    }

    #[test]
    fn waiting_omits_ready_count_when_absent() {
        let id = Uuid::nil();
        let msg = ServerMsg::Waiting {
            count: 2,
            countdown: 15,
            names: vec!["a".into(), "b".into()],
            match_id: id,
            ready_count: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "waiting", "count": 2, "countdown": 15, "names": ["a", "b"], "matchId": id})
        );
    }

    #[test]
    fn game_over_uses_camel_case_fields() {
        let msg = ServerMsg::GameOver {
            won: true,
            placement: 1,
            xp: 430,
            kills: 2,
            hits: 9,
            torpedoes_fired: 3,
            duration: 181,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "gameOver");
        assert_eq!(value["torpedoesFired"], 3);
    }
}
