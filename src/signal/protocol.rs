//! Envelope exchanged with the signaling server.

use serde::{Deserialize, Serialize};

/// Envelope action. Unknown actions deserialize to [`Action::Unknown`] and
/// are ignored by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "register")]
    Register,
    #[serde(rename = "log")]
    Log,
    #[serde(rename = "startCall")]
    StartCall,
    #[serde(rename = "endCall")]
    EndCall,
    #[serde(rename = "sdpOffer")]
    SdpOffer,
    #[serde(rename = "sdpAnswer")]
    SdpAnswer,
    #[serde(rename = "sendIceCandidate")]
    SendIceCandidate,
    #[serde(rename = "receiveIceCandidate")]
    ReceiveIceCandidate,
    #[serde(rename = "unknown", other)]
    Unknown,
}

/// One signaling message. `data` carries an embedded JSON document (a
/// spectrum record, an SDP, or an ICE candidate) as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub device_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    pub action: Action,
}

impl Message {
    pub fn register(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            client_id: String::new(),
            data: String::new(),
            action: Action::Register,
        }
    }

    pub fn log(device_id: &str, record: String) -> Self {
        Self {
            device_id: device_id.to_string(),
            client_id: String::new(),
            data: record,
            action: Action::Log,
        }
    }
}

/// ICE candidate as delivered in `receiveIceCandidate` data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateInit {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        default,
        rename = "sdpMLineIndex",
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}
