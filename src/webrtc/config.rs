//! WebRTC configuration helpers

use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;

use crate::config::IceConfig;

/// Build the ICE server list, STUN entries first
pub fn ice_servers(config: &IceConfig) -> Vec<RTCIceServer> {
    let mut ice_servers = vec![];

    for stun_url in &config.stun_servers {
        ice_servers.push(RTCIceServer {
            urls: vec![stun_url.clone()],
            ..Default::default()
        });
    }

    for turn in &config.turn_servers {
        ice_servers.push(RTCIceServer {
            urls: turn.urls.clone(),
            username: turn.username.clone(),
            credential: turn.credential.clone(),
            ..Default::default()
        });
    }

    ice_servers
}

/// Peer connection configuration for the given relay servers
pub fn rtc_configuration(config: &IceConfig) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: ice_servers(config),
        ..Default::default()
    }
}
