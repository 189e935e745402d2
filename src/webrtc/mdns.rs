use webrtc::ice::mdns::MulticastDnsMode;

pub const ENV_MDNS_MODE: &str = "REMOTE_VIEWER_WEBRTC_MDNS_MODE";

pub fn parse_mdns_mode(raw: &str) -> Option<MulticastDnsMode> {
    let value = raw.trim().to_ascii_lowercase();
    if value.is_empty() {
        return None;
    }

    match value.as_str() {
        "disabled" | "off" | "false" | "0" => Some(MulticastDnsMode::Disabled),
        "query" | "query_only" | "query-only" => Some(MulticastDnsMode::QueryOnly),
        "gather" | "query_and_gather" | "query-and-gather" | "on" | "true" | "1" => {
            Some(MulticastDnsMode::QueryAndGather)
        }
        _ => None,
    }
}

pub fn mdns_mode_from_env() -> Option<MulticastDnsMode> {
    parse_mdns_mode(&std::env::var(ENV_MDNS_MODE).ok()?)
}

pub fn mdns_mode() -> MulticastDnsMode {
    // QueryOnly keeps .local host candidates out of the offer while still
    // resolving the agent's mDNS candidates.
    mdns_mode_from_env().unwrap_or(MulticastDnsMode::QueryOnly)
}

pub fn default_mdns_host_name(session_id: &str) -> String {
    format!("{session_id}.local")
}
