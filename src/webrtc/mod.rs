//! WebRTC negotiation for the viewer side
//!
//! ```text
//! SessionCoordinator
//!        |
//!        v
//! PeerTransport (RTCPeerConnection)
//!        |  create offer, gather candidates
//!        v
//! gather_local_offer  ---- finalized offer ---->  SignalingExchange
//!                                                      |
//!        Agent <------ POST /api/session {offer, screen}
//!                                                      |
//! PeerTransport <------------- answer -----------------+
//!        |
//!        +------- on_track ------> Presentation
//! ```

pub mod config;
pub mod gather;
pub mod mdns;
pub mod media;
pub mod peer;
pub mod signaling;
pub mod transport;

pub use gather::gather_local_offer;
pub use media::{provider_for, LocalMediaProvider, NoLocalMedia, PlaceholderVideoSource};
pub use peer::{RtcPeerTransport, RtcTransportFactory};
pub use signaling::{
    HttpSignaling, NegotiationRequest, SdpType, SessionDescription, SignalingExchange,
};
pub use transport::{
    CandidateEvent, LocalMedia, MediaIntent, MediaKind, PeerTransport, RemoteStream,
    RemoteStreamHandler, TransportFactory,
};
