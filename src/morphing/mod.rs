//! Traffic morphing engine.
//!
//! Shapes the sizes and timing of outgoing frames to match the statistical
//! profile of a cover application (video streaming, conferencing, REST
//! traffic). Morphing is an output-side transformation only: the receiver
//! discards cover frames and sees application bytes unchanged.
//!
//! A profile is selected per user from the account's policy string; unknown
//! or empty policies fall back to the HTTP/2 API profile.

mod profile;
mod writer;

pub use profile::{pad, DelayPattern, SizePattern, TrafficProfile};
pub use writer::write_morphed;

/// Morphing configuration bound to one session.
#[derive(Debug, Clone, Copy)]
pub struct MorphingConfig {
    /// Whether morphing is applied to this session's writes
    pub enabled: bool,
    /// Profile to mimic when enabled
    pub profile: &'static TrafficProfile,
}

impl MorphingConfig {
    /// Build a config from a user's policy string.
    pub fn from_policy(enabled: bool, policy: &str) -> Self {
        Self {
            enabled,
            profile: TrafficProfile::for_policy(policy),
        }
    }

    /// A disabled config (frames pass through unshaped).
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            profile: TrafficProfile::http2_api(),
        }
    }
}
