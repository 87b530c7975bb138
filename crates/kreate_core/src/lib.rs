//! kreate core - segment planning and reassembly for highlight clips
//!
//! This crate contains all run logic with zero CLI dependencies.
//! Media work itself is delegated to ffmpeg through [`media::MediaTool`].

pub mod config;
pub mod logging;
pub mod manifest;
pub mod media;
pub mod orchestrator;
pub mod planning;
pub mod timecode;
pub mod work_area;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
