use std::fmt;

use crate::error::BackendError;

/// Opaque id of one playable unit allocated by a [`MediaBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendHandle(pub u64);

impl fmt::Display for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEventKind {
    Error(String),
    Tag { field: String, value: String },
}

/// Asynchronous notification raised by a backend handle after `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEvent {
    pub handle: BackendHandle,
    pub kind: BackendEventKind,
}

impl BackendEvent {
    pub fn error(handle: BackendHandle, message: impl Into<String>) -> Self {
        Self {
            handle,
            kind: BackendEventKind::Error(message.into()),
        }
    }

    pub fn tag(handle: BackendHandle, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            handle,
            kind: BackendEventKind::Tag {
                field: field.into(),
                value: value.into(),
            },
        }
    }
}

pub trait MediaBackend {
    fn create(&mut self) -> Result<BackendHandle, BackendError>;
    fn set_uri(&mut self, handle: BackendHandle, uri: &str) -> Result<(), BackendError>;
    fn set_volume(&mut self, handle: BackendHandle, volume: f64) -> Result<(), BackendError>;
    /// Fire-and-forget; failures are reported later as [`BackendEventKind::Error`].
    fn start(&mut self, handle: BackendHandle) -> Result<(), BackendError>;
    /// Releases every resource of `handle` before returning. Unknown handles are a no-op.
    fn stop(&mut self, handle: BackendHandle);
}

pub fn volume_to_vlc_scale(volume: f64) -> u16 {
    // VLC's RC volume uses a 0-512 scale with 256 as nominal 100%.
    (volume.clamp(0.0, 1.0) * 256.0).round() as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlc_scale_maps_unit_range_to_nominal() {
        assert_eq!(volume_to_vlc_scale(0.0), 0);
        assert_eq!(volume_to_vlc_scale(0.5), 128);
        assert_eq!(volume_to_vlc_scale(1.0), 256);
        assert_eq!(volume_to_vlc_scale(3.0), 256);
    }
}
