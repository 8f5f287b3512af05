//! Device Profile Store
//!
//! Static description of the emulated camera: its identity and the ordered
//! list of media profiles it advertises. Built once at startup and shared
//! read-only between request handlers.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::OnvifError;

/// Identity strings reported by GetDeviceInformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceIdentity {
    pub uuid: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
}

impl DeviceIdentity {
    fn validate(&self) -> Result<(), OnvifError> {
        let fields = [
            ("uuid", &self.uuid),
            ("name", &self.name),
            ("manufacturer", &self.manufacturer),
            ("model", &self.model),
            ("serial_number", &self.serial_number),
            ("firmware_version", &self.firmware_version),
        ];
        for (field, value) in fields {
            if let Some(c) = value.chars().find(|c| !is_xml_char(*c)) {
                return Err(OnvifError::InvalidIdentity {
                    field,
                    reason: format!("character U+{:04X} is not allowed in XML", c as u32),
                });
            }
        }
        Ok(())
    }
}

/// Characters allowed in an XML 1.0 document. Escaping cannot represent the others.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || ('\u{20}'..='\u{D7FF}').contains(&c)
        || ('\u{E000}'..='\u{FFFD}').contains(&c)
        || c >= '\u{10000}'
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            uuid: "urn:uuid:12345678-1234-1234-1234-123456789012".to_string(),
            name: "ONVIF Camera".to_string(),
            manufacturer: "Sample Manufacturer".to_string(),
            model: "Sample Model".to_string(),
            serial_number: "123456789".to_string(),
            firmware_version: "1.0.0".to_string(),
        }
    }
}

/// A named bundle of encoder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaProfile {
    pub token: String,
    pub name: String,
    pub video_encoder_token: String,
    pub audio_encoder_token: String,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    /// Bits per second
    pub bitrate: u32,
}

impl MediaProfile {
    /// 1920x1080 @ 30fps, 4 Mbps
    pub fn main_stream() -> Self {
        Self {
            token: "Profile_1".to_string(),
            name: "MainStream".to_string(),
            video_encoder_token: "VideoEncoder_1".to_string(),
            audio_encoder_token: "AudioEncoder_1".to_string(),
            width: 1920,
            height: 1080,
            framerate: 30,
            bitrate: 4_000_000,
        }
    }

    /// 640x480 @ 15fps, 1 Mbps
    pub fn sub_stream() -> Self {
        Self {
            token: "Profile_2".to_string(),
            name: "SubStream".to_string(),
            video_encoder_token: "VideoEncoder_2".to_string(),
            audio_encoder_token: "AudioEncoder_2".to_string(),
            width: 640,
            height: 480,
            framerate: 15,
            bitrate: 1_000_000,
        }
    }

    fn validate(&self) -> Result<(), OnvifError> {
        let invalid = |reason: &str| OnvifError::InvalidProfile {
            token: self.token.clone(),
            reason: reason.to_string(),
        };

        if self.token.trim().is_empty() {
            return Err(invalid("token must not be empty"));
        }
        let text = [
            &self.token,
            &self.name,
            &self.video_encoder_token,
            &self.audio_encoder_token,
        ];
        if text.iter().any(|s| !s.chars().all(is_xml_char)) {
            return Err(invalid("contains characters not allowed in XML"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(invalid("resolution must be positive"));
        }
        if self.framerate == 0 {
            return Err(invalid("framerate must be positive"));
        }
        if self.bitrate == 0 {
            return Err(invalid("bitrate must be positive"));
        }
        Ok(())
    }
}

/// Read-only device description shared by every response builder
#[derive(Debug, Clone)]
pub struct DeviceProfileStore {
    identity: DeviceIdentity,
    profiles: Vec<MediaProfile>,
}

impl DeviceProfileStore {
    /// Build a store, checking that tokens are unique, numeric fields positive
    /// and every string representable in XML. Profile order is kept as given.
    pub fn new(identity: DeviceIdentity, profiles: Vec<MediaProfile>) -> Result<Self, OnvifError> {
        identity.validate()?;
        if profiles.is_empty() {
            return Err(OnvifError::NoProfiles);
        }

        let mut seen = HashSet::new();
        for profile in &profiles {
            profile.validate()?;
            if !seen.insert(profile.token.as_str()) {
                return Err(OnvifError::DuplicateToken(profile.token.clone()));
            }
        }

        Ok(Self { identity, profiles })
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Profiles in insertion order
    pub fn profiles(&self) -> &[MediaProfile] {
        &self.profiles
    }

    /// Look up a profile by token
    pub fn profile(&self, token: &str) -> Option<&MediaProfile> {
        self.profiles.iter().find(|p| p.token == token)
    }
}

impl Default for DeviceProfileStore {
    fn default() -> Self {
        Self {
            identity: DeviceIdentity::default(),
            profiles: vec![MediaProfile::main_stream(), MediaProfile::sub_stream()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profiles() {
        let store = DeviceProfileStore::default();
        let profiles = store.profiles();

        assert_eq!(profiles.len(), 2);

        assert_eq!(profiles[0].token, "Profile_1");
        assert_eq!(profiles[0].name, "MainStream");
        assert_eq!((profiles[0].width, profiles[0].height), (1920, 1080));
        assert_eq!(profiles[0].framerate, 30);
        assert_eq!(profiles[0].bitrate, 4_000_000);

        assert_eq!(profiles[1].token, "Profile_2");
        assert_eq!(profiles[1].name, "SubStream");
        assert_eq!((profiles[1].width, profiles[1].height), (640, 480));
        assert_eq!(profiles[1].framerate, 15);
        assert_eq!(profiles[1].bitrate, 1_000_000);
    }

    #[test]
    fn test_default_identity() {
        let store = DeviceProfileStore::default();
        assert_eq!(
            store.identity().uuid,
            "urn:uuid:12345678-1234-1234-1234-123456789012"
        );
        assert_eq!(store.identity().manufacturer, "Sample Manufacturer");
    }

    #[test]
    fn test_insertion_order_preserved() {
        let store = DeviceProfileStore::new(
            DeviceIdentity::default(),
            vec![MediaProfile::sub_stream(), MediaProfile::main_stream()],
        )
        .unwrap();

        let tokens: Vec<_> = store.profiles().iter().map(|p| p.token.as_str()).collect();
        assert_eq!(tokens, vec!["Profile_2", "Profile_1"]);
    }

    #[test]
    fn test_duplicate_token_rejected() {
        let err = DeviceProfileStore::new(
            DeviceIdentity::default(),
            vec![MediaProfile::main_stream(), MediaProfile::main_stream()],
        )
        .unwrap_err();
        assert!(matches!(err, OnvifError::DuplicateToken(t) if t == "Profile_1"));
    }

    #[test]
    fn test_zero_bitrate_rejected() {
        let mut profile = MediaProfile::sub_stream();
        profile.bitrate = 0;

        let err = DeviceProfileStore::new(DeviceIdentity::default(), vec![profile]).unwrap_err();
        assert!(matches!(err, OnvifError::InvalidProfile { .. }));
    }

    #[test]
    fn test_empty_profiles_rejected() {
        let err = DeviceProfileStore::new(DeviceIdentity::default(), vec![]).unwrap_err();
        assert!(matches!(err, OnvifError::NoProfiles));
    }

    #[test]
    fn test_control_character_in_identity_rejected() {
        let identity = DeviceIdentity {
            model: "Cam\u{1}".to_string(),
            ..DeviceIdentity::default()
        };
        let err = DeviceProfileStore::new(identity, vec![MediaProfile::main_stream()]).unwrap_err();
        assert!(matches!(err, OnvifError::InvalidIdentity { field: "model", .. }));
    }

    #[test]
    fn test_control_character_in_profile_rejected() {
        let mut profile = MediaProfile::main_stream();
        profile.name = "Main\u{FFFE}".to_string();
        let err = DeviceProfileStore::new(DeviceIdentity::default(), vec![profile]).unwrap_err();
        assert!(matches!(err, OnvifError::InvalidProfile { .. }));
    }

    #[test]
    fn test_markup_and_whitespace_allowed() {
        let identity = DeviceIdentity {
            manufacturer: "Smith & Sons <Optics>\tLtd\n".to_string(),
            name: "Caméra 🎥".to_string(),
            ..DeviceIdentity::default()
        };
        assert!(DeviceProfileStore::new(identity, vec![MediaProfile::sub_stream()]).is_ok());
    }

    #[test]
    fn test_profile_lookup() {
        let store = DeviceProfileStore::default();
        assert_eq!(store.profile("Profile_2").map(|p| p.height), Some(480));
        assert!(store.profile("Profile_9").is_none());
    }
}
