use serde::{Deserialize, Serialize};
use std::fmt;

/// Strongly typed device identifier (ADB serial)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Device state as reported by `host:devices-l`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Device,
    Offline,
    Unauthorized,
    Unknown,
}

impl DeviceState {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "device" => DeviceState::Device,
            "offline" => DeviceState::Offline,
            "unauthorized" => DeviceState::Unauthorized,
            _ => DeviceState::Unknown,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeviceState::Device => "device",
            DeviceState::Offline => "offline",
            DeviceState::Unauthorized => "unauthorized",
            DeviceState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the server's device list. A snapshot: enumeration
/// returns a value, nothing here tracks later state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub state: DeviceState,
    pub product: Option<String>,
    pub model: Option<String>,
    pub device: Option<String>,
    pub transport_id: Option<u32>,
}

impl Device {
    pub fn new(id: impl Into<DeviceId>) -> Self {
        Self {
            id: id.into(),
            state: DeviceState::Unknown,
            product: None,
            model: None,
            device: None,
            transport_id: None,
        }
    }

    pub fn with_state(mut self, state: DeviceState) -> Self {
        self.state = state;
        self
    }

    /// Check if device is available for commands
    pub fn is_available(&self) -> bool {
        self.state == DeviceState::Device
    }

    pub fn display_name(&self) -> String {
        if let Some(model) = &self.model {
            format!("{} ({})", model, self.id)
        } else {
            self.id.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_state_parsing() {
        assert_eq!(DeviceState::parse("device"), DeviceState::Device);
        assert_eq!(DeviceState::parse("OFFLINE"), DeviceState::Offline);
        assert_eq!(DeviceState::parse("unauthorized"), DeviceState::Unauthorized);
        assert_eq!(DeviceState::parse("recovery"), DeviceState::Unknown);
    }

    #[test]
    fn display_name_prefers_model() {
        let plain = Device::new("emulator-5554");
        assert_eq!(plain.display_name(), "emulator-5554");

        let mut with_model = Device::new("abc123");
        with_model.model = Some("Pixel_8".to_string());
        assert_eq!(with_model.display_name(), "Pixel_8 (abc123)");
    }
}
