//! Device classification
//!
//! Decides from the platform's model and manufacturer strings whether the
//! terminal carries the Newland print head.
//!
//! The match is a heuristic: unlisted model codes are missed, and an
//! unrelated device whose model happens to contain `NBB65` is accepted.

use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use tracing::debug;

/// Model code of the supported handheld terminal
const MODEL_SIGNATURE: &str = "NBB65";

/// Lowercase manufacturer signature
const MANUFACTURER_SIGNATURE: &str = "newland";

const DMI_PRODUCT_NAME: &str = "/sys/devices/virtual/dmi/id/product_name";
const DMI_SYS_VENDOR: &str = "/sys/devices/virtual/dmi/id/sys_vendor";

/// Hardware identity reported by the host platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    model: String,
    manufacturer: String,
}

impl DeviceIdentity {
    pub fn new(model: impl Into<String>, manufacturer: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            manufacturer: manufacturer.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    /// Whether this identity matches the printer-hardware signature
    pub fn is_supported(&self) -> bool {
        self.model.contains(MODEL_SIGNATURE)
            || self
                .manufacturer
                .to_lowercase()
                .contains(MANUFACTURER_SIGNATURE)
    }

    /// Read the identity from the running platform
    ///
    /// `DEVICE_MODEL` / `DEVICE_MANUFACTURER` override everything, then Android
    /// system properties, then Linux DMI. Missing values become empty strings.
    pub fn detect() -> Self {
        let model = std::env::var("DEVICE_MODEL")
            .ok()
            .or_else(|| getprop("ro.product.model"))
            .or_else(|| read_trimmed(DMI_PRODUCT_NAME))
            .unwrap_or_default();
        let manufacturer = std::env::var("DEVICE_MANUFACTURER")
            .ok()
            .or_else(|| getprop("ro.product.manufacturer"))
            .or_else(|| read_trimmed(DMI_SYS_VENDOR))
            .unwrap_or_default();

        debug!(model = %model, manufacturer = %manufacturer, "device identity detected");
        Self::new(model, manufacturer)
    }
}

/// Process-wide platform identity, read once
pub fn platform_identity() -> &'static DeviceIdentity {
    static IDENTITY: OnceLock<DeviceIdentity> = OnceLock::new();
    IDENTITY.get_or_init(DeviceIdentity::detect)
}

/// Whether the current hardware supports the printer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability(bool);

impl Capability {
    pub fn of(identity: &DeviceIdentity) -> Self {
        Self(identity.is_supported())
    }

    /// Capability of the running platform
    pub fn platform() -> Self {
        Self::of(platform_identity())
    }

    pub fn supported() -> Self {
        Self(true)
    }

    pub fn unsupported() -> Self {
        Self(false)
    }

    pub fn is_supported(&self) -> bool {
        self.0
    }
}

fn getprop(key: &str) -> Option<String> {
    let output = Command::new("getprop").arg(key).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!value.is_empty()).then_some(value)
}

fn read_trimmed(path: impl AsRef<Path>) -> Option<String> {
    let value = std::fs::read_to_string(path).ok()?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_signature() {
        assert!(DeviceIdentity::new("NBB65-3G", "Foo").is_supported());
        assert!(DeviceIdentity::new("X-NBB65", "").is_supported());
    }

    #[test]
    fn test_model_signature_case_sensitive() {
        assert!(!DeviceIdentity::new("nbb65", "Acme").is_supported());
    }

    #[test]
    fn test_manufacturer_case_insensitive() {
        assert!(DeviceIdentity::new("X1", "Newland Co.").is_supported());
        assert!(DeviceIdentity::new("X1", "FUJIAN NEWLAND").is_supported());
    }

    #[test]
    fn test_unsupported() {
        assert!(!DeviceIdentity::new("X1", "Acme").is_supported());
        assert!(!DeviceIdentity::new("", "").is_supported());
    }

    #[test]
    fn test_capability_of() {
        let identity = DeviceIdentity::new("NBB65-4G", "Newland");
        assert!(Capability::of(&identity).is_supported());
        assert!(!Capability::of(&DeviceIdentity::new("X1", "Acme")).is_supported());
    }

    #[test]
    fn test_read_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"  NBB65 \n").unwrap();
        assert_eq!(read_trimmed(file.path()), Some("NBB65".to_string()));
        assert_eq!(read_trimmed("/nonexistent/dmi/product_name"), None);
    }
}
