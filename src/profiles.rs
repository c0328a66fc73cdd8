//! Built-in hardware profiles.
//!
//! A profile fully specifies the model lineup for a hardware tier so users
//! pick one name instead of four model identifiers. The table is static and
//! immutable; `get` hands out owned copies, never references into the table.

use serde::Serialize;

/// One hardware tier: which models fit and where the vision model runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HardwareProfile {
    pub name: &'static str,
    /// Whisper model size (tiny, base, small, medium, large-v3).
    pub whisper_model: &'static str,
    /// Vision model identifier on the inference endpoint.
    pub vision_model: &'static str,
    /// Text model identifier on the inference endpoint.
    pub text_model: &'static str,
    /// Pin the vision model to CPU (low-VRAM machines).
    pub vision_on_cpu: bool,
    pub description: &'static str,
}

/// The built-in profile table.
///
/// Tiers are calibrated against real machines: `laptop` is the minimum that
/// still produces usable captions, `workstation` assumes the full lineup
/// fits in VRAM.
const PROFILES: &[HardwareProfile] = &[
    HardwareProfile {
        name: "laptop",
        whisper_model: "small",
        vision_model: "llava:7b",
        text_model: "phi3:mini",
        vision_on_cpu: true,
        description: "GTX 1050 Ti (4GB VRAM), 48GB RAM",
    },
    HardwareProfile {
        name: "workstation",
        whisper_model: "large-v3",
        vision_model: "llava:34b",
        text_model: "llama3.1:70b",
        vision_on_cpu: false,
        description: "RTX 4090 (24GB VRAM), 96GB RAM",
    },
];

/// Look up a profile by name. Returns an owned copy.
pub fn get(name: &str) -> Result<HardwareProfile, crate::config::ConfigError> {
    PROFILES
        .iter()
        .find(|p| p.name == name)
        .cloned()
        .ok_or_else(|| crate::config::ConfigError::UnknownProfile {
            name: name.to_string(),
            available: list().join(", "),
        })
}

/// Names of all built-in profiles, table order.
pub fn list() -> Vec<&'static str> {
    PROFILES.iter().map(|p| p.name).collect()
}

/// Human-readable description for a profile name.
pub fn describe(name: &str) -> String {
    match PROFILES.iter().find(|p| p.name == name) {
        Some(p) => p.description.to_string(),
        None => format!("Unknown profile: {name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_builtin_profiles_exist() {
        assert!(list().len() >= 2);
        assert!(list().contains(&"laptop"));
        assert!(list().contains(&"workstation"));
    }

    #[test]
    fn laptop_is_the_low_resource_tier() {
        let p = get("laptop").unwrap();
        assert_eq!(p.whisper_model, "small");
        assert!(p.vision_on_cpu);
        assert!(!p.description.is_empty());
    }

    #[test]
    fn workstation_is_the_high_resource_tier() {
        let p = get("workstation").unwrap();
        assert_eq!(p.whisper_model, "large-v3");
        assert!(!p.vision_on_cpu);
        assert_eq!(p.text_model, "llama3.1:70b");
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let err = get("mainframe").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("mainframe"));
        assert!(msg.contains("laptop"));
    }

    #[test]
    fn get_returns_an_independent_copy() {
        let a = get("laptop").unwrap();
        let b = get("laptop").unwrap();
        assert_eq!(a, b);
        // Two lookups are distinct values; mutating one cannot reach the table.
        drop(a);
        assert_eq!(get("laptop").unwrap(), b);
    }

    #[test]
    fn describe_known_and_unknown() {
        assert!(describe("workstation").contains("RTX 4090"));
        assert!(describe("toaster").contains("Unknown profile"));
    }
}
