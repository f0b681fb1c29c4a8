//! Policy value objects.
//!
//! The original deployment drove authentication, mediation and deletion
//! behaviour through loose boolean switches scattered across a settings
//! dictionary. Here they are grouped into explicit value objects that get
//! injected into the components that act on them, so control flow reads off
//! a single struct instead of a pile of conditionals.

use serde::Deserialize;

/// How an On-Behalf-Of target identity is validated during mediation.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OboValidation {
    /// Accept any opaque string as a delegation target.
    AnyTarget,
    /// Only accept targets listed in the configured directory of known
    /// identities.
    #[default]
    KnownTargets,
}

/// Authentication and mediation switches, injected into the authenticator.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityPolicy {
    /// Whether the authentication subsystem is active. When `false`,
    /// requests pass through without credential checks, acting as the
    /// identity they claim; operations that require a verified identity
    /// (such as known-target mediation) fail with a "disabled" error.
    pub authenticate: bool,
    /// Whether On-Behalf-Of deposit is permitted at all.
    pub mediation: bool,
    /// Validation applied to the On-Behalf-Of target when mediation is used.
    #[serde(default)]
    pub obo_validation: OboValidation,
}
impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            authenticate: true,
            mediation: true,
            obo_validation: OboValidation::default(),
        }
    }
}

/// What happens to an item's stored content when it is deleted.
///
/// Deletion is always a soft state transition; the identifier is never
/// reused. This policy only decides whether the payload bytes stick around
/// for audit or are removed from disk.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurgePolicy {
    /// Keep all content versions on disk after deletion.
    #[default]
    Retain,
    /// Remove payload files, keeping only the item record.
    Purge,
}
