//! # Permissions
//!
//! Role-based access model: a fixed set of [`Section`]s, each with five
//! independent [`Capability`] flags.
//!
//! ## Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  User ──(exactly one)──► Role ──► PermissionSet                         │
//! │                                    │                                    │
//! │                                    ├── items:     view add edit  .   .  │
//! │                                    ├── sales:     view add  .    .   .  │
//! │                                    ├── audit:     view  .   .    .  extra│
//! │                                    └── (missing): .    .    .    .   .  │
//! │                                                                         │
//! │  has(section, cap) → stored flag, or false when nothing is stored       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Storage
//! Serialized as a JSON object keyed by section name:
//! `{"items": {"view": true, "add": true, "edit": false, ...}, ...}`.
//! Unknown section keys are dropped on load so a role row written by a
//! newer build still loads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

// =============================================================================
// Section
// =============================================================================

/// A permission section. Each maps to one area of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Dashboard,
    Items,
    Warehouses,
    Transactions,
    Partners,
    PriceList,
    Sales,
    Purchases,
    Returns,
    Audit,
    Profit,
    Reports,
    Activity,
    Users,
    Roles,
    Settings,
    Backup,
}

impl Section {
    /// Every section, in menu order.
    pub const ALL: [Section; 17] = [
        Section::Dashboard,
        Section::Items,
        Section::Warehouses,
        Section::Transactions,
        Section::Partners,
        Section::PriceList,
        Section::Sales,
        Section::Purchases,
        Section::Returns,
        Section::Audit,
        Section::Profit,
        Section::Reports,
        Section::Activity,
        Section::Users,
        Section::Roles,
        Section::Settings,
        Section::Backup,
    ];

    /// Stable storage name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Section::Dashboard => "dashboard",
            Section::Items => "items",
            Section::Warehouses => "warehouses",
            Section::Transactions => "transactions",
            Section::Partners => "partners",
            Section::PriceList => "price_list",
            Section::Sales => "sales",
            Section::Purchases => "purchases",
            Section::Returns => "returns",
            Section::Audit => "audit",
            Section::Profit => "profit",
            Section::Reports => "reports",
            Section::Activity => "activity",
            Section::Users => "users",
            Section::Roles => "roles",
            Section::Settings => "settings",
            Section::Backup => "backup",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .iter()
            .copied()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "section".to_string(),
                allowed: Section::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Capability
// =============================================================================

/// One of the five per-section flags.
///
/// `Extra` covers section-specific privileged actions: applying an audit,
/// restoring a backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    View,
    Add,
    Edit,
    Delete,
    Extra,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::View,
        Capability::Add,
        Capability::Edit,
        Capability::Delete,
        Capability::Extra,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Capability::View => "view",
            Capability::Add => "add",
            Capability::Edit => "edit",
            Capability::Delete => "delete",
            Capability::Extra => "extra",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Section Capabilities
// =============================================================================

/// The five flags of a single section. Missing keys deserialize as `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionCapabilities {
    pub view: bool,
    pub add: bool,
    pub edit: bool,
    pub delete: bool,
    pub extra: bool,
}

impl SectionCapabilities {
    /// Every flag set.
    pub const fn all() -> Self {
        SectionCapabilities {
            view: true,
            add: true,
            edit: true,
            delete: true,
            extra: true,
        }
    }

    /// Only `view` set.
    pub const fn view_only() -> Self {
        SectionCapabilities {
            view: true,
            add: false,
            edit: false,
            delete: false,
            extra: false,
        }
    }

    pub const fn get(&self, capability: Capability) -> bool {
        match capability {
            Capability::View => self.view,
            Capability::Add => self.add,
            Capability::Edit => self.edit,
            Capability::Delete => self.delete,
            Capability::Extra => self.extra,
        }
    }

    pub fn set(&mut self, capability: Capability, allowed: bool) {
        match capability {
            Capability::View => self.view = allowed,
            Capability::Add => self.add = allowed,
            Capability::Edit => self.edit = allowed,
            Capability::Delete => self.delete = allowed,
            Capability::Extra => self.extra = allowed,
        }
    }
}

// =============================================================================
// Permission Set
// =============================================================================

/// A role's capabilities across all sections.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, SectionCapabilities>",
    into = "BTreeMap<String, SectionCapabilities>"
)]
pub struct PermissionSet {
    sections: BTreeMap<Section, SectionCapabilities>,
}

impl PermissionSet {
    /// No capabilities anywhere.
    pub fn none() -> Self {
        PermissionSet::default()
    }

    /// Every capability in every section (the bootstrap administrator role).
    pub fn all() -> Self {
        PermissionSet {
            sections: Section::ALL
                .iter()
                .map(|s| (*s, SectionCapabilities::all()))
                .collect(),
        }
    }

    /// Authorization check.
    ///
    /// ## Example
    /// ```rust
    /// use invpro_core::permissions::{Capability, PermissionSet, Section};
    ///
    /// let mut perms = PermissionSet::none();
    /// perms.grant(Section::Items, Capability::View);
    ///
    /// assert!(perms.has(Section::Items, Capability::View));
    /// assert!(!perms.has(Section::Items, Capability::Delete));
    /// assert!(!perms.has(Section::Sales, Capability::View));
    /// ```
    pub fn has(&self, section: Section, capability: Capability) -> bool {
        self.sections
            .get(&section)
            .map(|caps| caps.get(capability))
            .unwrap_or(false)
    }

    /// Authorization check by stored section name; unknown names are denied.
    pub fn has_named(&self, section: &str, capability: Capability) -> bool {
        section
            .parse::<Section>()
            .map(|s| self.has(s, capability))
            .unwrap_or(false)
    }

    /// Flags for one section (all false when nothing is stored).
    pub fn section(&self, section: Section) -> SectionCapabilities {
        self.sections.get(&section).copied().unwrap_or_default()
    }

    pub fn set_section(&mut self, section: Section, caps: SectionCapabilities) {
        self.sections.insert(section, caps);
    }

    pub fn grant(&mut self, section: Section, capability: Capability) {
        self.sections.entry(section).or_default().set(capability, true);
    }

    pub fn revoke(&mut self, section: Section, capability: Capability) {
        if let Some(caps) = self.sections.get_mut(&section) {
            caps.set(capability, false);
        }
    }

    /// Builder-style [`PermissionSet::grant`].
    pub fn with(mut self, section: Section, capability: Capability) -> Self {
        self.grant(section, capability);
        self
    }

    /// Sections where `view` is granted, in menu order.
    pub fn visible_sections(&self) -> Vec<Section> {
        Section::ALL
            .iter()
            .copied()
            .filter(|s| self.has(*s, Capability::View))
            .collect()
    }
}

impl From<BTreeMap<String, SectionCapabilities>> for PermissionSet {
    fn from(raw: BTreeMap<String, SectionCapabilities>) -> Self {
        let sections = raw
            .into_iter()
            .filter_map(|(name, caps)| name.parse::<Section>().ok().map(|s| (s, caps)))
            .collect();
        PermissionSet { sections }
    }
}

impl From<PermissionSet> for BTreeMap<String, SectionCapabilities> {
    fn from(set: PermissionSet) -> Self {
        set.sections
            .into_iter()
            .map(|(section, caps)| (section.as_str().to_string(), caps))
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
