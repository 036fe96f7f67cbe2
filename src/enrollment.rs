//! Enrollment permissions and the enrollment authorization decision.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::descriptor::{AccessControlEntry, AceKind};
use crate::sid::Sid;

/// The `Certificate-Enrollment` extended right (`rightsGuid`
/// `0e10c968-78fb-11d2-90d4-00c04f79dc55`).
pub const ENROLL_EXTENDED_RIGHT: Uuid = Uuid::from_u128(0x0e10c968_78fb_11d2_90d4_00c04f79dc55);

/// A caller's security context: a user and the groups it's a member of.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// The primary principal.
    pub user: Sid,

    /// Group memberships, if known. `None` is treated like an empty list.
    pub groups: Option<Vec<Sid>>,
}

impl Identity {
    /// An identity whose group memberships are unavailable.
    pub fn new(user: Sid) -> Self {
        Self { user, groups: None }
    }

    /// An identity with the given group memberships.
    pub fn with_groups(user: Sid, groups: impl IntoIterator<Item = Sid>) -> Self {
        Self {
            user,
            groups: Some(groups.into_iter().collect()),
        }
    }
}

/// The principals a template's DACL allows and denies the enrollment right.
///
/// A principal may be in both sets; the deny wins at authorization time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EnrollmentPermissions {
    allowed: BTreeSet<Sid>,
    denied: BTreeSet<Sid>,
}

impl EnrollmentPermissions {
    /// Collects the principals of every entry scoped to
    /// [`ENROLL_EXTENDED_RIGHT`]. Entries for any other right are ignored.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a AccessControlEntry>) -> Self {
        let mut permissions = Self::default();

        for entry in entries
            .into_iter()
            .filter(|e| e.object_type == ENROLL_EXTENDED_RIGHT)
        {
            let set = match entry.kind {
                AceKind::Allow => &mut permissions.allowed,
                AceKind::Deny => &mut permissions.denied,
            };
            set.insert(entry.principal.clone());
        }

        permissions
    }

    /// Principals with an allow entry for enrollment.
    pub fn allowed(&self) -> &BTreeSet<Sid> {
        &self.allowed
    }

    /// Principals with a deny entry for enrollment.
    pub fn denied(&self) -> &BTreeSet<Sid> {
        &self.denied
    }

    /// Whether `identity` may enroll. See [`authorize`].
    pub fn authorize(&self, identity: &Identity, explicit_only: bool) -> bool {
        authorize(identity, &self.allowed, &self.denied, explicit_only)
    }
}

/// Decides whether `identity` may enroll given the allowed and denied
/// principal sets.
///
/// The user and (unless `explicit_only` is set) every group are checked
/// against both sets. The identity is authorized if any of them is allowed
/// and none of them is denied: a deny through any membership overrides an
/// allow through any other.
pub fn authorize(
    identity: &Identity,
    allowed: &BTreeSet<Sid>,
    denied: &BTreeSet<Sid>,
    explicit_only: bool,
) -> bool {
    let mut is_allowed = false;
    let mut is_denied = false;

    if !explicit_only {
        for group in identity.groups.iter().flatten() {
            is_allowed |= allowed.contains(group);
            is_denied |= denied.contains(group);
        }
    }

    is_allowed |= allowed.contains(&identity.user);
    is_denied |= denied.contains(&identity.user);

    is_allowed && !is_denied
}
