use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use waypost_common::{PrincipalId, Result};
use waypost_roster::RosterStore;

// ── Types ────────────────────────────────────────────────────────────────────

/// Classification of an inbound principal, in policy priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The single configured owner. All privileged actions available.
    Admin,
    /// On the roster. Non-privileged actions available.
    Member,
    /// Neither; may only attempt onboarding.
    Unknown,
}

/// Policy layer deciding who may do what.
///
/// Owns no transport concerns: it classifies ids, runs the shared-secret
/// onboarding check, and tracks the two-step self-revocation flow. Every
/// rejection it produces must render as the one uniform denial message.
pub struct AccessGate {
    owner_id: PrincipalId,
    access_code: String,
    roster: Arc<RosterStore>,
    /// Principals that asked to revoke and still owe a confirmation.
    pending_revocations: Mutex<HashSet<PrincipalId>>,
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Constant-time string comparison (prevents timing probes on the code).
fn safe_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

// ── Gate logic ───────────────────────────────────────────────────────────────

impl AccessGate {
    pub fn new(
        owner_id: PrincipalId,
        access_code: impl Into<String>,
        roster: Arc<RosterStore>,
    ) -> Self {
        Self {
            owner_id,
            access_code: access_code.into(),
            roster,
            pending_revocations: Mutex::new(HashSet::new()),
        }
    }

    /// Owner wins over roster membership.
    pub fn classify(&self, id: PrincipalId) -> Role {
        if id == self.owner_id {
            Role::Admin
        } else if self.roster.contains(id) {
            Role::Member
        } else {
            Role::Unknown
        }
    }

    /// Shared-secret onboarding. `Ok(true)` means the principal is now a
    /// member; `Ok(false)` is a denial (wrong code). No retry delay or
    /// lockout is applied on mismatch.
    pub fn try_onboard(&self, id: PrincipalId, code: &str) -> Result<bool> {
        if !safe_equal(code, &self.access_code) {
            return Ok(false);
        }
        self.roster.add(id, None)?;
        Ok(true)
    }

    /// First step of self-revocation: remember that `id` asked.
    pub fn request_revocation(&self, id: PrincipalId) {
        self.pending_revocations.lock().unwrap().insert(id);
    }

    /// Second step: only a principal with a pending request is removed.
    /// `Ok(false)` means nothing was pending and nothing changed.
    pub fn confirm_revocation(&self, id: PrincipalId) -> Result<bool> {
        if !self.pending_revocations.lock().unwrap().remove(&id) {
            return Ok(false);
        }
        self.roster.remove(id)?;
        Ok(true)
    }

    pub fn member_count(&self) -> usize {
        self.roster.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(dir: &tempfile::TempDir) -> AccessGate {
        let roster = Arc::new(RosterStore::open(dir.path().join("users.db")).unwrap());
        AccessGate::new(1, "sesame", roster)
    }

    #[test]
    fn classification_priority() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(&dir);

        assert_eq!(gate.classify(1), Role::Admin);
        assert_eq!(gate.classify(2), Role::Unknown);

        gate.try_onboard(2, "sesame").unwrap();
        assert_eq!(gate.classify(2), Role::Member);
        // Owner stays admin even if someone adds the id to the roster.
        gate.roster.add(1, None).unwrap();
        assert_eq!(gate.classify(1), Role::Admin);
    }

    #[test]
    fn wrong_code_is_denied_without_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(&dir);

        assert!(!gate.try_onboard(5, "SESAME").unwrap());
        assert!(!gate.try_onboard(5, "").unwrap());
        assert_eq!(gate.classify(5), Role::Unknown);
        assert_eq!(gate.member_count(), 0);
    }

    #[test]
    fn revocation_needs_both_steps() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(&dir);
        gate.try_onboard(7, "sesame").unwrap();

        // Confirm without a request changes nothing.
        assert!(!gate.confirm_revocation(7).unwrap());
        assert_eq!(gate.classify(7), Role::Member);

        // Request alone changes nothing.
        gate.request_revocation(7);
        assert_eq!(gate.classify(7), Role::Member);

        assert!(gate.confirm_revocation(7).unwrap());
        assert_eq!(gate.classify(7), Role::Unknown);

        // The pending flag was consumed.
        assert!(!gate.confirm_revocation(7).unwrap());
    }

    #[test]
    fn safe_equal_basics() {
        assert!(safe_equal("abc", "abc"));
        assert!(!safe_equal("abc", "abd"));
        assert!(!safe_equal("abc", "abcd"));
        assert!(safe_equal("", ""));
    }
}
