//! Session management for authenticated users.
//!
//! Sessions are created after a successful login once group membership has
//! been resolved and roles computed. They hold the user's profile and role
//! set for the session's lifetime and are discarded at logout.

use chrono::{DateTime, Duration, Utc};
use groupgate_core::GroupId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::role::RoleSet;
use crate::user::UserProfile;

/// Unique identifier for a session.
///
/// Session IDs are opaque strings generated during session creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new session ID from a string.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Returns the session ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Rules deciding when an otherwise unexpired session must re-authenticate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionPolicy {
    role_refresh_interval: Option<Duration>,
    max_idle: Option<Duration>,
}

impl SessionPolicy {
    /// Creates a policy from interval lengths in seconds; zero disables a check.
    #[must_use]
    pub fn from_seconds(role_refresh_interval: u64, max_idle: u64) -> Self {
        Self {
            role_refresh_interval: positive_duration(role_refresh_interval),
            max_idle: positive_duration(max_idle),
        }
    }

    /// Returns how old roles may get before the session is stale.
    #[must_use]
    pub fn role_refresh_interval(&self) -> Option<Duration> {
        self.role_refresh_interval
    }

    /// Returns how long a session may go without activity.
    #[must_use]
    pub fn max_idle(&self) -> Option<Duration> {
        self.max_idle
    }
}

fn positive_duration(seconds: u64) -> Option<Duration> {
    if seconds == 0 {
        return None;
    }
    i64::try_from(seconds).ok().and_then(Duration::try_seconds)
}

/// Represents an active authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier for this session.
    id: SessionId,
    /// Profile of the authenticated user.
    user: UserProfile,
    /// Roles computed from group membership at login.
    roles: RoleSet,
    /// Raw member group ids, kept only when diagnostics are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group_ids: Option<BTreeSet<GroupId>>,
    /// When group membership was resolved.
    groups_fetched_at: DateTime<Utc>,
    /// When the session was last used on a protected route.
    last_activity_at: DateTime<Utc>,
    /// When the session was created.
    created_at: DateTime<Utc>,
    /// When the session expires.
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new session for the given user.
    ///
    /// The session is valid for the given duration. A duration reaching past
    /// the latest representable time expires at that time instead.
    #[must_use]
    pub fn new(id: SessionId, user: UserProfile, roles: RoleSet, duration: Duration) -> Self {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id,
            user,
            roles,
            group_ids: None,
            groups_fetched_at: now,
            last_activity_at: now,
            created_at: now,
            expires_at,
        }
    }

    /// Records the raw member group ids on the session.
    #[must_use]
    pub fn with_group_ids(mut self, group_ids: BTreeSet<GroupId>) -> Self {
        self.group_ids = Some(group_ids);
        self
    }

    /// Returns the session ID.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the authenticated user's profile.
    #[must_use]
    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    /// Returns the user's roles.
    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    /// Returns the raw member group ids, if recorded.
    #[must_use]
    pub fn group_ids(&self) -> Option<&BTreeSet<GroupId>> {
        self.group_ids.as_ref()
    }

    /// Returns when group membership was resolved.
    #[must_use]
    pub fn groups_fetched_at(&self) -> DateTime<Utc> {
        self.groups_fetched_at
    }

    /// Returns when the session was last active.
    #[must_use]
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    /// Returns when the session was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the session expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the session has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns true if the session is still valid (not expired) as of `now`.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now)
    }

    /// Returns true if the policy requires the user to log in again.
    ///
    /// A session is stale when its roles are older than the refresh interval
    /// or it has been idle longer than the idle limit.
    #[must_use]
    pub fn is_stale(&self, policy: &SessionPolicy, now: DateTime<Utc>) -> bool {
        if let Some(interval) = policy.role_refresh_interval() {
            if now - self.groups_fetched_at >= interval {
                return true;
            }
        }

        if let Some(max_idle) = policy.max_idle() {
            if now - self.last_activity_at >= max_idle {
                return true;
            }
        }

        false
    }

    /// Records activity on the session.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupgate_core::RoleName;

    fn test_session_id() -> SessionId {
        SessionId::new("sess_test_123".to_string())
    }

    fn test_user() -> UserProfile {
        UserProfile::new(
            "sub_123".to_string(),
            "https://login.microsoftonline.com/tenant/v2.0".to_string(),
        )
    }

    fn test_roles() -> RoleSet {
        RoleSet::from_roles([RoleName::new("user").unwrap()])
    }

    fn test_session(duration: Duration) -> Session {
        Session::new(test_session_id(), test_user(), test_roles(), duration)
    }

    #[test]
    fn session_id_display() {
        let id = test_session_id();
        assert_eq!(id.to_string(), "sess_test_123");
    }

    #[test]
    fn session_id_from_str() {
        let id: SessionId = "test_session".into();
        assert_eq!(id.as_str(), "test_session");
    }

    #[test]
    fn new_session_has_correct_fields() {
        let before = Utc::now();
        let session = test_session(Duration::hours(1));
        let after = Utc::now();

        assert_eq!(session.id(), &test_session_id());
        assert_eq!(session.user(), &test_user());
        assert_eq!(session.roles(), &test_roles());
        assert!(session.group_ids().is_none());
        assert!(session.created_at() >= before);
        assert!(session.created_at() <= after);
        assert_eq!(session.groups_fetched_at(), session.created_at());
        assert_eq!(session.last_activity_at(), session.created_at());
        assert!(session.expires_at() > session.created_at());
    }

    #[test]
    fn session_expiration() {
        let now = Utc::now();
        let session = test_session(Duration::seconds(-1));
        assert!(session.is_expired(now));
        assert!(!session.is_valid(now));

        let session = test_session(Duration::hours(1));
        assert!(!session.is_expired(now));
        assert!(session.is_valid(now));
    }

    #[test]
    fn expiry_is_judged_at_the_given_instant() {
        let session = test_session(Duration::hours(1));
        let expires_at = session.expires_at();

        assert!(!session.is_expired(expires_at - Duration::seconds(1)));
        assert!(session.is_expired(expires_at));
    }

    #[test]
    fn oversized_duration_saturates_instead_of_overflowing() {
        let session = test_session(Duration::MAX);
        assert_eq!(session.expires_at(), DateTime::<Utc>::MAX_UTC);
        assert!(session.is_valid(Utc::now()));
    }

    #[test]
    fn disabled_policy_never_stale() {
        let session = test_session(Duration::hours(1));
        let policy = SessionPolicy::from_seconds(0, 0);
        assert!(!session.is_stale(&policy, Utc::now() + Duration::days(365)));
    }

    #[test]
    fn stale_after_role_refresh_interval() {
        let session = test_session(Duration::hours(8));
        let policy = SessionPolicy::from_seconds(600, 0);
        let fetched = session.groups_fetched_at();

        assert!(!session.is_stale(&policy, fetched + Duration::seconds(599)));
        assert!(session.is_stale(&policy, fetched + Duration::seconds(600)));
    }

    #[test]
    fn stale_after_idle_limit_and_touch_resets() {
        let mut session = test_session(Duration::hours(8));
        let policy = SessionPolicy::from_seconds(0, 60);
        let start = session.last_activity_at();

        assert!(session.is_stale(&policy, start + Duration::seconds(61)));

        session.touch(start + Duration::seconds(30));
        assert!(!session.is_stale(&policy, start + Duration::seconds(61)));
        assert_eq!(session.last_activity_at(), start + Duration::seconds(30));
    }

    #[test]
    fn session_serialization_roundtrip() {
        let group: GroupId = "11111111-1111-4111-8111-111111111111".parse().unwrap();
        let session = test_session(Duration::hours(1)).with_group_ids(BTreeSet::from([group]));

        let json = serde_json::to_string(&session).expect("serialize");
        let parsed: Session = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(session, parsed);
        assert_eq!(parsed.group_ids().map(BTreeSet::len), Some(1));
    }

    #[test]
    fn group_ids_omitted_when_not_recorded() {
        let session = test_session(Duration::hours(1));
        let json = serde_json::to_value(&session).expect("serialize");
        assert!(json.get("group_ids").is_none());
    }
}
