//! Membership resolution across an arbitrary number of watched groups.
//!
//! The provider only answers for a bounded number of candidate groups per
//! call, so the watched set is split into chunks that are checked
//! concurrently. Resolution is all-or-nothing: if any chunk fails the caller
//! gets an error and no partial membership.

use crate::client::MembershipCheck;
use crate::error::ResolutionError;
use crate::types::{AccessToken, MAX_GROUPS_PER_CHECK, MembershipResult};
use futures::future::try_join_all;
use groupgate_core::GroupId;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Resolves which watched groups a user belongs to.
#[derive(Clone)]
pub struct MembershipResolver {
    check: Arc<dyn MembershipCheck>,
    timeout: Option<Duration>,
}

impl MembershipResolver {
    /// Creates a resolver without an overall time limit.
    #[must_use]
    pub fn new(check: Arc<dyn MembershipCheck>) -> Self {
        Self {
            check,
            timeout: None,
        }
    }

    /// Bounds the total time a resolution may take.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the subset of `watched` the token's user is a member of.
    ///
    /// An empty watched set resolves to an empty result without contacting
    /// the provider.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError::CheckFailed` if any chunk's check fails and
    /// `ResolutionError::TimedOut` if the configured limit elapses.
    #[instrument(skip_all, fields(watched = watched.len()))]
    pub async fn resolve(
        &self,
        token: &AccessToken,
        watched: &BTreeSet<GroupId>,
    ) -> groupgate_core::Result<MembershipResult, ResolutionError> {
        if watched.is_empty() {
            debug!("no watched groups, skipping membership check");
            return Ok(MembershipResult::empty());
        }

        let group_ids: Vec<GroupId> = watched.iter().copied().collect();
        let chunks = group_ids.len().div_ceil(MAX_GROUPS_PER_CHECK);

        let checks = group_ids
            .chunks(MAX_GROUPS_PER_CHECK)
            .enumerate()
            .map(|(index, chunk)| {
                let check = Arc::clone(&self.check);
                async move {
                    check
                        .check_member_groups(token, chunk)
                        .await
                        .map_err(|report| {
                            let details = report.current_context().to_string();
                            warn!(chunk = index + 1, chunks, %details, "membership check failed");
                            ResolutionError::CheckFailed {
                                chunk: index + 1,
                                chunks,
                                details,
                            }
                        })
                }
            });
        let all_checks = try_join_all(checks);

        let responses = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, all_checks).await.map_err(|_| {
                warn!(timeout_ms = limit.as_millis(), "membership resolution timed out");
                ResolutionError::TimedOut {
                    after_ms: limit.as_millis(),
                }
            })??,
            None => all_checks.await?,
        };

        let result: MembershipResult = responses.into_iter().flatten().collect();
        debug!(
            chunks,
            members = result.group_ids().len(),
            "membership resolved"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for MembershipResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipResolver")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MembershipCheckError;
    use async_trait::async_trait;
    use rootcause::prelude::Report;
    use std::sync::Mutex;

    /// In-memory membership check that records every call it receives.
    #[derive(Default)]
    struct FakeMembershipCheck {
        members: BTreeSet<GroupId>,
        fail_when_asked_about: Option<GroupId>,
        delay: Option<Duration>,
        calls: Mutex<Vec<Vec<GroupId>>>,
    }

    impl FakeMembershipCheck {
        fn with_members(members: impl IntoIterator<Item = GroupId>) -> Self {
            Self {
                members: members.into_iter().collect(),
                ..Self::default()
            }
        }

        fn call_sizes(&self) -> Vec<usize> {
            let mut sizes: Vec<usize> = self.calls.lock().unwrap().iter().map(Vec::len).collect();
            sizes.sort_unstable();
            sizes
        }
    }

    #[async_trait]
    impl MembershipCheck for FakeMembershipCheck {
        async fn check_member_groups(
            &self,
            _token: &AccessToken,
            group_ids: &[GroupId],
        ) -> Result<BTreeSet<GroupId>, Report<MembershipCheckError>> {
            self.calls.lock().unwrap().push(group_ids.to_vec());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(poison) = self.fail_when_asked_about
                && group_ids.contains(&poison)
            {
                return Err(MembershipCheckError::UnexpectedStatus {
                    status: 503,
                    body: "service unavailable".to_string(),
                }
                .into());
            }

            Ok(group_ids
                .iter()
                .filter(|id| self.members.contains(*id))
                .copied()
                .collect())
        }
    }

    fn group(i: usize) -> GroupId {
        format!("00000000-0000-4000-8000-{i:012x}").parse().unwrap()
    }

    fn groups(range: std::ops::Range<usize>) -> BTreeSet<GroupId> {
        range.map(group).collect()
    }

    fn token() -> AccessToken {
        AccessToken::new("token".to_string())
    }

    #[tokio::test]
    async fn empty_watched_set_makes_no_calls() {
        let check = Arc::new(FakeMembershipCheck::with_members(groups(0..3)));
        let resolver = MembershipResolver::new(check.clone());

        let result = resolver.resolve(&token(), &BTreeSet::new()).await.unwrap();

        assert!(result.group_ids().is_empty());
        assert!(check.call_sizes().is_empty());
    }

    #[tokio::test]
    async fn twenty_five_groups_split_into_twenty_and_five() {
        let watched = groups(0..25);
        let members: BTreeSet<GroupId> = [group(3), group(21), group(24)].into();
        let check = Arc::new(FakeMembershipCheck::with_members(
            members.iter().copied().chain([group(100)]),
        ));
        let resolver = MembershipResolver::new(check.clone());

        let result = resolver.resolve(&token(), &watched).await.unwrap();

        assert_eq!(check.call_sizes(), vec![5, 20]);
        assert_eq!(result.group_ids(), &members);
    }

    #[tokio::test]
    async fn every_watched_group_is_asked_about_exactly_once() {
        let watched = groups(0..41);
        let check = Arc::new(FakeMembershipCheck::default());
        let resolver = MembershipResolver::new(check.clone());

        resolver.resolve(&token(), &watched).await.unwrap();

        let calls = check.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|chunk| chunk.len() <= MAX_GROUPS_PER_CHECK));
        let asked: Vec<GroupId> = calls.into_iter().flatten().collect();
        assert_eq!(asked.len(), watched.len());
        assert_eq!(asked.into_iter().collect::<BTreeSet<_>>(), watched);
    }

    #[tokio::test]
    async fn exactly_twenty_groups_is_a_single_call() {
        let check = Arc::new(FakeMembershipCheck::default());
        let resolver = MembershipResolver::new(check.clone());

        resolver.resolve(&token(), &groups(0..20)).await.unwrap();

        assert_eq!(check.call_sizes(), vec![20]);
    }

    #[tokio::test]
    async fn chunked_result_matches_a_single_unbounded_check() {
        let watched = groups(0..40);
        let members: BTreeSet<GroupId> = [group(0), group(19), group(20), group(39)].into();
        let check = Arc::new(FakeMembershipCheck::with_members(members.iter().copied()));
        let resolver = MembershipResolver::new(check.clone());

        let result = resolver.resolve(&token(), &watched).await.unwrap();

        let unbounded: BTreeSet<GroupId> = watched.intersection(&members).copied().collect();
        assert_eq!(check.call_sizes(), vec![20, 20]);
        assert_eq!(result.into_group_ids(), unbounded);
    }

    #[tokio::test]
    async fn failure_in_any_chunk_fails_the_whole_resolution() {
        let watched = groups(0..25);
        let check = Arc::new(FakeMembershipCheck {
            members: groups(0..25),
            fail_when_asked_about: Some(group(22)),
            ..FakeMembershipCheck::default()
        });
        let resolver = MembershipResolver::new(check);

        let err = resolver.resolve(&token(), &watched).await.unwrap_err();

        match err.current_context() {
            ResolutionError::CheckFailed {
                chunk,
                chunks,
                details,
            } => {
                assert_eq!(*chunk, 2);
                assert_eq!(*chunks, 2);
                assert!(details.contains("503"));
            }
            other => panic!("expected CheckFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let check = Arc::new(FakeMembershipCheck {
            delay: Some(Duration::from_secs(5)),
            ..FakeMembershipCheck::default()
        });
        let resolver = MembershipResolver::new(check).with_timeout(Duration::from_millis(20));

        let err = resolver.resolve(&token(), &groups(0..3)).await.unwrap_err();

        assert_eq!(
            err.current_context(),
            &ResolutionError::TimedOut { after_ms: 20 }
        );
    }

    #[tokio::test]
    async fn resolution_within_the_limit_succeeds() {
        let check = Arc::new(FakeMembershipCheck {
            members: [group(1)].into(),
            delay: Some(Duration::from_millis(5)),
            ..FakeMembershipCheck::default()
        });
        let resolver = MembershipResolver::new(check).with_timeout(Duration::from_secs(5));

        let result = resolver.resolve(&token(), &groups(0..3)).await.unwrap();

        assert_eq!(result.into_group_ids(), BTreeSet::from([group(1)]));
    }
}
