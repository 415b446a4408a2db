//! Microsoft Graph client for group membership checks.

use crate::error::MembershipCheckError;
use crate::types::{
    AccessToken, CheckMemberGroupsRequest, CheckMemberGroupsResponse, MAX_GROUPS_PER_CHECK,
};
use async_trait::async_trait;
use groupgate_core::GroupId;
use rootcause::prelude::Report;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default Microsoft Graph API root.
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// A provider capability answering "which of these groups is the user in?".
///
/// Implementations accept at most [`MAX_GROUPS_PER_CHECK`] ids per call.
#[async_trait]
pub trait MembershipCheck: Send + Sync {
    /// Returns the subset of `group_ids` the token's user is a member of.
    async fn check_member_groups(
        &self,
        token: &AccessToken,
        group_ids: &[GroupId],
    ) -> Result<BTreeSet<GroupId>, Report<MembershipCheckError>>;
}

/// Client for the Graph `me/checkMemberGroups` endpoint.
///
/// Calls are made with the signed-in user's delegated token.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
}

impl GraphClient {
    /// Creates a new Graph client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The Graph API root (e.g., "https://graph.microsoft.com/v1.0")
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, Report<MembershipCheckError>> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| MembershipCheckError::RequestFailed {
                details: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn check_member_groups_url(&self) -> String {
        format!("{}/me/checkMemberGroups", self.base_url)
    }
}

#[async_trait]
impl MembershipCheck for GraphClient {
    #[instrument(skip(self, token, group_ids), fields(groups = group_ids.len()))]
    async fn check_member_groups(
        &self,
        token: &AccessToken,
        group_ids: &[GroupId],
    ) -> Result<BTreeSet<GroupId>, Report<MembershipCheckError>> {
        if group_ids.len() > MAX_GROUPS_PER_CHECK {
            return Err(MembershipCheckError::TooManyGroups {
                count: group_ids.len(),
                max: MAX_GROUPS_PER_CHECK,
            }
            .into());
        }

        let request = CheckMemberGroupsRequest::new(group_ids);
        let response = self
            .http
            .post(self.check_member_groups_url())
            .bearer_auth(token.secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| MembershipCheckError::RequestFailed {
                details: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MembershipCheckError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let payload: CheckMemberGroupsResponse =
            response
                .json()
                .await
                .map_err(|e| MembershipCheckError::InvalidResponse {
                    details: e.to_string(),
                })?;

        let requested: BTreeSet<GroupId> = group_ids.iter().copied().collect();
        let mut members = BTreeSet::new();
        for raw in payload.value {
            let group_id =
                raw.parse::<GroupId>()
                    .map_err(|e| MembershipCheckError::InvalidResponse {
                        details: e.to_string(),
                    })?;
            if requested.contains(&group_id) {
                members.insert(group_id);
            } else {
                warn!(%group_id, "ignoring group that was not part of the check");
            }
        }

        debug!(members = members.len(), "membership check result");
        Ok(members)
    }
}
