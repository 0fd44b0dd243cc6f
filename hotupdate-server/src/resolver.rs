//! # Progressive Update Resolver
//!
//! Decides, for a client reporting its current version, whether an update is
//! available and which single version it should install next. Clients move one
//! published version per check so that intermediate releases are never
//! skipped; `has_more` tells them to check again after applying the hop.
//!
//! "Latest" is the last entry of the version list (publication order), not the
//! numerically highest one. A force flag on that entry makes an update
//! mandatory even when the client reports an equal or newer version.

use std::fmt;

use serde::Serialize;

use crate::registry::PACKAGE_FILE_NAME;
use crate::types::{Version, VersionList};
use crate::version::is_newer;

/// Why no update is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoUpdateReason {
    NoVersions,
    AlreadyCurrent,
    NoUpdatePath,
}

impl NoUpdateReason {
    pub fn message(self) -> &'static str {
        match self {
            NoUpdateReason::NoVersions => "No versions published",
            NoUpdateReason::AlreadyCurrent => "Already on the latest version",
            NoUpdateReason::NoUpdatePath => "No applicable update path",
        }
    }
}

impl fmt::Display for NoUpdateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// The next hop a client should install.
///
/// Serializes to the body returned by the check endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateAvailable {
    #[serde(rename = "appID")]
    pub app_id: String,
    #[serde(rename = "currentVersion")]
    pub current: String,
    #[serde(rename = "latestVersion")]
    pub latest_id: String,
    #[serde(rename = "nextVersion")]
    pub next_version: String,
    #[serde(rename = "updateUrl")]
    pub download_url: String,
    #[serde(rename = "updateInfo")]
    pub update_info: Version,
    #[serde(rename = "hasMoreUpdates")]
    pub has_more: bool,
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateDecision {
    NoUpdate { reason: NoUpdateReason },
    Available(UpdateAvailable),
}

impl UpdateDecision {
    pub fn has_update(&self) -> bool {
        matches!(self, UpdateDecision::Available(_))
    }
}

/// Download location of a version's package.
pub fn download_url(app_id: &str, version_id: &str) -> String {
    format!("/api/apps/{app_id}/download/{version_id}/{PACKAGE_FILE_NAME}")
}

/// Computes the update decision for `current` against an app's version list.
pub fn resolve(app_id: &str, current: &str, versions: &VersionList) -> UpdateDecision {
    let Some(latest) = versions.latest() else {
        return UpdateDecision::NoUpdate {
            reason: NoUpdateReason::NoVersions,
        };
    };

    let needs_update = is_newer(&latest.id, current) || latest.force;
    if !needs_update {
        return UpdateDecision::NoUpdate {
            reason: NoUpdateReason::AlreadyCurrent,
        };
    }

    let next = next_hop(current, &versions.versions)
        .or_else(|| latest.force.then_some(latest));

    let Some(next) = next else {
        return UpdateDecision::NoUpdate {
            reason: NoUpdateReason::NoUpdatePath,
        };
    };

    UpdateDecision::Available(UpdateAvailable {
        app_id: app_id.to_string(),
        current: current.to_string(),
        latest_id: latest.id.clone(),
        next_version: next.id.clone(),
        download_url: download_url(app_id, &next.id),
        update_info: next.clone(),
        has_more: is_newer(&latest.id, &next.id),
    })
}

/// The version that follows `current` in publication order.
///
/// A known version (first exact match) is followed by its successor; an
/// unknown one by the first published version that is newer than it.
fn next_hop<'a>(current: &str, versions: &'a [Version]) -> Option<&'a Version> {
    match versions.iter().position(|v| v.id == current) {
        Some(index) => versions.get(index + 1),
        None => versions
            .iter()
            .find(|v| is_newer(&v.id, current)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Registry, StorageLayout};
    use crate::types::now;

    fn version(id: &str, force: bool) -> Version {
        Version {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            file_path: StorageLayout::relative_package_path(id),
            file_size: 10,
            created_at: now(),
            force,
        }
    }

    fn list(entries: &[(&str, bool)]) -> VersionList {
        let mut versions = VersionList::default();
        for (id, force) in entries {
            versions.append(version(id, *force));
        }
        versions
    }

    fn available(decision: UpdateDecision) -> UpdateAvailable {
        match decision {
            UpdateDecision::Available(update) => update,
            other => panic!("expected an update, got {other:?}"),
        }
    }

    fn reason(decision: UpdateDecision) -> NoUpdateReason {
        match decision {
            UpdateDecision::NoUpdate { reason } => reason,
            other => panic!("expected no update, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_list_never_updates() {
        let versions = VersionList::default();
        for current in ["", "0.0.1", "1.0.0", "99"] {
            assert_eq!(
                reason(resolve("app", current, &versions)),
                NoUpdateReason::NoVersions
            );
        }
    }

    #[test]
    fn test_progressive_hop_from_oldest() {
        let versions = list(&[("1.0.0", false), ("1.1.0", false), ("1.2.0", false)]);
        let update = available(resolve("game", "1.0.0", &versions));

        assert_eq!(update.next_version, "1.1.0");
        assert_eq!(update.latest_id, "1.2.0");
        assert!(update.has_more);
        assert_eq!(update.current, "1.0.0");
        assert_eq!(update.download_url, "/api/apps/game/download/1.1.0/update.zip");
        assert_eq!(update.update_info.id, "1.1.0");
    }

    #[test]
    fn test_last_hop_has_no_more() {
        let versions = list(&[("1.0.0", false), ("1.1.0", false), ("1.2.0", false)]);
        let update = available(resolve("game", "1.1.0", &versions));

        assert_eq!(update.next_version, "1.2.0");
        assert!(!update.has_more);
    }

    #[test]
    fn test_current_version_gets_no_update() {
        let versions = list(&[("1.0.0", false), ("1.1.0", false), ("1.2.0", false)]);
        assert_eq!(
            reason(resolve("game", "1.2.0", &versions)),
            NoUpdateReason::AlreadyCurrent
        );
        assert_eq!(
            reason(resolve("game", "1.3.0", &versions)),
            NoUpdateReason::AlreadyCurrent
        );
    }

    #[test]
    fn test_unknown_version_jumps_to_first_newer() {
        let versions = list(&[("1.0.0", false), ("1.1.0", true)]);
        let update = available(resolve("game", "0.9.0", &versions));

        assert_eq!(update.next_version, "1.0.0");
        assert!(update.has_more);

        let versions = list(&[("1.0.0", false), ("1.1.0", false), ("1.2.0", false)]);
        let update = available(resolve("game", "1.0.5", &versions));
        assert_eq!(update.next_version, "1.1.0");
    }

    #[test]
    fn test_forced_latest_reinstalls_when_no_path() {
        let versions = list(&[("1.0.0", false), ("1.1.0", true)]);

        // Client already on the forced latest: it gets the latest again.
        let update = available(resolve("game", "1.1.0", &versions));
        assert_eq!(update.next_version, "1.1.0");
        assert!(!update.has_more);

        // Client ahead of every published version.
        let update = available(resolve("game", "2.0.0", &versions));
        assert_eq!(update.next_version, "1.1.0");
    }

    #[test]
    fn test_forced_latest_still_progressive() {
        let versions = list(&[("1.0.0", false), ("1.1.0", false), ("1.2.0", true)]);
        let update = available(resolve("game", "1.0.0", &versions));

        assert_eq!(update.next_version, "1.1.0");
        assert!(update.has_more);
    }

    #[test]
    fn test_latest_is_publication_order_not_numeric() {
        // Known quirk: 1.5.0 was published after 2.0.0, so it counts as latest
        // and a client on 1.6.0 is told it is current.
        let versions = list(&[("1.0.0", false), ("2.0.0", false), ("1.5.0", false)]);
        assert_eq!(
            reason(resolve("game", "1.6.0", &versions)),
            NoUpdateReason::AlreadyCurrent
        );

        // A client on 1.0.0 hops to the next published entry even though it is
        // numerically beyond latest, and has_more is false.
        let update = available(resolve("game", "1.0.0", &versions));
        assert_eq!(update.next_version, "2.0.0");
        assert_eq!(update.latest_id, "1.5.0");
        assert!(!update.has_more);
    }

    #[test]
    fn test_duplicate_ids_match_first_occurrence() {
        let versions = list(&[
            ("1.0.0", false),
            ("1.1.0", false),
            ("1.0.0", false),
            ("1.2.0", false),
        ]);
        let update = available(resolve("game", "1.0.0", &versions));
        assert_eq!(update.next_version, "1.1.0");
    }

    #[test]
    fn test_equal_but_differently_spelled_latest_is_current() {
        let versions = list(&[("1.0.0", false), ("1.0", false)]);
        assert_eq!(
            reason(resolve("game", "1.0.0", &versions)),
            NoUpdateReason::AlreadyCurrent
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let versions = list(&[("1.0.0", false), ("1.1.0", false), ("1.2.0", true)]);
        for current in ["0.1", "1.0.0", "1.1.0", "1.2.0", "3"] {
            assert_eq!(
                resolve("game", current, &versions),
                resolve("game", current, &versions)
            );
        }
    }

    #[test]
    fn test_available_serializes_to_check_response_fields() {
        let versions = list(&[("1.0.0", false), ("1.1.0", false)]);
        let update = available(resolve("game", "1.0.0", &versions));
        let value = serde_json::to_value(&update).unwrap();

        assert_eq!(value["appID"], "game");
        assert_eq!(value["currentVersion"], "1.0.0");
        assert_eq!(value["latestVersion"], "1.1.0");
        assert_eq!(value["nextVersion"], "1.1.0");
        assert_eq!(value["updateUrl"], "/api/apps/game/download/1.1.0/update.zip");
        assert_eq!(value["updateInfo"]["id"], "1.1.0");
        assert_eq!(value["hasMoreUpdates"], false);
    }
}
