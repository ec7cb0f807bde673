//! C7 — eligibility filter: an ordered, short-circuiting predicate walk over
//! the folder tree (spec §4.3).

use crate::catalog::{Folder, Folders};
use crate::request::ResolvedRequest;

/// The predicate chain's outcome: either a pass, or the tag of the first
/// failing check, used only for diagnostic logging (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureTag {
    Inactive,
    Country,
    Brand,
    Network,
    NetworkType,
    SubNetwork,
    Gender,
    DeviceType,
    Vertical,
    Cpc,
}

impl FailureTag {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureTag::Inactive => "Inactive",
            FailureTag::Country => "Country",
            FailureTag::Brand => "Brand",
            FailureTag::Network => "Network",
            FailureTag::NetworkType => "NetworkType",
            FailureTag::SubNetwork => "SubNetwork",
            FailureTag::Gender => "Gender",
            FailureTag::DeviceType => "DeviceType",
            FailureTag::Vertical => "Vertical",
            FailureTag::Cpc => "CPC",
        }
    }
}

/// An eligible folder with its resolved bid amount (spec §4.3).
#[derive(Debug, Clone, Copy)]
pub struct EligibleFolder {
    pub folder_id: i64,
    pub bid_amount: i64,
}

/// "Unconstrained on this dimension" iff the vector is empty; otherwise the
/// request's resolved id must appear in it (spec §3).
fn dimension_matches(vector: &[i64], resolved_id: i64) -> bool {
    vector.is_empty() || vector.contains(&resolved_id)
}

/// Runs the fixed-order predicate chain against one folder. Returns `Ok(())`
/// if it passes, or `Err(tag)` naming the first failing dimension.
///
/// Test requests (`request.raw.test == true`) bypass only the country check;
/// every other check still applies (spec §4.3).
fn folder_matches(folder: &Folder, request: &ResolvedRequest) -> Result<(), FailureTag> {
    if !folder.active {
        return Err(FailureTag::Inactive);
    }
    if !request.raw.test && !dimension_matches(&folder.country, request.country_id) {
        return Err(FailureTag::Country);
    }
    if !dimension_matches(&folder.brand, request.brand_id) {
        return Err(FailureTag::Brand);
    }
    if !dimension_matches(&folder.network, request.network_id) {
        return Err(FailureTag::Network);
    }
    if !dimension_matches(&folder.network_type, request.network_type_id) {
        return Err(FailureTag::NetworkType);
    }
    if !dimension_matches(&folder.subnetwork, request.subnetwork_id) {
        return Err(FailureTag::SubNetwork);
    }
    if !dimension_matches(&folder.gender, request.gender_id) {
        return Err(FailureTag::Gender);
    }
    if !dimension_matches(&folder.device_type, request.device_type_id) {
        return Err(FailureTag::DeviceType);
    }
    if !dimension_matches(&folder.vertical, request.vertical_id) {
        return Err(FailureTag::Vertical);
    }
    if folder.cpc > 0 && folder.cpc < request.raw.bidfloor() {
        return Err(FailureTag::Cpc);
    }
    Ok(())
}

/// The folder's own CPC if positive, else its parent's CPC if it has one,
/// else 0 (spec §4.3 CPC inheritance).
fn effective_cpc(folder: &Folder, folders: &Folders) -> i64 {
    if folder.cpc > 0 {
        return folder.cpc;
    }
    folder
        .parent_id
        .and_then(|parent_id| folders.by_id(parent_id))
        .map(|parent| parent.cpc)
        .unwrap_or(0)
}

/// Visits one folder (root or child), logging the failure tag on rejection
/// and appending an [`EligibleFolder`] (with at least one creative) on
/// acceptance. Returns `true` iff the folder was eligible.
fn visit(folder: &Folder, request: &ResolvedRequest, folders: &Folders, out: &mut Vec<EligibleFolder>, total_cpc: &mut i64) -> bool {
    if let Err(tag) = folder_matches(folder, request) {
        tracing::debug!(folder_id = folder.id, tag = tag.as_str(), "folder rejected");
        return false;
    }
    tracing::debug!(folder_id = folder.id, "folder matches");

    if !folder.creatives.is_empty() {
        let cpc = effective_cpc(folder, folders);
        *total_cpc += cpc;
        out.push(EligibleFolder {
            folder_id: folder.id,
            bid_amount: cpc,
        });
    }
    true
}

/// Walks only root folders; for each root, evaluates it, then evaluates each
/// child independently — a child is visited regardless of whether its parent
/// was eligible (spec §4.3, and the "Open Questions" note in §9: this is
/// preserved as specified, not considered a bug).
///
/// Returns the eligible `(folder_id, bid_amount)` pairs and the accumulated
/// `totalCpc`, both handed to the selector/pricer (C8).
pub fn filter(folders: &Folders, request: &ResolvedRequest) -> (Vec<EligibleFolder>, i64) {
    let mut eligible = Vec::new();
    let mut total_cpc = 0;

    for &root_id in folders.roots() {
        let Some(root) = folders.by_id(root_id) else {
            continue;
        };
        visit(root, request, folders, &mut eligible, &mut total_cpc);
        for &child_id in &root.children {
            if let Some(child) = folders.by_id(child_id) {
                visit(child, request, folders, &mut eligible, &mut total_cpc);
            }
        }
    }

    (eligible, total_cpc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RawBidRequest;

    fn request_with(country_id: i64, test: bool, bidfloor: i64) -> ResolvedRequest {
        ResolvedRequest {
            raw: RawBidRequest {
                test,
                impressions: vec![crate::request::Impression { bidfloor }],
                ..Default::default()
            },
            country_id,
            ..Default::default()
        }
    }

    fn folder(id: i64, country: Vec<i64>, cpc: i64, creatives: Vec<i64>) -> Folder {
        Folder {
            id,
            active: true,
            country,
            cpc,
            creatives,
            ..Default::default()
        }
    }

    #[test]
    fn country_mismatch_rejects_non_test_request() {
        let f = folder(1, vec![1], 500, vec![9]);
        let req = request_with(2, false, 0);
        assert_eq!(folder_matches(&f, &req), Err(FailureTag::Country));
    }

    #[test]
    fn test_flag_bypasses_only_country_check() {
        let f = folder(1, vec![1], 500, vec![9]);
        let req = request_with(2, true, 0);
        assert_eq!(folder_matches(&f, &req), Ok(()));
    }

    #[test]
    fn bidfloor_gate_rejects_underpriced_folder() {
        let f = folder(1, vec![], 200, vec![9]);
        let req = request_with(0, false, 250);
        assert_eq!(folder_matches(&f, &req), Err(FailureTag::Cpc));
    }

    #[test]
    fn zero_cpc_folder_is_never_bidfloor_rejected() {
        let f = folder(1, vec![], 0, vec![9]);
        let req = request_with(0, false, 250);
        assert_eq!(folder_matches(&f, &req), Ok(()));
    }

    #[test]
    fn cpc_inherits_from_parent_when_zero() {
        let parent = folder(1, vec![], 300, vec![]);
        let child = Folder {
            id: 2,
            parent_id: Some(1),
            children: vec![],
            active: true,
            cpc: 0,
            creatives: vec![9],
            ..Default::default()
        };
        let mut root = parent.clone();
        root.children = vec![2];
        let folders = Folders::from_vec(vec![root, child]);
        let req = request_with(0, false, 0);
        let (eligible, total_cpc) = filter(&folders, &req);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].bid_amount, 300);
        assert_eq!(total_cpc, 300);
    }

    #[test]
    fn children_are_visited_independently_of_parent_eligibility() {
        let mut parent = folder(1, vec![1], 300, vec![]); // country=[1], request has 2 -> parent rejected
        parent.children = vec![2];
        let child = Folder {
            id: 2,
            parent_id: Some(1),
            children: vec![],
            active: true,
            cpc: 0,
            country: vec![],
            creatives: vec![9],
            ..Default::default()
        };
        let folders = Folders::from_vec(vec![parent, child]);
        let req = request_with(2, false, 0);
        let (eligible, _) = filter(&folders, &req);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].folder_id, 2);
    }

    #[test]
    fn empty_catalog_yields_no_eligible_folders() {
        let folders = Folders::from_vec(vec![]);
        let req = request_with(0, false, 0);
        let (eligible, total_cpc) = filter(&folders, &req);
        assert!(eligible.is_empty());
        assert_eq!(total_cpc, 0);
    }
}
