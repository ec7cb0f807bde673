//! C6 — request normalization: decoding the inbound RTB JSON and resolving
//! its string dimensions against the current snapshot's pseudonym tables.

use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

/// The abridged RTB bid-request fields this core consumes (spec §6).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawBidRequest {
    #[serde(default)]
    pub impressions: Vec<Impression>,
    #[serde(default)]
    pub site: Site,
    #[serde(default)]
    pub device: Device,
    #[serde(default)]
    pub user: RequestUser,
    #[serde(default)]
    pub test: bool,
    #[serde(default)]
    pub random255: u8,
}

impl RawBidRequest {
    pub fn bidfloor(&self) -> i64 {
        self.impressions.first().map(|i| i.bidfloor).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Impression {
    #[serde(default)]
    pub bidfloor: i64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Site {
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub subnetwork: String,
    #[serde(default)]
    pub networktype: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub vertical: String,
    #[serde(default)]
    pub placement: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Device {
    #[serde(default)]
    pub devicetype: String,
    #[serde(default)]
    pub geo: Geo,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Geo {
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RequestUser {
    #[serde(default)]
    pub gender: String,
}

/// Resolved dimension ids plus the raw request they were resolved from
/// (spec §3 "DemandFlight", the `Request` field).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedRequest {
    pub raw: RawBidRequest,
    pub vertical_id: i64,
    pub brand_id: i64,
    pub network_id: i64,
    pub subnetwork_id: i64,
    pub network_type_id: i64,
    pub device_type_id: i64,
    pub country_id: i64,
    pub gender_id: i64,
}

/// Decode the HTTP body into a [`RawBidRequest`] and resolve its dimensions
/// against `snapshot`'s pseudonym tables. A decode failure is returned as
/// `Err` so the caller can record it in the flight's error slot without
/// aborting the pipeline early (spec §4.2).
pub fn normalize(body: &[u8], snapshot: &Snapshot) -> Result<ResolvedRequest, serde_json::Error> {
    let raw: RawBidRequest = serde_json::from_slice(body)?;

    let subnetwork_id = snapshot.pseudonyms.subnetwork.resolve(&raw.site.subnetwork, "subnetwork");
    let country_id = snapshot.pseudonyms.country.resolve(&raw.device.geo.country, "country");
    let network_id = snapshot.pseudonyms.network.resolve(&raw.site.network, "network");
    let device_type_id = snapshot.pseudonyms.device_type.resolve(&raw.device.devicetype, "deviceType");
    let brand_id = snapshot.pseudonyms.brand_slug.resolve(&raw.site.brand, "brandSlug");
    let vertical_id = snapshot.pseudonyms.vertical.resolve(&raw.site.vertical, "vertical");
    let network_type_id = snapshot.pseudonyms.network_type.resolve(&raw.site.networktype, "networkType");
    let gender_id = snapshot.pseudonyms.gender.resolve(&raw.user.gender, "gender");

    tracing::debug!(
        subnetwork_id,
        country_id,
        network_id,
        device_type_id,
        brand_id,
        vertical_id,
        network_type_id,
        gender_id,
        "dimensions resolved"
    );

    Ok(ResolvedRequest {
        raw,
        vertical_id,
        brand_id,
        network_id,
        subnetwork_id,
        network_type_id,
        device_type_id,
        country_id,
        gender_id,
    })
}

/// Builds the `WinUrl` template left intact for the exchange's own macro
/// expansion (spec §4.2). The exchange macros (`${AUCTION_PRICE}` etc.) are
/// NOT touched by our own `{token}` creative-URL expansion pass (see
/// SPEC_FULL.md §C.1).
pub fn win_url(host: &str) -> String {
    format!("http://{host}/win?price=${{AUCTION_PRICE}}&key=${{AUCTION_BID_ID}}&imp=${{AUCTION_IMP_ID}}")
}
