//! C8 — selector / pricer: a pluggable policy (eligibility-set-to-choice,
//! revshare, click-id) plus price calculation and URL template expansion
//! (spec §4.4).

use crate::eligibility::EligibleFolder;
use crate::flight::DemandFlight;

/// Three capabilities, replaceable per deployment without touching the
/// pipeline (spec §9 "Pluggable pricing policy").
pub trait BiddingPolicy: Send + Sync {
    /// Must set `flight.folder_id`, `flight.full_price`, `flight.creative_id`.
    fn select_folder_and_creative(&self, flight: &mut DemandFlight, eligible: &[EligibleFolder], total_cpc: i64);

    /// A percentage in `[0, 100]`; values above 100 are clamped by the caller.
    fn calculate_revshare(&self, flight: &DemandFlight) -> f64;

    /// An opaque tracking token; may be empty.
    fn generate_click_id(&self, flight: &DemandFlight) -> String;
}

/// Reference policy: deterministic selection keyed off the request's own
/// `random255` byte, 98% revshare, no click-id (spec §4.4, matching the
/// original `SimpleLogic`).
pub struct SimplePolicy;

impl BiddingPolicy for SimplePolicy {
    fn select_folder_and_creative(&self, flight: &mut DemandFlight, eligible: &[EligibleFolder], _total_cpc: i64) {
        let random255 = flight.request.raw.random255 as usize;
        let chosen = eligible[random255 % eligible.len()];

        tracing::debug!(
            folder_id = chosen.folder_id,
            candidates = eligible.len(),
            "folder selected"
        );

        flight.folder_id = chosen.folder_id;
        flight.full_price = chosen.bid_amount;

        let creatives = &flight
            .snapshot
            .folders
            .by_id(chosen.folder_id)
            .expect("selected folder must exist in the snapshot it was chosen from")
            .creatives;
        flight.creative_id = creatives[random255 % creatives.len()];
    }

    fn calculate_revshare(&self, _flight: &DemandFlight) -> f64 {
        98.0
    }

    fn generate_click_id(&self, _flight: &DemandFlight) -> String {
        String::new()
    }
}

/// `bid.price = full_price * revshare / 100.0`; values above 100 are clamped
/// to 100 before use (spec §4.4, §8 invariant 4 and scenario S6).
pub fn clamp_revshare(revshare: f64) -> f64 {
    revshare.min(100.0)
}

pub fn bid_price(full_price: i64, revshare: f64) -> f64 {
    full_price as f64 * clamp_revshare(revshare) / 100.0
}

/// `margin = full_price - floor(bid.price)` (spec §4.4, §8 invariant 4).
pub fn margin(full_price: i64, price: f64) -> i64 {
    full_price - price.floor() as i64
}

/// Replaces each token exactly once, in the fixed order listed in spec §4.4's
/// table — "one pass each" means the first occurrence only, matching the
/// original's `strings.Replace(url, token, value, 1)` (see SPEC_FULL.md §C.2).
pub struct UrlTokens<'a> {
    pub click_id: &'a str,
    pub opaque_clickid: &'a str,
    pub network: &'a str,
    pub subnetwork: &'a str,
    pub brand: &'a str,
    pub brand_url: &'a str,
    pub vertical: &'a str,
    pub cpc: &'a str,
    pub placement: &'a str,
}

fn replace_first(input: &str, token: &str, value: &str) -> String {
    input.replacen(token, value, 1)
}

pub fn expand_url(template: &str, tokens: &UrlTokens) -> String {
    let mut url = template.to_string();
    url = replace_first(&url, "{realnetwork}", "");
    url = replace_first(&url, "{realsubnetwork}", "");
    url = replace_first(&url, "{ct}", tokens.click_id);
    url = replace_first(&url, "{clickid}", tokens.opaque_clickid);
    url = replace_first(&url, "{network}", tokens.network);
    url = replace_first(&url, "{subnetwork}", tokens.subnetwork);
    url = replace_first(&url, "{brand}", tokens.brand);
    url = replace_first(&url, "{brandurl}", tokens.brand_url);
    url = replace_first(&url, "{vertical}", tokens.vertical);
    url = replace_first(&url, "{cpc}", tokens.cpc);
    url = replace_first(&url, "{placement}", tokens.placement);
    url
}

/// `full_price / 100000` formatted with six decimal places, matching Go's
/// default `%f` verb (SPEC_FULL.md §C.3; spec §8 scenario S2: `500 ->
/// "0.005000"`).
pub fn format_cpc(full_price: i64) -> String {
    format!("{:.6}", full_price as f64 / 100_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revshare_above_100_is_clamped() {
        assert_eq!(clamp_revshare(150.0), 100.0);
        assert_eq!(bid_price(500, 150.0), 500.0);
    }

    #[test]
    fn price_and_margin_match_scenario_s2() {
        let price = bid_price(500, 98.0);
        assert_eq!(price, 490.0);
        assert_eq!(margin(500, price), 10);
    }

    #[test]
    fn cpc_formatting_matches_scenario_s2() {
        assert_eq!(format_cpc(500), "0.005000");
    }

    #[test]
    fn url_expansion_replaces_first_occurrence_only() {
        let tokens = UrlTokens {
            click_id: "",
            opaque_clickid: "OPAQUE",
            network: "n42",
            subnetwork: "",
            brand: "",
            brand_url: "",
            vertical: "",
            cpc: "0.005000",
            placement: "",
        };
        let expanded = expand_url("x?c={cpc}&n={network}", &tokens);
        assert_eq!(expanded, "x?c=0.005000&n=n42");
    }

    #[test]
    fn exchange_macros_survive_url_expansion() {
        let tokens = UrlTokens {
            click_id: "",
            opaque_clickid: "",
            network: "",
            subnetwork: "",
            brand: "",
            brand_url: "",
            vertical: "",
            cpc: "0.000000",
            placement: "",
        };
        let expanded = expand_url("x?{clickid}&k=${AUCTION_BID_ID}", &tokens);
        assert!(expanded.contains("${AUCTION_BID_ID}"));
    }
}
