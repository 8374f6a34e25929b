//! Tracking links for selected promos

use url::Url;

use super::Offer;
use crate::error::{Result, ServiceError};
use crate::generation::OfferType;

/// Site the links point at unless the caller passes another base
pub const DEFAULT_LINK_BASE: &str = "https://aidailypost.com";

/// Build the tracking link for `offer` shown with variant `variant_id`
///
/// Review offers point at the on-site review, everything else at the
/// slug redirect. Both carry `utm_source=newsletter&promo_var={id}`.
pub fn tracking_link(base: &Url, offer: &Offer, variant_id: i64) -> Result<Url> {
    let slug = offer.slug.trim().trim_matches('/');
    if slug.is_empty() {
        return Err(ServiceError::validation(format!(
            "Offer {} has no slug",
            offer.id
        )));
    }

    let mut link = base.clone();
    {
        let mut segments = link.path_segments_mut().map_err(|_| {
            ServiceError::configuration(format!("Link base {} cannot carry a path", base))
        })?;
        segments.pop_if_empty();
        if offer.offer_type == OfferType::Review {
            segments.push("review");
        }
        segments.push(slug);
    }

    link.query_pairs_mut()
        .clear()
        .append_pair("utm_source", "newsletter")
        .append_pair("promo_var", &variant_id.to_string());
    link.set_fragment(None);

    Ok(link)
}
