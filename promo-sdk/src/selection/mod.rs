//! Weighted newsletter content selection
//!
//! Picks one offer with probability proportional to its weight, then one of
//! that offer's approved variants uniformly. Candidates arrive pre-filtered
//! for eligibility; this module only draws.

pub mod link;

use std::sync::{Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::error::{Result, ServiceError};
use crate::generation::OfferType;

pub use link::{tracking_link, DEFAULT_LINK_BASE};

/// Integer draws for the selector
pub trait RandomSource {
    /// Draw uniformly from `[0, upper)`; `upper` is at least 1
    fn draw_below(&mut self, upper: u64) -> u64;
}

/// Adapter from any `rand` generator
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: RngCore> RandomSource for RngSource<R> {
    fn draw_below(&mut self, upper: u64) -> u64 {
        self.0.gen_range(0..upper)
    }
}

impl RngSource<StdRng> {
    /// Generator seeded from the operating system
    pub fn from_entropy() -> Self {
        RngSource(StdRng::from_entropy())
    }

    /// Reproducible generator
    pub fn seeded(seed: u64) -> Self {
        RngSource(StdRng::seed_from_u64(seed))
    }
}

/// An eligible promotional offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: i64,
    pub name: String,
    /// Relative selection weight, at least 1 for eligible offers
    pub weight: u32,
    pub offer_type: OfferType,
    /// Path segment used to build the tracking link
    pub slug: String,
}

/// An approved copy variant of an offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: i64,
    pub text: String,
    pub cta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
}

/// The offer, variant and link shown in one newsletter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoSelection {
    pub offer: Offer,
    pub variant: Variant,
    pub link: String,
}

/// Pick one item with probability `weight_of(item) / total`
///
/// The draw `r` lands in `[0, total)` and selects the first item whose
/// running weight sum exceeds `r`.
pub fn pick_weighted<'a, T, W, R>(items: &'a [T], weight_of: W, rng: &mut R) -> Result<&'a T>
where
    W: Fn(&T) -> u64,
    R: RandomSource + ?Sized,
{
    let last = items
        .last()
        .ok_or_else(|| ServiceError::selection("No candidates to select from"))?;

    let total = items
        .iter()
        .fold(0u64, |sum, item| sum.saturating_add(weight_of(item)));
    if total == 0 {
        return Err(ServiceError::selection(format!(
            "Total weight of {} candidates is zero",
            items.len()
        )));
    }

    let r = rng.draw_below(total);
    let mut cumulative = 0u64;
    for item in items {
        cumulative = cumulative.saturating_add(weight_of(item));
        if r < cumulative {
            return Ok(item);
        }
    }

    // Only reachable if the random source draws outside [0, total)
    warn!(draw = r, total, "Weighted walk finished without a pick, using last candidate");
    Ok(last)
}

/// Pick one item with equal probability
pub fn pick_uniform<'a, T, R>(items: &'a [T], rng: &mut R) -> Result<&'a T>
where
    R: RandomSource + ?Sized,
{
    pick_weighted(items, |_| 1, rng)
}

/// Thread-safe selector owning its random source
#[derive(Debug)]
pub struct WeightedSelector<S = RngSource<StdRng>> {
    rng: Mutex<S>,
}

impl WeightedSelector<RngSource<StdRng>> {
    /// Selector drawing from an entropy-seeded generator
    pub fn new() -> Self {
        Self::with_source(RngSource::from_entropy())
    }

    /// Selector with reproducible draws
    pub fn seeded(seed: u64) -> Self {
        Self::with_source(RngSource::seeded(seed))
    }
}

impl Default for WeightedSelector<RngSource<StdRng>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RandomSource> WeightedSelector<S> {
    /// Selector drawing from `source`
    pub fn with_source(source: S) -> Self {
        Self {
            rng: Mutex::new(source),
        }
    }

    fn rng(&self) -> MutexGuard<'_, S> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Weighted pick over arbitrary items
    pub fn pick_weighted<'a, T, W>(&self, items: &'a [T], weight_of: W) -> Result<&'a T>
    where
        W: Fn(&T) -> u64,
    {
        pick_weighted(items, weight_of, &mut *self.rng())
    }

    /// Uniform pick over arbitrary items
    pub fn pick_uniform<'a, T>(&self, items: &'a [T]) -> Result<&'a T> {
        pick_uniform(items, &mut *self.rng())
    }

    /// Weighted pick of an offer
    pub fn pick_offer<'a>(&self, offers: &'a [Offer]) -> Result<&'a Offer> {
        self.pick_weighted(offers, |offer| u64::from(offer.weight))
    }

    /// Uniform pick of a variant
    pub fn pick_variant<'a>(&self, variants: &'a [Variant]) -> Result<&'a Variant> {
        self.pick_uniform(variants)
    }

    /// Pick an offer, one of its variants, and build the tracking link
    ///
    /// `variants_for` returns the approved variants of the chosen offer. An
    /// offer without variants is a `Selection` error.
    pub fn select<F>(&self, offers: &[Offer], variants_for: F, link_base: &Url) -> Result<PromoSelection>
    where
        F: FnOnce(&Offer) -> Vec<Variant>,
    {
        let offer = self.pick_offer(offers)?;
        let variants = variants_for(offer);
        let variant = self.pick_variant(&variants).map_err(|_| {
            ServiceError::selection(format!("Offer {} has no approved variants", offer.id))
        })?;

        let link = tracking_link(link_base, offer, variant.id)?;
        info!(
            offer_id = offer.id,
            offer_name = %offer.name,
            variant_id = variant.id,
            "Newsletter promo selected"
        );

        Ok(PromoSelection {
            offer: offer.clone(),
            variant: variant.clone(),
            link: link.to_string(),
        })
    }
}
