//! Newsletter Promo Selection Example
//!
//! This example picks an offer by weight, rotates its variants and prints
//! the tracking link, then shows how often each offer won over many draws.
//!
//! To run this example:
//! ```
//! cargo run --example select_promo
//! ```

use std::collections::BTreeMap;

use promo_sdk::selection::DEFAULT_LINK_BASE;
use promo_sdk::{Offer, OfferType, Variant, WeightedSelector};
use url::Url;

fn variants_for(offer: &Offer) -> Vec<Variant> {
    (1..=3)
        .map(|n| Variant {
            id: offer.id * 100 + n,
            text: format!("{} copy, take {}", offer.name, n),
            cta: "Learn More".to_string(),
            headline: None,
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let offers = vec![
        Offer {
            id: 1,
            name: "Acme Deploy".to_string(),
            weight: 10,
            offer_type: OfferType::Affiliate,
            slug: "acme-deploy".to_string(),
        },
        Offer {
            id: 2,
            name: "Notebook Pro review".to_string(),
            weight: 5,
            offer_type: OfferType::Review,
            slug: "notebook-pro".to_string(),
        },
        Offer {
            id: 3,
            name: "Support the newsletter".to_string(),
            weight: 1,
            offer_type: OfferType::Donation,
            slug: "coffee".to_string(),
        },
    ];

    let base = Url::parse(DEFAULT_LINK_BASE)?;
    let selector = WeightedSelector::new();

    let selection = selector.select(&offers, variants_for, &base)?;
    println!("Selected: {} / variant {}", selection.offer.name, selection.variant.id);
    println!("Text:     {}", selection.variant.text);
    println!("Link:     {}\n", selection.link);

    let mut wins: BTreeMap<i64, usize> = BTreeMap::new();
    for _ in 0..10_000 {
        *wins.entry(selector.pick_offer(&offers)?.id).or_default() += 1;
    }
    for offer in &offers {
        let count = wins.get(&offer.id).copied().unwrap_or(0);
        println!(
            "{:<24} weight {:>2}  picked {:>5} times ({:.1}%)",
            offer.name,
            offer.weight,
            count,
            count as f64 / 100.0
        );
    }

    Ok(())
}
