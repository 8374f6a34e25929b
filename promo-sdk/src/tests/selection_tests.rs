//! Tests for weighted content selection
//!
//! These tests pin the draw-to-offer mapping with scripted draws and check
//! the long-run distribution with a seeded generator.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use url::Url;

    use crate::error::ServiceError;
    use crate::generation::OfferType;
    use crate::selection::{
        pick_weighted, Offer, RandomSource, Variant, WeightedSelector, DEFAULT_LINK_BASE,
    };

    /// Hands out a fixed sequence of draws
    struct Sequence(std::vec::IntoIter<u64>);

    impl RandomSource for Sequence {
        fn draw_below(&mut self, _upper: u64) -> u64 {
            self.0.next().unwrap_or(0)
        }
    }

    fn offer(id: i64, weight: u32, offer_type: OfferType) -> Offer {
        Offer {
            id,
            name: format!("Offer {}", id),
            weight,
            offer_type,
            slug: format!("offer-{}", id),
        }
    }

    fn variant(id: i64) -> Variant {
        Variant {
            id,
            text: format!("Variant {} copy", id),
            cta: "Learn More".to_string(),
            headline: None,
        }
    }

    fn link_base() -> Url {
        Url::parse(DEFAULT_LINK_BASE).unwrap()
    }

    #[test]
    fn test_draws_map_to_weight_ranges() {
        let offers = vec![
            offer(1, 10, OfferType::Affiliate),
            offer(2, 5, OfferType::Affiliate),
            offer(3, 1, OfferType::Affiliate),
        ];

        let mut source = Sequence((0..16).collect::<Vec<_>>().into_iter());
        let picks: Vec<i64> = (0..16)
            .map(|_| pick_weighted(&offers, |o| u64::from(o.weight), &mut source).unwrap().id)
            .collect();

        let mut expected = vec![1; 10];
        expected.extend([2; 5]);
        expected.push(3);
        assert_eq!(picks, expected);
    }

    #[test]
    fn test_distribution_follows_weights() {
        let offers = vec![
            offer(1, 10, OfferType::Affiliate),
            offer(2, 5, OfferType::Review),
            offer(3, 1, OfferType::Donation),
        ];
        let selector = WeightedSelector::seeded(7);

        let mut counts: HashMap<i64, usize> = HashMap::new();
        let draws = 100_000;
        for _ in 0..draws {
            let picked = selector.pick_offer(&offers).unwrap();
            *counts.entry(picked.id).or_default() += 1;
        }

        for (id, weight) in [(1, 10.0), (2, 5.0), (3, 1.0)] {
            let observed = counts[&id] as f64 / draws as f64;
            let expected = weight / 16.0;
            assert!(
                (observed - expected).abs() < 0.01,
                "offer {} observed {:.4}, expected {:.4}",
                id,
                observed,
                expected
            );
        }
    }

    #[test]
    fn test_variants_are_uniform() {
        let variants: Vec<Variant> = (1..=4).map(variant).collect();
        let selector = WeightedSelector::seeded(11);

        let mut counts = [0usize; 4];
        for _ in 0..40_000 {
            let picked = selector.pick_variant(&variants).unwrap();
            counts[(picked.id - 1) as usize] += 1;
        }

        for count in counts {
            assert!((9_000..11_000).contains(&count), "count {}", count);
        }
    }

    #[test]
    fn test_select_builds_tracking_link() {
        let offers = vec![offer(10, 1, OfferType::Review), offer(20, 3, OfferType::Affiliate)];
        // 0 lands on the review offer, then variant index 1
        let selector = WeightedSelector::with_source(Sequence(vec![0, 1].into_iter()));

        let selection = selector
            .select(&offers, |o| vec![variant(o.id * 10), variant(o.id * 10 + 1)], &link_base())
            .unwrap();

        assert_eq!(selection.offer.id, 10);
        assert_eq!(selection.variant.id, 101);
        assert_eq!(
            selection.link,
            "https://aidailypost.com/review/offer-10?utm_source=newsletter&promo_var=101"
        );
    }

    #[test]
    fn test_select_affiliate_link() {
        let offers = vec![offer(10, 1, OfferType::Review), offer(20, 3, OfferType::Affiliate)];
        let selector = WeightedSelector::with_source(Sequence(vec![3, 0].into_iter()));

        let selection = selector
            .select(&offers, |o| vec![variant(o.id)], &link_base())
            .unwrap();

        assert_eq!(selection.offer.id, 20);
        assert_eq!(
            selection.link,
            "https://aidailypost.com/offer-20?utm_source=newsletter&promo_var=20"
        );
    }

    #[test]
    fn test_offer_without_variants_is_an_error() {
        let offers = vec![offer(5, 1, OfferType::Affiliate)];
        let selector = WeightedSelector::seeded(1);

        let err = selector
            .select(&offers, |_| Vec::new(), &link_base())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Selection(ref m) if m.contains("5")));
    }

    #[test]
    fn test_no_offers_is_an_error() {
        let selector = WeightedSelector::seeded(1);
        let err = selector
            .select(&[], |_| vec![variant(1)], &link_base())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Selection(_)));
    }

    #[test]
    fn test_selector_shared_across_threads() {
        let selector = Arc::new(WeightedSelector::seeded(3));
        let offers = Arc::new(vec![
            offer(1, 2, OfferType::Affiliate),
            offer(2, 2, OfferType::Affiliate),
        ]);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let selector = Arc::clone(&selector);
                let offers = Arc::clone(&offers);
                std::thread::spawn(move || {
                    (0..1000)
                        .filter(|_| selector.pick_offer(&offers).unwrap().id == 1)
                        .count()
                })
            })
            .collect();

        let first: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert!((1_800..2_200).contains(&first), "picked offer 1 {} times", first);
    }
}
