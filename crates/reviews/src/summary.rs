use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::review::Review;

/// Aggregate rating figures for one product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub count: u64,
    /// Mean rating rounded to two decimals; zero when there are no reviews.
    pub average: Decimal,
    /// Review counts for ratings 1 through 5.
    pub distribution: [u64; 5],
}

impl RatingSummary {
    pub fn from_reviews<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let mut distribution = [0u64; 5];
        for review in reviews {
            if let Some(slot) = (review.rating as usize)
                .checked_sub(1)
                .and_then(|idx| distribution.get_mut(idx))
            {
                *slot += 1;
            }
        }
        Self::from_distribution(distribution)
    }

    /// Build from per-rating counts (index 0 holds the one-star count).
    pub fn from_distribution(distribution: [u64; 5]) -> Self {
        let count: u64 = distribution.iter().sum();
        let sum: u64 = distribution
            .iter()
            .zip(1u64..)
            .map(|(n, rating)| n * rating)
            .sum();
        let average = if count == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(sum) / Decimal::from(count)).round_dp(2)
        };
        Self {
            count,
            average,
            distribution,
        }
    }
}
