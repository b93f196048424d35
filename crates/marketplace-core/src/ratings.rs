//! Attorney rating aggregation

use thiserror::Error;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Rating must be between 1 and 5 (got {0})")]
pub struct RatingOutOfRange(pub i64);

pub fn validate_rating(rating: i64) -> Result<u8, RatingOutOfRange> {
    if (MIN_RATING as i64..=MAX_RATING as i64).contains(&rating) {
        Ok(rating as u8)
    } else {
        Err(RatingOutOfRange(rating))
    }
}

/// Fold one more rating into a running average
pub fn apply_rating(avg: f64, count: u32, rating: u8) -> (f64, u32) {
    let new_count = count + 1;
    let new_avg = (avg * count as f64 + rating as f64) / new_count as f64;
    // Two decimals is all the profile card shows
    ((new_avg * 100.0).round() / 100.0, new_count)
}
