pub mod booking;
pub mod line_user;
pub mod location;
pub mod reward_log;
pub mod sweet;
pub mod sweet_review;

/// Round an average to two decimals for display.
pub fn round_rating(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
