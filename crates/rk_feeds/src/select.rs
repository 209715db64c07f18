use chrono::{DateTime, Duration, Utc};
use rk_core::{FeedEntry, SelectionPolicy, UndatedPolicy};

/// Oldest publication time still considered fresh. Inclusive.
/// An age reaching past the earliest representable date keeps everything.
pub fn cutoff(now: DateTime<Utc>, max_age_days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(max_age_days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Drops entries older than the cutoff, then keeps the first
/// `max_articles_per_feed` of what is left. Feed order is preserved.
pub fn select_entries(
    entries: Vec<FeedEntry>,
    policy: &SelectionPolicy,
    now: DateTime<Utc>,
) -> Vec<FeedEntry> {
    let oldest = cutoff(now, policy.max_age_days);

    entries
        .into_iter()
        .filter(|entry| match entry.published_at {
            Some(published) => published >= oldest,
            None => policy.undated == UndatedPolicy::Include,
        })
        .take(policy.max_articles_per_feed)
        .collect()
}
