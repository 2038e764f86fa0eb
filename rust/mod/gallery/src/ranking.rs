use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::model::{FeedItem, SortBy};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Something the ranking engine can order.
pub trait Rankable {
    fn created_at(&self) -> Option<DateTime<Utc>>;
    fn favorites_count(&self) -> u64;
}

impl Rankable for FeedItem {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.card.artwork.created_at
    }

    fn favorites_count(&self) -> u64 {
        self.favorites_count
    }
}

/// Sort `items` in place by `policy`. The sort is stable: items equal on
/// every key keep their relative order.
pub fn rank<T: Rankable>(items: &mut [T], policy: SortBy, now: DateTime<Utc>) {
    match policy {
        SortBy::Newest => items.sort_by(|a, b| by_created_desc(a, b)),
        SortBy::Popular => items.sort_by(|a, b| {
            b.favorites_count()
                .cmp(&a.favorites_count())
                .then_with(|| by_created_desc(a, b))
        }),
        SortBy::Trending => items.sort_by(|a, b| {
            trending_score(b, now)
                .total_cmp(&trending_score(a, now))
                .then_with(|| b.favorites_count().cmp(&a.favorites_count()))
                .then_with(|| by_created_desc(a, b))
        }),
    }
}

/// Favorites per day of age. Age is floored at one day; a missing or
/// future timestamp counts as brand new.
pub fn trending_score<T: Rankable>(item: &T, now: DateTime<Utc>) -> f64 {
    let age_days = item
        .created_at()
        .map(|created| (now - created).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY)
        .unwrap_or(0.0);
    item.favorites_count() as f64 / age_days.max(1.0)
}

/// Newest first; a missing timestamp sorts as the epoch.
fn by_created_desc<T: Rankable>(a: &T, b: &T) -> Ordering {
    let a = a.created_at().unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let b = b.created_at().unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    b.cmp(&a)
}
