use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Strategy for generating dates across a span of processing years
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2015i32..=2030, 1u32..=365).prop_map(|(year, ordinal)| {
        NaiveDate::from_yo_opt(year, ordinal)
            .unwrap_or_else(|| NaiveDate::from_yo_opt(year, 1).unwrap())
    })
}

/// Strategy for generating ordinary seasons (start before end, same year)
pub fn summer_season_strategy() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (2015i32..=2030, 1u32..=150, 30i64..=200).prop_map(|(year, ordinal, length)| {
        let start = NaiveDate::from_yo_opt(year, ordinal).unwrap();
        let end = start + Duration::days(length);
        (start, end)
    })
}

/// Strategy for generating winter seasons, stored with the end date earlier in
/// the year than the start date
pub fn winter_season_strategy() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (2015i32..=2030, 9u32..=11, 1u32..=28, 3u32..=7, 1u32..=28).prop_map(
        |(year, start_month, start_day, end_month, end_day)| {
            (
                NaiveDate::from_ymd_opt(year, start_month, start_day).unwrap(),
                NaiveDate::from_ymd_opt(year, end_month, end_day).unwrap(),
            )
        },
    )
}

/// Strategy for generating a day offset relative to some reference date
pub fn day_offset_strategy() -> impl Strategy<Value = i64> {
    -400i64..=400
}

/// Strategy for generating Sentinel-2 style tile identifiers
pub fn tile_id_strategy() -> impl Strategy<Value = String> {
    "[0-9]{2}[A-Z]{3}"
}

/// Strategy for generating a set of distinct tiles
pub fn tile_set_strategy(max: usize) -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(tile_id_strategy(), 1..=max)
}

/// Index production switches: (ndwi, brightness, fapar, fcover)
pub fn index_switches_strategy() -> impl Strategy<Value = (bool, bool, bool, bool)> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>())
}

/// Strategy for generating a per-product "already processed" mask
pub fn processed_mask_strategy() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 0..24)
}

/// Strategy for generating parent product id lists, including ids the sidecar
/// writer must drop
pub fn parent_ids_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-5i64..=10_000, 0..32)
}

