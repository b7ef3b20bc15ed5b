//! Virtual-time witness scheduling.
//!
//! Each witness advances through a virtual lap at a speed proportional to
//! its votes. The witness whose lap ends soonest gets the next timeshare
//! slot. All position arithmetic wraps modulo 2^128.

use crate::domain::constants::PERCENT_100;

/// Virtual position after `votes` accumulated from `last_update` to `now`.
#[must_use]
pub fn advance_position(position: u128, votes: i64, last_update: u128, now: u128) -> u128 {
    let speed = votes as u128;
    position.wrapping_add(speed.wrapping_mul(now.wrapping_sub(last_update)))
}

/// Virtual time at which a witness completes its lap.
#[must_use]
pub fn scheduled_time(last_update: u128, position: u128, votes: i64, lap_length: u128) -> u128 {
    let speed = (votes.max(0) as u128).saturating_add(1);
    last_update.wrapping_add(lap_length.wrapping_sub(position) / speed)
}

/// Pushes a wrapped scheduled time to the end of the lap.
#[must_use]
pub fn clamp_scheduled_time(scheduled: u128, current_virtual_time: u128) -> u128 {
    if scheduled < current_virtual_time {
        u128::MAX
    } else {
        scheduled
    }
}

/// Deterministic Fisher-Yates shuffle seeded by the block time.
pub fn shuffle<T>(items: &mut [T], seed_secs: u32) {
    const MULTIPLIER: u64 = 2_685_821_657_736_338_717;
    let now_hi = u64::from(seed_secs) << 32;
    let len = items.len();
    for i in 0..len {
        let mut k = now_hi.wrapping_add((i as u64).wrapping_mul(MULTIPLIER));
        k ^= k >> 12;
        k ^= k << 25;
        k ^= k >> 27;
        k = k.wrapping_mul(MULTIPLIER);
        let j = i + (k % (len - i) as u64) as usize;
        items.swap(i, j);
    }
}

/// Share of the last 128 slots that produced a block, in basis points.
#[must_use]
pub fn participation_rate(recent_slots_filled: u128) -> u32 {
    u32::from(PERCENT_100) * recent_slots_filled.count_ones() / 128
}

/// Element at the middle of `values` after sorting by `key`.
pub fn median_by_key<T, K, F>(values: &[T], key: F) -> Option<&T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut sorted: Vec<&T> = values.iter().collect();
    sorted.sort_by_key(|value| key(value));
    sorted.get(sorted.len() / 2).copied()
}
