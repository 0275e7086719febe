use chrono::{NaiveDateTime, TimeDelta};

/// Current instant as naive UTC, the wire format used throughout the scheduler.
///
/// Kept as a single indirection (rather than `Utc::now().naive_utc()` sprinkled
/// everywhere) so tests can be written against the same call sites the runtime uses.
pub fn naive_utc_now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

/// Next aligned tick at or after `now`, given a `reference` instant and an `interval`.
///
/// `reference + ceil((now - reference) / interval) * interval`, matching the
/// cleaner's and synchronizer's shared tick-alignment formula.
pub fn next_aligned_tick(reference: NaiveDateTime, interval: TimeDelta, now: NaiveDateTime) -> NaiveDateTime {
    if interval <= TimeDelta::zero() {
        return now;
    }
    let elapsed = now - reference;
    let interval_ms = interval.num_milliseconds();
    let elapsed_ms = elapsed.num_milliseconds();
    let ticks = elapsed_ms.div_euclid(interval_ms) + if elapsed_ms.rem_euclid(interval_ms) != 0 { 1 } else { 0 };
    reference + interval * (ticks as i32)
}

/// Duration from `now` until `target`, clamped to zero (never sleep a negative amount).
pub fn clamped_delta(target: NaiveDateTime, now: NaiveDateTime) -> std::time::Duration {
    let delta = target - now;
    delta.to_std().unwrap_or(std::time::Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn aligns_to_next_tick_when_between_ticks() {
        let reference = dt(2000, 1, 1, 0, 0, 0);
        let interval = TimeDelta::days(1);
        let now = dt(2024, 3, 1, 12, 0, 0);
        let next = next_aligned_tick(reference, interval, now);
        assert_eq!(next, dt(2024, 3, 2, 0, 0, 0));
    }

    #[test]
    fn stays_put_when_exactly_on_a_tick() {
        let reference = dt(2000, 1, 1, 0, 0, 0);
        let interval = TimeDelta::minutes(1);
        let now = dt(2024, 3, 1, 12, 5, 0);
        let next = next_aligned_tick(reference, interval, now);
        assert_eq!(next, now);
    }

    #[test]
    fn clamps_negative_delta_to_zero() {
        let target = dt(2024, 1, 1, 0, 0, 0);
        let now = dt(2024, 1, 1, 0, 0, 1);
        assert_eq!(clamped_delta(target, now), std::time::Duration::ZERO);
    }
}
