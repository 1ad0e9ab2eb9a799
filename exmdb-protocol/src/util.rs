//! Entity id, change number and NT timestamp algebra.
//!
//! An entity id packs a 16-bit replica id with 48 bits of a change counter.
//! The counter travels as a "GC buffer": its 6 low bytes placed in the most
//! significant half of a u64 in big-endian order, so that the id's memory
//! layout is `replid (LE) ‖ counter (BE)`.

use chrono::{DateTime, TimeZone, Utc};

/// Seconds between the NT epoch (1601-01-01) and the UNIX epoch.
const EPOCH_DIFF: i64 = 11_644_473_600;

/// Packs the low 48 bits of `value` into GC byte order.
pub const fn value_to_gc(value: u64) -> u64 {
    (value << 16).swap_bytes()
}

/// Unpacks a GC buffer back into the counter value. Inverse of
/// [`value_to_gc`] for all values below 2^48.
pub const fn gc_to_value(gc: u64) -> u64 {
    gc.swap_bytes() >> 16
}

/// Combines a replica id with a packed GC buffer into an entity id.
pub const fn make_eid(replid: u16, gc: u64) -> u64 {
    replid as u64 | (gc << 16)
}

/// Combines a replica id with a plain counter value into an entity id.
pub const fn make_eid_ex(replid: u16, value: u64) -> u64 {
    make_eid(replid, value_to_gc(value))
}

/// Converts an NT timestamp (100 ns ticks since 1601) to a UNIX timestamp.
pub const fn nx_time(nt: u64) -> i64 {
    (nt / 10_000_000) as i64 - EPOCH_DIFF
}

/// Converts a UNIX timestamp to an NT timestamp.
pub const fn nt_time(unix: i64) -> u64 {
    (unix + EPOCH_DIFF) as u64 * 10_000_000
}

/// Current time as an NT timestamp.
pub fn nt_now() -> u64 {
    nt_time(Utc::now().timestamp())
}

/// NT timestamp as a UTC datetime, if representable.
pub fn nt_to_datetime(nt: u64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(nx_time(nt), 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gc_roundtrip() {
        for value in [0u64, 1, 0xffff, 0x1_0000, 0xdead_beef, (1 << 48) - 1] {
            assert_eq!(gc_to_value(value_to_gc(value)), value);
        }
    }

    #[test]
    fn test_gc_byte_layout() {
        // Counter 1 occupies the last of the six big-endian bytes.
        let gc = value_to_gc(1);
        assert_eq!(gc.to_le_bytes(), [0, 0, 0, 0, 0, 1, 0, 0]);
    }

    #[test]
    fn test_make_eid() {
        let eid = make_eid_ex(1, 2);
        // replid LE, then the counter in big-endian order.
        assert_eq!(eid.to_le_bytes(), [1, 0, 0, 0, 0, 0, 0, 2]);
        assert_eq!(gc_to_value(eid >> 16), 2);
    }

    #[test]
    fn test_time_roundtrip() {
        for unix in [0i64, 1, 1_600_000_000, 4_000_000_000] {
            assert_eq!(nx_time(nt_time(unix)), unix);
        }
    }

    #[test]
    fn test_nt_epoch() {
        assert_eq!(nt_time(0), 116_444_736_000_000_000);
        assert_eq!(nx_time(116_444_736_000_000_000), 0);
    }

    #[test]
    fn test_nt_to_datetime() {
        let dt = nt_to_datetime(nt_time(0)).unwrap();
        assert_eq!(dt.timestamp(), 0);
    }
}
