//! Statistics the engine keeps about capability traffic: how many
//! capabilities cross the memory boundary, how often derivations land
//! out of bounds or become unrepresentable, and instruction counts.
//!
//! Counting is unconditional and cheap; whether anything is ever read
//! back is the embedder's business.

use std::fmt::{self, Display};

use tracing::debug;

use crate::cap::Capability;

/// Histogram bucket limits for how far out of bounds a derived
/// capability landed.
const BOUNDS_BUCKETS: [u64; 13] = [
    1,
    2,
    4,
    8,
    16,
    32,
    64,
    256,
    1024,
    4096,
    64 * 1024,
    1024 * 1024,
    64 * 1024 * 1024,
];

const BUCKET_NAMES: [&str; 13] = [
    "1  ", "2  ", "4  ", "8  ", "16 ", "32 ", "64 ", "256", "1K ", "4K ", "64K", "1M ", "64M",
];

fn bucket_index(howmuch: u64) -> usize {
    for (i, limit) in BOUNDS_BUCKETS.iter().enumerate() {
        if howmuch <= *limit {
            return i;
        }
    }
    BOUNDS_BUCKETS.len()
}

/// The operations whose bounds behaviour is tracked individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedOp {
    IncOffset,
    SetOffset,
    GetPccSetOffset,
    FromPtr,
}

impl DerivedOp {
    fn name(&self) -> &'static str {
        match self {
            DerivedOp::IncOffset => "CIncOffset",
            DerivedOp::SetOffset => "CSetOffset",
            DerivedOp::GetPccSetOffset => "CGetPCCSetOffset",
            DerivedOp::FromPtr => "CFromPtr",
        }
    }
}

/// Per-operation deviation histogram: how far past (or before) its
/// bounds each derived capability landed. The last bucket of each
/// histogram collects everything beyond the largest limit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BoundsStat {
    pub total: u64,
    pub after: [u64; BOUNDS_BUCKETS.len() + 1],
    pub before: [u64; BOUNDS_BUCKETS.len() + 1],
    pub unrepresentable: u64,
}

impl BoundsStat {
    /// Record where a successfully derived capability's cursor sits
    /// relative to its bounds. Untagged results are arithmetic on plain
    /// integers and are not counted.
    pub fn record(&mut self, cap: &Capability) {
        if !cap.tag {
            return;
        }
        let offset = cap.offset();
        let length = cap.length();
        if offset == length {
            // One past the end is valid ISO C and very common.
            self.after[0] += 1;
            return;
        }
        if offset > length {
            let howmuch = if (offset as i64) < (length as i64) {
                offset as i64
            } else {
                (offset - length) as i64 + 1
            };
            debug!(
                howmuch,
                base = cap.base,
                length,
                offset,
                "out-of-bounds capability created"
            );
            if howmuch > 0 {
                self.after[bucket_index(howmuch as u64)] += 1;
            } else {
                self.before[bucket_index(howmuch.unsigned_abs())] += 1;
            }
        }
    }
}

impl Display for BoundsStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut total_oob = self.after[0];
        writeln!(f, "  One past the end:           {}", self.after[0])?;
        for i in 1..BOUNDS_BUCKETS.len() {
            writeln!(
                f,
                "  Out of bounds by up to {}: {}",
                BUCKET_NAMES[i], self.after[i]
            )?;
            total_oob += self.after[i];
        }
        writeln!(
            f,
            "  Out of bounds by over  {}: {}",
            BUCKET_NAMES[BUCKET_NAMES.len() - 1],
            self.after[BOUNDS_BUCKETS.len()]
        )?;
        total_oob += self.after[BOUNDS_BUCKETS.len()];
        for i in 0..BOUNDS_BUCKETS.len() {
            writeln!(
                f,
                "  Before bounds by up to -{}: {}",
                BUCKET_NAMES[i], self.before[i]
            )?;
            total_oob += self.before[i];
        }
        writeln!(
            f,
            "  Before bounds by over  -{}: {}",
            BUCKET_NAMES[BUCKET_NAMES.len() - 1],
            self.before[BOUNDS_BUCKETS.len()]
        )?;
        total_oob += self.before[BOUNDS_BUCKETS.len()];
        writeln!(
            f,
            "  Became unrepresentable due to out-of-bounds: {}",
            self.unrepresentable
        )?;
        total_oob += self.unrepresentable;
        writeln!(f, "Total out of bounds: {total_oob}")
    }
}

/// All counters one hart maintains.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Statistics {
    /// CSetBounds requests the format had to widen.
    pub imprecise_setbounds: u64,
    /// Tagged capabilities whose derivation lost the tag to
    /// unrepresentability.
    pub unrepresentable_caps: u64,
    pub cap_read: u64,
    pub cap_read_tagged: u64,
    pub cap_write: u64,
    pub cap_write_tagged: u64,
    pub icount: u64,
    pub icount_kernel: u64,
    pub icount_user: u64,
    pub inc_offset: BoundsStat,
    pub set_offset: BoundsStat,
    pub get_pcc_set_offset: BoundsStat,
    pub from_ptr: BoundsStat,
}

impl Statistics {
    pub fn bounds_mut(&mut self, op: DerivedOp) -> &mut BoundsStat {
        match op {
            DerivedOp::IncOffset => &mut self.inc_offset,
            DerivedOp::SetOffset => &mut self.set_offset,
            DerivedOp::GetPccSetOffset => &mut self.get_pcc_set_offset,
            DerivedOp::FromPtr => &mut self.from_ptr,
        }
    }
}

impl Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Capability reads:  {} ({} tagged)", self.cap_read, self.cap_read_tagged)?;
        writeln!(f, "Capability writes: {} ({} tagged)", self.cap_write, self.cap_write_tagged)?;
        writeln!(f, "Imprecise CSetBounds: {}", self.imprecise_setbounds)?;
        writeln!(f, "Unrepresentable capabilities: {}", self.unrepresentable_caps)?;
        writeln!(
            f,
            "Instructions: {} ({} kernel, {} user)",
            self.icount, self.icount_kernel, self.icount_user
        )?;
        for op in [
            DerivedOp::IncOffset,
            DerivedOp::SetOffset,
            DerivedOp::GetPccSetOffset,
            DerivedOp::FromPtr,
        ] {
            let stat = match op {
                DerivedOp::IncOffset => &self.inc_offset,
                DerivedOp::SetOffset => &self.set_offset,
                DerivedOp::GetPccSetOffset => &self.get_pcc_set_offset,
                DerivedOp::FromPtr => &self.from_ptr,
            };
            writeln!(f, "Number of {}s: {}", op.name(), stat.total)?;
            Display::fmt(stat, f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(1), 0);
        assert_eq!(bucket_index(2), 1);
        assert_eq!(bucket_index(3), 2);
        assert_eq!(bucket_index(100), 7);
        assert_eq!(bucket_index(64 * 1024 * 1024), 12);
        assert_eq!(bucket_index(64 * 1024 * 1024 + 1), 13);
    }

    #[test]
    fn test_record_in_bounds_counts_nothing() {
        let mut stat = BoundsStat::default();
        let mut c = Capability::max_perms(0x10);
        c.base = 0;
        c.top = 0x100;
        stat.record(&c);
        assert_eq!(stat, BoundsStat::default());
    }

    #[test]
    fn test_record_one_past_the_end() {
        let mut stat = BoundsStat::default();
        let mut c = Capability::max_perms(0x100);
        c.base = 0;
        c.top = 0x100;
        stat.record(&c);
        assert_eq!(stat.after[0], 1);
    }

    #[test]
    fn test_record_far_out_of_bounds() {
        let mut stat = BoundsStat::default();
        let mut c = Capability::max_perms(0x100 + 1000);
        c.base = 0;
        c.top = 0x100;
        stat.record(&c);
        // 1000 past one-past-the-end lands in the 1K bucket
        assert_eq!(stat.after[bucket_index(1001)], 1);
    }

    #[test]
    fn test_record_before_bounds() {
        let mut stat = BoundsStat::default();
        let mut c = Capability::max_perms(0);
        c.base = 0x1000;
        c.top = 0x1100;
        c.cursor = 0x1000 - 4;
        stat.record(&c);
        assert_eq!(stat.before[bucket_index(4)], 1);
    }

    #[test]
    fn test_untagged_not_counted() {
        let mut stat = BoundsStat::default();
        let mut c = Capability::null();
        c.cursor = u64::MAX;
        stat.record(&c);
        assert_eq!(stat, BoundsStat::default());
    }
}
