//! Capability pointer comparison.
//!
//! Ordered comparisons look at cursors; when exactly one operand is
//! tagged, the untagged one orders below it.

use crate::cpu::Hart;
use crate::encoding::Codec;

impl<C: Codec> Hart<C> {
    fn cursors_equal(&self, cb: u8, ct: u8) -> bool {
        let cbp = self.capregs.read(cb);
        let ctp = self.capregs.read(ct);
        cbp.tag == ctp.tag && cbp.cursor == ctp.cursor
    }

    /// When the tags differ the untagged operand is less; otherwise
    /// compare cursors with `cmp`.
    fn cursor_less(&self, cb: u8, ct: u8, cmp: impl Fn(u64, u64) -> bool) -> bool {
        let cbp = self.capregs.read(cb);
        let ctp = self.capregs.read(ct);
        if cbp.tag != ctp.tag {
            !cbp.tag
        } else {
            cmp(cbp.cursor, ctp.cursor)
        }
    }

    /// CEQ.
    pub fn eq(&self, cb: u8, ct: u8) -> u64 {
        self.cursors_equal(cb, ct) as u64
    }

    /// CNE.
    pub fn ne(&self, cb: u8, ct: u8) -> u64 {
        !self.cursors_equal(cb, ct) as u64
    }

    /// CLT: signed cursor comparison.
    pub fn lt(&self, cb: u8, ct: u8) -> u64 {
        self.cursor_less(cb, ct, |a, b| (a as i64) < (b as i64)) as u64
    }

    /// CLE: signed cursor comparison.
    pub fn le(&self, cb: u8, ct: u8) -> u64 {
        self.cursor_less(cb, ct, |a, b| (a as i64) <= (b as i64)) as u64
    }

    /// CLTU: unsigned cursor comparison.
    pub fn ltu(&self, cb: u8, ct: u8) -> u64 {
        self.cursor_less(cb, ct, |a, b| a < b) as u64
    }

    /// CLEU: unsigned cursor comparison.
    pub fn leu(&self, cb: u8, ct: u8) -> u64 {
        self.cursor_less(cb, ct, |a, b| a <= b) as u64
    }

    /// CExEq: equality of every architectural field.
    pub fn exeq(&self, cb: u8, ct: u8) -> u64 {
        let cbp = self.capregs.read(cb);
        let ctp = self.capregs.read(ct);
        (cbp.tag == ctp.tag
            && cbp.base == ctp.base
            && cbp.offset() == ctp.offset()
            && cbp.top == ctp.top
            && cbp.otype == ctp.otype
            && cbp.perms == ctp.perms
            && cbp.uperms == ctp.uperms) as u64
    }

    /// CNExEq.
    pub fn nexeq(&self, cb: u8, ct: u8) -> u64 {
        (self.exeq(cb, ct) == 0) as u64
    }

    /// CTestSubset: `ct` refers to a subset of `cb`'s memory with a
    /// subset of its permissions. Seals and cursors do not take part.
    pub fn test_subset(&self, cb: u8, ct: u8) -> u64 {
        let cbp = self.capregs.read(cb);
        let ctp = self.capregs.read(ct);
        (cbp.tag == ctp.tag
            && cbp.base <= ctp.base
            && ctp.top <= cbp.top
            && cbp.perms.contains(ctp.perms)
            && cbp.uperms & ctp.uperms == ctp.uperms) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cap::{Capability, Perms};
    use crate::encoding::Compressed128;

    fn hart() -> Hart<Compressed128> {
        Hart::default()
    }

    fn at(cursor: u64, tag: bool) -> Capability {
        let mut c = Capability::max_perms(cursor);
        c.tag = tag;
        c
    }

    #[test]
    fn test_eq_ne_are_complements() {
        let mut h = hart();
        h.capregs.write(1, at(0x100, true));
        h.capregs.write(2, at(0x100, true));
        h.capregs.write(3, at(0x200, true));
        h.capregs.write(4, at(0x100, false));

        for (a, b) in [(1, 2), (1, 3), (1, 4), (2, 3)] {
            assert_eq!(h.eq(a, b), 1 - h.ne(a, b));
        }
        assert_eq!(h.eq(1, 2), 1);
        assert_eq!(h.eq(1, 3), 0);
        // Same cursor, different tags: not equal
        assert_eq!(h.eq(1, 4), 0);
    }

    #[test]
    fn test_signed_vs_unsigned_order() {
        let mut h = hart();
        h.capregs.write(1, at(u64::MAX, true)); // -1 signed
        h.capregs.write(2, at(1, true));

        assert_eq!(h.lt(1, 2), 1);
        assert_eq!(h.ltu(1, 2), 0);
        assert_eq!(h.le(1, 2), 1);
        assert_eq!(h.leu(1, 2), 0);
    }

    #[test]
    fn test_untagged_orders_below_tagged() {
        let mut h = hart();
        h.capregs.write(1, at(0x100, false));
        h.capregs.write(2, at(0x1, true));

        assert_eq!(h.lt(1, 2), 1);
        assert_eq!(h.ltu(1, 2), 1);
        assert_eq!(h.lt(2, 1), 0);
        assert_eq!(h.leu(2, 1), 0);
    }

    #[test]
    fn test_exeq_looks_at_every_field() {
        let mut h = hart();
        let c = at(0x100, true);
        h.capregs.write(1, c);
        h.capregs.write(2, c);
        assert_eq!(h.exeq(1, 2), 1);
        assert_eq!(h.nexeq(1, 2), 0);

        let mut d = c;
        d.perms -= Perms::STORE;
        h.capregs.write(3, d);
        assert_eq!(h.exeq(1, 3), 0);
        assert_eq!(h.nexeq(1, 3), 1);

        // Equal cursors but different bounds
        let mut e = c;
        e.base = 0x10;
        e.top = 0x1000;
        h.capregs.write(4, e);
        assert_eq!(h.eq(1, 4), 1);
        assert_eq!(h.exeq(1, 4), 0);
    }

    #[test]
    fn test_test_subset() {
        let mut h = hart();
        let mut outer = at(0x1000, true);
        outer.base = 0x1000;
        outer.top = 0x2000;
        h.capregs.write(1, outer);

        let mut inner = outer;
        inner.base = 0x1400;
        inner.top = 0x1800;
        inner.perms = Perms::LOAD | Perms::GLOBAL;
        h.capregs.write(2, inner);
        assert_eq!(h.test_subset(1, 2), 1);
        assert_eq!(h.test_subset(2, 1), 0);

        // Wider permissions break subsetting even with narrower bounds
        let mut priv_esc = inner;
        priv_esc.perms = outer.perms | Perms::RESERVED;
        h.capregs.write(3, priv_esc);
        let mut outer_less = outer;
        outer_less.perms -= Perms::RESERVED;
        h.capregs.write(1, outer_less);
        assert_eq!(h.test_subset(1, 3), 0);
    }
}
