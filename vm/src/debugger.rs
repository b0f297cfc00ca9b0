//! The remote-debugger register file view.
//!
//! One fixed index space covers the integer GPRs, the CP0 essentials
//! and the FPU; a parallel space covers the capability registers. Both
//! are shared between the remote stub and local state dumps, so the
//! numbering here is load-bearing.

use crate::cpu::{Hart, STATUS_FR};
use crate::encoding::Codec;

fn put_u64(buf: &mut [u8], value: u64) -> usize {
    buf[..8].copy_from_slice(&value.to_le_bytes());
    8
}

impl<C: Codec> Hart<C> {
    /// Read integer-side register `n` into `buf`, returning how many
    /// bytes were produced. Undefined indices produce nothing.
    pub fn debug_read_register(&self, n: usize, buf: &mut [u8]) -> usize {
        if n < 32 {
            return put_u64(buf, self.gpr[n]);
        }
        if self.fpu.present && (38..72).contains(&n) {
            return match n {
                70 => put_u64(buf, self.fpu.fcr31 as i32 as u64),
                71 => put_u64(buf, self.fpu.fcr0 as i32 as u64),
                _ => {
                    if self.cp0.status & STATUS_FR != 0 {
                        put_u64(buf, self.fpu.fpr[n - 38])
                    } else {
                        put_u64(buf, self.fpu.fpr[n - 38] as u32 as u64)
                    }
                }
            };
        }
        match n {
            32 => put_u64(buf, self.cp0.status as i32 as u64),
            33 => put_u64(buf, self.lo),
            34 => put_u64(buf, self.hi),
            35 => put_u64(buf, self.cp0.badvaddr),
            36 => put_u64(buf, self.cp0.cause as i32 as u64),
            37 => put_u64(buf, self.capregs.pcc.cursor | self.isa_mode16 as u64),
            _ => 0,
        }
    }

    /// Write integer-side register `n` from `buf`, returning how many
    /// bytes were consumed. Read-only and out-of-range indices are
    /// silently ignored.
    pub fn debug_write_register(&mut self, n: usize, buf: &[u8]) -> usize {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&buf[..8]);
        let value = u64::from_le_bytes(bytes);

        if n < 32 {
            self.gpr[n] = value;
            return 8;
        }
        if self.fpu.present && (38..72).contains(&n) {
            match n {
                70 => {
                    let mask = self.fpu.fcr31_rw_mask;
                    self.fpu.fcr31 = (value as u32 & mask) | (self.fpu.fcr31 & !mask);
                }
                // FIR is read-only
                71 => {}
                _ => {
                    if self.cp0.status & STATUS_FR != 0 {
                        self.fpu.fpr[n - 38] = value;
                    } else {
                        self.fpu.fpr[n - 38] =
                            (self.fpu.fpr[n - 38] & !0xffff_ffff) | (value as u32 as u64);
                    }
                }
            }
            return 8;
        }
        match n {
            32 => self.cp0.store_status(value),
            33 => self.lo = value,
            34 => self.hi = value,
            35 => self.cp0.badvaddr = value,
            36 => self.cp0.store_cause(value),
            37 => {
                self.capregs.pcc.cursor = value & !1;
                self.isa_mode16 = value & 1 != 0;
            }
            _ => {
                if n > 72 {
                    return 0;
                }
                // Other registers are read-only; ignore writes.
            }
        }
        8
    }

    fn debug_put_cap(&self, cap: &crate::cap::Capability, buf: &mut [u8]) -> usize {
        let image = self.codec.compress(cap);
        let nwords = self.codec.words();
        for (i, word) in image.words.iter().take(nwords).enumerate() {
            buf[8 * i..8 * i + 8].copy_from_slice(&word.to_le_bytes());
        }
        8 * nwords
    }

    /// Read capability-side register `n` into `buf`: 0-31 are the
    /// general registers, 32-41 the named hardware registers and PCC,
    /// 42 the capability cause, 43 the bitset of tagged registers.
    pub fn debug_read_cap_register(&self, n: usize, buf: &mut [u8]) -> usize {
        if n < 32 {
            return self.debug_put_cap(self.capregs.raw(n as u8), buf);
        }
        let hwr = &self.capregs.hwr;
        match n {
            32 => self.debug_put_cap(&hwr.ddc, buf),
            33 => self.debug_put_cap(&self.capregs.pcc, buf),
            34 => self.debug_put_cap(&hwr.user_tls, buf),
            35 => self.debug_put_cap(&hwr.priv_tls, buf),
            36 => self.debug_put_cap(&hwr.kr1c, buf),
            37 => self.debug_put_cap(&hwr.kr2c, buf),
            38 => self.debug_put_cap(&hwr.kcc, buf),
            39 => self.debug_put_cap(&hwr.kdc, buf),
            40 => self.debug_put_cap(&hwr.epcc, buf),
            41 => self.debug_put_cap(&hwr.error_epcc, buf),
            42 => put_u64(buf, self.cap_cause as u64),
            43 => {
                let mut valid = 0u64;
                if hwr.ddc.tag {
                    valid |= 1;
                }
                for i in 1..32 {
                    if self.capregs.raw(i).tag {
                        valid |= 1 << i;
                    }
                }
                if self.capregs.pcc.tag {
                    valid |= 1 << 32;
                }
                put_u64(buf, valid)
            }
            _ => 0,
        }
    }

    /// Capability registers are read-only to the debugger; report the
    /// width so the stub can skip the payload.
    pub fn debug_write_cap_register(&mut self, n: usize, _buf: &[u8]) -> usize {
        if n < 42 {
            return C::CAP_SIZE;
        }
        if n == 42 || n == 43 {
            return 8;
        }
        0
    }
}
