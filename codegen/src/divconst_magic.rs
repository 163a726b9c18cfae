//! Magic-multiplier computation for constant integer division.
//!
//! Implements the algorithms of Hacker's Delight, chapter 10: replace
//! division by a fixed, non-power-of-two divisor with a high-word multiply
//! plus a shift and a small correction. The signed and unsigned cases use distinct
//! algorithms because the correction differs (add-and-rotate for unsigned,
//! add-numerator-if-negative for signed).

/// The magic constant and shift amount for unsigned division by a fixed
/// divisor, plus whether a correction (add-numerator, rotate-right-through-
/// carry, then shift) is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicU32 {
    /// The multiplier.
    pub magic: u32,
    /// The final right-shift amount.
    pub shift: u32,
    /// True if the multiply-high result needs the add/rotate correction
    /// before the shift.
    pub add: bool,
}

/// Compute the unsigned 32-bit magic multiplier for division by `d`,
/// `d > 1`. Ported from Hacker's Delight figure 10-2's `magicu` routine.
pub fn magic_u32(d: u32) -> MagicU32 {
    assert!(d > 1, "magic_u32 only handles d > 1");
    let two31 = 0x8000_0000u32;
    let mut p = 31u32;
    let nc = (two31 / d) * d - 1;
    let mut q1 = two31 / nc;
    let mut r1 = two31 - q1 * nc;
    let mut q2 = (two31 - 1) / d;
    let mut r2 = (two31 - 1) - q2 * d;
    let mut add = false;
    loop {
        p += 1;
        if r1 >= nc - r1 {
            q1 = q1.wrapping_mul(2).wrapping_add(1);
            r1 = r1.wrapping_mul(2).wrapping_sub(nc);
        } else {
            q1 = q1.wrapping_mul(2);
            r1 = r1.wrapping_mul(2);
        }
        if r2 + 1 >= d - r2 {
            if q2 >= two31 - 1 {
                add = true;
            }
            q2 = q2.wrapping_mul(2).wrapping_add(1);
            r2 = r2.wrapping_mul(2).wrapping_add(1).wrapping_sub(d);
        } else {
            if q2 >= two31 {
                add = true;
            }
            q2 = q2.wrapping_mul(2);
            r2 = r2.wrapping_mul(2).wrapping_add(1);
        }
        let delta = d - 1 - r2;
        if !(p < 64 && (q1 < delta || (q1 == delta && r1 == 0))) {
            break;
        }
    }
    MagicU32 { magic: q2.wrapping_add(1), shift: p - 32, add }
}

/// The magic constant and shift amount for signed division by a fixed
/// divisor `d`, `d` not `0`, `1`, `-1`, or a power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicI32 {
    /// The multiplier, as a signed value.
    pub magic: i32,
    /// The final (post-correction) right-shift amount.
    pub shift: u32,
}

/// Compute the signed 32-bit magic multiplier for division by `d`.
/// Ported from Hacker's Delight figure 10-1's `magic` routine.
pub fn magic_i32(d: i32) -> MagicI32 {
    assert!(d != 0 && d != 1 && d != -1, "magic_i32 requires a proper divisor");
    let two31 = 0x8000_0000u32;
    let ad = (d as i64).unsigned_abs() as u32;
    let t = two31.wrapping_add((d as u32) >> 31);
    let anc = t - 1 - t % ad;
    let mut p = 31u32;
    let mut q1 = two31 / anc;
    let mut r1 = two31 - q1 * anc;
    let mut q2 = two31 / ad;
    let mut r2 = two31 - q2 * ad;
    loop {
        p += 1;
        q1 = q1.wrapping_mul(2);
        r1 = r1.wrapping_mul(2);
        if r1 >= anc {
            q1 = q1.wrapping_add(1);
            r1 -= anc;
        }
        q2 = q2.wrapping_mul(2);
        r2 = r2.wrapping_mul(2);
        if r2 >= ad {
            q2 = q2.wrapping_add(1);
            r2 -= ad;
        }
        let delta = ad - r2;
        if !(q1 < delta || (q1 == delta && r1 == 0)) {
            break;
        }
    }
    let mut mag = (q2 + 1) as i32;
    if d < 0 {
        mag = -mag;
    }
    MagicI32 { magic: mag, shift: p - 32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference values from Hacker's Delight's published magic-number
    /// table (figures 10-1/10-2), checked independently rather than
    /// derived by reapplying this module's own arithmetic.
    #[test]
    fn signed_magic_matches_the_published_table() {
        let cases: &[(i32, u32, u32)] = &[
            (3, 0x5555_5556, 0),
            (5, 0x6666_6667, 1),
            (6, 0x2AAA_AAAB, 0),
            (7, 0x9249_2493, 2),
            (9, 0x38E3_8E39, 1),
            (10, 0x6666_6667, 2),
            (11, 0x2E8B_A2E9, 1),
            (12, 0x2AAA_AAAB, 1),
            (25, 0x51EB_851F, 3),
            (-3, 0x5555_5555, 1),
            (-5, 0x9999_9999, 1),
            (-7, 0x6DB6_DB6D, 2),
        ];
        for &(d, magic, shift) in cases {
            let m = magic_i32(d);
            assert_eq!(m.magic as u32, magic, "magic for d={}", d);
            assert_eq!(m.shift, shift, "shift for d={}", d);
        }
    }

    #[test]
    fn unsigned_magic_matches_the_published_table() {
        let cases: &[(u32, u32, u32, bool)] = &[
            (3, 0x5555_5556, 0, false),
            (5, 0x6666_6667, 1, false),
            (6, 0x2AAA_AAAB, 0, false),
            (7, 0x9249_2493, 2, false),
            (9, 0x38E3_8E39, 1, false),
            (10, 0x6666_6667, 2, false),
            (11, 0x2E8B_A2E9, 1, false),
            (1000, 0x1062_4DD3, 6, false),
        ];
        for &(d, magic, shift, add) in cases {
            let m = magic_u32(d);
            assert_eq!(m.magic, magic, "magic for d={}", d);
            assert_eq!(m.shift, shift, "shift for d={}", d);
            assert_eq!(m.add, add, "add for d={}", d);
        }
    }

    #[test]
    #[should_panic]
    fn unsigned_magic_rejects_d_of_one() {
        magic_u32(1);
    }

    #[test]
    #[should_panic]
    fn signed_magic_rejects_plus_or_minus_one() {
        magic_i32(1);
    }
}
