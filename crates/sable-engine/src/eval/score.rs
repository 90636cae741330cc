//! Middlegame/endgame score pair packed into one integer.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::eval::phase::MAX_PHASE;

/// A tapered evaluation term.
///
/// The middlegame half lives in the upper 16 bits and the endgame half in
/// the lower 16, so sums of terms are a single `i32` addition. The endgame
/// half is signed, which borrows from the upper half when negative;
/// [`mg`](Score::mg) rounds that borrow back out.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Score(i32);

impl Score {
    /// Both halves zero.
    pub const ZERO: Score = Score(0);

    /// Pack a middlegame and endgame value.
    #[inline]
    pub const fn new(mg: i16, eg: i16) -> Score {
        Score(((mg as i32) << 16).wrapping_add(eg as i32))
    }

    /// Middlegame half.
    #[inline]
    pub const fn mg(self) -> i16 {
        (self.0.wrapping_add(0x8000) >> 16) as i16
    }

    /// Endgame half.
    #[inline]
    pub const fn eg(self) -> i16 {
        self.0 as i16
    }

    /// Blend the two halves by game phase.
    ///
    /// `phase` runs from 0 (bare kings and pawns) to [`MAX_PHASE`]. Division
    /// truncates toward zero, so `(-s).taper(p) == -(s.taper(p))`.
    #[inline]
    pub fn taper(self, phase: i32) -> i32 {
        let phase = phase.clamp(0, MAX_PHASE);
        (self.mg() as i32 * phase + self.eg() as i32 * (MAX_PHASE - phase)) / MAX_PHASE
    }
}

/// `S(mg, eg)` shorthand for table literals.
#[allow(non_snake_case)]
#[inline]
pub const fn S(mg: i16, eg: i16) -> Score {
    Score::new(mg, eg)
}

impl Add for Score {
    type Output = Score;

    #[inline]
    fn add(self, rhs: Score) -> Score {
        Score(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for Score {
    #[inline]
    fn add_assign(&mut self, rhs: Score) {
        *self = *self + rhs;
    }
}

impl Sub for Score {
    type Output = Score;

    #[inline]
    fn sub(self, rhs: Score) -> Score {
        Score(self.0.wrapping_sub(rhs.0))
    }
}

impl SubAssign for Score {
    #[inline]
    fn sub_assign(&mut self, rhs: Score) {
        *self = *self - rhs;
    }
}

impl Neg for Score {
    type Output = Score;

    // Negating the raw word would flip the borrow as well; repack instead.
    #[inline]
    fn neg(self) -> Score {
        Score::new(-self.mg(), -self.eg())
    }
}

impl Mul<i16> for Score {
    type Output = Score;

    #[inline]
    fn mul(self, rhs: i16) -> Score {
        Score::new(self.mg() * rhs, self.eg() * rhs)
    }
}

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S({}, {})", self.mg(), self.eg())
    }
}

#[cfg(test)]
mod tests {
    use super::{S, Score};

    #[test]
    fn halves_survive_packing() {
        for (mg, eg) in [(100, 200), (-50, -30), (100, -50), (-100, 50), (0, -1)] {
            let s = S(mg, eg);
            assert_eq!((s.mg(), s.eg()), (mg, eg));
        }
    }

    #[test]
    fn arithmetic_is_per_half() {
        assert_eq!(S(10, 20) + S(30, -40), S(40, -20));
        assert_eq!(S(50, 60) - S(10, 80), S(40, -20));
        assert_eq!(-S(10, -20), S(-10, 20));
        assert_eq!(S(10, -20) * 3, S(30, -60));

        let mut s = S(1, 2);
        s += S(3, 4);
        s -= S(1, 1);
        assert_eq!(s, S(3, 5));
    }

    #[test]
    fn taper_endpoints() {
        let s = S(300, -100);
        assert_eq!(s.taper(24), 300);
        assert_eq!(s.taper(0), -100);
        assert_eq!(s.taper(12), 100);
    }

    #[test]
    fn taper_clamps_phase() {
        let s = S(80, 40);
        assert_eq!(s.taper(40), s.taper(24));
        assert_eq!(s.taper(-3), s.taper(0));
    }

    #[test]
    fn taper_is_sign_symmetric() {
        for phase in 0..=24 {
            let s = S(37, -11);
            assert_eq!((-s).taper(phase), -s.taper(phase));
        }
    }

    #[test]
    fn zero_is_zero() {
        assert_eq!(Score::ZERO.taper(17), 0);
        assert_eq!(Score::default(), Score::ZERO);
    }
}
