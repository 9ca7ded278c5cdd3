/// Experience needed to advance one level. Uniform, does not scale.
pub const XP_PER_LEVEL: i32 = 100;

/// The level a cumulative xp total corresponds to. Level is always derived
/// through this function and never stored independently.
pub fn level_for_xp(xp: i32) -> i32 {
    xp / XP_PER_LEVEL + 1
}

/// Progress within the current level, in xp
pub fn xp_into_level(xp: i32) -> i32 {
    xp % XP_PER_LEVEL
}

/// Progress towards the next level as a fraction between 0 and 1.
/// This is the single source of truth for progress bars; deriving it from
/// `xp - level * 100` is wrong for any level above 1.
pub fn progress_fraction(xp: i32) -> f32 {
    xp_into_level(xp) as f32 / XP_PER_LEVEL as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_a_pure_function_of_xp() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(120), 2);
        assert_eq!(level_for_xp(250), 3);
        assert_eq!(level_for_xp(300), 4);

        for xp in 0..1000 {
            assert_eq!(level_for_xp(xp), xp / 100 + 1);
        }
    }

    #[test]
    fn progress_uses_the_modulus_form_above_level_one() {
        // xp = 250 is level 3. The broken level * 100 subtraction would
        // yield -50 here; the modulus form must yield 50.
        assert_eq!(xp_into_level(250), 50);
        assert!(xp_into_level(250) != 250 - level_for_xp(250) * 100);

        assert_eq!(progress_fraction(250), 0.5);
        assert_eq!(progress_fraction(0), 0.0);
        assert!((progress_fraction(199) - 0.99).abs() < 1e-6);
    }
}
