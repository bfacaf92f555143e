//! Score-to-color and score-to-interpretation policy.
//!
//! A four-tier step function shared by the overall score badge and the
//! per-category progress bars. Pure and stateless; every call site applies it
//! independently.

/// Display color in 8-bit RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const GREEN: Rgb = Rgb {
    r: 34,
    g: 197,
    b: 94,
};
pub const AMBER: Rgb = Rgb {
    r: 251,
    g: 191,
    b: 36,
};
pub const ORANGE: Rgb = Rgb {
    r: 251,
    g: 146,
    b: 60,
};
pub const RED: Rgb = Rgb {
    r: 239,
    g: 68,
    b: 68,
};

pub fn score_color(score: u8) -> Rgb {
    match score {
        80.. => GREEN,
        60..=79 => AMBER,
        40..=59 => ORANGE,
        _ => RED,
    }
}

pub fn score_interpretation(score: u8) -> &'static str {
    match score {
        80.. => "Excellent - Your organization demonstrates strong cyber resilience",
        60..=79 => "Good - Your organization has solid foundations with room for improvement",
        40..=59 => "Fair - Several areas require attention to improve resilience",
        _ => "Needs Improvement - Significant gaps identified in cyber resilience",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries_land_on_documented_side() {
        assert_eq!(score_color(80), GREEN);
        assert_eq!(score_color(79), AMBER);
        assert_eq!(score_color(60), AMBER);
        assert_eq!(score_color(59), ORANGE);
        assert_eq!(score_color(40), ORANGE);
        assert_eq!(score_color(39), RED);
        assert_eq!(score_color(0), RED);
        assert_eq!(score_color(100), GREEN);
    }

    #[test]
    fn interpretation_matches_color_tier() {
        assert!(score_interpretation(92).starts_with("Excellent"));
        assert!(score_interpretation(80).starts_with("Excellent"));
        assert!(score_interpretation(65).starts_with("Good"));
        assert!(score_interpretation(45).starts_with("Fair"));
        assert!(score_interpretation(12).starts_with("Needs Improvement"));
    }

    #[test]
    fn policy_is_deterministic_across_full_range() {
        for score in 0..=100u8 {
            assert_eq!(score_color(score), score_color(score));
            assert_eq!(score_interpretation(score), score_interpretation(score));
        }
    }
}
