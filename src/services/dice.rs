//! Dice expression evaluator.
//!
//! Parses expressions such as `d20`, `2d6+3` or `4d8-1` and rolls them,
//! optionally with advantage or disadvantage. The evaluator is generic over
//! the random source so that callers can use the thread RNG while tests use a
//! seeded generator.
//!
//! # Grammar
//!
//! ```text
//! [count]d<sides>[(+|-)<modifier>]
//! ```
//!
//! Case and surrounding whitespace are ignored. `count` defaults to 1.

use std::{fmt, str::FromStr, sync::LazyLock};

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MAX_DICE: u32 = 100;
pub const MIN_SIDES: u32 = 2;
pub const MAX_SIDES: u32 = 1000;
pub const MAX_MODIFIER: i32 = 1000;

static DICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{0,6})d(\d{1,6})(?:([+-])(\d{1,6}))?$").expect("dice pattern compiles")
});

/// Why an expression was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiceError {
    #[error("'{0}' is not a dice expression (expected e.g. 2d6+3)")]
    Malformed(String),

    #[error("dice count must be between 1 and 100")]
    CountOutOfRange,

    #[error("dice must have between 2 and 1000 sides")]
    SidesOutOfRange,

    #[error("modifier must be between -1000 and 1000")]
    ModifierOutOfRange,
}

/// How many times the dice set is rolled and which set is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollMode {
    #[default]
    Normal,
    /// Roll twice, keep the higher sum.
    Advantage,
    /// Roll twice, keep the lower sum.
    Disadvantage,
}

impl RollMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RollMode::Normal => "normal",
            RollMode::Advantage => "advantage",
            RollMode::Disadvantage => "disadvantage",
        }
    }
}

/// A validated dice expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceExpression {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_ascii_lowercase();

        let caps = DICE_PATTERN
            .captures(&normalized)
            .ok_or_else(|| DiceError::Malformed(input.trim().to_string()))?;

        // Captures are bounded to six digits, so these parses cannot overflow.
        let count = match &caps[1] {
            "" => 1,
            digits => digits.parse::<u32>().map_err(|_| DiceError::CountOutOfRange)?,
        };
        let sides = caps[2]
            .parse::<u32>()
            .map_err(|_| DiceError::SidesOutOfRange)?;
        let modifier = match (caps.get(3), caps.get(4)) {
            (Some(sign), Some(value)) => {
                let value = value
                    .as_str()
                    .parse::<i32>()
                    .map_err(|_| DiceError::ModifierOutOfRange)?;
                if sign.as_str() == "-" { -value } else { value }
            }
            _ => 0,
        };

        if !(1..=MAX_DICE).contains(&count) {
            return Err(DiceError::CountOutOfRange);
        }
        if !(MIN_SIDES..=MAX_SIDES).contains(&sides) {
            return Err(DiceError::SidesOutOfRange);
        }
        if modifier.abs() > MAX_MODIFIER {
            return Err(DiceError::ModifierOutOfRange);
        }

        Ok(Self {
            count,
            sides,
            modifier,
        })
    }
}

/// Canonical form: `2d6+3`, `1d20`, `4d8-1`.
impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

/// Outcome of one evaluation.
///
/// # JSON Example
///
/// ```json
/// {
///   "expression": "1d20+5",
///   "count": 1,
///   "sides": 20,
///   "modifier": 5,
///   "mode": "advantage",
///   "rolls": [17],
///   "dropped_rolls": [4],
///   "subtotal": 17,
///   "total": 22
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub expression: String,
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
    pub mode: RollMode,

    /// Kept dice
    pub rolls: Vec<u32>,

    /// The discarded set when rolling with advantage or disadvantage
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dropped_rolls: Option<Vec<u32>>,

    /// Sum of the kept dice
    pub subtotal: i32,

    /// `subtotal + modifier`
    pub total: i32,
}

impl DiceExpression {
    /// Roll the expression with the given mode and random source.
    pub fn roll<R: Rng + ?Sized>(&self, mode: RollMode, rng: &mut R) -> RollResult {
        let first = self.roll_set(rng);

        let (kept, dropped) = match mode {
            RollMode::Normal => (first, None),
            RollMode::Advantage | RollMode::Disadvantage => {
                let second = self.roll_set(rng);
                let second_wins = match mode {
                    RollMode::Advantage => sum(&second) > sum(&first),
                    _ => sum(&second) < sum(&first),
                };
                if second_wins {
                    (second, Some(first))
                } else {
                    (first, Some(second))
                }
            }
        };

        let subtotal = sum(&kept);
        RollResult {
            expression: self.to_string(),
            count: self.count,
            sides: self.sides,
            modifier: self.modifier,
            mode,
            rolls: kept,
            dropped_rolls: dropped,
            subtotal,
            total: subtotal + self.modifier,
        }
    }

    fn roll_set<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<u32> {
        (0..self.count)
            .map(|_| rng.random_range(1..=self.sides))
            .collect()
    }
}

fn sum(rolls: &[u32]) -> i32 {
    // count <= 100 and sides <= 1000, so the sum fits comfortably
    rolls.iter().map(|&r| r as i32).sum()
}

/// Parse and roll in one step using the thread-local RNG.
pub fn evaluate(expression: &str, mode: RollMode) -> Result<RollResult, DiceError> {
    let parsed: DiceExpression = expression.parse()?;
    Ok(parsed.roll(mode, &mut rand::rng()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn parse(s: &str) -> Result<DiceExpression, DiceError> {
        s.parse()
    }

    #[test]
    fn parses_full_expression() {
        assert_eq!(
            parse("2d6+3").unwrap(),
            DiceExpression {
                count: 2,
                sides: 6,
                modifier: 3
            }
        );
    }

    #[test]
    fn count_defaults_to_one() {
        let expr = parse("d20").unwrap();
        assert_eq!(expr.count, 1);
        assert_eq!(expr.sides, 20);
        assert_eq!(expr.modifier, 0);
    }

    #[test]
    fn negative_modifier_case_and_surrounding_whitespace() {
        let expr = parse("  4D8-1 ").unwrap();
        assert_eq!(
            expr,
            DiceExpression {
                count: 4,
                sides: 8,
                modifier: -1
            }
        );
        assert_eq!(expr.to_string(), "4d8-1");
    }

    #[test]
    fn inner_whitespace_is_malformed() {
        for bad in ["2 d 6", "2d6 + 3", "1 0 d 6", "4D8 - 1", "d 20"] {
            assert!(
                matches!(parse(bad), Err(DiceError::Malformed(_))),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn canonical_display() {
        assert_eq!(parse("d20").unwrap().to_string(), "1d20");
        assert_eq!(parse("3d4+0").unwrap().to_string(), "3d4");
        assert_eq!(parse("1d12+7").unwrap().to_string(), "1d12+7");
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "2x6", "d", "2d", "2d6+", "2d6++3", "d6d6", "roll 2d6", "2d6*2", "-1d6"] {
            assert!(
                matches!(parse(bad), Err(DiceError::Malformed(_))),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert_eq!(parse("0d6"), Err(DiceError::CountOutOfRange));
        assert_eq!(parse("101d6"), Err(DiceError::CountOutOfRange));
        assert_eq!(parse("1d1"), Err(DiceError::SidesOutOfRange));
        assert_eq!(parse("1d1001"), Err(DiceError::SidesOutOfRange));
        assert_eq!(parse("1d6+1001"), Err(DiceError::ModifierOutOfRange));
        assert_eq!(parse("1d6-1001"), Err(DiceError::ModifierOutOfRange));
        assert!(parse("100d1000-1000").is_ok());
    }

    #[test]
    fn normal_roll_stays_in_bounds() {
        let expr = parse("10d6+2").unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let result = expr.roll(RollMode::Normal, &mut rng);
            assert_eq!(result.rolls.len(), 10);
            assert!(result.rolls.iter().all(|r| (1..=6).contains(r)));
            assert!(result.dropped_rolls.is_none());
            assert_eq!(result.subtotal, result.rolls.iter().sum::<u32>() as i32);
            assert_eq!(result.total, result.subtotal + 2);
            assert!((12..=62).contains(&result.total));
        }
    }

    #[test]
    fn advantage_keeps_the_higher_set() {
        let expr = parse("1d20").unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let result = expr.roll(RollMode::Advantage, &mut rng);
            let dropped = result.dropped_rolls.clone().expect("two sets rolled");
            assert_eq!(dropped.len(), 1);
            assert!(result.subtotal >= dropped.iter().sum::<u32>() as i32);
        }
    }

    #[test]
    fn disadvantage_keeps_the_lower_set() {
        let expr = parse("2d6-1").unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..200 {
            let result = expr.roll(RollMode::Disadvantage, &mut rng);
            let dropped = result.dropped_rolls.clone().expect("two sets rolled");
            assert!(result.subtotal <= dropped.iter().sum::<u32>() as i32);
            assert_eq!(result.total, result.subtotal - 1);
        }
    }

    #[test]
    fn seeded_rolls_are_reproducible() {
        let expr = parse("3d8").unwrap();
        let a = expr.roll(RollMode::Advantage, &mut StdRng::seed_from_u64(99));
        let b = expr.roll(RollMode::Advantage, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn modifier_can_push_total_below_one() {
        let expr = parse("1d4-10").unwrap();
        let result = expr.roll(RollMode::Normal, &mut StdRng::seed_from_u64(1));
        assert!(result.total < 0);
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RollMode::Disadvantage).unwrap(),
            "\"disadvantage\""
        );
        let mode: RollMode = serde_json::from_str("\"advantage\"").unwrap();
        assert_eq!(mode, RollMode::Advantage);
    }

    #[test]
    fn evaluate_reports_parse_errors() {
        assert!(matches!(
            evaluate("banana", RollMode::Normal),
            Err(DiceError::Malformed(_))
        ));
        let result = evaluate("d6", RollMode::Normal).unwrap();
        assert_eq!(result.expression, "1d6");
    }
}
