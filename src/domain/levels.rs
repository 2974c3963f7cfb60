use std::fmt;

/// Experience levels held in a bank account.
/// Stored as a signed integer so a bad request (e.g. -5) is representable and can be rejected.
pub type Levels = i64;

/// Parse a user-supplied level count.
/// Only whole, strictly positive numbers are accepted: "5" -> 5, " 12 " -> 12.
pub fn parse_levels(input: &str) -> Result<Levels, ParseLevelsError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseLevelsError::Empty);
    }

    let levels: Levels = input
        .parse()
        .map_err(|_| ParseLevelsError::NotANumber(input.to_string()))?;

    if levels < 1 {
        return Err(ParseLevelsError::NotPositive(levels));
    }

    Ok(levels)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseLevelsError {
    Empty,
    NotANumber(String),
    NotPositive(Levels),
}

impl fmt::Display for ParseLevelsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseLevelsError::Empty => write!(f, "no level count given"),
            ParseLevelsError::NotANumber(s) => write!(f, "'{}' is not a whole number", s),
            ParseLevelsError::NotPositive(n) => {
                write!(f, "level count must be a positive integer, got {}", n)
            }
        }
    }
}

impl std::error::Error for ParseLevelsError {}
