use std::fmt;
use std::str::FromStr;

/// Calendar window for transaction statistics.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Period {
    OneWeek,
    OneMonth,
    ThreeMonths,
    SixMonths,
    #[default]
    TwelveMonths,
    TwentyFourMonths,
    ThirtySixMonths,
}

impl Period {
    pub const ALL: [Period; 7] = [
        Period::OneWeek,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::TwelveMonths,
        Period::TwentyFourMonths,
        Period::ThirtySixMonths,
    ];

    /// Wire form used in query strings (`1w`, `1m` .. `36m`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneWeek => "1w",
            Period::OneMonth => "1m",
            Period::ThreeMonths => "3m",
            Period::SixMonths => "6m",
            Period::TwelveMonths => "12m",
            Period::TwentyFourMonths => "24m",
            Period::ThirtySixMonths => "36m",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePeriodError(pub String);

impl fmt::Display for ParsePeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown period {:?} (expected one of 1w,1m,3m,6m,12m,24m,36m)", self.0)
    }
}

impl std::error::Error for ParsePeriodError {}

impl FromStr for Period {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == needle)
            .ok_or_else(|| ParsePeriodError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Period;

    #[test]
    fn parses_wire_names() {
        assert_eq!("1w".parse::<Period>().unwrap(), Period::OneWeek);
        assert_eq!(" 36M ".parse::<Period>().unwrap(), Period::ThirtySixMonths);
        assert!("2y".parse::<Period>().is_err());
    }

    #[test]
    fn default_is_twelve_months() {
        assert_eq!(Period::default().as_str(), "12m");
    }
}
