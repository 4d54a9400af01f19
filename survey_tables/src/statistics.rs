use log::{debug, warn};

/// Which end of the scale a derived recode groups.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Direction {
    Top,
    Bottom,
}

impl Direction {
    pub fn letter(&self) -> char {
        match self {
            Direction::Top => 't',
            Direction::Bottom => 'b',
        }
    }

    fn multiplier(&self) -> i64 {
        match self {
            Direction::Top => 1,
            Direction::Bottom => 2,
        }
    }

    fn caption(&self) -> &'static str {
        match self {
            Direction::Top => "Top",
            Direction::Bottom => "Bottom",
        }
    }
}

/// A top-N or bottom-N request.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct StatRequest {
    pub direction: Direction,
    pub n: u32,
}

impl StatRequest {
    pub fn top(n: u32) -> StatRequest {
        StatRequest {
            direction: Direction::Top,
            n,
        }
    }

    pub fn bottom(n: u32) -> StatRequest {
        StatRequest {
            direction: Direction::Bottom,
            n,
        }
    }

    /// The code given to the derived category: 102 for top-2, 203 for bottom-3.
    pub fn derived_value(&self) -> i64 {
        self.direction.multiplier() * 100 + self.n as i64
    }

    /// "Top-2", "Bottom-3"
    pub fn caption(&self) -> String {
        format!("{}-{}", self.direction.caption(), self.n)
    }

    /// The name of the derived variable, for instance `t2Q5`.
    pub fn variable_name(&self, question_id: &str) -> String {
        format!("{}{}{}", self.direction.letter(), self.n, question_id)
    }

    /// Selects the codes grouped by this request.
    ///
    /// `sorted_codes` must be in ascending order. For bottom requests the lowest
    /// code is reserved for a sentinel answer and never selected.
    pub fn select_codes(&self, sorted_codes: &[i64]) -> Vec<i64> {
        let n = self.n as usize;
        match self.direction {
            Direction::Top => {
                let start = sorted_codes.len().saturating_sub(n);
                sorted_codes[start..].to_vec()
            }
            Direction::Bottom => sorted_codes.iter().skip(1).take(n).cloned().collect(),
        }
    }
}

/// Column percentages, plus the derived top/bottom categories.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Percentage {
    pub requests: Vec<StatRequest>,
}

/// The statistics computed for a table.
///
/// Both percentages and the mean may be requested at the same time. The default
/// configuration requests nothing: the table only shows counts.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct StatisticsConfig {
    pub percentage: Option<Percentage>,
    pub mean: bool,
}

impl StatisticsConfig {
    pub fn percentage(requests: &[StatRequest]) -> StatisticsConfig {
        StatisticsConfig {
            percentage: Some(Percentage {
                requests: requests.to_vec(),
            }),
            mean: false,
        }
    }

    pub fn with_mean(self) -> StatisticsConfig {
        StatisticsConfig { mean: true, ..self }
    }

    /// Parses the space-separated properties of the spreadsheet, e.g. `t2 b3 m`.
    ///
    /// Column percentages are always enabled. Malformed top/bottom requests are
    /// logged and skipped, without affecting the other requests.
    pub fn from_properties(properties: &str) -> StatisticsConfig {
        let mut requests: Vec<StatRequest> = Vec::new();
        let mut mean = false;
        for token in properties.split_whitespace() {
            let direction = match token.chars().next() {
                Some('t') => Some(Direction::Top),
                Some('b') => Some(Direction::Bottom),
                Some('m') => {
                    mean = true;
                    None
                }
                _ => {
                    debug!("from_properties: ignoring property {:?}", token);
                    None
                }
            };
            if let Some(direction) = direction {
                match token[1..].parse::<u32>() {
                    Ok(n) if n > 0 => requests.push(StatRequest { direction, n }),
                    _ => warn!(
                        "from_properties: skipping malformed statistic request {:?}",
                        token
                    ),
                }
            }
        }
        StatisticsConfig {
            percentage: Some(Percentage { requests }),
            mean,
        }
    }

    /// The properties string understood by `from_properties`.
    pub fn to_properties(&self) -> String {
        let mut tokens: Vec<String> = Vec::new();
        if let Some(p) = &self.percentage {
            for r in p.requests.iter() {
                tokens.push(format!("{}{}", r.direction.letter(), r.n));
            }
        }
        if self.mean {
            tokens.push("m".to_string());
        }
        tokens.join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.percentage.is_none() && !self.mean
    }
}
