use crate::error::{Dp21Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Benchmark emission scenario backing one slice of the ice-sheet ensemble.
///
/// The ordering matters: the discriminant is the branch index in a stacked
/// pool and the label handed out by the scenario selector.
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Rcp26 = 0,
    Rcp45 = 1,
    Rcp85 = 2,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Rcp26, Scenario::Rcp45, Scenario::Rcp85];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Rcp26 => "rcp26",
            Scenario::Rcp45 => "rcp45",
            Scenario::Rcp85 => "rcp85",
        }
    }

    /// Position of this scenario on the branch axis of a stacked pool.
    pub fn branch(&self) -> usize {
        *self as usize
    }
}

impl FromStr for Scenario {
    type Err = Dp21Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rcp26" => Ok(Scenario::Rcp26),
            "rcp45" => Ok(Scenario::Rcp45),
            "rcp85" => Ok(Scenario::Rcp85),
            other => Err(Dp21Error::UnknownScenario(other.to_string())),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Scenario;
    use crate::error::Dp21Error;

    #[test]
    fn test_parse_scenario() {
        assert_eq!("rcp26".parse::<Scenario>().unwrap(), Scenario::Rcp26);
        assert_eq!(" RCP85 ".parse::<Scenario>().unwrap(), Scenario::Rcp85);
        assert!(matches!(
            "ssp585".parse::<Scenario>(),
            Err(Dp21Error::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_branch_follows_declaration_order() {
        let branches: Vec<usize> = Scenario::ALL.iter().map(Scenario::branch).collect();
        assert_eq!(branches, vec![0, 1, 2]);
    }
}
