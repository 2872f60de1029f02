//! Pipeline stage marker.

use crate::error::HardenerError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Which manifest a stage works on: 1 = original scan, 2 = remediated,
/// 3 = functionality restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Iteration {
    Original,
    Remediated,
    Functional,
}

impl Iteration {
    pub fn number(&self) -> u8 {
        match self {
            Self::Original => 1,
            Self::Remediated => 2,
            Self::Functional => 3,
        }
    }
}

impl FromStr for Iteration {
    type Err = HardenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Self::Original),
            "2" => Ok(Self::Remediated),
            "3" => Ok(Self::Functional),
            other => Err(HardenerError::InvalidIteration(other.to_string())),
        }
    }
}

impl fmt::Display for Iteration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl Serialize for Iteration {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(self.number())
    }
}
