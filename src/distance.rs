//! Harness-level distance metric

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BenchError;

/// Distance metric a collection is configured with
///
/// Every backend maps each variant to exactly one native value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distance {
    #[serde(alias = "l2", alias = "euclidean")]
    L2Squared,
    #[serde(alias = "angular")]
    Cosine,
    #[serde(alias = "dot_product")]
    Dot,
}

impl Distance {
    pub const ALL: [Distance; 3] = [Distance::L2Squared, Distance::Cosine, Distance::Dot];

    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::L2Squared => "l2_squared",
            Distance::Cosine => "cosine",
            Distance::Dot => "dot",
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distance {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l2_squared" | "l2" | "euclidean" => Ok(Distance::L2Squared),
            "cosine" | "angular" => Ok(Distance::Cosine),
            "dot" | "dot_product" => Ok(Distance::Dot),
            other => Err(BenchError::Configuration(format!(
                "unknown distance '{}', expected one of: l2_squared, cosine, dot",
                other
            ))),
        }
    }
}
