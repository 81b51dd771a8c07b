use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::reduce_partition::constants::CONCAT_SEPARATOR;

/// User aggregation applied once per distinct key.
///
/// The order of `values` carries no meaning: the partition sort is unstable,
/// so two runs over the same input may present a key's values in different
/// orders. Implementations must depend only on the multiset of values.
pub trait ReduceFn {
    fn reduce(&self, key: &str, values: &[String]) -> Result<String>;
}

impl<F> ReduceFn for F
where
    F: Fn(&str, &[String]) -> Result<String>,
{
    fn reduce(&self, key: &str, values: &[String]) -> Result<String> {
        self(key, values)
    }
}

/// Reducers available from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinReducer {
    /// Number of values
    Count,
    /// Sum of values parsed as signed 64-bit integers
    Sum,
    /// Values sorted and joined with commas
    Concat,
    /// Number of distinct values
    Distinct,
    /// Smallest value in byte order
    Min,
    /// Largest value in byte order
    Max,
}

impl ReduceFn for BuiltinReducer {
    fn reduce(&self, key: &str, values: &[String]) -> Result<String> {
        match self {
            Self::Count => Ok(values.len().to_string()),
            Self::Sum => {
                let mut total: i64 = 0;
                for value in values {
                    let n: i64 = value
                        .trim()
                        .parse()
                        .with_context(|| format!("value {:?} for key {:?} is not an integer", value, key))?;
                    total = total
                        .checked_add(n)
                        .with_context(|| format!("sum for key {:?} overflows", key))?;
                }
                Ok(total.to_string())
            }
            Self::Concat => {
                let mut sorted: Vec<&str> = values.iter().map(String::as_str).collect();
                sorted.sort_unstable();
                Ok(sorted.join(CONCAT_SEPARATOR))
            }
            Self::Distinct => {
                let distinct: BTreeSet<&str> = values.iter().map(String::as_str).collect();
                Ok(distinct.len().to_string())
            }
            Self::Min => values
                .iter()
                .min()
                .cloned()
                .with_context(|| format!("no values for key {:?}", key)),
            Self::Max => values
                .iter()
                .max()
                .cloned()
                .with_context(|| format!("no values for key {:?}", key)),
        }
    }
}
