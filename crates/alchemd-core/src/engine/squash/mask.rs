//! Atom index masks in the `@1-23,34-47` range syntax.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MaskError {
    #[error("Mask '{0}' must start with '@'")]
    MissingPrefix(String),
    #[error("Invalid atom index '{0}' in mask")]
    InvalidIndex(String),
    #[error("Atom indices in masks are 1-based; found 0")]
    ZeroIndex,
    #[error("Descending range '{0}' in mask")]
    DescendingRange(String),
}

/// A sorted set of unique 0-based atom indices.
///
/// Renders as 1-based contiguous runs (`@1-3,7,9-10`) so that large selections
/// stay short; an empty mask renders as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AtomMask {
    indices: Vec<usize>,
}

impl AtomMask {
    pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut indices: Vec<usize> = indices.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    /// A mask covering `start..end`.
    pub fn range(start: usize, end: usize) -> Self {
        Self {
            indices: (start..end).collect(),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    /// Inclusive 1-based runs of consecutive indices.
    pub fn runs(&self) -> Vec<(usize, usize)> {
        let mut runs: Vec<(usize, usize)> = Vec::new();
        for &i in &self.indices {
            let one_based = i + 1;
            match runs.last_mut() {
                Some((_, end)) if *end + 1 == one_based => *end = one_based,
                _ => runs.push((one_based, one_based)),
            }
        }
        runs
    }
}

impl FromIterator<usize> for AtomMask {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for AtomMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.indices.is_empty() {
            return Ok(());
        }
        let runs: Vec<String> = self
            .runs()
            .into_iter()
            .map(|(start, end)| {
                if start == end {
                    start.to_string()
                } else {
                    format!("{start}-{end}")
                }
            })
            .collect();
        write!(f, "@{}", runs.join(","))
    }
}

fn parse_one_based(s: &str) -> Result<usize, MaskError> {
    let value: usize = s
        .trim()
        .parse()
        .map_err(|_| MaskError::InvalidIndex(s.to_string()))?;
    if value == 0 {
        return Err(MaskError::ZeroIndex);
    }
    Ok(value)
}

impl FromStr for AtomMask {
    type Err = MaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        let body = s
            .strip_prefix('@')
            .ok_or_else(|| MaskError::MissingPrefix(s.to_string()))?;

        let mut indices = Vec::new();
        for part in body.split(',') {
            match part.split_once('-') {
                Some((start, end)) => {
                    let (start, end) = (parse_one_based(start)?, parse_one_based(end)?);
                    if end < start {
                        return Err(MaskError::DescendingRange(part.to_string()));
                    }
                    indices.extend((start - 1)..end);
                }
                None => indices.push(parse_one_based(part)? - 1),
            }
        }
        Ok(Self::new(indices))
    }
}
