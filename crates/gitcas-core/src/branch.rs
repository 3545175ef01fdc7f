//! # Branch Identifiers
//!
//! Storage is sharded across version-control branches. Each shard is an
//! integer id that only ever increases; its branch name is the id in
//! lowercase base-36, left-padded with zeros to [`BRANCH_NAME_WIDTH`].
//!
//! The rendered name appears in every public URL, so the encoding is part
//! of the durable contract.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Fixed width of a rendered branch name.
pub const BRANCH_NAME_WIDTH: usize = 8;

const RADIX: u64 = 36;

/// Integer shard id of a storage branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(u64);

impl BranchId {
    /// Wrap a raw branch id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw integer id.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The id that follows this one after a rollover.
    pub fn next(&self, offset: u64) -> Self {
        Self(self.0.saturating_add(offset))
    }

    /// Render the branch name: lowercase base-36, zero-padded to width 8.
    pub fn name(&self) -> String {
        let mut digits = Vec::with_capacity(BRANCH_NAME_WIDTH);
        let mut n = self.0;
        loop {
            let d = (n % RADIX) as u32;
            digits.push(std::char::from_digit(d, RADIX as u32).unwrap_or('0'));
            n /= RADIX;
            if n == 0 {
                break;
            }
        }
        while digits.len() < BRANCH_NAME_WIDTH {
            digits.push('0');
        }
        digits.iter().rev().collect()
    }

    /// Parse a rendered branch name back into an id.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        if name.len() < BRANCH_NAME_WIDTH {
            return Err(CoreError::InvalidBranch(format!(
                "{name:?} is shorter than {BRANCH_NAME_WIDTH} characters"
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        {
            return Err(CoreError::InvalidBranch(format!(
                "{name:?} must be lowercase base-36"
            )));
        }
        u64::from_str_radix(name, RADIX as u32)
            .map(Self)
            .map_err(|e| CoreError::InvalidBranch(format!("{name:?}: {e}")))
    }
}

impl std::fmt::Display for BranchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}
