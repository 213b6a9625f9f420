//! Bill-of-materials explosion for order section strings
//!
//! An order's section string is a `-` separated token list. A token starting
//! with the section prefix (`M`) names a parent section; the token right after
//! it, when it does not carry the prefix, lists the section's child codes one
//! character per child. `M1-FX-M2-M3-A` yields three sections: `M1` with
//! children `F` and `X`, `M2` without children and `M3` with child `A`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix reserved for parent section tokens
pub const SECTION_PREFIX: char = 'M';

/// Reasons a section string cannot be exploded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BomError {
    /// The string contains no tokens at all
    #[error("section string is empty")]
    Empty,

    /// Two separators with nothing between them
    #[error("empty token at position {0}")]
    EmptyToken(usize),

    /// A child list that does not follow a section token
    #[error("token '{token}' at position {position} does not follow a section")]
    StrayToken {
        /// The offending token
        token: String,
        /// Zero-based token position
        position: usize,
    },
}

/// A child required by a section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSpec {
    /// Child product code
    pub code: String,
    /// Size code inherited from the order
    pub size: String,
}

/// A parent section with its required children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpec {
    /// One-based section number within the order
    pub section: u32,
    /// Parent product code
    pub code: String,
    /// Size code of the order
    pub size: String,
    /// Children to be mounted at assembly
    pub children: Vec<ChildSpec>,
}

/// Explode a section string into parent sections and their children
pub fn parse_sections(sections: &str, size: &str) -> Result<Vec<SectionSpec>, BomError> {
    let trimmed = sections.trim();
    if trimmed.is_empty() {
        return Err(BomError::Empty);
    }

    let tokens: Vec<&str> = trimmed.split('-').map(str::trim).collect();
    let mut bom = Vec::new();
    let mut position = 0;

    while position < tokens.len() {
        let token = tokens[position];
        if token.is_empty() {
            return Err(BomError::EmptyToken(position));
        }
        if !token.starts_with(SECTION_PREFIX) {
            return Err(BomError::StrayToken { token: token.to_string(), position });
        }

        let mut section = SectionSpec {
            section: bom.len() as u32 + 1,
            code: token.to_string(),
            size: size.to_string(),
            children: Vec::new(),
        };

        if let Some(next) = tokens.get(position + 1) {
            if next.is_empty() {
                return Err(BomError::EmptyToken(position + 1));
            }
            if !next.starts_with(SECTION_PREFIX) {
                section.children = next
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .map(|c| ChildSpec { code: c.to_string(), size: size.to_string() })
                    .collect();
                position += 1;
            }
        }

        bom.push(section);
        position += 1;
    }

    Ok(bom)
}
