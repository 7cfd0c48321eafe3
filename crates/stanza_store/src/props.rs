//! The 4-bit aspect mask carried on every dependency edge.
//!
//! An edge from X to Y says "X used some part of Y". The mask records
//! which parts: raw content, attributes, compiled content, and output
//! path. Outdatedness checks consult only the aspects that actually
//! changed, so an attribute edit does not invalidate a dependent that
//! read nothing but raw content.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Which aspects of a dependency target were used.
///
/// The all-false mask is the identity of [`merge`](DepProps::merge) and
/// denotes an edge that exists but asserts nothing.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DepProps {
    /// The target's raw content was used.
    pub raw_content: bool,
    /// The target's attributes were used.
    pub attributes: bool,
    /// The target's compiled content was used.
    pub compiled_content: bool,
    /// The target's output path was used.
    pub path: bool,
}

impl DepProps {
    /// The empty mask.
    pub const NONE: DepProps = DepProps {
        raw_content: false,
        attributes: false,
        compiled_content: false,
        path: false,
    };

    /// Only the raw-content aspect.
    pub const RAW_CONTENT: DepProps = DepProps {
        raw_content: true,
        attributes: false,
        compiled_content: false,
        path: false,
    };

    /// Only the attributes aspect.
    pub const ATTRIBUTES: DepProps = DepProps {
        raw_content: false,
        attributes: true,
        compiled_content: false,
        path: false,
    };

    /// Only the compiled-content aspect.
    pub const COMPILED_CONTENT: DepProps = DepProps {
        raw_content: false,
        attributes: false,
        compiled_content: true,
        path: false,
    };

    /// Only the path aspect.
    pub const PATH: DepProps = DepProps {
        raw_content: false,
        attributes: false,
        compiled_content: false,
        path: true,
    };

    /// Combines two masks; a bit is set in the result if it is set in
    /// either input.
    pub fn merge(self, other: DepProps) -> DepProps {
        DepProps {
            raw_content: self.raw_content || other.raw_content,
            attributes: self.attributes || other.attributes,
            compiled_content: self.compiled_content || other.compiled_content,
            path: self.path || other.path,
        }
    }

    /// Returns `true` if no aspect is set.
    pub fn is_none(self) -> bool {
        self == DepProps::NONE
    }
}

impl BitOr for DepProps {
    type Output = DepProps;

    fn bitor(self, rhs: DepProps) -> DepProps {
        self.merge(rhs)
    }
}

impl fmt::Debug for DepProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Props({}{}{}{})",
            if self.raw_content { 'r' } else { '_' },
            if self.attributes { 'a' } else { '_' },
            if self.compiled_content { 'c' } else { '_' },
            if self.path { 'p' } else { '_' },
        )
    }
}
