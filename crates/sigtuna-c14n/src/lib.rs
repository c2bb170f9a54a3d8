#![forbid(unsafe_code)]

//! XML Canonicalization (C14N 1.0) of element subtrees.
//!
//! Supports the four methods a WS-Security signature can reference:
//! inclusive and exclusive, each with or without comments. The subtree is
//! always rooted at an element (the signed SOAP Body or the SignedInfo), so
//! the general detached-node-set machinery of full C14N is not needed.

mod emit;
mod escape;
mod subtree;

use roxmltree::Node;
use sigtuna_core::{algorithm, SigningError};

/// Canonicalization method selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    Inclusive,
    InclusiveWithComments,
    Exclusive,
    ExclusiveWithComments,
}

impl C14nMode {
    /// The algorithm URI identifying this method.
    pub fn uri(&self) -> &'static str {
        match self {
            C14nMode::Inclusive => algorithm::C14N,
            C14nMode::InclusiveWithComments => algorithm::C14N_WITH_COMMENTS,
            C14nMode::Exclusive => algorithm::EXC_C14N,
            C14nMode::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// Look up a mode from its algorithm URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::C14N => Some(C14nMode::Inclusive),
            algorithm::C14N_WITH_COMMENTS => Some(C14nMode::InclusiveWithComments),
            algorithm::EXC_C14N => Some(C14nMode::Exclusive),
            algorithm::EXC_C14N_WITH_COMMENTS => Some(C14nMode::ExclusiveWithComments),
            _ => None,
        }
    }

    pub fn with_comments(&self) -> bool {
        matches!(
            self,
            C14nMode::InclusiveWithComments | C14nMode::ExclusiveWithComments
        )
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(
            self,
            C14nMode::Exclusive | C14nMode::ExclusiveWithComments
        )
    }
}

/// Canonicalize the subtree rooted at `apex` with the given method.
pub fn canonicalize_subtree(apex: Node<'_, '_>, mode: C14nMode) -> Result<Vec<u8>, SigningError> {
    subtree::canonicalize(apex, mode)
}
