//! Virtual-Group Binder
//!
//! Routes payloads of a bucket to GVGs through local bindings and keeps
//! both size counters in step:
//! - a binding's stored and charge sizes
//! - a GVG's aggregate stored size
//!
//! Rebinding on migration is planned and fully validated before any
//! counter moves.

mod engine;

pub use engine::*;

use crate::types::*;
use std::collections::BTreeMap;

/// Outcome of binding a payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingEvent {
    /// A new local binding was created
    Created(LocalBinding),
    /// An existing local binding grew
    Updated(LocalBinding),
}

impl BindingEvent {
    pub fn binding(&self) -> &LocalBinding {
        match self {
            BindingEvent::Created(b) | BindingEvent::Updated(b) => b,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, BindingEvent::Created(_))
    }
}

/// Validated rebind of a bucket, ready to apply
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebindPlan {
    pub bucket_id: BucketId,
    /// Bindings after the rebind, ordered by binding id
    pub bindings: Vec<LocalBinding>,
    /// Net stored-size change per GVG
    pub gvg_deltas: BTreeMap<GvgId, i128>,
}
