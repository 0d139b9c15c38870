//! Change classification for hotswap decisions.
//!
//! This module partitions a resource's property diffs into hotswappable and
//! non-hotswappable subsets given a per-resource-type allow-list, and defines
//! the [`Verdict`] sum type the deployment driver acts on.

mod engine;
mod verdict;

pub use engine::{classify, ClassifiedChanges};
pub use verdict::{
    reject_change, report_non_hotswappable, ApplyAction, ApplyFuture, HotswappableChange,
    NonHotswappableChange, Verdict, TAGS_PROPERTY,
};
