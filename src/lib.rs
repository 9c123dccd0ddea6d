//! Rewrites relative or locale-formatted timestamps on a page into absolute
//! `YYYY-MM-DD HH:MM:SS` text, and keeps them that way as the page mutates.

pub mod config;
pub mod dom;
pub mod error;
pub mod normalizer;
pub mod output;
pub mod reconciler;

pub use config::{Bootstrap, Config, DisplayZone, HourClock, ObserveOptions, TimestampRecord};
pub use dom::{Dom, MemoryDom, MutationBatch, MutationKind, MutationRecord, NodeId};
pub use error::{ParseError, ReconcileError};
pub use reconciler::{DomReconciler, TimeSource, get_datetime, reconcile_page};
