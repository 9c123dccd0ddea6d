//! The page tree as this crate sees it: something to query, read attributes from, write text into,
//! and observe for changes. The tree itself belongs to the host.

pub mod html;
pub mod memory;

use crossbeam::channel::Receiver;

use crate::config::ObserveOptions;

pub use memory::MemoryDom;

pub type NodeId = usize;
pub type ObserverId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Attributes,
    ChildList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

/// Records delivered together in one notification, in the order they happened.
pub type MutationBatch = Vec<MutationRecord>;

/// A live subscription: batches for it arrive on `batches`.
#[derive(Debug)]
pub struct Observation {
    pub id: ObserverId,
    pub batches: Receiver<MutationBatch>,
}

pub trait Dom {
    fn body(&self) -> Option<NodeId>;

    /// Lowercase element name, `None` for text nodes.
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    fn text_content(&self, node: NodeId) -> String;

    /// Replace all children of `node` with a single text node.
    fn set_text_content(&mut self, node: NodeId, text: &str);

    /// Descendant elements named `tag`, in document order. `node` itself is not included.
    fn descendants_by_tag(&self, node: NodeId, tag: &str) -> Vec<NodeId>;

    /// Every element named `tag` in the document.
    fn elements_by_tag(&self, tag: &str) -> Vec<NodeId>;

    fn observe(&mut self, root: NodeId, options: ObserveOptions) -> Observation;

    fn disconnect(&mut self, id: ObserverId);

    /// Hand queued records to observers. Hosts that deliver on their own schedule can ignore this.
    fn flush(&mut self) {}
}
