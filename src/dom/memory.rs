use crossbeam::channel::{Sender, unbounded};
use std::mem;

use super::{Dom, MutationBatch, MutationKind, MutationRecord, NodeId, Observation, ObserverId};
use crate::config::ObserveOptions;

#[derive(Debug, Clone)]
enum NodeData {
    Document,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

#[derive(Debug)]
struct Observer {
    root: NodeId,
    options: ObserveOptions,
    pending: MutationBatch,
    tx: Sender<MutationBatch>,
}

/// Arena-backed tree. Mutations are queued per observer and handed out on [`Dom::flush`],
/// the way a browser batches records until the next microtask checkpoint.
#[derive(Debug)]
pub struct MemoryDom {
    nodes: Vec<Node>,
    observers: Vec<Option<Observer>>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            observers: Vec::new(),
        }
    }

    pub fn document(&self) -> NodeId {
        0
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        self.nodes.len() - 1
    }

    /// Attach `child` under `parent`, moving it if it already has a parent.
    /// Unknown ids and attaching a node beneath itself are ignored.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent >= self.nodes.len()
            || child >= self.nodes.len()
            || self.is_inclusive_ancestor(child, parent)
        {
            return;
        }
        if let Some(old) = self.nodes[child].parent.take() {
            self.nodes[old].children.retain(|&c| c != child);
            self.queue(old, MutationKind::ChildList);
        }
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        self.queue(parent, MutationKind::ChildList);
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(Node {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.nodes.get_mut(node)
        else {
            return;
        };
        match attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
        self.queue(node, MutationKind::Attributes);
    }

    /// Element with attributes and optional text, appended under `parent`.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
        text: Option<&str>,
    ) -> NodeId {
        let el = self.create_element(tag);
        if let NodeData::Element { attrs: slot, .. } = &mut self.nodes[el].data {
            slot.extend(attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        }
        if let Some(text) = text {
            let t = self.create_text(text);
            self.nodes[t].parent = Some(el);
            self.nodes[el].children.push(t);
        }
        self.append_child(parent, el);
        el
    }

    pub fn live_observers(&self) -> usize {
        self.observers.iter().flatten().count()
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node].parent {
                Some(p) => node = p,
                None => return false,
            }
        }
    }

    fn queue(&mut self, target: NodeId, kind: MutationKind) {
        let covers: Vec<bool> = self
            .observers
            .iter()
            .map(|slot| match slot {
                Some(o) => {
                    let wanted = match kind {
                        MutationKind::Attributes => o.options.attributes,
                        MutationKind::ChildList => o.options.child_list,
                    };
                    wanted
                        && (o.root == target
                            || (o.options.subtree && self.is_inclusive_ancestor(o.root, target)))
                }
                None => false,
            })
            .collect();

        for (slot, hit) in self.observers.iter_mut().zip(covers) {
            if let (Some(o), true) = (slot, hit) {
                o.pending.push(MutationRecord { target, kind });
            }
        }
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node].data {
            NodeData::Text(t) => out.push_str(t),
            _ => {
                for &c in &self.nodes[node].children {
                    self.collect_text(c, out);
                }
            }
        }
    }

    fn collect_tag(&self, node: NodeId, tag: &str, out: &mut Vec<NodeId>) {
        for &c in &self.nodes[node].children {
            if self.tag_name(c) == Some(tag) {
                out.push(c);
            }
            self.collect_tag(c, tag, out);
        }
    }
}

impl Dom for MemoryDom {
    fn body(&self) -> Option<NodeId> {
        self.elements_by_tag("body").into_iter().next()
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node)?.data {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(node)?.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        if node < self.nodes.len() {
            self.collect_text(node, &mut out);
        }
        out
    }

    fn set_text_content(&mut self, node: NodeId, text: &str) {
        match self.nodes.get_mut(node) {
            None => return,
            Some(Node {
                data: NodeData::Text(t),
                ..
            }) => {
                *t = text.to_string();
                return;
            }
            Some(_) => {}
        }
        let removed = mem::take(&mut self.nodes[node].children);
        for &c in &removed {
            self.nodes[c].parent = None;
        }
        let added = !text.is_empty();
        if added {
            let t = self.create_text(text);
            self.nodes[t].parent = Some(node);
            self.nodes[node].children.push(t);
        }
        if added || !removed.is_empty() {
            self.queue(node, MutationKind::ChildList);
        }
    }

    fn descendants_by_tag(&self, node: NodeId, tag: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        if node < self.nodes.len() {
            self.collect_tag(node, tag, &mut out);
        }
        out
    }

    fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants_by_tag(self.document(), tag)
    }

    fn observe(&mut self, root: NodeId, options: ObserveOptions) -> Observation {
        let (tx, rx) = unbounded();
        self.observers.push(Some(Observer {
            root,
            options,
            pending: Vec::new(),
            tx,
        }));
        Observation {
            id: self.observers.len() - 1,
            batches: rx,
        }
    }

    fn disconnect(&mut self, id: ObserverId) {
        if let Some(slot) = self.observers.get_mut(id) {
            *slot = None;
        }
    }

    fn flush(&mut self) {
        for slot in self.observers.iter_mut() {
            let Some(o) = slot else { continue };
            if o.pending.is_empty() {
                continue;
            }
            let batch = mem::take(&mut o.pending);
            // receiver gone: nobody is listening any more
            if o.tx.send(batch).is_err() {
                *slot = None;
            }
        }
    }
}
