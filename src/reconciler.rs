//! Keeps every `<time>` element under `<body>` showing canonical absolute text while the page
//! keeps changing underneath it.
//!
//! The only per-element state is the displayed text itself: text that already reads
//! `YYYY-MM-DD HH:MM:SS` is never written again. Each write we make produces another child-list
//! record for the same element, so that check is also what ends the write/notify cycle.

use tracing::{debug, info, trace, warn};

use crate::config::{Bootstrap, Config, TimestampRecord};
use crate::dom::{Dom, MutationKind, MutationRecord, NodeId, Observation};
use crate::error::{ParseError, ReconcileError};
use crate::normalizer::{is_already_canonical, normalize};

pub const TIME_TAG: &str = "time";
pub const DATETIME_ATTR: &str = "datetime";
pub const TITLE_ATTR: &str = "data-title";

// a well-behaved tree settles in two rounds (raw bootstrap, then canonical)
const MAX_PUMP_ROUNDS: usize = 64;

/// Where an element's timestamp comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeSource {
    /// `datetime` attribute of a `<time>` element.
    Structured(String),
    /// Locale-formatted tooltip text, e.g. `Jan 5, 2024 3:04pm GMT+0800`.
    FreeText(String),
}

impl TimeSource {
    pub fn raw(&self) -> &str {
        match self {
            TimeSource::Structured(s) | TimeSource::FreeText(s) => s,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TimeSource::Structured(_) => "structured",
            TimeSource::FreeText(_) => "free-text",
        }
    }
}

/// The machine attribute wins on `<time>` elements; anything else falls back to `data-title`.
pub fn get_datetime<D: Dom + ?Sized>(dom: &D, el: NodeId) -> Option<TimeSource> {
    if dom.tag_name(el) == Some(TIME_TAG) {
        if let Some(v) = dom.attribute(el, DATETIME_ATTR) {
            return Some(TimeSource::Structured(v.to_string()));
        }
    }
    dom.attribute(el, TITLE_ATTR)
        .map(|v| TimeSource::FreeText(v.to_string()))
}

/// Canonical text for `el`, or why there is none.
pub fn canonical_for<D: Dom + ?Sized>(
    dom: &D,
    el: NodeId,
    config: &Config,
) -> Result<String, ParseError> {
    let source = get_datetime(dom, el).ok_or(ParseError::NoSource)?;
    normalize(source.raw(), config)
}

#[derive(Debug, Default)]
pub struct DomReconciler {
    config: Config,
    observation: Option<Observation>,
}

impl DomReconciler {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            observation: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_observing(&self) -> bool {
        self.observation.is_some()
    }

    /// Subscribe to `<body>` and sweep the `<time>` elements already on the page.
    ///
    /// With [`Bootstrap::Raw`] the sweep only writes each element's raw value; the child-list
    /// records those writes produce are what bring the elements to canonical text on the next
    /// [`pump`](Self::pump).
    pub fn initialize<D: Dom>(&mut self, dom: &mut D) -> Result<(), ReconcileError> {
        if self.observation.is_some() {
            return Err(ReconcileError::AlreadyInitialized);
        }
        let Some(body) = dom.body() else {
            warn!("no <body> found, not observing");
            return Err(ReconcileError::MissingRoot);
        };

        self.observation = Some(dom.observe(body, self.config.observe));

        let elements = dom.elements_by_tag(TIME_TAG);
        let mut written = 0usize;
        for &el in &elements {
            let done = match self.config.bootstrap {
                Bootstrap::Raw => self.write_raw(dom, el),
                Bootstrap::Normalize => self.rewrite(dom, el),
            };
            written += done as usize;
        }

        info!(
            "observing <body> (node {body}); initial sweep wrote {written}/{} time elements",
            elements.len()
        );
        Ok(())
    }

    fn write_raw<D: Dom>(&self, dom: &mut D, el: NodeId) -> bool {
        if is_already_canonical(&dom.text_content(el)) {
            return false;
        }
        match get_datetime(dom, el) {
            Some(source) => {
                dom.set_text_content(el, source.raw());
                true
            }
            None => false,
        }
    }

    /// Bring one element to canonical text. Returns whether it was written.
    fn rewrite<D: Dom>(&self, dom: &mut D, el: NodeId) -> bool {
        let current = dom.text_content(el);
        if is_already_canonical(&current) {
            trace!(node = el, "already canonical");
            return false;
        }
        match canonical_for(dom, el, &self.config) {
            Ok(text) => {
                dom.set_text_content(el, &text);
                true
            }
            Err(e) => {
                debug!(node = el, text = %current, error = %e, "leaving text unchanged");
                false
            }
        }
    }

    /// Process one delivered batch in order. Returns the number of elements written.
    pub fn on_mutation_batch<D: Dom>(&self, dom: &mut D, batch: &[MutationRecord]) -> usize {
        trace!(records = batch.len(), "mutation batch");
        let mut written = 0usize;
        for record in batch {
            let times = dom.descendants_by_tag(record.target, TIME_TAG);
            if !times.is_empty() {
                for el in times {
                    written += self.rewrite(dom, el) as usize;
                }
                continue;
            }
            if dom.tag_name(record.target) != Some(TIME_TAG) {
                continue;
            }
            if record.kind == MutationKind::ChildList {
                written += self.rewrite(dom, record.target) as usize;
            }
        }
        written
    }

    /// Let the host deliver what it has queued and process it, until nothing more arrives.
    /// Returns the number of elements written.
    pub fn pump<D: Dom>(&self, dom: &mut D) -> usize {
        let Some(obs) = &self.observation else {
            return 0;
        };
        let mut written = 0usize;
        for _ in 0..MAX_PUMP_ROUNDS {
            dom.flush();
            let batches: Vec<_> = obs.batches.try_iter().collect();
            if batches.is_empty() {
                return written;
            }
            for batch in &batches {
                written += self.on_mutation_batch(dom, batch);
            }
        }
        warn!("mutations still arriving after {MAX_PUMP_ROUNDS} rounds, yielding");
        written
    }

    /// Drop the subscription. A later [`initialize`](Self::initialize) starts over.
    pub fn dispose<D: Dom>(&mut self, dom: &mut D) {
        if let Some(obs) = self.observation.take() {
            dom.disconnect(obs.id);
            info!("stopped observing");
        }
    }
}

/// Reconcile a static page until it settles, then report every `<time>` element: where its
/// value came from, what it showed before, and its canonical text or why there is none.
pub fn reconcile_page<D: Dom>(
    dom: &mut D,
    config: &Config,
) -> Result<Vec<TimestampRecord>, ReconcileError> {
    let before: Vec<(NodeId, String)> = dom
        .elements_by_tag(TIME_TAG)
        .into_iter()
        .map(|el| (el, dom.text_content(el)))
        .collect();

    let mut reconciler = DomReconciler::new(config.clone());
    reconciler.initialize(dom)?;
    reconciler.pump(dom);
    reconciler.dispose(dom);

    let records = before
        .into_iter()
        .map(|(el, before)| {
            let source = get_datetime(dom, el);
            let now = dom.text_content(el);
            let (canonical, error) = if is_already_canonical(&now) {
                (Some(now), None)
            } else {
                (None, canonical_for(dom, el, config).err().map(|e| e.to_string()))
            };
            TimestampRecord {
                source: source.as_ref().map(|s| s.kind().to_string()),
                raw: source.map(|s| s.raw().to_string()),
                before: Some(before),
                canonical,
                error,
            }
        })
        .collect();
    Ok(records)
}
