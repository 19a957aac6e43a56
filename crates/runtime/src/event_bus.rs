use std::collections::VecDeque;

use crate::frame::Frame;

/// A frame-tagged event.
///
/// `kind` names the event family (`"knotVisibility"`, `"pick"`, ...) and the
/// payload carries its structured content.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T> {
    pub frame_index: u64,
    pub kind: &'static str,
    pub payload: T,
}

/// Event log for one render loop.
///
/// Unbounded by default; [`EventBus::bounded`] keeps only the newest
/// `limit` events and drops older ones as new ones arrive.
///
/// Ordering contract: events are stored in emission order; `drain` hands
/// them out in that same order.
#[derive(Debug)]
pub struct EventBus<T = String> {
    events: VecDeque<Event<T>>,
    limit: Option<usize>,
    dropped: u64,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
            limit: None,
            dropped: 0,
        }
    }

    pub fn bounded(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    pub fn emit(&mut self, frame: Frame, kind: &'static str, payload: impl Into<T>) {
        self.events.push_back(Event {
            frame_index: frame.index,
            kind,
            payload: payload.into(),
        });
        if let Some(limit) = self.limit {
            while self.events.len() > limit {
                self.events.pop_front();
                self.dropped += 1;
            }
        }
    }

    /// Retained events, oldest first.
    pub fn events(&self) -> impl DoubleEndedIterator<Item = &Event<T>> + ExactSizeIterator {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events evicted by the retention limit so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn events_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Event<T>> + 'a {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    pub fn drain(&mut self) -> Vec<Event<T>> {
        self.events.drain(..).collect()
    }
}
