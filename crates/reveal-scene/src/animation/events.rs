//! Lifecycle events for reveal sequences.
//!
//! Sequencers and sections push events into an `EventQueue` while they are
//! updated; the host drains the queue after each frame.
//!
//! # Usage
//!
//! ```ignore
//! section.on_frame(16.0, &mut sink);
//! for event in section.drain_events() {
//!     match event {
//!         RevealEvent::Visibility { section, state } => println!("{section} is now {state:?}"),
//!         RevealEvent::Sequence { event: SequenceEvent::Completed, track, .. } => {
//!             println!("{track} finished");
//!         }
//!         _ => {}
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::observer::VisibilityState;

/// Event emitted by an `AnimationSequencer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SequenceEvent {
    /// A step left its start offset and began moving.
    StepStarted { step: String },
    /// A step reached its destination.
    StepEnded { step: String },
    /// Every step reached the visible variant.
    Completed,
    /// Visibility was lost and the steps head back to the hidden variant.
    Reversed,
    /// Every step came back to rest at the hidden variant.
    Rewound,
    /// Torn down; values are frozen.
    Cancelled,
}

impl SequenceEvent {
    /// Step this event refers to, if any.
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::StepStarted { step } | Self::StepEnded { step } => Some(step),
            _ => None,
        }
    }
}

/// Event emitted by a `SectionRenderer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RevealEvent {
    /// The section's region crossed its threshold.
    Visibility {
        section: String,
        state: VisibilityState,
    },
    /// Deferred children were mounted.
    ChildrenMounted { section: String },
    /// A track of the section reported progress.
    Sequence {
        section: String,
        track: String,
        event: SequenceEvent,
    },
    /// The section was torn down.
    Unmounted { section: String },
}

impl RevealEvent {
    /// Get the section id for this event.
    pub fn section(&self) -> &str {
        match self {
            Self::Visibility { section, .. }
            | Self::ChildrenMounted { section }
            | Self::Sequence { section, .. }
            | Self::Unmounted { section } => section,
        }
    }

    /// Check if this reports a track finishing its reveal.
    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            Self::Sequence {
                event: SequenceEvent::Completed,
                ..
            }
        )
    }
}

/// FIFO queue for events collected during update cycles.
#[derive(Debug, Clone)]
pub struct EventQueue<T> {
    events: VecDeque<T>,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: T) {
        self.events.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn pop(&mut self) -> Option<T> {
        self.events.pop_front()
    }

    /// Drain all events from the queue, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.events.drain(..)
    }

    pub fn peek(&self) -> Option<&T> {
        self.events.front()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.events.iter()
    }
}

impl EventQueue<RevealEvent> {
    /// Get events for a specific section.
    pub fn events_for_section(&self, section: &str) -> Vec<&RevealEvent> {
        self.events
            .iter()
            .filter(|e| e.section() == section)
            .collect()
    }
}
