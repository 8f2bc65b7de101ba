//! Bounded, per-step message board robots use to announce what they did.

use std::collections::VecDeque;

use crate::types::{Position, RobotId, WasteId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Claimed(WasteId),
    Released(WasteId),
    Converted { produced: WasteId, at: Position },
    Delivered(WasteId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Message {
    pub step: u64,
    pub sender: RobotId,
    pub kind: MessageKind,
}

/// Only messages of the current step are kept; when full, the oldest entry
/// is dropped.
pub struct MessageBoard {
    step: u64,
    capacity: usize,
    entries: VecDeque<Message>,
}

impl MessageBoard {
    pub fn new(capacity: usize) -> Self {
        Self {
            step: 0,
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Advance to `step`, discarding everything posted earlier.
    pub fn begin_step(&mut self, step: u64) {
        self.step = step;
        self.entries.retain(|message| message.step >= step);
    }

    pub fn post(&mut self, sender: RobotId, kind: MessageKind) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Message {
            step: self.step,
            sender,
            kind,
        });
    }

    /// Whether another robot announced a claim on `id` during this step.
    pub fn claimed_by_other(&self, id: WasteId, robot: RobotId) -> bool {
        self.entries.iter().any(|message| {
            message.sender != robot && message.kind == MessageKind::Claimed(id)
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
