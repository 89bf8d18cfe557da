//! Outbound frame queues for one node.

use std::collections::VecDeque;

use zwave_frame::DataFrame;

/// Where [`FrameQueues::push`] put a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queued {
    /// Ready to send on the next idle tick.
    Write,
    /// Held until the node is known to be awake.
    Wakeup,
}

/// The write queue and the wakeup queue of a node.
///
/// The wakeup queue only holds frames while the node is not listening; it is
/// emptied into the front of the write queue as soon as the node is awake.
#[derive(Debug, Default)]
pub struct FrameQueues {
    listening: bool,
    write: VecDeque<DataFrame>,
    wakeup: VecDeque<DataFrame>,
}

impl FrameQueues {
    pub fn new(listening: bool) -> Self {
        FrameQueues {
            listening,
            ..Default::default()
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Update the listening flag. Becoming listening flushes the wakeup queue;
    /// the number of frames moved is returned.
    pub fn set_listening(&mut self, listening: bool) -> usize {
        self.listening = listening;
        if listening {
            self.flush_wakeup()
        } else {
            0
        }
    }

    /// Queue a frame. With `defer` set, a frame for a sleeping node goes to
    /// the wakeup queue instead of the write queue.
    pub fn push(&mut self, frame: DataFrame, defer: bool) -> Queued {
        if defer && !self.listening {
            self.wakeup.push_back(frame);
            Queued::Wakeup
        } else {
            self.write.push_back(frame);
            Queued::Write
        }
    }

    /// Move every deferred frame, in order, ahead of the frames already in the
    /// write queue. Returns how many frames moved.
    pub fn flush_wakeup(&mut self) -> usize {
        let moved = self.wakeup.len();
        if moved > 0 {
            let mut write = std::mem::take(&mut self.wakeup);
            write.append(&mut self.write);
            self.write = write;
        }
        moved
    }

    pub fn pop_front(&mut self) -> Option<DataFrame> {
        self.write.pop_front()
    }

    pub fn write_len(&self) -> usize {
        self.write.len()
    }

    pub fn wakeup_len(&self) -> usize {
        self.wakeup.len()
    }

    pub fn write_queue(&self) -> impl Iterator<Item = &DataFrame> {
        self.write.iter()
    }

    pub fn wakeup_queue(&self) -> impl Iterator<Item = &DataFrame> {
        self.wakeup.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zwave_frame::{NodeId, RequestNodeInfo};

    fn frame(node: u8) -> DataFrame {
        RequestNodeInfo::new(NodeId(node)).into()
    }

    #[test]
    fn test_listening_never_defers() {
        let mut queues = FrameQueues::new(true);
        assert_eq!(queues.push(frame(1), true), Queued::Write);
        assert_eq!(queues.write_len(), 1);
        assert_eq!(queues.wakeup_len(), 0);
    }

    #[test]
    fn test_sleeping_defers_only_when_asked() {
        let mut queues = FrameQueues::new(false);
        assert_eq!(queues.push(frame(1), true), Queued::Wakeup);
        assert_eq!(queues.push(frame(2), false), Queued::Write);
        assert_eq!(queues.write_len(), 1);
        assert_eq!(queues.wakeup_len(), 1);
    }

    #[test]
    fn test_flush_puts_deferred_frames_first() {
        let mut queues = FrameQueues::new(false);
        queues.push(frame(1), true);
        queues.push(frame(2), true);
        queues.push(frame(3), false);

        assert_eq!(queues.flush_wakeup(), 2);
        assert_eq!(queues.wakeup_len(), 0);
        let order: Vec<_> = queues.write_queue().cloned().collect();
        assert_eq!(order, vec![frame(1), frame(2), frame(3)]);
    }

    #[test]
    fn test_becoming_listening_flushes() {
        let mut queues = FrameQueues::new(false);
        queues.push(frame(1), true);
        assert_eq!(queues.set_listening(true), 1);
        assert_eq!(queues.pop_front(), Some(frame(1)));
        assert_eq!(queues.pop_front(), None);
    }
}
