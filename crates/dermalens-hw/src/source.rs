//! Where frames come from: a live camera or a prepared sequence.

use crate::frame::{Frame, FrameError};
use std::collections::VecDeque;

/// Produces frames for the detection loop.
///
/// `Ok(None)` means the next frame is not ready yet; the caller skips the
/// tick and asks again on the next one.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        (**self).next_frame()
    }
}

/// Replays pre-decoded frames in order.
///
/// With `hold_last`, the final frame keeps being returned once the queue is
/// drained, like a camera pointed at a still scene.
pub struct FrameSequence {
    frames: VecDeque<Frame>,
    last: Option<Frame>,
    hold_last: bool,
}

impl FrameSequence {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            last: None,
            hold_last: false,
        }
    }

    pub fn hold_last(mut self) -> Self {
        self.hold_last = true;
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for FrameSequence {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        match self.frames.pop_front() {
            Some(frame) => {
                if self.hold_last {
                    self.last = Some(frame.clone());
                }
                Ok(Some(frame))
            }
            None if self.hold_last => Ok(self.last.clone()),
            None => Ok(None),
        }
    }
}
