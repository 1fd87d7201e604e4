/// Writes deferred to the next paint.
///
/// Item formatting waits until the mutation that triggered it has settled.
/// Tasks are plain data; the scheduler decides when they become runnable.
use crate::tree::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTask {
    FormatSection(NodeId),
    MarkComment(NodeId),
    MarkBlocked(NodeId),
    /// Collapse a header whose stored state says collapsed.
    RestoreSection(NodeId),
}

impl FrameTask {
    pub fn item(self) -> NodeId {
        match self {
            FrameTask::FormatSection(n)
            | FrameTask::MarkComment(n)
            | FrameTask::MarkBlocked(n)
            | FrameTask::RestoreSection(n) => n,
        }
    }
}

pub trait FrameScheduler {
    fn defer(&mut self, task: FrameTask);

    /// Tasks runnable as soon as the current handler returns.
    fn ready(&mut self) -> Vec<FrameTask>;

    /// Tasks of the frame the host just painted.
    fn frame(&mut self) -> Vec<FrameTask>;

    fn pending(&self) -> usize;
}

/// Every task runs right after the handler that queued it.
#[derive(Debug, Default)]
pub struct InlineFrames {
    queue: Vec<FrameTask>,
}

impl FrameScheduler for InlineFrames {
    fn defer(&mut self, task: FrameTask) {
        self.queue.push(task);
    }

    fn ready(&mut self) -> Vec<FrameTask> {
        std::mem::take(&mut self.queue)
    }

    fn frame(&mut self) -> Vec<FrameTask> {
        std::mem::take(&mut self.queue)
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Tasks wait for the host's next frame.
#[derive(Debug, Default)]
pub struct HostFrames {
    queue: Vec<FrameTask>,
}

impl FrameScheduler for HostFrames {
    fn defer(&mut self, task: FrameTask) {
        self.queue.push(task);
    }

    fn ready(&mut self) -> Vec<FrameTask> {
        Vec::new()
    }

    fn frame(&mut self) -> Vec<FrameTask> {
        std::mem::take(&mut self.queue)
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}
