use crate::shared::frame::Frame;

/// A stream of frames in capture order.
///
/// Each frame carries its index and its offset from the start of the
/// stream; the pipeline derives tracker time from that offset, not from the
/// wall clock, so recorded sessions replay with their original timing.
pub trait FrameSource: Send {
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Number of frames, if known up front. `None` for live sources.
    fn len_hint(&self) -> Option<usize> {
        None
    }

    /// Releases any resources held by the source.
    fn close(&mut self) {}
}
