/// Seconds spent in each phase of one frame.
///
/// `compose` is whatever part of `total` was not spent rendering or reading
/// back pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct FrameTiming {
    pub render: f64,
    pub buffer_read: f64,
    pub compress: f64,
    pub blend: f64,
    pub collect: f64,
    pub compose: f64,
    pub total: f64,
}

/// Per-frame counters reported alongside the image.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct FrameStats {
    /// 1-based count of frames drawn by the context.
    pub frame: u64,
    pub bytes_sent: u64,
    pub timing: FrameTiming,
}
