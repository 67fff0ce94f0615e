use image::RgbImage;
use nalgebra::Point2;

use crate::error::StreamError;
use crate::overlay::Overlay;

/// One video frame in acquisition order.
#[derive(Clone, Debug)]
pub struct Frame {
    pub index: u64,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Reference origin for polar measurements.
    #[inline]
    pub fn center(&self) -> Point2<f64> {
        polar_locate_core::frame_center(self.width(), self.height())
    }
}

/// Where frames come from.
pub trait FrameSource {
    /// Next frame, or `Ok(None)` when nothing is available this cycle.
    fn capture(&mut self) -> Result<Option<Frame>, StreamError>;

    /// `false` once the stream has ended.
    fn is_streaming(&self) -> bool;
}

/// Where annotated frames go.
pub trait FrameSink {
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<(), StreamError>;

    fn set_status(&mut self, status: &str);

    /// `false` once the consumer has gone away.
    fn is_streaming(&self) -> bool;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn capture(&mut self) -> Result<Option<Frame>, StreamError> {
        (**self).capture()
    }

    fn is_streaming(&self) -> bool {
        (**self).is_streaming()
    }
}

impl<K: FrameSink + ?Sized> FrameSink for Box<K> {
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<(), StreamError> {
        (**self).render(frame, overlay)
    }

    fn set_status(&mut self, status: &str) {
        (**self).set_status(status)
    }

    fn is_streaming(&self) -> bool {
        (**self).is_streaming()
    }
}
