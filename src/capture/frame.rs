//! Camera frame container.
//!
//! Frames are handed to the landmark source for inference and nothing else:
//! no `Clone`, no serialization, and pixel memory is zeroized on drop.

use zeroize::Zeroize;

/// One decoded camera frame.
pub struct VideoFrame {
    /// RGB24 pixel data. Read-only access through `pixels()`.
    data: Vec<u8>,

    pub width: u32,
    pub height: u32,

    /// Presentation time of the frame within the stream, in seconds.
    /// Two reads that return the same frame report the same media time.
    pub media_time: f64,
}

// Explicitly NOT implementing Clone; a frame lives for one presentation slot.

impl VideoFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, media_time: f64) -> Self {
        Self {
            data,
            width,
            height,
            media_time,
        }
    }

    /// Pixels for inference. Callers must not retain the slice past the call.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("media_time", &self.media_time)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Drop for VideoFrame {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_omits_pixels() {
        let frame = VideoFrame::new(vec![7u8; 12], 2, 2, 0.5);
        let rendered = format!("{:?}", frame);
        assert!(rendered.contains("bytes: 12"));
        assert!(!rendered.contains("[7, 7"));
        assert_eq!(frame.pixels().len(), frame.byte_len());
    }
}
