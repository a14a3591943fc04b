//! # Frame Buffer Module
//!
//! Keeps the most recent `N` captured samples in one reusable buffer.
//! The capture side appends whatever chunk sizes the device delivers;
//! the estimator reads the whole window once per tick. One writer, one
//! reader, same thread, so no synchronization is involved.

/// Default analysis window, ~85-93 ms at 44.1-48 kHz.
pub const DEFAULT_FRAME_SIZE: usize = 4096;

/// Rolling window over the newest samples, oldest first.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    samples: Vec<f32>,
}

impl FrameBuffer {
    /// Creates a silent buffer of `size` samples.
    pub fn new(size: usize) -> Self {
        Self {
            samples: vec![0.0; size],
        }
    }

    /// Appends new samples, discarding the oldest ones.
    pub fn push_samples(&mut self, data: &[f32]) {
        let size = self.samples.len();
        if size == 0 || data.is_empty() {
            return;
        }

        if data.len() >= size {
            self.samples.copy_from_slice(&data[data.len() - size..]);
        } else {
            let keep = size - data.len();
            self.samples.copy_within(data.len().., 0);
            self.samples[keep..].copy_from_slice(data);
        }
    }

    /// The current window, oldest sample first.
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Zeroes the window.
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
    }

    /// Zeroes and resizes the window.
    pub fn resize(&mut self, size: usize) {
        self.samples.clear();
        self.samples.resize(size, 0.0);
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_silent() {
        let buffer = FrameBuffer::new(4);
        assert_eq!(buffer.as_slice(), &[0.0; 4]);
    }

    #[test]
    fn small_chunks_shift_in_from_the_right() {
        let mut buffer = FrameBuffer::new(4);
        buffer.push_samples(&[1.0, 2.0]);
        assert_eq!(buffer.as_slice(), &[0.0, 0.0, 1.0, 2.0]);
        buffer.push_samples(&[3.0]);
        assert_eq!(buffer.as_slice(), &[0.0, 1.0, 2.0, 3.0]);
        buffer.push_samples(&[4.0, 5.0]);
        assert_eq!(buffer.as_slice(), &[2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn oversized_chunk_keeps_its_tail() {
        let mut buffer = FrameBuffer::new(3);
        buffer.push_samples(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buffer.as_slice(), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn clear_and_resize_reset_contents() {
        let mut buffer = FrameBuffer::new(2);
        buffer.push_samples(&[1.0, 2.0]);
        buffer.clear();
        assert_eq!(buffer.as_slice(), &[0.0, 0.0]);

        buffer.push_samples(&[1.0, 2.0]);
        buffer.resize(3);
        assert_eq!(buffer.as_slice(), &[0.0, 0.0, 0.0]);
    }
}
