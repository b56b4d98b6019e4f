use anyhow::{anyhow, Result};

use super::frames::Frame;

/// Width of the hash signature in bits.
pub const HASH_BITS: u32 = 64;

/// Perceptual hash collaborator. Visually similar frames must map to
/// signatures with a small Hamming distance.
pub trait FrameHasher: Send + Sync {
    fn hash(&self, frame: &Frame) -> Result<u64>;
}

/// Average hash (aHash) over an 8x8 grayscale downsample.
///
/// Each of the 64 cells averages a block of the source frame; a bit is set
/// when the cell is brighter than the frame mean. Fast enough to run on every
/// sampled frame without a decode-side resize.
#[derive(Debug, Clone, Default)]
pub struct AverageHasher;

impl AverageHasher {
    pub fn new() -> Self {
        Self
    }
}

impl FrameHasher for AverageHasher {
    fn hash(&self, frame: &Frame) -> Result<u64> {
        let w = frame.width as usize;
        let h = frame.height as usize;

        if w == 0 || h == 0 {
            return Err(anyhow!("cannot hash empty frame ({}x{})", w, h));
        }
        if frame.data.len() != w * h {
            return Err(anyhow!(
                "frame buffer size mismatch: expected {} bytes for {}x{}, got {}",
                w * h,
                w,
                h,
                frame.data.len()
            ));
        }

        let block_w = (w / 8).max(1);
        let block_h = (h / 8).max(1);

        let mut cells = [0u32; 64];
        let mut total = 0u64;

        for by in 0..8 {
            let y_start = (by * block_h).min(h);
            let y_end = ((by + 1) * block_h).min(h).max(y_start);

            for bx in 0..8 {
                let x_start = (bx * block_w).min(w);
                let x_end = ((bx + 1) * block_w).min(w).max(x_start);

                let mut sum = 0u32;
                let mut count = 0u32;
                for y in y_start..y_end {
                    let row = y * w;
                    for x in x_start..x_end {
                        sum += frame.data[row + x] as u32;
                        count += 1;
                    }
                }

                let avg = if count > 0 { sum / count } else { 0 };
                cells[by * 8 + bx] = avg;
                total += avg as u64;
            }
        }

        let mean = (total / 64) as u32;

        let mut hash = 0u64;
        for (i, &cell) in cells.iter().enumerate() {
            if cell > mean {
                hash |= 1 << i;
            }
        }

        Ok(hash)
    }
}

/// Hamming distance between two hash signatures.
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(width: u32, height: u32, data: Vec<u8>) -> Frame {
        Frame {
            width,
            height,
            data,
        }
    }

    /// Left half dark, right half bright. `invert` flips the halves.
    fn split_frame(width: u32, height: u32, invert: bool) -> Frame {
        let (lo, hi) = if invert { (220, 20) } else { (20, 220) };
        let mut data = Vec::with_capacity((width * height) as usize);
        for _y in 0..height {
            for x in 0..width {
                data.push(if x < width / 2 { lo } else { hi });
            }
        }
        frame_with(width, height, data)
    }

    #[test]
    fn test_hamming_distance() {
        assert_eq!(hamming_distance(0, 0), 0);
        assert_eq!(hamming_distance(0b1111, 0b0000), 4);
        assert_eq!(hamming_distance(u64::MAX, 0), 64);
    }

    #[test]
    fn test_identical_frames_hash_equal() {
        let hasher = AverageHasher::new();
        let a = hasher.hash(&split_frame(64, 64, false)).unwrap();
        let b = hasher.hash(&split_frame(64, 64, false)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_inverted_frames_are_distant() {
        let hasher = AverageHasher::new();
        let a = hasher.hash(&split_frame(64, 64, false)).unwrap();
        let b = hasher.hash(&split_frame(64, 64, true)).unwrap();
        assert!(hamming_distance(a, b) > 32);
    }

    #[test]
    fn test_buffer_size_mismatch_is_error() {
        let hasher = AverageHasher::new();
        let frame = frame_with(16, 16, vec![0u8; 10]);
        assert!(hasher.hash(&frame).is_err());
    }

    #[test]
    fn test_small_frames_hash() {
        // Frames smaller than the 8x8 grid still produce a signature.
        let hasher = AverageHasher::new();
        let frame = split_frame(4, 4, false);
        hasher.hash(&frame).unwrap();
    }
}
