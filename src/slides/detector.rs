use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::frames::{Frame, FrameSource};
use super::ocr::OcrEngine;
use super::phash::{hamming_distance, FrameHasher};

/// One detected slide: the OCR text of a visually distinct frame, tagged with
/// its timestamp in seconds. Immutable once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideRecord {
    pub time: f64,
    pub text: String,
}

/// Per-frame failure surfaced by the slide stream.
///
/// Decode errors are fatal: the stream ends after yielding one. Hash errors
/// are recoverable per frame; the stream keeps going and the caller decides
/// whether to skip or abort. OCR failures never surface here — the affected
/// record is skipped and processing continues.
#[derive(Debug, Error)]
pub enum SlideError {
    #[error("video decode failed at frame {frame}")]
    Decode {
        frame: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("hash computation failed at frame {frame}: {message}")]
    Hash { frame: u64, message: String },
}

/// Tuning for the slide-change detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideDetectorConfig {
    /// Hash every Nth frame. Must be >= 1.
    pub frame_interval: u64,

    /// Emit only when the Hamming distance to the last emitted hash exceeds
    /// this value. 0 emits on any differing hash.
    pub hash_threshold: u32,
}

impl Default for SlideDetectorConfig {
    fn default() -> Self {
        Self {
            frame_interval: 30,
            hash_threshold: 5,
        }
    }
}

/// Slide-change detector.
///
/// Samples frames at a fixed interval, hashes each sample, and runs OCR only
/// when the hash differs materially from the previously emitted one. Hash and
/// OCR collaborators are injected so callers construct expensive resources
/// once and tests can substitute mocks.
#[derive(Debug, Clone)]
pub struct SlideDetector<H, O> {
    config: SlideDetectorConfig,
    hasher: H,
    ocr: O,
}

impl<H, O> SlideDetector<H, O>
where
    H: FrameHasher,
    O: OcrEngine,
{
    pub fn new(config: SlideDetectorConfig, hasher: H, ocr: O) -> Self {
        // interval 0 would sample nothing and divide by zero; clamp up.
        let config = SlideDetectorConfig {
            frame_interval: config.frame_interval.max(1),
            ..config
        };
        Self {
            config,
            hasher,
            ocr,
        }
    }

    pub fn config(&self) -> &SlideDetectorConfig {
        &self.config
    }

    /// Lazily walk `source`, yielding slide records in timestamp order.
    ///
    /// The stream owns the source; dropping it early releases the decoder.
    pub fn records<S: FrameSource>(&self, source: S) -> SlideStream<'_, S, H, O> {
        let fps = source.fps();
        SlideStream {
            detector: self,
            source,
            fps,
            frame_index: 0,
            previous_hash: None,
            done: false,
        }
    }

    /// Collect all slide records, aborting on the first decode or hash error.
    pub fn extract<S: FrameSource>(&self, source: S) -> Result<Vec<SlideRecord>, SlideError> {
        self.records(source).collect()
    }
}

/// Lazy iterator over detected slides. Ends after the source is exhausted or
/// a decode error is yielded.
pub struct SlideStream<'a, S, H, O> {
    detector: &'a SlideDetector<H, O>,
    source: S,
    fps: f64,
    frame_index: u64,
    previous_hash: Option<u64>,
    done: bool,
}

impl<S, H, O> SlideStream<'_, S, H, O>
where
    S: FrameSource,
    H: FrameHasher,
    O: OcrEngine,
{
    fn timestamp(&self, frame_index: u64) -> f64 {
        if self.fps > 0.0 {
            frame_index as f64 / self.fps
        } else {
            0.0
        }
    }

    /// Run OCR on an emitted frame. `previous_hash` has already been updated,
    /// so a failed or empty OCR never re-triggers on the same slide.
    fn ocr_record(&self, frame: &Frame, frame_index: u64) -> Option<SlideRecord> {
        match self.detector.ocr.extract_text(frame) {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    debug!("frame {}: slide changed but OCR found no text", frame_index);
                    None
                } else {
                    Some(SlideRecord {
                        time: self.timestamp(frame_index),
                        text: text.to_string(),
                    })
                }
            }
            Err(e) => {
                warn!("frame {}: OCR failed, skipping slide: {}", frame_index, e);
                None
            }
        }
    }
}

impl<S, H, O> Iterator for SlideStream<'_, S, H, O>
where
    S: FrameSource,
    H: FrameHasher,
    O: OcrEngine,
{
    type Item = Result<SlideRecord, SlideError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let frame = match self.source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(source) => {
                    // Corrupt or unreadable source is fatal for the run.
                    self.done = true;
                    return Some(Err(SlideError::Decode {
                        frame: self.frame_index,
                        source,
                    }));
                }
            };

            let frame_index = self.frame_index;
            self.frame_index += 1;

            if frame_index % self.detector.config.frame_interval != 0 {
                continue;
            }

            let hash = match self.detector.hasher.hash(&frame) {
                Ok(h) => h,
                Err(e) => {
                    // Without a hash there is no safe emit/skip decision for
                    // this frame; surface it and move on.
                    return Some(Err(SlideError::Hash {
                        frame: frame_index,
                        message: e.to_string(),
                    }));
                }
            };

            let changed = match self.previous_hash {
                None => true,
                Some(prev) => hamming_distance(hash, prev) > self.detector.config.hash_threshold,
            };

            if !changed {
                continue;
            }

            self.previous_hash = Some(hash);

            if let Some(record) = self.ocr_record(&frame, frame_index) {
                return Some(Ok(record));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slides::phash::{AverageHasher, HASH_BITS};
    use anyhow::anyhow;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const W: u32 = 16;
    const H: u32 = 16;

    /// Left half dark, right half bright; `invert` flips the halves so the
    /// two variants hash far apart.
    fn pattern(invert: bool) -> Frame {
        let (lo, hi) = if invert { (220u8, 20u8) } else { (20u8, 220u8) };
        let mut data = Vec::with_capacity((W * H) as usize);
        for _y in 0..H {
            for x in 0..W {
                data.push(if x < W / 2 { lo } else { hi });
            }
        }
        Frame {
            width: W,
            height: H,
            data,
        }
    }

    enum Step {
        Frame(Frame),
        Error,
    }

    struct MockSource {
        steps: VecDeque<Step>,
        fps: f64,
    }

    impl MockSource {
        fn new(frames: Vec<Frame>, fps: f64) -> Self {
            Self {
                steps: frames.into_iter().map(Step::Frame).collect(),
                fps,
            }
        }
    }

    impl FrameSource for MockSource {
        fn fps(&self) -> f64 {
            self.fps
        }

        fn read_frame(&mut self) -> io::Result<Option<Frame>> {
            match self.steps.pop_front() {
                Some(Step::Frame(f)) => Ok(Some(f)),
                Some(Step::Error) => {
                    Err(io::Error::new(io::ErrorKind::InvalidData, "corrupt stream"))
                }
                None => Ok(None),
            }
        }
    }

    /// OCR stub returning fixed text, with a call counter and optional
    /// scripted failure on the first call.
    struct MockOcr {
        text: String,
        calls: AtomicUsize,
        fail_first: bool,
    }

    impl MockOcr {
        fn with_text(text: &str) -> Self {
            Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
                fail_first: false,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl OcrEngine for &MockOcr {
        fn extract_text(&self, _frame: &Frame) -> anyhow::Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(anyhow!("engine crashed"));
            }
            Ok(self.text.clone())
        }
    }

    fn detector(
        interval: u64,
        threshold: u32,
        ocr: &MockOcr,
    ) -> SlideDetector<AverageHasher, &MockOcr> {
        SlideDetector::new(
            SlideDetectorConfig {
                frame_interval: interval,
                hash_threshold: threshold,
            },
            AverageHasher::new(),
            ocr,
        )
    }

    #[test]
    fn test_constant_video_emits_at_most_once() {
        let frames: Vec<Frame> = (0..90).map(|_| pattern(false)).collect();
        let ocr = MockOcr::with_text("Intro slide");
        let det = detector(30, 5, &ocr);

        let records = det.extract(MockSource::new(frames, 30.0)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].time, 0.0);
        // Only the first sample clears the gate, so OCR ran exactly once.
        assert_eq!(ocr.call_count(), 1);
    }

    #[test]
    fn test_record_count_bounded_by_sample_count() {
        // Worst case: every sampled frame alternates pattern at threshold 0.
        let frames: Vec<Frame> = (0..300).map(|i| pattern(i % 2 == 1)).collect();

        for interval in [1u64, 2, 5, 30, 60] {
            let ocr = MockOcr::with_text("text");
            let det = detector(interval, 0, &ocr);
            let records = det.extract(MockSource::new(frames.clone(), 30.0)).unwrap();
            assert!(
                records.len() as u64 <= 300 / interval,
                "interval {}: {} records",
                interval,
                records.len()
            );
        }
    }

    #[test]
    fn test_timestamps_non_decreasing() {
        let frames: Vec<Frame> = (0..120).map(|i| pattern((i / 10) % 2 == 1)).collect();
        let ocr = MockOcr::with_text("text");
        let det = detector(5, 0, &ocr);

        let records = det.extract(MockSource::new(frames, 30.0)).unwrap();
        assert!(records.len() > 1);
        for pair in records.windows(2) {
            assert!(pair[0].time <= pair[1].time);
        }
    }

    #[test]
    fn test_max_threshold_emits_only_first_sample() {
        // Distance can never strictly exceed the hash bit width, so nothing
        // after the first sampled frame gets through.
        let frames: Vec<Frame> = (0..100).map(|i| pattern(i % 2 == 1)).collect();
        let ocr = MockOcr::with_text("text");
        let det = detector(1, HASH_BITS, &ocr);

        let records = det.extract(MockSource::new(frames, 25.0)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].time, 0.0);
    }

    #[test]
    fn test_zero_threshold_emits_on_any_difference() {
        let frames: Vec<Frame> = (0..6).map(|i| pattern(i % 2 == 1)).collect();
        let ocr = MockOcr::with_text("text");
        let det = detector(1, 0, &ocr);

        let records = det.extract(MockSource::new(frames, 30.0)).unwrap();
        assert_eq!(records.len(), 6);
    }

    #[test]
    fn test_two_slide_lecture_scenario() {
        // 300 frames at 30fps, slide change at frame 150, interval 30,
        // threshold 5: samples once per second, expect records at 0s and 5s.
        let frames: Vec<Frame> = (0..300).map(|i| pattern(i >= 150)).collect();
        let ocr = MockOcr::with_text("Slide text");
        let det = detector(30, 5, &ocr);

        let records = det.extract(MockSource::new(frames, 30.0)).unwrap();
        assert_eq!(records.len(), 2);
        assert!((records[0].time - 0.0).abs() < 1e-9);
        assert!((records[1].time - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_ocr_suppresses_record_but_updates_hash() {
        let frames: Vec<Frame> = (0..90).map(|_| pattern(false)).collect();
        let ocr = MockOcr::with_text("   ");
        let det = detector(30, 5, &ocr);

        let records = det.extract(MockSource::new(frames, 30.0)).unwrap();
        assert!(records.is_empty());
        // previous_hash was still updated on the first emit decision, so the
        // remaining identical samples never re-trigger OCR.
        assert_eq!(ocr.call_count(), 1);
    }

    #[test]
    fn test_ocr_failure_skips_frame_and_continues() {
        let frames = vec![pattern(false), pattern(true)];
        let ocr = MockOcr {
            text: "Recovered slide".to_string(),
            calls: AtomicUsize::new(0),
            fail_first: true,
        };
        let det = detector(1, 0, &ocr);

        let records = det.extract(MockSource::new(frames, 30.0)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "Recovered slide");
        assert!((records[0].time - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_hash_failure_is_per_frame_and_stream_continues() {
        let bad_frame = Frame {
            width: W,
            height: H,
            data: vec![0u8; 3], // wrong buffer size, hashing fails
        };
        let frames = vec![bad_frame, pattern(false)];
        let ocr = MockOcr::with_text("text");
        let det = detector(1, 0, &ocr);

        let mut stream = det.records(MockSource::new(frames, 30.0));
        assert!(matches!(
            stream.next(),
            Some(Err(SlideError::Hash { frame: 0, .. }))
        ));
        let second = stream.next().unwrap().unwrap();
        assert_eq!(second.text, "text");
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_decode_error_ends_stream() {
        let ocr = MockOcr::with_text("text");
        let det = detector(1, 0, &ocr);

        let mut source = MockSource::new(vec![pattern(false)], 30.0);
        source.steps.push_back(Step::Error);
        source.steps.push_back(Step::Frame(pattern(true)));

        let mut stream = det.records(source);
        assert!(stream.next().unwrap().is_ok());
        assert!(matches!(
            stream.next(),
            Some(Err(SlideError::Decode { frame: 1, .. }))
        ));
        // Fatal: nothing after the decode error, even though a frame remains.
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_extract_aborts_on_decode_error() {
        let ocr = MockOcr::with_text("text");
        let det = detector(1, 0, &ocr);

        let mut source = MockSource::new(vec![], 30.0);
        source.steps.push_back(Step::Error);

        assert!(det.extract(source).is_err());
    }

    #[test]
    fn test_interval_zero_clamped_to_one() {
        let ocr = MockOcr::with_text("text");
        let det = detector(0, 0, &ocr);
        assert_eq!(det.config().frame_interval, 1);
    }
}
