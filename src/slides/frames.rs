use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, warn};

/// A single decoded grayscale frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Gray8 pixel data, row-major, `width * height` bytes.
    pub data: Vec<u8>,
}

/// Sequential frame decode collaborator.
///
/// Implementations own their decoder handle; dropping the source must release
/// it. `read_frame` returns `Ok(None)` when the stream is exhausted and an
/// error when the source is corrupt or truncated mid-frame.
pub trait FrameSource {
    /// Frames per second of the underlying stream.
    fn fps(&self) -> f64;

    /// Read the next frame in decode order.
    fn read_frame(&mut self) -> io::Result<Option<Frame>>;
}

/// Frame source backed by an `ffmpeg` child process streaming raw gray8
/// frames over stdout.
pub struct FfmpegFrameSource {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    fps: f64,
    frame_len: usize,
}

impl FfmpegFrameSource {
    /// Spawn an ffmpeg decoder for `video_path`, scaling every frame to
    /// `width`x`height`. The fps comes from a prior probe (see
    /// `VideoProcessor::get_video_info`).
    pub fn open(video_path: &Path, width: u32, height: u32, fps: f64) -> io::Result<Self> {
        if width == 0 || height == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid frame dimensions {}x{}", width, height),
            ));
        }

        let mut child = Command::new("ffmpeg")
            .args([
                "-v",
                "error",
                "-i",
                &video_path.to_string_lossy(),
                "-vf",
                &format!("scale={}:{}", width, height),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "gray",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "ffmpeg stdout not captured")
        })?;

        debug!(
            "🎞️  ffmpeg frame stream opened: {} ({}x{} @ {:.2}fps)",
            video_path.display(),
            width,
            height,
            fps
        );

        Ok(Self {
            child,
            stdout,
            width,
            height,
            fps,
            frame_len: width as usize * height as usize,
        })
    }
}

impl FrameSource for FfmpegFrameSource {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn read_frame(&mut self) -> io::Result<Option<Frame>> {
        let mut buf = vec![0u8; self.frame_len];
        let mut filled = 0;

        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..])? {
                0 if filled == 0 => return Ok(None),
                0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "truncated frame: got {} of {} bytes",
                            filled, self.frame_len
                        ),
                    ));
                }
                n => filled += n,
            }
        }

        Ok(Some(Frame {
            width: self.width,
            height: self.height,
            data: buf,
        }))
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        // Callers may abandon the stream early; make sure the decoder goes
        // away with it.
        if let Err(e) = self.child.kill() {
            if e.kind() != io::ErrorKind::InvalidInput {
                warn!("failed to kill ffmpeg frame decoder: {}", e);
            }
        }
        let _ = self.child.wait();
    }
}
