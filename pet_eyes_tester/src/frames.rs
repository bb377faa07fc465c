// Directory-backed stand-ins for the camera and the display surface.

use pet_eyes::core_modules::utils::image_helper::image_helper::{load_frame, save_png};
use pet_eyes::pipeline::FrameBuffer;
use pet_eyes::{FrameSink, FrameSource};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;

/// Every decodable image file directly inside `dir`, sorted by name.
pub fn list_frames(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && image::ImageFormat::from_path(path).is_ok())
        .collect();
    frames.sort();
    Ok(frames)
}

/// Yields one decoded file per cycle, then reports how many it handed out.
pub struct DirectorySource {
    pending: VecDeque<PathBuf>,
    delivered: usize,
    exhausted: Option<oneshot::Sender<usize>>,
}

impl DirectorySource {
    pub fn new(frames: Vec<PathBuf>) -> (Self, oneshot::Receiver<usize>) {
        let (tx, rx) = oneshot::channel();
        let source = Self {
            pending: frames.into(),
            delivered: 0,
            exhausted: Some(tx),
        };
        (source, rx)
    }
}

impl FrameSource for DirectorySource {
    fn current_frame(&mut self) -> Option<FrameBuffer> {
        while let Some(path) = self.pending.pop_front() {
            match load_frame(&path) {
                Ok(frame) => {
                    self.delivered += 1;
                    return Some(frame);
                }
                Err(e) => tracing::warn!("skipping {}: {e}", path.display()),
            }
        }
        // Cycles are sequential, so every delivered frame has been presented by now.
        if let Some(tx) = self.exhausted.take() {
            let _ = tx.send(self.delivered);
        }
        None
    }
}

/// Writes each presented frame as `frame_00000.png`, `frame_00001.png`, ...
pub struct PngSequenceSink {
    output_dir: PathBuf,
    next_index: usize,
}

impl PngSequenceSink {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            next_index: 0,
        }
    }
}

impl FrameSink for PngSequenceSink {
    fn present_frame(&mut self, frame: FrameBuffer) {
        let path = self.output_dir.join(format!("frame_{:05}.png", self.next_index));
        self.next_index += 1;
        match save_png(&path, &frame) {
            Ok(()) => tracing::debug!("wrote {}", path.display()),
            Err(e) => tracing::error!("failed to write {}: {e}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_walks_sorted_images_then_reports() {
        let dir = tempfile::tempdir().expect("Error creating temp dir.");
        for (name, value) in [("b.png", 20u8), ("a.png", 10), ("broken.png", 0)] {
            let path = dir.path().join(name);
            if name == "broken.png" {
                std::fs::write(&path, b"not a png").unwrap();
            } else {
                save_png(&path, &FrameBuffer::filled(2, 2, [value, value, value, 255])).unwrap();
            }
        }
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let frames = list_frames(dir.path()).unwrap();
        let names: Vec<_> = frames.iter().map(|p| p.file_name().unwrap().to_str().unwrap().to_owned()).collect();
        assert_eq!(names, ["a.png", "b.png", "broken.png"]);

        let (mut source, mut exhausted) = DirectorySource::new(frames);
        assert_eq!(source.current_frame().unwrap().pixel(0, 0), Some([10, 10, 10, 255]));
        assert!(exhausted.try_recv().is_err());
        assert_eq!(source.current_frame().unwrap().pixel(1, 1), Some([20, 20, 20, 255]));
        assert!(source.current_frame().is_none());
        assert_eq!(exhausted.try_recv().unwrap(), 2);
        assert!(source.current_frame().is_none());
    }

    #[test]
    fn sink_numbers_its_output() {
        let dir = tempfile::tempdir().expect("Error creating temp dir.");
        let mut sink = PngSequenceSink::new(dir.path().to_path_buf());
        sink.present_frame(FrameBuffer::filled(1, 1, [1, 2, 3, 4]));
        sink.present_frame(FrameBuffer::filled(1, 1, [5, 6, 7, 8]));

        let second = load_frame(dir.path().join("frame_00001.png")).unwrap();
        assert_eq!(second.pixel(0, 0), Some([5, 6, 7, 8]));
        assert!(dir.path().join("frame_00000.png").exists());
    }
}
