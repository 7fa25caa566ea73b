//! Asynchronous frame writer with worker thread pool.
//!
//! Writes mono8 frames to disk as PNG without blocking the capture loop.
//! Uses a bounded channel and a small worker pool; a full queue is
//! reported to the caller rather than blocking the frame path.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Sender, TrySendError};
use image::GrayImage;
use ndarray::Array2;
use std::mem;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tracing::{info, warn};

pub struct FrameWriterHandle {
    sender: Sender<FrameWriteTask>,
    workers: Vec<JoinHandle<()>>,
}

struct FrameWriteTask {
    frame: Array2<u8>,
    filepath: PathBuf,
}

impl FrameWriterHandle {
    pub fn new(num_workers: usize, buffer_size: usize) -> Self {
        let (sender, receiver) = bounded::<FrameWriteTask>(buffer_size);

        let mut workers = Vec::new();
        for worker_id in 0..num_workers {
            let receiver = receiver.clone();

            let handle = std::thread::spawn(move || {
                info!("Frame writer worker {} started", worker_id);
                while let Ok(task) = receiver.recv() {
                    if let Err(e) = save_frame(&task.frame, &task.filepath) {
                        warn!(
                            "Worker {} failed to save frame to {}: {}",
                            worker_id,
                            task.filepath.display(),
                            e
                        );
                    }
                }
                info!("Frame writer worker {} shutting down", worker_id);
            });

            workers.push(handle);
        }

        Self { sender, workers }
    }

    /// Close the queue and join all workers, draining pending writes.
    pub fn wait_for_completion(mut self) {
        mem::drop(self.sender);

        for (worker_id, handle) in self.workers.drain(..).enumerate() {
            if let Err(e) = handle.join() {
                warn!("Worker {} panicked: {:?}", worker_id, e);
            }
        }

        info!("All frame writer workers completed");
    }

    /// Enqueue a frame for writing. Fails fast if the queue is full or
    /// the workers have shut down.
    pub fn write_frame(&self, frame: &Array2<u8>, filepath: PathBuf) -> Result<()> {
        let task = FrameWriteTask {
            frame: frame.clone(),
            filepath: filepath.clone(),
        };

        match self.sender.try_send(task) {
            Ok(_) => Ok(()),
            Err(TrySendError::Full(_)) => {
                anyhow::bail!(
                    "Frame writer queue full, cannot write to {}",
                    filepath.display()
                )
            }
            Err(TrySendError::Disconnected(_)) => {
                anyhow::bail!("Frame writer workers have shut down")
            }
        }
    }
}

fn array2_to_gray_image(frame: &Array2<u8>) -> GrayImage {
    let (height, width) = frame.dim();
    let data: Vec<u8> = frame.iter().copied().collect();
    GrayImage::from_raw(width as u32, height as u32, data)
        .expect("buffer length matches frame dimensions")
}

fn save_frame(frame: &Array2<u8>, filepath: &Path) -> Result<()> {
    if let Some(parent) = filepath.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let img = array2_to_gray_image(frame);
    img.save(filepath)
        .with_context(|| format!("Failed to save frame to {}", filepath.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use tempfile::TempDir;

    #[test]
    fn test_frame_writer_basic() {
        let temp_dir = TempDir::new().unwrap();
        let writer = FrameWriterHandle::new(2, 10);

        let frame = Array2::from_shape_fn((64, 64), |(y, x)| ((x + y) % 256) as u8);

        let filepath = temp_dir.path().join("test_frame.png");
        writer.write_frame(&frame, filepath.clone()).unwrap();
        writer.wait_for_completion();

        assert!(filepath.exists());
    }

    #[test]
    fn test_frame_writer_multiple_frames() {
        let temp_dir = TempDir::new().unwrap();
        let writer = FrameWriterHandle::new(2, 10);

        for i in 0..5 {
            let frame = Array2::from_shape_fn((32, 32), |(y, x)| ((x + y + i) % 256) as u8);
            let filepath = temp_dir.path().join(format!("frame_{}.png", i));
            writer.write_frame(&frame, filepath).unwrap();
        }

        writer.wait_for_completion();

        for i in 0..5 {
            let filepath = temp_dir.path().join(format!("frame_{}.png", i));
            assert!(filepath.exists(), "Frame {} should exist", i);
        }
    }

    #[test]
    fn test_frame_writer_creates_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let writer = FrameWriterHandle::new(1, 5);

        let frame = Array2::from_elem((16, 16), 42u8);
        let nested_path = temp_dir.path().join("subdir1/subdir2/nested_frame.png");
        writer.write_frame(&frame, nested_path.clone()).unwrap();
        writer.wait_for_completion();

        assert!(nested_path.exists());
    }

    #[test]
    fn test_saved_frame_preserves_pixels() {
        let temp_dir = TempDir::new().unwrap();
        let filepath = temp_dir.path().join("pixels.png");

        let frame = Array2::from_shape_fn((8, 8), |(y, x)| (16 * y + x) as u8);
        save_frame(&frame, &filepath).unwrap();

        let img = image::open(&filepath).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (8, 8));
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(3, 2).0[0], 35); // (x=3, y=2) -> 16*2+3
    }
}
