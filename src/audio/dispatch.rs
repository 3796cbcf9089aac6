use crossbeam_channel::{Sender, TrySendError};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Append `data` to `buf` as mono f32. Interleaved channels are averaged; a
/// trailing partial frame is averaged over the channels it has.
pub(super) fn append_downmixed_samples<T, F>(
    buf: &mut Vec<f32>,
    data: &[T],
    channels: usize,
    mut convert: F,
) where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    let mut acc = 0.0f32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += convert(sample);
        count += 1;
        if count == channels {
            buf.push(acc / channels as f32);
            acc = 0.0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push(acc / count as f32);
    }
}

/// Callback-side half of capture.
///
/// Drivers deliver buffers of whatever size they like; the pipeline wants
/// exactly [`FRAME_SAMPLES`](super::FRAME_SAMPLES) per frame. Leftover samples
/// wait in `pending` for the next callback. Frames go out with `try_send`, and
/// one that finds the analysis queue full is counted in `dropped` and lost.
pub(super) struct FrameDispatcher {
    frame_samples: usize,
    pending: Vec<f32>,
    mono: Vec<f32>,
    sender: Sender<Vec<f32>>,
    dropped: Arc<AtomicUsize>,
}

impl FrameDispatcher {
    pub(super) fn new(
        frame_samples: usize,
        sender: Sender<Vec<f32>>,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            frame_samples: frame_samples.max(1),
            // One driver buffer plus a partial frame.
            pending: Vec::with_capacity(frame_samples * 2),
            mono: Vec::new(),
            sender,
            dropped,
        }
    }

    pub(super) fn push<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        self.mono.clear();
        append_downmixed_samples(&mut self.mono, data, channels, convert);
        self.pending.extend_from_slice(&self.mono);

        while self.pending.len() >= self.frame_samples {
            let frame: Vec<f32> = self.pending.drain(..self.frame_samples).collect();
            match self.sender.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => {
                    // Worker is gone; nothing will read the rest.
                    self.pending.clear();
                    break;
                }
            }
        }
    }

    /// Samples held back until the next full frame.
    #[cfg(test)]
    pub(super) fn pending_samples(&self) -> usize {
        self.pending.len()
    }
}
