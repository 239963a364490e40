// Purpose - audio buffers at the hardware boundary, format conversions

pub mod converter;

/// Planar capture buffers, one `Vec` per device input channel.
#[derive(Debug, Default, Clone)]
pub struct AudioInput {
    pub buffers: Vec<Vec<f32>>,
}

/// Planar playback buffers, one `Vec` per device output channel.
#[derive(Debug, Default, Clone)]
pub struct AudioOutput {
    pub buffers: Vec<Vec<f32>>,
}

impl AudioInput {
    /// `channels` silent channels of `frames` samples.
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            buffers: vec![vec![0.0; frames]; channels],
        }
    }

    /// Split interleaved samples into planar channels.
    pub fn from_interleaved(samples: &[f32], channels: usize) -> Self {
        Self {
            buffers: converter::deinterleave(samples, channels),
        }
    }

    pub fn channels(&self) -> usize {
        self.buffers.len()
    }

    /// Length of the shortest channel.
    pub fn frames(&self) -> usize {
        self.buffers.iter().map(Vec::len).min().unwrap_or(0)
    }

    /// Copy frame `index` into `frame`; anything missing reads as zero.
    pub fn read_frame(&self, index: usize, frame: &mut [f32]) {
        for (ch, slot) in frame.iter_mut().enumerate() {
            *slot = self
                .buffers
                .get(ch)
                .and_then(|buffer| buffer.get(index))
                .copied()
                .unwrap_or(0.0);
        }
    }
}

impl AudioOutput {
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            buffers: vec![vec![0.0; frames]; channels],
        }
    }

    pub fn channels(&self) -> usize {
        self.buffers.len()
    }

    pub fn frames(&self) -> usize {
        self.buffers.iter().map(Vec::len).min().unwrap_or(0)
    }

    /// Store `frame` at position `index` across the channels.
    pub fn write_frame(&mut self, index: usize, frame: &[f32]) {
        for (buffer, &sample) in self.buffers.iter_mut().zip(frame) {
            if let Some(slot) = buffer.get_mut(index) {
                *slot = sample;
            }
        }
    }

    pub fn interleaved(&self) -> Vec<f32> {
        converter::interleave(&self.buffers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_round_trip_through_planar_buffers() {
        let input = AudioInput::from_interleaved(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(input.frames(), 2);

        let mut frame = [0.0; 3];
        input.read_frame(1, &mut frame);
        assert_eq!(frame, [3.0, 4.0, 0.0]);

        let mut output = AudioOutput::new(2, 2);
        output.write_frame(0, &[1.0, 2.0]);
        output.write_frame(1, &frame);
        assert_eq!(output.interleaved(), vec![1.0, 2.0, 3.0, 4.0]);
    }
}
