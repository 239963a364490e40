#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

use crate::error::ParamError;

/*
Tick-rate Oscillators
=====================

Every oscillator here produces exactly one sample per clock tick. They share
three parameters and one piece of running state:

  frequency     Hz, strictly positive.
  phase         Current position in the cycle, kept in (-pi, pi].
  gain          Output scale, non-negative.

  w             Angular increment per sample: w = 2*pi*frequency / sample_rate,
                reduced into (-pi, pi]. Recomputed whenever any parameter
                changes.

After producing a sample the phase advances by w and wraps back into
(-pi, pi]. Frequencies are not clamped to Nyquist; anything above
sample_rate / 2 aliases.


Sine as a Resonator
-------------------

The sine does not call sin() per sample. It runs the two-term recurrence

    y[n] = p * y[n-1] - y[n-2]        with p = 2 * cos(w)

which is a lossless IIR resonator ringing at w. Seeding it with

    y[-2] = sin(phase - 2w)
    y[-1] = sin(phase - w)

makes y[0] = sin(phase). Each sample costs one multiply and one subtract no
matter how slow the platform's trig functions are. The seed is recomputed
whenever frequency, phase or gain is set, so the recurrence always starts
from the phase the oscillator actually holds.


Piecewise Shapes
----------------

Square, saw, pulse and triangle are closed-form functions of the phase:

    Square      +gain when phase > 0, else -gain
    Saw         phase / pi * gain                     (ramp -1 .. 1)
    Pulse       +gain when phase > pi * (width - 0.5), else -gain
    Triangle    peaks at +-pi*width, linear in between

    width = 0.5 gives a square-duty pulse and a symmetric triangle.
*/

/// Built-in oscillator shapes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Saw,
    Pulse,
    Triangle,
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    /// Resonator constant and the two previous outputs (oldest first).
    Sine { p: f32, y: [f32; 2] },
    Square,
    Saw,
    Pulse { width: f32 },
    Triangle { width: f32 },
}

/// Per-sample oscillator with deterministic recurrence state.
#[derive(Debug, Clone)]
pub struct Oscillator {
    shape: Shape,
    sample_rate: f32,
    frequency: f32,
    phase: f32,
    gain: f32,
    w: f32,
}

pub const DEFAULT_FREQUENCY: f32 = 440.0;
pub const DEFAULT_GAIN: f32 = 0.5;
pub const DEFAULT_WIDTH: f32 = 0.5;

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: u32) -> Self {
        let shape = match waveform {
            Waveform::Sine => Shape::Sine { p: 0.0, y: [0.0; 2] },
            Waveform::Square => Shape::Square,
            Waveform::Saw => Shape::Saw,
            Waveform::Pulse => Shape::Pulse {
                width: DEFAULT_WIDTH,
            },
            Waveform::Triangle => Shape::Triangle {
                width: DEFAULT_WIDTH,
            },
        };

        let mut osc = Self {
            shape,
            sample_rate: sample_rate.max(1) as f32,
            frequency: DEFAULT_FREQUENCY,
            phase: 0.0,
            gain: DEFAULT_GAIN,
            w: 0.0,
        };
        osc.reseed();
        osc
    }

    pub fn sine(sample_rate: u32) -> Self {
        Self::new(Waveform::Sine, sample_rate)
    }

    pub fn square(sample_rate: u32) -> Self {
        Self::new(Waveform::Square, sample_rate)
    }

    pub fn saw(sample_rate: u32) -> Self {
        Self::new(Waveform::Saw, sample_rate)
    }

    pub fn pulse(sample_rate: u32) -> Self {
        Self::new(Waveform::Pulse, sample_rate)
    }

    pub fn triangle(sample_rate: u32) -> Self {
        Self::new(Waveform::Triangle, sample_rate)
    }

    pub fn waveform(&self) -> Waveform {
        match self.shape {
            Shape::Sine { .. } => Waveform::Sine,
            Shape::Square => Waveform::Square,
            Shape::Saw => Waveform::Saw,
            Shape::Pulse { .. } => Waveform::Pulse,
            Shape::Triangle { .. } => Waveform::Triangle,
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Angular increment per sample, in radians, reduced into (-pi, pi].
    pub fn increment(&self) -> f32 {
        self.w
    }

    /// Duty/peak width for pulse and triangle shapes.
    pub fn width(&self) -> Option<f32> {
        match self.shape {
            Shape::Pulse { width } | Shape::Triangle { width } => Some(width),
            _ => None,
        }
    }

    pub fn set_frequency(&mut self, frequency: f32) -> Result<(), ParamError> {
        if !(frequency > 0.0 && frequency.is_finite()) {
            return Err(ParamError::Frequency(frequency));
        }
        self.frequency = frequency;
        self.reseed();
        Ok(())
    }

    pub fn set_phase(&mut self, phase: f32) -> Result<(), ParamError> {
        if !(phase > -PI && phase <= PI) {
            return Err(ParamError::Phase(phase));
        }
        self.phase = phase;
        self.reseed();
        Ok(())
    }

    pub fn set_gain(&mut self, gain: f32) -> Result<(), ParamError> {
        if !(gain >= 0.0 && gain.is_finite()) {
            return Err(ParamError::Gain(gain));
        }
        self.gain = gain;
        self.reseed();
        Ok(())
    }

    /// Set the pulse duty / triangle peak width.
    ///
    /// Shapes without a width accept any in-range value and ignore it.
    pub fn set_width(&mut self, value: f32) -> Result<(), ParamError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ParamError::Width(value));
        }
        if let Shape::Pulse { width } | Shape::Triangle { width } = &mut self.shape {
            *width = value;
        }
        Ok(())
    }

    fn reseed(&mut self) {
        // Same samples modulo 2pi; `advance` then needs one wrap step.
        let w = (TAU * self.frequency / self.sample_rate).rem_euclid(TAU);
        self.w = if w > PI { w - TAU } else { w };
        if let Shape::Sine { p, y } = &mut self.shape {
            *p = 2.0 * self.w.cos();
            y[0] = (self.phase - 2.0 * self.w).sin();
            y[1] = (self.phase - self.w).sin();
        }
    }

    /// Produce one sample and advance the phase.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let gain = self.gain;
        let phase = self.phase;

        let value = match &mut self.shape {
            Shape::Sine { p, y } => {
                let next = *p * y[1] - y[0];
                y[0] = y[1];
                y[1] = next;
                next * gain
            }
            Shape::Square => {
                if phase > 0.0 {
                    gain
                } else {
                    -gain
                }
            }
            Shape::Saw => phase / PI * gain,
            Shape::Pulse { width } => {
                if phase > PI * (*width - 0.5) {
                    gain
                } else {
                    -gain
                }
            }
            Shape::Triangle { width } => triangle(phase, *width) * gain,
        };

        self.advance();
        value
    }

    /// Fill a buffer with consecutive samples.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }

    #[inline]
    fn advance(&mut self) {
        self.phase += self.w;
        if self.phase > PI {
            self.phase -= TAU;
        } else if self.phase <= -PI {
            self.phase += TAU;
        }
    }
}

/// Unit-amplitude triangle with peaks at `-pi*width` (-1) and `pi*width` (+1).
#[inline]
fn triangle(phase: f32, width: f32) -> f32 {
    let peak = PI * width;
    if phase < -peak {
        (-PI - phase) / (PI - peak)
    } else if phase <= peak {
        if peak > 0.0 {
            phase / peak
        } else {
            0.0
        }
    } else {
        (PI - phase) / (PI - peak)
    }
}
