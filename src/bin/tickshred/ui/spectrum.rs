//! Spectrum analyzer widget
//!
//! Hann-windowed FFT of the scope buffer, folded into log-spaced bands.
//! Each band shows the loudest FFT bin it covers, so a pure tone stays a
//! single sharp peak whatever band it falls into.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::TAU;
use std::ops::Range;
use std::sync::Arc;

/// Number of log-spaced bands to display
const BANDS: usize = 48;
const LOWEST_HZ: f32 = 20.0;
const FLOOR_DB: f64 = -100.0;

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    /// FFT bins covered by each band
    bands: Vec<Range<usize>>,
    /// (band centre in Hz, level in dB)
    spectrum: Vec<(f64, f64)>,
}

impl SpectrumAnalyzer {
    /// `size` is the FFT length and must match the scope buffer.
    pub fn new(size: usize, sample_rate: u32) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(size);
        let window = (0..size)
            .map(|i| 0.5 * (1.0 - (TAU * i as f32 / size.saturating_sub(1).max(1) as f32).cos()))
            .collect();

        let nyquist = (sample_rate as f32 / 2.0).min(20_000.0).max(LOWEST_HZ * 2.0);
        let hz_per_bin = sample_rate as f32 / size.max(1) as f32;
        let last_bin = (size / 2).max(1);
        let edge = |band: usize| {
            let t = band as f32 / BANDS as f32;
            LOWEST_HZ * (nyquist / LOWEST_HZ).powf(t)
        };

        let mut bands = Vec::with_capacity(BANDS);
        let mut spectrum = Vec::with_capacity(BANDS);
        for band in 0..BANDS {
            let (lo, hi) = (edge(band), edge(band + 1));
            let start = ((lo / hz_per_bin) as usize).min(last_bin - 1);
            let end = ((hi / hz_per_bin).ceil() as usize).clamp(start + 1, last_bin);
            bands.push(start..end);
            spectrum.push((f64::from((lo * hi).sqrt()), FLOOR_DB));
        }

        Self {
            fft,
            window,
            scratch: vec![Complex::new(0.0, 0.0); size],
            bands,
            spectrum,
        }
    }

    /// Recompute from `buffer`; ignored unless it has the FFT length.
    pub fn update(&mut self, buffer: &[f32]) {
        if buffer.len() != self.window.len() {
            return;
        }
        for ((bin, &sample), &w) in self.scratch.iter_mut().zip(buffer).zip(&self.window) {
            *bin = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        for (band, (_, level)) in self.bands.iter().zip(self.spectrum.iter_mut()) {
            let power = self.scratch[band.clone()]
                .iter()
                .map(Complex::norm_sqr)
                .fold(1e-12f32, f32::max);
            *level = (10.0 * f64::from(power).log10()).max(FLOOR_DB);
        }
    }

    pub fn data(&self) -> &[(f64, f64)] {
        &self.spectrum
    }
}

/// Render the spectrum analyzer widget
pub fn render_spectrum(frame: &mut Frame, area: Rect, spectrum: &[(f64, f64)]) {
    let block = Block::default().title(" Spectrum ").borders(Borders::ALL);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(spectrum);

    let max_freq = spectrum.last().map_or(1.0, |(f, _)| *f);
    let top_db = spectrum.iter().map(|(_, db)| *db).fold(0.0, f64::max) + 10.0;

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([LOWEST_HZ as f64, max_freq])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([FLOOR_DB, top_db])
                .labels(vec!["-100", "-50", "0"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_peaks_in_its_band() {
        let size = 1024;
        let sample_rate = 48_000;
        let freq = 3_000.0;
        let tone: Vec<f32> = (0..size)
            .map(|n| (TAU * freq * n as f32 / sample_rate as f32).sin())
            .collect();

        let mut analyzer = SpectrumAnalyzer::new(size, sample_rate);
        analyzer.update(&tone);

        let (loudest, _) = analyzer
            .data()
            .iter()
            .copied()
            .fold((0.0, f64::MIN), |best, band| if band.1 > best.1 { band } else { best });
        assert!((loudest / freq as f64).log2().abs() < 0.25, "peak at {loudest} Hz");
    }
}
