//! Demo patch shared by `play` and `render`
//!
//! ```text
//! lead (sine) ----------.
//! bass (triangle) ------+--> master (gain) --> dac
//! click (pulse) -> level'
//! ```
//!
//! The melody shred retunes lead and bass every step and broadcasts the
//! beat event on every bar; the pulse shred waits on that event and opens
//! the click's level for a few milliseconds.

use color_eyre::eyre::{eyre, Result as EyreResult};
use tickshred::dsp::{Oscillator, Waveform};
use tickshred::graph::Kernel;
use tickshred::shred::{task, Event, Suspension, TaskHandle};
use tickshred::{NodeRef, ParamError, Server, TaskError};

/// A minor pentatonic phrase, MIDI note numbers.
const PHRASE: [u8; 8] = [57, 60, 62, 64, 67, 64, 62, 60];
const STEP_SECONDS: f64 = 0.2;
const STEPS_PER_BAR: usize = 4;

/// MIDI note number to Hz.
pub fn mtof(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

fn fault(err: impl std::fmt::Display) -> TaskError {
    TaskError::fault(err.to_string())
}

fn tune(
    node: &NodeRef,
    f: impl FnOnce(&mut Oscillator) -> Result<(), ParamError>,
) -> EyreResult<()> {
    node.with_oscillator(f)
        .ok_or_else(|| eyre!("{} is not an oscillator", node.id()))??;
    Ok(())
}

fn retune(node: &NodeRef, frequency: f32) -> Result<(), TaskError> {
    node.with_oscillator(|osc| osc.set_frequency(frequency))
        .ok_or_else(|| fault(format!("{} is not an oscillator", node.id())))?
        .map_err(fault)
}

fn set_level(node: &NodeRef, level: f32) {
    node.with_kernel(|kernel| *kernel = Kernel::Gain(level));
}

/// Nodes and shreds of the running patch. Sinks only hold weak references
/// to their sources, so the patch must outlive playback.
pub struct Patch {
    pub lead: NodeRef,
    pub beat: Event,
    pub melody: TaskHandle,
    pub pulse: TaskHandle,
    _graph: [NodeRef; 4],
}

impl Patch {
    pub fn build(server: &Server) -> EyreResult<Self> {
        let lead = server.oscillator(Waveform::Sine);
        let bass = server.oscillator(Waveform::Triangle);
        let click = server.oscillator(Waveform::Pulse);
        let click_level = server.gain(1, 0.0);
        let master = server.gain(1, 0.8);

        tune(&lead, |osc| osc.set_gain(0.3))?;
        tune(&bass, |osc| {
            osc.set_width(0.3)?;
            osc.set_gain(0.25)
        })?;
        tune(&click, |osc| {
            osc.set_frequency(2_000.0)?;
            osc.set_width(0.1)?;
            osc.set_gain(0.5)
        })?;

        server.connect(&lead, &master)?;
        server.connect(&bass, &master)?;
        server.connect(&click, &click_level)?;
        server.connect(&click_level, &master)?;
        server.connect(&master, server.dac())?;

        let beat = server.event();
        let melody = server.spork(melody(&lead, &bass, &beat));
        let pulse = server.spork(pulse(&click_level, &beat));

        Ok(Self {
            lead,
            beat,
            melody,
            pulse,
            _graph: [bass, click, click_level, master],
        })
    }

    pub fn lead_frequency(&self) -> f32 {
        self.lead.with_oscillator(|osc| osc.frequency()).unwrap_or(0.0)
    }
}

fn melody(lead: &NodeRef, bass: &NodeRef, beat: &Event) -> impl task::Task {
    let (lead, bass, beat) = (lead.clone(), bass.clone(), beat.clone());
    let mut step = 0usize;
    task::from_fn(move |server, _| {
        let note = PHRASE[step % PHRASE.len()];
        retune(&lead, mtof(note))?;
        if step % STEPS_PER_BAR == 0 {
            retune(&bass, mtof(note - 24))?;
            beat.broadcast(server, (step / STEPS_PER_BAR) as i64);
        }
        step += 1;
        Ok(Suspension::Timed(server.seconds(STEP_SECONDS)))
    })
}

fn pulse(level: &NodeRef, beat: &Event) -> impl task::Task {
    let (level, beat) = (level.clone(), beat.clone());
    let mut ringing = false;
    task::from_fn(move |server, wake| {
        if ringing {
            set_level(&level, 0.0);
            ringing = false;
            return Ok(Suspension::Await(beat.clone()));
        }
        match wake.and_then(|bar| bar.as_int()) {
            Some(bar) => {
                // Accent the first bar of every four.
                set_level(&level, if bar % 4 == 0 { 0.6 } else { 0.3 });
                ringing = true;
                Ok(Suspension::Timed(server.ms(30.0)))
            }
            None => Ok(Suspension::Await(beat.clone())),
        }
    })
}

/// Spork a short saw burst straight into the dac. Its nodes live inside
/// the shred and disappear from the graph when it ends.
pub fn burst(server: &Server) -> TaskHandle {
    let saw = server.oscillator(Waveform::Saw);
    let level = server.gain(1, 0.12);
    let mut started = false;
    server.spork(task::from_fn(move |server, _| {
        if started {
            server.disconnect(&level, server.dac());
            return Ok(Suspension::Terminated);
        }
        started = true;
        retune(&saw, mtof(81))?;
        server.connect(&saw, &level).map_err(fault)?;
        server.connect(&level, server.dac()).map_err(fault)?;
        Ok(Suspension::Timed(server.ms(400.0)))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickshred::ServerConfig;

    #[test]
    fn a4_is_440() {
        assert_eq!(mtof(69), 440.0);
        assert!((mtof(81) - 880.0).abs() < 1e-3);
    }

    #[test]
    fn patch_plays_and_bursts_clean_up() {
        let server = Server::new(ServerConfig::new().sample_rate(8_000).channels(1)).unwrap();
        let patch = Patch::build(&server).unwrap();
        assert_eq!(server.dac().source_count(), 1);

        let burst = burst(&server);
        server.advance(server.ms(10.0));
        assert_eq!(server.dac().source_count(), 2);

        server.advance(server.seconds(1.0));
        assert!(burst.is_terminated());
        assert_eq!(server.dac().source_count(), 1);
        assert_eq!(patch.lead_frequency(), mtof(PHRASE[5]));
        assert!(!patch.melody.is_terminated());
    }
}
