use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::graph::node::{Kernel, Node, NodeRef};

/*
Oscillator Nodes
================

An oscillator node has no inputs and one output. Every tick it writes the
next sample of its waveform to output 0. Parameters are changed through
`Node::with_oscillator`, typically from a shred:

    let osc = OscNode::sine(server.sample_rate());
    connect(&osc, server.dac(), None)?;

    osc.with_oscillator(|o| o.set_frequency(660.0));

A change made by a shred during tick N is heard in the frame of tick N,
because the scheduler drains before the graph is pulled.
*/

pub struct OscNode;

impl OscNode {
    pub fn new(waveform: Waveform, sample_rate: u32) -> NodeRef {
        Node::from_kernel(0, 1, Kernel::Oscillator(Oscillator::new(waveform, sample_rate)))
    }

    pub fn sine(sample_rate: u32) -> NodeRef {
        Self::new(Waveform::Sine, sample_rate)
    }

    pub fn square(sample_rate: u32) -> NodeRef {
        Self::new(Waveform::Square, sample_rate)
    }

    pub fn saw(sample_rate: u32) -> NodeRef {
        Self::new(Waveform::Saw, sample_rate)
    }

    pub fn pulse(sample_rate: u32) -> NodeRef {
        Self::new(Waveform::Pulse, sample_rate)
    }

    pub fn triangle(sample_rate: u32) -> NodeRef {
        Self::new(Waveform::Triangle, sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParamError;

    #[test]
    fn writes_one_sample_per_tick() {
        let osc = OscNode::saw(48_000);
        osc.with_oscillator(|o| o.set_gain(1.0)).unwrap().unwrap();
        let w = osc.with_oscillator(|o| o.increment()).unwrap();

        osc.tick(0);
        assert_eq!(osc.output(0), Some(0.0));
        osc.tick(0);
        osc.tick(1);
        let expected = w / std::f32::consts::PI;
        assert!((osc.output(0).unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn parameter_errors_surface_through_node() {
        let osc = OscNode::sine(48_000);
        assert_eq!(
            osc.with_oscillator(|o| o.set_frequency(-1.0)),
            Some(Err(ParamError::Frequency(-1.0)))
        );

        let plain = Node::new(0, 1);
        assert_eq!(plain.with_oscillator(|o| o.frequency()), None);
    }

    #[test]
    fn has_no_inputs() {
        let osc = OscNode::triangle(48_000);
        assert_eq!(osc.input_size(), 0);
        assert_eq!(osc.output_size(), 1);
    }
}
