//! Constant-gain scaling between two buffers.

/*
Gain
====

Scaling a signal by a constant is the whole job of the gain kernel:

    output[i] = input[i] * gain

  gain > 1.0  louder
  gain = 1.0  unchanged
  gain < 1.0  quieter
  gain = 0.0  silence

Because routes already sum every source into a node's inputs, a gain node is
also the mixer of the graph: route several sources into one gain node and
its output is the scaled sum.

When the buffers have different lengths only the common prefix is written;
any extra output channels keep whatever they held before (zero unless
something else wrote them).
*/

/// Write `input * gain` into `output` over the common prefix.
#[inline]
pub fn scale_into(input: &[f32], output: &mut [f32], gain: f32) {
    for (o, &i) in output.iter_mut().zip(input.iter()) {
        *o = i * gain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_common_prefix() {
        let input = [1.0, 0.5, -0.5];
        let mut output = [9.0; 4];
        scale_into(&input, &mut output, 0.5);
        assert_eq!(output, [0.5, 0.25, -0.25, 9.0]);
    }

    #[test]
    fn zero_gain_silences() {
        let mut output = [0.3, -0.7];
        scale_into(&[1.0, 1.0], &mut output, 0.0);
        assert_eq!(output, [0.0, 0.0]);
    }
}
