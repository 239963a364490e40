//! Offline rendering to WAV

use std::path::Path;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use hound::{SampleFormat, WavSpec, WavWriter};
use tickshred::io::converter;
use tickshred::shred::{task, Suspension};
use tickshred::{Server, ServerConfig};
use tracing::info;

use super::patch::{self, Patch};

/// Frames rendered per call into the server.
const BLOCK_FRAMES: usize = 1024;
const BURST_EVERY_SECONDS: f64 = 2.0;

pub fn render(path: &Path, config: ServerConfig, seconds: f64) -> EyreResult<()> {
    let channels = u16::try_from(config.output_channels)
        .wrap_err("too many output channels for a WAV file")?;
    let server = Server::new(config).wrap_err("invalid server configuration")?;
    let _patch = Patch::build(&server)?;

    // Nobody presses [B] offline.
    server.spork_in(
        server.seconds(1.0),
        task::from_fn(|server, _| {
            patch::burst(server);
            Ok(Suspension::Timed(server.seconds(BURST_EVERY_SECONDS)))
        }),
    );

    let spec = WavSpec {
        channels,
        sample_rate: server.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)
        .wrap_err_with(|| format!("failed to create {}", path.display()))?;

    let width = usize::from(channels);
    let total = server.seconds(seconds);
    let mut block = vec![0.0f32; BLOCK_FRAMES * width];
    let mut peak = 0.0f32;

    while server.now() < total {
        let frames = (total - server.now()).min(BLOCK_FRAMES as u64) as usize;
        let block = &mut block[..frames * width];
        server.process_interleaved(None, block);
        peak = peak.max(converter::peak(block));

        for &sample in block.iter() {
            writer
                .write_sample(converter::to_i16(sample))
                .wrap_err("failed to write sample")?;
        }
    }
    writer.finalize().wrap_err("failed to finalize WAV")?;

    let stats = server.stats();
    info!(
        path = %path.display(),
        frames = total,
        peak,
        shreds = stats.sporked,
        resumes = stats.resumes,
        "rendered"
    );
    server.stop();
    Ok(())
}
