//! Offline rendering through a room.

use crate::config::RoomArgs;
use chamber_effects::Room;
use chamber_io::{BitDepth, SignalStats, read_mono, render, write_mono};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Args)]
pub struct RenderArgs {
    /// Input WAV file (multichannel input is mixed to mono)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    #[command(flatten)]
    room: RoomArgs,

    /// Processing block size
    #[arg(long, default_value = "512")]
    block_size: usize,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let depth = BitDepth::try_from(args.bit_depth)?;
    let config = args.room.resolve()?;

    println!("Reading {}...", args.input.display());
    let clip = read_mono(&args.input)?;
    let samples = &clip.samples;
    let sample_rate = clip.sample_rate as f32;

    println!(
        "  {} samples, {} Hz, {:.2}s",
        samples.len(),
        clip.sample_rate,
        clip.duration_secs()
    );
    if clip.source_channels > 1 {
        println!("  mixed down from {} channels", clip.source_channels);
    }

    let settings = config.settings(sample_rate)?;
    let tail_samples = (config.tail_seconds()? * sample_rate).round() as usize;
    let (mut room, controller) = Room::new(settings)?;
    if let Some(openness) = config.openness() {
        controller.set_openness(openness);
    }

    let settings = room.settings();
    println!(
        "Rendering {:.0} x {:.0} x {:.0} ft room, {} material{}...",
        settings.length,
        settings.width,
        settings.height,
        settings.material.response,
        if settings.late { "" } else { ", early reflections only" }
    );

    let total = samples.len() + tail_samples;
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let output = render(&mut room, samples, tail_samples, args.block_size, |done| {
        pb.set_position(done as u64);
    });
    pb.finish_with_message("done");
    room.shutdown();

    let input_stats = SignalStats::measure(samples);
    let output_stats = SignalStats::measure(&output);

    println!("\nStats:");
    println!(
        "  Input:  RMS {:.1} dB, Peak {:.1} dB",
        input_stats.rms_db(),
        input_stats.peak_db()
    );
    println!(
        "  Output: RMS {:.1} dB, Peak {:.1} dB",
        output_stats.rms_db(),
        output_stats.peak_db()
    );
    if output_stats.peak > 1.0 {
        println!("  Warning: output exceeds full scale and will clip below 32-bit");
    }

    println!("\nWriting {}...", args.output.display());
    write_mono(&args.output, &output, clip.sample_rate, depth)?;
    println!("Done!");

    Ok(())
}
