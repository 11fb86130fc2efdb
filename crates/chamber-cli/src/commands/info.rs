//! Derived room statistics.

use crate::config::RoomArgs;
use chamber_effects::Room;
use clap::Args;

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    room: RoomArgs,

    /// Sample rate in Hz
    #[arg(short, long, default_value = "48000")]
    sample_rate: u32,
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let config = args.room.resolve()?;
    let sample_rate = args.sample_rate as f32;
    let settings = config.settings(sample_rate)?;
    let (room, _controller) = Room::new(settings)?;

    let settings = room.settings();
    let early = room.early();
    let material = room.material().spec();

    println!(
        "Room: {:.1} x {:.1} x {:.1} ft at {} Hz",
        settings.length, settings.width, settings.height, args.sample_rate
    );
    println!(
        "Material: {} at {:.0} Hz, gain {:.2}, shape {:.2} (bound {:.2})",
        material.response,
        material.frequency,
        material.gain,
        material.shape,
        room.material().gain_bound()
    );

    println!("\nAxis resonances:");
    for (axis, delay) in ["height", "length", "width"].iter().zip(early.delays()) {
        println!(
            "  {:<7} {:>6} samples  {:>8.2} ms  {:>7.2} Hz",
            axis,
            delay,
            ms(delay as f32, sample_rate),
            sample_rate / delay.max(1) as f32
        );
    }
    println!(
        "  Travel: {:.2} ms to {:.2} ms",
        early.min_delay() * 1000.0,
        early.max_delay() * 1000.0
    );

    let taps = if early.heading_to_b() {
        early.slot_b()
    } else {
        early.slot_a()
    };
    println!("\nReflections (echo gain {:.2}):", early.factor());
    for (offset, weight) in taps.offsets().iter().zip(taps.weights()) {
        println!(
            "  {:>6} samples  {:>8.2} ms  weight {:.4}",
            offset,
            ms(*offset as f32, sample_rate),
            weight
        );
    }

    let [min, max] = early.reverb_window();
    println!(
        "\nReverb window: {:.0} to {:.0} samples ({:.1} ms to {:.1} ms)",
        min,
        max,
        ms(min, sample_rate),
        ms(max, sample_rate)
    );

    match room.late() {
        Some(late) => {
            let tail = late.tail();
            println!(
                "Late tail: {} rotations, {:.0} impulses/s, reverberance {:.2}, wet {:.2}",
                tail.rotation_count(),
                settings.density,
                late.reverberance(),
                settings.wet
            );
        }
        None => println!("Late tail: disabled"),
    }

    Ok(())
}

fn ms(samples: f32, sample_rate: f32) -> f32 {
    samples / sample_rate * 1000.0
}
