//! Render configuration: an optional TOML file with command-line overrides.
//!
//! ```toml
//! [room]
//! length = 40.0
//! width = 25.0
//! height = 15.0
//!
//! [material]
//! response = "lowshelf"
//! frequency = 300.0
//! gain = 2.0
//!
//! [reverb]
//! reverberance = 0.9
//! tail_seconds = 3.0
//! ```
//!
//! Every field is optional. Missing fields fall back to
//! [`RoomSettings::default`].

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chamber_core::{ResponseType, gain_from_db};
use chamber_effects::RoomSettings;
use clap::Args;
use serde::Deserialize;

/// Silence appended after the input when nothing else is configured.
pub const DEFAULT_TAIL_SECONDS: f32 = 2.0;

/// Parsed render configuration.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub room: RoomSection,
    pub material: MaterialSection,
    pub reverb: ReverbSection,
}

/// `[room]`: geometry and early reflections.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoomSection {
    pub length: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub stereo_width: Option<f32>,
    pub factor: Option<f32>,
    pub seed: Option<u32>,
}

/// `[material]`: the absorption filter.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaterialSection {
    pub response: Option<String>,
    pub frequency: Option<f64>,
    pub gain: Option<f64>,
    pub shape: Option<f64>,
}

/// `[reverb]`: the late tail and the render length.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReverbSection {
    pub enabled: Option<bool>,
    pub density: Option<f32>,
    pub reverberance: Option<f32>,
    pub openness: Option<f32>,
    pub wet: Option<f32>,
    pub tail_seconds: Option<f32>,
}

impl RenderConfig {
    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Parse TOML text.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Replace every field that `top` sets.
    pub fn overlay(&mut self, top: RenderConfig) {
        let RenderConfig {
            room,
            material,
            reverb,
        } = top;

        overlay(&mut self.room.length, room.length);
        overlay(&mut self.room.width, room.width);
        overlay(&mut self.room.height, room.height);
        overlay(&mut self.room.stereo_width, room.stereo_width);
        overlay(&mut self.room.factor, room.factor);
        overlay(&mut self.room.seed, room.seed);

        overlay(&mut self.material.response, material.response);
        overlay(&mut self.material.frequency, material.frequency);
        overlay(&mut self.material.gain, material.gain);
        overlay(&mut self.material.shape, material.shape);

        overlay(&mut self.reverb.enabled, reverb.enabled);
        overlay(&mut self.reverb.density, reverb.density);
        overlay(&mut self.reverb.reverberance, reverb.reverberance);
        overlay(&mut self.reverb.openness, reverb.openness);
        overlay(&mut self.reverb.wet, reverb.wet);
        overlay(&mut self.reverb.tail_seconds, reverb.tail_seconds);
    }

    /// Build room settings at `sample_rate`.
    ///
    /// Filter parameters are checked later by the room itself; this only
    /// rejects what the room would silently clamp.
    pub fn settings(&self, sample_rate: f32) -> anyhow::Result<RoomSettings> {
        let mut settings = RoomSettings {
            sample_rate,
            ..RoomSettings::default()
        };

        let room = &self.room;
        settings.length = room.length.unwrap_or(settings.length);
        settings.width = room.width.unwrap_or(settings.width);
        settings.height = room.height.unwrap_or(settings.height);
        settings.stereo_width = room.stereo_width.unwrap_or(settings.stereo_width);
        settings.factor = room.factor.unwrap_or(settings.factor);
        settings.seed = room.seed.unwrap_or(settings.seed);

        for (name, value) in [
            ("length", settings.length),
            ("width", settings.width),
            ("height", settings.height),
        ] {
            if !(value.is_finite() && value > 0.0) {
                bail!("Room {name} must be a positive number of feet, got {value}");
            }
        }

        let material = &self.material;
        if let Some(name) = &material.response {
            settings.material.response = name.parse::<ResponseType>()?;
        }
        settings.material.frequency = material.frequency.unwrap_or(settings.material.frequency);
        settings.material.gain = material.gain.unwrap_or(settings.material.gain);
        settings.material.shape = material.shape.unwrap_or(settings.material.shape);

        let reverb = &self.reverb;
        settings.late = reverb.enabled.unwrap_or(settings.late);
        settings.density = reverb.density.unwrap_or(settings.density);
        settings.reverberance = reverb.reverberance.unwrap_or(settings.reverberance);
        settings.wet = reverb.wet.unwrap_or(settings.wet);

        if !(settings.density.is_finite() && settings.density > 0.0) {
            bail!("Density must be positive, got {}", settings.density);
        }

        Ok(settings)
    }

    /// Openness to glide toward after construction, if any.
    pub fn openness(&self) -> Option<f32> {
        self.reverb.openness
    }

    /// Seconds of silence to render after the input.
    pub fn tail_seconds(&self) -> anyhow::Result<f32> {
        let seconds = self.reverb.tail_seconds.unwrap_or(DEFAULT_TAIL_SECONDS);
        if !(seconds.is_finite() && seconds >= 0.0) {
            bail!("Tail length must be zero or more seconds, got {seconds}");
        }
        Ok(seconds)
    }
}

fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Room flags shared by every subcommand. Flags win over the config file.
#[derive(Args, Debug, Default)]
pub struct RoomArgs {
    /// Render configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Room length in feet
    #[arg(long)]
    pub length: Option<f32>,

    /// Room width in feet
    #[arg(long)]
    pub width: Option<f32>,

    /// Room height in feet
    #[arg(long)]
    pub height: Option<f32>,

    /// Listener placement spread (0.0 to 0.5)
    #[arg(long)]
    pub stereo_width: Option<f32>,

    /// Wall material response (lowpass, highpass, bandpass, peak, notch, lowshelf, highshelf)
    #[arg(short, long)]
    pub material: Option<String>,

    /// Material frequency in Hz
    #[arg(long)]
    pub frequency: Option<f64>,

    /// Material gain, linear (4.0 is flat)
    #[arg(long, conflicts_with = "gain_db")]
    pub gain: Option<f64>,

    /// Material gain in dB (0 is flat)
    #[arg(long, allow_hyphen_values = true)]
    pub gain_db: Option<f64>,

    /// Material Q, bandwidth or slope
    #[arg(long)]
    pub shape: Option<f64>,

    /// Late tail impulses per second
    #[arg(long)]
    pub density: Option<f32>,

    /// Late tail decay (0.0 to 1.0)
    #[arg(long)]
    pub reverberance: Option<f32>,

    /// Glide the decay toward 1 - openness once rendering starts
    #[arg(long)]
    pub openness: Option<f32>,

    /// Early echo gain
    #[arg(long)]
    pub factor: Option<f32>,

    /// Late tail level in the output
    #[arg(long)]
    pub wet: Option<f32>,

    /// Seconds of silence rendered after the input
    #[arg(long)]
    pub tail_seconds: Option<f32>,

    /// Seed for listener placement jitter
    #[arg(long)]
    pub seed: Option<u32>,

    /// Early reflections only
    #[arg(long)]
    pub no_late: bool,
}

impl RoomArgs {
    /// Load the config file, if any, and apply flags on top.
    pub fn resolve(&self) -> anyhow::Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path)?,
            None => RenderConfig::default(),
        };
        config.overlay(self.overrides());
        Ok(config)
    }

    fn overrides(&self) -> RenderConfig {
        RenderConfig {
            room: RoomSection {
                length: self.length,
                width: self.width,
                height: self.height,
                stereo_width: self.stereo_width,
                factor: self.factor,
                seed: self.seed,
            },
            material: MaterialSection {
                response: self.material.clone(),
                frequency: self.frequency,
                gain: self.gain.or(self.gain_db.map(gain_from_db)),
                shape: self.shape,
            },
            reverb: ReverbSection {
                enabled: self.no_late.then_some(false),
                density: self.density,
                reverberance: self.reverberance,
                openness: self.openness,
                wet: self.wet,
                tail_seconds: self.tail_seconds,
            },
        }
    }
}
