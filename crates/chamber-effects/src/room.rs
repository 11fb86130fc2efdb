//! A complete room: material filter, early reflections and late tail.
//!
//! [`Room`] owns every piece of DSP state and is meant to live on the audio
//! thread. Other threads steer it through a [`RoomController`], which queues
//! [`RoomCommand`]s on a crossbeam channel. The room drains that queue at the
//! start of each [`process`](Effect::process) /
//! [`process_block`](Effect::process_block) call, so a coefficient set or tap
//! table is never swapped halfway through a sample.
//!
//! # Example
//!
//! ```rust
//! use chamber_core::Effect;
//! use chamber_effects::{Room, RoomSettings};
//!
//! let (mut room, controller) = Room::new(RoomSettings::default())?;
//!
//! controller.set_size(60.0, 40.0, 20.0);
//! controller.set_openness(0.3);
//!
//! let mut block = vec![0.0; 256];
//! block[0] = 1.0;
//! room.process_block_inplace(&mut block);
//! assert_eq!(room.early().goal_dimensions(), [60.0, 40.0, 20.0]);
//! # Ok::<(), chamber_core::FilterError>(())
//! ```

use chamber_core::{DEFAULT_SEED, Effect, FilterDesigner, FilterError, FilterSpec, ResponseType};
use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::{EarlyReflections, ReverbUnit};

/// Absorption curve shared by both stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Response shape.
    pub response: ResponseType,
    /// Design frequency in Hz.
    pub frequency: f64,
    /// Linear gain; see [`UNITY_GAIN`](chamber_core::UNITY_GAIN).
    pub gain: f64,
    /// Q, bandwidth or slope, depending on `response`.
    pub shape: f64,
}

impl Default for Material {
    /// Walls that soak up treble: -6 dB above 4 kHz.
    fn default() -> Self {
        Self {
            response: ResponseType::HighShelf,
            frequency: 4000.0,
            gain: 2.0,
            shape: 1.0,
        }
    }
}

impl Material {
    fn spec(&self, sample_rate: f32) -> FilterSpec {
        FilterSpec {
            response: self.response,
            sample_rate: f64::from(sample_rate),
            frequency: self.frequency,
            gain: self.gain,
            shape: self.shape,
        }
    }
}

/// Everything needed to build a [`Room`].
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSettings {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Room length in feet.
    pub length: f32,
    /// Room width in feet.
    pub width: f32,
    /// Room height in feet.
    pub height: f32,
    /// Listener placement spread, 0 to 0.5.
    pub stereo_width: f32,
    /// Wall absorption.
    pub material: Material,
    /// Velvet impulses per second in the late tail.
    pub density: f32,
    /// Initial late-tail decay, 0 to 1.
    pub reverberance: f32,
    /// Early echo gain.
    pub factor: f32,
    /// Late tail level in the output.
    pub wet: f32,
    /// Whether to build the late tail at all.
    pub late: bool,
    /// Seed for listener jitter.
    pub seed: u32,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            length: 30.0,
            width: 20.0,
            height: 12.0,
            stereo_width: 0.2,
            material: Material::default(),
            density: 2000.0,
            reverberance: 0.85,
            factor: 1.0,
            wet: 0.5,
            late: true,
            seed: DEFAULT_SEED,
        }
    }
}

/// A parameter change queued for the audio thread.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomCommand {
    /// Resize the room, in feet.
    SetSize {
        /// Length in feet.
        length: f32,
        /// Width in feet.
        width: f32,
        /// Height in feet.
        height: f32,
    },
    /// Early echo gain.
    SetFactor(f32),
    /// Late-tail openness, 0 (closed) to 1 (no tail).
    SetOpenness(f32),
    /// Replace the late tail's guaranteed taps, in samples.
    SetResonances(Vec<usize>),
    /// Material design frequency in Hz.
    SetFrequency(f64),
    /// Material linear gain.
    SetGain(f64),
    /// Material Q, bandwidth or slope.
    SetShape(f64),
    /// Late tail level in the output.
    SetWet(f32),
}

/// Cloneable, `Send` handle for steering a [`Room`] from another thread.
#[derive(Debug, Clone)]
pub struct RoomController {
    tx: Sender<RoomCommand>,
}

impl RoomController {
    /// Queue a command. Returns `false` once the room has been dropped.
    pub fn send(&self, command: RoomCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    /// Resize the room, in feet.
    pub fn set_size(&self, length: f32, width: f32, height: f32) -> bool {
        self.send(RoomCommand::SetSize {
            length,
            width,
            height,
        })
    }

    /// Set the early echo gain.
    pub fn set_factor(&self, factor: f32) -> bool {
        self.send(RoomCommand::SetFactor(factor))
    }

    /// Set the late-tail openness.
    pub fn set_openness(&self, openness: f32) -> bool {
        self.send(RoomCommand::SetOpenness(openness))
    }

    /// Replace the late tail's guaranteed taps.
    pub fn set_resonances(&self, offsets: Vec<usize>) -> bool {
        self.send(RoomCommand::SetResonances(offsets))
    }

    /// Set the material frequency in Hz.
    pub fn set_frequency(&self, frequency: f64) -> bool {
        self.send(RoomCommand::SetFrequency(frequency))
    }

    /// Set the material linear gain.
    pub fn set_gain(&self, gain: f64) -> bool {
        self.send(RoomCommand::SetGain(gain))
    }

    /// Set the material Q, bandwidth or slope.
    pub fn set_shape(&self, shape: f64) -> bool {
        self.send(RoomCommand::SetShape(shape))
    }

    /// Set the late tail level.
    pub fn set_wet(&self, wet: f32) -> bool {
        self.send(RoomCommand::SetWet(wet))
    }
}

/// Early reflections feeding an optional late tail, both through one material.
#[derive(Debug)]
pub struct Room {
    material: FilterDesigner,
    early: EarlyReflections,
    late: Option<ReverbUnit>,
    commands: Receiver<RoomCommand>,
    /// Live parameters, kept so a sample-rate change can rebuild.
    settings: RoomSettings,
    released: bool,
}

impl Room {
    /// Build a room and the controller that steers it.
    pub fn new(settings: RoomSettings) -> Result<(Self, RoomController), FilterError> {
        let (tx, rx) = unbounded();
        let (material, early, late) = build(&settings)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            length = settings.length,
            width = settings.width,
            height = settings.height,
            late = settings.late,
            "room built"
        );

        let room = Self {
            material,
            early,
            late,
            commands: rx,
            settings,
            released: false,
        };
        Ok((room, RoomController { tx }))
    }

    /// Process one sample without draining commands.
    #[inline]
    pub fn tick(&mut self, input: f32) -> Result<f32, FilterError> {
        let early = self.early.process(input, &mut self.material)?;
        let Some(late) = self.late.as_mut() else {
            return Ok(early);
        };
        late.set_window(self.early.reverb_window());
        let tail = late.process(early, &mut self.material)?;
        Ok(early + tail * self.settings.wet)
    }

    /// [`tick`](Self::tick), passing `input` through if a stage has no voice.
    fn tick_or_dry(&mut self, input: f32) -> f32 {
        match self.tick(input) {
            Ok(out) => out,
            Err(err) => {
                #[cfg(feature = "tracing")]
                if !self.released {
                    tracing::warn!(%err, "room stage lost its voice, passing input through");
                }
                #[cfg(not(feature = "tracing"))]
                let _ = err;
                input
            }
        }
    }

    /// Apply every queued command. Returns how many were applied.
    pub fn drain_commands(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
            applied += 1;
        }

        #[cfg(feature = "tracing")]
        if applied > 0 {
            tracing::debug!(applied, "room commands drained");
        }
        applied
    }

    /// Apply one command immediately.
    pub fn apply(&mut self, command: RoomCommand) {
        let redesigned = match command {
            RoomCommand::SetSize {
                length,
                width,
                height,
            } => {
                self.early.set_size(length, width, height);
                [self.settings.length, self.settings.width, self.settings.height] =
                    self.early.goal_dimensions();
                if let Some(late) = self.late.as_mut() {
                    late.set_resonance(&self.early.delays());
                }
                Ok(())
            }
            RoomCommand::SetFactor(factor) => {
                self.early.set_factor(factor);
                self.settings.factor = factor;
                Ok(())
            }
            RoomCommand::SetOpenness(openness) => {
                if let Some(late) = self.late.as_mut() {
                    late.set_openness(openness);
                    self.settings.reverberance = late.goal_reverberance();
                }
                Ok(())
            }
            RoomCommand::SetResonances(offsets) => {
                if let Some(late) = self.late.as_mut() {
                    late.set_resonance(&offsets);
                }
                Ok(())
            }
            RoomCommand::SetFrequency(frequency) => self.material.set_frequency(frequency),
            RoomCommand::SetGain(gain) => self.material.set_gain(gain),
            RoomCommand::SetShape(shape) => self.material.set_shape(shape),
            RoomCommand::SetWet(wet) => {
                self.settings.wet = wet;
                Ok(())
            }
        };

        match redesigned {
            Ok(()) => {
                let spec = self.material.spec();
                self.settings.material.frequency = spec.frequency;
                self.settings.material.gain = spec.gain;
                self.settings.material.shape = spec.shape;
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%err, "material change rejected, keeping previous design");
                #[cfg(not(feature = "tracing"))]
                let _ = err;
            }
        }
    }

    /// Return both filter voices. Processing afterwards passes input through.
    pub fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.material.unregister(self.early.voice());
        if let Some(late) = &self.late {
            self.material.unregister(late.voice());
        }
        self.released = true;
    }

    /// The early-reflection stage.
    pub fn early(&self) -> &EarlyReflections {
        &self.early
    }

    /// The late tail, if built.
    pub fn late(&self) -> Option<&ReverbUnit> {
        self.late.as_ref()
    }

    /// The shared material filter.
    pub fn material(&self) -> &FilterDesigner {
        &self.material
    }

    /// Live parameters.
    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }
}

fn build(
    settings: &RoomSettings,
) -> Result<(FilterDesigner, EarlyReflections, Option<ReverbUnit>), FilterError> {
    let mut material = FilterDesigner::from_spec(settings.material.spec(settings.sample_rate))?;

    let mut early = EarlyReflections::with_seed(
        settings.sample_rate,
        settings.length,
        settings.width,
        settings.height,
        settings.stereo_width,
        &mut material,
        settings.seed,
    );
    early.set_factor(settings.factor);

    let late = settings.late.then(|| {
        let mut late = ReverbUnit::new(
            settings.sample_rate,
            early.reverb_window(),
            settings.density,
            settings.reverberance,
            &mut material,
        );
        late.set_resonance(&early.delays());
        late
    });

    Ok((material, early, late))
}

impl Effect for Room {
    fn process(&mut self, input: f32) -> f32 {
        self.drain_commands();
        self.tick_or_dry(input)
    }

    fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(
            input.len(),
            output.len(),
            "Input and output buffers must have same length"
        );
        self.drain_commands();
        for (inp, out) in input.iter().zip(output.iter_mut()) {
            *out = self.tick_or_dry(*inp);
        }
    }

    fn process_block_inplace(&mut self, buffer: &mut [f32]) {
        self.drain_commands();
        for sample in buffer.iter_mut() {
            *sample = self.tick_or_dry(*sample);
        }
    }

    /// Rebuilds every stage at the new rate. Rejected rates keep the old room.
    fn set_sample_rate(&mut self, sample_rate: f32) {
        let settings = RoomSettings {
            sample_rate,
            ..self.settings.clone()
        };
        match build(&settings) {
            Ok((material, early, late)) => {
                self.material = material;
                self.early = early;
                self.late = late;
                self.settings = settings;
                self.released = false;
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%err, sample_rate, "sample rate rejected");
                #[cfg(not(feature = "tracing"))]
                let _ = err;
            }
        }
    }

    fn reset(&mut self) {
        self.early.reset();
        if let Some(late) = self.late.as_mut() {
            late.reset();
        }
        self.material.reset_all();
    }
}

impl Drop for Room {
    fn drop(&mut self) {
        self.shutdown();
    }
}
