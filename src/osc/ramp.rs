use simplelog::warn;

/// Duty cycles of exactly 0 or 1 collapse the wave into DC, so the pulse
/// width is kept strictly inside (0, 1).
const PULSE_WIDTH_EPSILON: f32 = 1e-3;

/// Identifies one of the five controllable parameters of the oscillator.
///
/// Ranges and defaults follow the classic square-wave generator node:
/// 440 Hz, full amplitude, 50% duty cycle, no detuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterId {
    Frequency,
    Amplitude,
    PulseWidth,
    DetuningOffset,
    DetuningMultiplier,
}

impl ParameterId {
    /// Tag of the parameter, used for logging and preset files.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Frequency => "frequency",
            Self::Amplitude => "amplitude",
            Self::PulseWidth => "pulse_width",
            Self::DetuningOffset => "detuning_offset",
            Self::DetuningMultiplier => "detuning_multiplier",
        }
    }

    /// Value a freshly built oscillator starts from.
    pub fn default_value(&self) -> f32 {
        match self {
            Self::Frequency => 440.0,
            Self::Amplitude => 1.0,
            Self::PulseWidth => 0.5,
            Self::DetuningOffset => 0.0,
            Self::DetuningMultiplier => 1.0,
        }
    }

    /// Valid range of the parameter. Values outside are clamped, never
    /// rejected.
    pub fn range(&self) -> (f32, f32) {
        match self {
            Self::Frequency => (10.0, 22_000.0),
            Self::Amplitude => (0.0, 1.0),
            Self::PulseWidth => (PULSE_WIDTH_EPSILON, 1.0 - PULSE_WIDTH_EPSILON),
            Self::DetuningOffset => (-1000.0, 1000.0),
            Self::DetuningMultiplier => (0.1, 10.0),
        }
    }

    /// Pulls `value` into the valid range. NaN falls back to the default.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            warn!("<b>Received <red>NaN</> <b>for {}. Using the default.</>", self.tag());
            return self.default_value();
        }

        let (min, max) = self.range();
        if value < min || value > max {
            #[cfg(feature = "verbose_modules")]
            {
                warn!("<b>Value <yellow>out of range</><b>.</>");
                warn!("  |_ Parameter: <yellow>{}</>", self.tag());
                warn!("  |_ Input value: <red>{}</>", value);
                warn!("  |_ Valid range: <green>[{}, {}]</>", min, max);
                warn!("  |_ Value clamped.");
            }
            value.clamp(min, max)
        } else {
            value
        }
    }
}

/// A ramp in flight for a single parameter: linear interpolation from
/// `start_value` towards `target_value` over `total_ramp_samples`. Destroyed
/// once `elapsed_samples` catches up, at which point the value snaps to the
/// target exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampTarget {
    start_value: f32,
    target_value: f32,
    elapsed_samples: u32,
    total_ramp_samples: u32,
}

impl RampTarget {
    fn value(&self) -> f32 {
        let progress = self.elapsed_samples as f32 / self.total_ramp_samples as f32;
        self.start_value + (self.target_value - self.start_value) * progress
    }

    /// Moves one sample forward. Returns true once the target is reached.
    fn advance(&mut self) -> bool {
        self.elapsed_samples += 1;
        self.elapsed_samples >= self.total_ramp_samples
    }
}

/// Current value of one parameter plus its in-flight ramp, if any.
#[derive(Debug, Clone, Copy)]
pub struct SmoothedParam {
    id: ParameterId,
    current: f32,
    ramp: Option<RampTarget>,
}

impl SmoothedParam {
    pub fn new(id: ParameterId) -> Self {
        Self {
            id,
            current: id.default_value(),
            ramp: None,
        }
    }

    pub fn with_value(id: ParameterId, value: f32) -> Self {
        Self {
            id,
            current: id.clamp(value),
            ramp: None,
        }
    }

    /// Value as of the last tick.
    pub fn get(&self) -> f32 {
        self.current
    }

    pub fn is_ramping(&self) -> bool {
        self.ramp.is_some()
    }

    /// Begins a ramp towards `value` over `ramp_samples` samples. A ramp
    /// already in progress is replaced, restarting from the current
    /// interpolated value so no discontinuity is produced. Zero samples
    /// applies immediately.
    pub fn set(&mut self, value: f32, ramp_samples: u32) {
        let target = self.id.clamp(value);

        if ramp_samples == 0 {
            self.current = target;
            self.ramp = None;
        } else {
            self.ramp = Some(RampTarget {
                start_value: self.current,
                target_value: target,
                elapsed_samples: 0,
                total_ramp_samples: ramp_samples,
            });
        }
    }

    /// Drops any ramp and forces the value. Used by `configure`.
    pub fn reset(&mut self, value: f32) {
        self.current = self.id.clamp(value);
        self.ramp = None;
    }

    /// Advances the ramp by one sample and returns the interpolated value.
    pub fn tick(&mut self) -> f32 {
        if let Some(ramp) = self.ramp.as_mut() {
            if ramp.advance() {
                self.current = ramp.target_value;
                self.ramp = None;
            } else {
                self.current = ramp.value();
            }
        }

        self.current
    }
}
