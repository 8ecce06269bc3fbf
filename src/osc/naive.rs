// Non-bandlimited reference oscillator. Aliases freely, so it is only good
// as an oracle for duty-cycle and timing checks in tests.

#[cfg(debug_assertions)]
#[allow(dead_code)]
pub struct NaiveSquare {
    phase: f32,
    phase_increment: f32,
    pulse_width: f32,
}

#[cfg(debug_assertions)]
#[allow(dead_code)]
impl NaiveSquare {
    pub fn new(frequency: f32, pulse_width: f32, sample_rate: i32) -> Self {
        Self {
            phase: 0.0,
            phase_increment: frequency / sample_rate as f32,
            pulse_width,
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        let value = if self.phase < self.pulse_width {
            1.0
        } else {
            -1.0
        };

        self.phase += self.phase_increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        value
    }
}
