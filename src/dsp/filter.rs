use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
| mode      | passes          | rejects         | raw coefficients (b = feedforward)      |
| --------- | --------------- | --------------- | --------------------------------------- |
| low-pass  | below cutoff    | above cutoff    | b0 = b2 = (1-cos ω0)/2, b1 = 1-cos ω0   |
| high-pass | above cutoff    | below cutoff    | b0 = b2 = (1+cos ω0)/2, b1 = -(1+cos ω0)|
| band-pass | around cutoff   | both sides      | b0 = α, b1 = 0, b2 = -α                 |
| off       | everything      | nothing         | (no computation, passthrough)           |

Shared feedback terms: a0 = 1 + α, a1 = -2 cos ω0, a2 = 1 - α

    ω0 = 2π · cutoff / sample_rate
    Q  = 0.707 + resonance · 9.0
    α  = sin(ω0) / (2Q)

Every raw coefficient is divided by a0. After normalisation the
direct-form-I recurrence this filter runs is:

    y[n] = a0·x[n] + a1·x[n-1] + a2·x[n-2] - b1·y[n-1] - b2·y[n-2]

where (a0, a1, a2) are the normalised feedforward terms and (b1, b2) the
normalised feedback terms.
*/

pub const MIN_CUTOFF_HZ: f32 = 20.0;
pub const MAX_CUTOFF_HZ: f32 = 20_000.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Off,
    LowPass,
    HighPass,
    BandPass,
}

/// Second-order IIR filter with a resonant peak at the cutoff.
pub struct ResonantFilter {
    sample_rate: f32,
    mode: FilterMode,
    cutoff_hz: f32,
    resonance: f32,

    // Normalised coefficients
    a0: f32,
    a1: f32,
    a2: f32,
    b1: f32,
    b2: f32,

    // History: x[n-1], x[n-2], y[n-1], y[n-2]
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl ResonantFilter {
    pub fn new(sample_rate: f32) -> Self {
        let mut filter = Self {
            sample_rate,
            mode: FilterMode::Off,
            cutoff_hz: 1_000.0,
            resonance: 0.0,
            a0: 1.0,
            a1: 0.0,
            a2: 0.0,
            b1: 0.0,
            b2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        filter.update_coefficients();
        filter
    }

    pub fn lowpass(sample_rate: f32, cutoff_hz: f32) -> Self {
        let mut filter = Self::new(sample_rate);
        filter.set_params(FilterMode::LowPass, cutoff_hz, 0.0);
        filter
    }

    pub fn highpass(sample_rate: f32, cutoff_hz: f32) -> Self {
        let mut filter = Self::new(sample_rate);
        filter.set_params(FilterMode::HighPass, cutoff_hz, 0.0);
        filter
    }

    pub fn bandpass(sample_rate: f32, cutoff_hz: f32) -> Self {
        let mut filter = Self::new(sample_rate);
        filter.set_params(FilterMode::BandPass, cutoff_hz, 0.0);
        filter
    }

    /// Highest usable cutoff: 20 kHz, or just under Nyquist at low rates.
    fn max_cutoff(&self) -> f32 {
        MAX_CUTOFF_HZ.min(self.sample_rate * 0.49)
    }

    pub fn set_params(&mut self, mode: FilterMode, cutoff_hz: f32, resonance: f32) {
        self.mode = mode;
        self.cutoff_hz = cutoff_hz.clamp(MIN_CUTOFF_HZ, self.max_cutoff());
        self.resonance = resonance.clamp(0.0, 1.0);
        self.update_coefficients();
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.set_params(self.mode, cutoff_hz, self.resonance);
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        self.set_params(self.mode, self.cutoff_hz, resonance);
    }

    fn update_coefficients(&mut self) {
        if self.mode == FilterMode::Off {
            return;
        }

        let w0 = TAU * self.cutoff_hz / self.sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let q = 0.707 + self.resonance * 9.0;
        let alpha = sin_w0 / (2.0 * q);

        let (ff0, ff1, ff2) = match self.mode {
            FilterMode::LowPass => {
                let k = (1.0 - cos_w0) / 2.0;
                (k, 1.0 - cos_w0, k)
            }
            FilterMode::HighPass => {
                let k = (1.0 + cos_w0) / 2.0;
                (k, -(1.0 + cos_w0), k)
            }
            FilterMode::BandPass => (alpha, 0.0, -alpha),
            FilterMode::Off => unreachable!("passthrough has no coefficients"),
        };

        let norm = 1.0 + alpha;
        self.a0 = ff0 / norm;
        self.a1 = ff1 / norm;
        self.a2 = ff2 / norm;
        self.b1 = (-2.0 * cos_w0) / norm;
        self.b2 = (1.0 - alpha) / norm;
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        if self.mode == FilterMode::Off {
            return x;
        }

        let y = self.a0 * x + self.a1 * self.x1 + self.a2 * self.x2
            - self.b1 * self.y1
            - self.b2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Zero the input/output history.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn resonance(&self) -> f32 {
        self.resonance
    }
}
