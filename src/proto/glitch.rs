/* Glitch timing engine: converts nanosecond parameters to device clock cycles
 * and tracks the arming state machine shared by fault-injection drivers. */

use thiserror::Error;

use crate::device::GlitchConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GlitchError {
    #[error("invalid glitch config: {0}")]
    InvalidConfig(String),

    #[error("operation not allowed in state {0:?}")]
    BadState(ArmState),
}

/* Converter between absolute nanoseconds and device clock cycles.
 *
 * The period is carried in picoseconds so an 8.3 ns clock stays exact.
 * Width rounds up so a requested pulse never silently shrinks to zero;
 * offset rounds down so the glitch never lands later than asked. */
#[derive(Debug, Clone, Copy)]
pub struct GlitchTimer {
    period_ps: u64,
}

impl GlitchTimer {
    pub fn new(period_ps: u64) -> Self {
        debug_assert!(period_ps > 0);
        Self { period_ps }
    }

    pub fn period_ps(&self) -> u64 {
        self.period_ps
    }

    /* ceil(width_ns / period) */
    pub fn width_cycles(&self, width_ns: u64) -> u64 {
        (width_ns * 1000).div_ceil(self.period_ps)
    }

    /* floor(offset_ns / period) */
    pub fn offset_cycles(&self, offset_ns: u64) -> u64 {
        (offset_ns * 1000) / self.period_ps
    }

    /* Validate a config and return its (width, offset) in cycles. */
    pub fn plan(&self, config: &GlitchConfig) -> Result<GlitchPlan, GlitchError> {
        config
            .validate()
            .map_err(|e| GlitchError::InvalidConfig(e.0))?;

        let width_cycles = self.width_cycles(config.width_ns);
        if width_cycles == 0 {
            return Err(GlitchError::InvalidConfig(format!(
                "width {} ns is below one clock cycle",
                config.width_ns
            )));
        }

        Ok(GlitchPlan {
            width_cycles,
            offset_cycles: self.offset_cycles(config.offset_ns),
            repeat: config.repeat,
        })
    }
}

/* Device-clock rendering of a GlitchConfig. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlitchPlan {
    pub width_cycles: u64,
    pub offset_cycles: u64,
    pub repeat: u32,
}

/* Arming state machine.
 *
 *   Idle -> Configured -> Armed -> (fired | disarmed) -> ...
 *
 * `arm` requires Configured; `trigger` requires Configured or Armed;
 * `disarm` is accepted from any non-Idle state. Reconfiguring while
 * Armed implicitly disarms back to Configured. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArmState {
    #[default]
    Idle,
    Configured,
    Armed,
}

impl ArmState {
    pub fn on_configure(&mut self) {
        /* Implicit disarm when reconfiguring an armed device. */
        *self = ArmState::Configured;
    }

    pub fn on_arm(&mut self) -> Result<(), GlitchError> {
        match self {
            ArmState::Configured => {
                *self = ArmState::Armed;
                Ok(())
            }
            other => Err(GlitchError::BadState(*other)),
        }
    }

    /* A manual trigger returns the device to Configured. */
    pub fn on_trigger(&mut self) -> Result<(), GlitchError> {
        match self {
            ArmState::Configured | ArmState::Armed => {
                *self = ArmState::Configured;
                Ok(())
            }
            ArmState::Idle => Err(GlitchError::BadState(ArmState::Idle)),
        }
    }

    pub fn on_disarm(&mut self) -> Result<(), GlitchError> {
        match self {
            ArmState::Idle => Err(GlitchError::BadState(ArmState::Idle)),
            _ => {
                *self = ArmState::Configured;
                Ok(())
            }
        }
    }

    pub fn reset(&mut self) {
        *self = ArmState::Idle;
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, ArmState::Armed)
    }
}

/* One record per trigger emitted by a parameter sweep. */
#[derive(Debug, Clone)]
pub struct SweepResult {
    pub width_ns: u64,
    pub offset_ns: u64,
    pub attempt: u32,
    pub observation: Option<String>,
}

/* Inclusive-range parameter grid for a glitch sweep. Yields one
 * (width, offset) pair per combination, widths outermost. */
pub fn sweep_grid(
    width_range: (u64, u64),
    width_step: u64,
    offset_range: (u64, u64),
    offset_step: u64,
) -> Vec<(u64, u64)> {
    let mut grid = Vec::new();
    if width_step == 0 || offset_step == 0 {
        return grid;
    }

    let mut width = width_range.0;
    while width <= width_range.1 {
        let mut offset = offset_range.0;
        while offset <= offset_range.1 {
            grid.push((width, offset));
            offset += offset_step;
        }
        width += width_step;
    }
    grid
}
