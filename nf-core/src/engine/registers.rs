//! Auxiliary register-write engine
//!
//! Applies side-channel EC configuration writes (e.g. forcing the EC into
//! manual fan mode) around the actual speed control. Each entry carries its
//! own compose mode and reset policy; register writes here are always byte
//! I/O regardless of the fan-speed word mode.

use tracing::{debug, warn};

use crate::data::{RegisterWriteConfiguration, RegisterWriteMode, RegisterWriteOccasion};
use crate::error::Result;
use crate::hw::EmbeddedController;

/// Ordered list of auxiliary register writes.
///
/// The engine performs no retries; retry policy lives with the callers
/// (the control loop retries the whole reset pass, not individual writes).
#[derive(Debug, Clone, Default)]
pub struct RegisterWriteEngine {
    configs: Vec<RegisterWriteConfiguration>,
}

impl RegisterWriteEngine {
    pub fn new(configs: Vec<RegisterWriteConfiguration>) -> Self {
        Self { configs }
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn configs(&self) -> &[RegisterWriteConfiguration] {
        &self.configs
    }

    /// Apply the configured writes in order. With `include_init_only` every
    /// entry is applied (the initialization pass); otherwise only
    /// `OnEveryWrite` entries are.
    ///
    /// The caller must hold the EC lock.
    pub fn apply(&self, ec: &dyn EmbeddedController, include_init_only: bool) -> Result<()> {
        for config in &self.configs {
            if !include_init_only && config.occasion == RegisterWriteOccasion::OnInitialization {
                continue;
            }
            apply_write(ec, config.register, config.value, config.write_mode)?;
        }
        Ok(())
    }

    /// Write every entry's reset value where a reset is required.
    ///
    /// Best-effort by design: failures are logged per entry and never
    /// propagated, so repeated invocations against unreachable hardware are
    /// harmless.
    pub fn reset(&self, ec: &dyn EmbeddedController) {
        for config in self.configs.iter().filter(|c| c.reset_required) {
            if let Err(e) = apply_write(ec, config.register, config.reset_value, config.reset_write_mode)
            {
                warn!(
                    register = config.register,
                    error = %e,
                    "register reset write failed"
                );
            }
        }
    }
}

fn apply_write(
    ec: &dyn EmbeddedController,
    register: u8,
    value: u8,
    mode: RegisterWriteMode,
) -> Result<()> {
    let combined = match mode {
        RegisterWriteMode::Set => value,
        RegisterWriteMode::And => ec.read_byte(register)? & value,
        RegisterWriteMode::Or => ec.read_byte(register)? | value,
    };
    debug!(register, value = combined, ?mode, "register write");
    ec.write_byte(register, combined)
}
