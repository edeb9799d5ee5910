use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationConfig {
    /// Upper bound on neighbor examinations per relocation call.
    /// `None` derives the bound from the bond count.
    pub max_steps: Option<usize>,
}

impl RelocationConfig {
    /// Step budget for one relocation call over a graph with `bond_count` bonds.
    ///
    /// Each particle is expanded at most once per call, so a traversal never needs more than
    /// one step per bond direction; the default budget is exactly that plus one.
    pub fn budget_for(&self, bond_count: usize) -> usize {
        self.max_steps
            .unwrap_or_else(|| bond_count.saturating_mul(2).saturating_add(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairConfig {
    pub relocation: RelocationConfig,
}

#[derive(Default)]
pub struct RepairConfigBuilder {
    max_relocation_steps: Option<usize>,
}

impl RepairConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_relocation_steps(mut self, steps: Option<usize>) -> Self {
        self.max_relocation_steps = steps;
        self
    }

    pub fn build(self) -> Result<RepairConfig, ConfigError> {
        if self.max_relocation_steps == Some(0) {
            return Err(ConfigError::InvalidParameter {
                name: "max_relocation_steps",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(RepairConfig {
            relocation: RelocationConfig {
                max_steps: self.max_relocation_steps,
            },
        })
    }
}
