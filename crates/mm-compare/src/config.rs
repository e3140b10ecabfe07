//! Comparison run configuration.

use mm_core::GeneratorConfig;
use mm_models::MemoryModel;

use crate::error::CompareError;

/// Maximum worker threads.
const JOBS_MAX: usize = 256;

/// Configuration for a comparison run.
#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// Program space to search
    pub generator: GeneratorConfig,
    /// Models to compare, in table order
    pub models: Vec<MemoryModel>,
    /// Worker threads (0 = one per CPU)
    pub jobs: usize,
    /// Programs evaluated per parallel batch
    pub batch_size: usize,
    /// Programs between progress reports
    pub progress_interval: u64,
    /// Programs between snapshots of the result
    pub snapshot_interval: u64,
    /// Re-derive every outcome set with the stateright machine
    pub cross_check: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            models: MemoryModel::ALL.to_vec(),
            jobs: 1,
            batch_size: 256,
            progress_interval: 10,
            snapshot_interval: 100,
            cross_check: false,
        }
    }
}

impl CompareConfig {
    /// Fast config for quick iteration.
    pub fn fast() -> Self {
        Self {
            generator: GeneratorConfig::small(),
            ..Default::default()
        }
    }

    /// Thorough config: larger program space, all CPUs, cross-checked.
    pub fn thorough() -> Self {
        Self {
            generator: GeneratorConfig::thorough(),
            jobs: 0,
            progress_interval: 1000,
            snapshot_interval: 10_000,
            cross_check: true,
            ..Default::default()
        }
    }

    /// Worker threads to actually use.
    pub fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get()
        } else {
            self.jobs
        }
    }

    /// Programs generated and evaluated before results are applied.
    pub fn effective_batch_size(&self) -> usize {
        if self.effective_jobs() == 1 {
            1
        } else {
            self.batch_size
        }
    }

    /// Check every setting.
    pub fn validate(&self) -> Result<(), CompareError> {
        self.generator.validate()?;

        if self.models.len() < 2 {
            return Err(CompareError::InvalidConfig(
                "at least two models are needed".to_string(),
            ));
        }
        for (i, model) in self.models.iter().enumerate() {
            if self.models[..i].contains(model) {
                return Err(CompareError::InvalidConfig(format!("{} listed twice", model)));
            }
        }
        if self.jobs > JOBS_MAX {
            return Err(CompareError::InvalidConfig(format!(
                "jobs must be at most {}, got {}",
                JOBS_MAX, self.jobs
            )));
        }
        if self.batch_size == 0 {
            return Err(CompareError::InvalidConfig("batch_size must be positive".to_string()));
        }
        if self.progress_interval == 0 || self.snapshot_interval == 0 {
            return Err(CompareError::InvalidConfig(
                "progress and snapshot intervals must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_presets() {
        assert!(CompareConfig::default().validate().is_ok());
        assert!(CompareConfig::fast().validate().is_ok());
        assert!(CompareConfig::thorough().validate().is_ok());
        assert!(CompareConfig::thorough().effective_jobs() >= 1);
    }

    #[test]
    fn test_sequential_batches_hold_one_program() {
        assert_eq!(CompareConfig::default().effective_batch_size(), 1);
        let parallel = CompareConfig {
            jobs: 4,
            ..Default::default()
        };
        assert_eq!(parallel.effective_batch_size(), 256);
    }

    #[test]
    fn test_rejects_bad_models() {
        let single = CompareConfig {
            models: vec![MemoryModel::Sc],
            ..Default::default()
        };
        assert!(matches!(single.validate(), Err(CompareError::InvalidConfig(_))));

        let dup = CompareConfig {
            models: vec![MemoryModel::Sc, MemoryModel::Sc],
            ..Default::default()
        };
        assert!(dup.validate().unwrap_err().is_usage());
    }

    #[test]
    fn test_rejects_bad_generator() {
        let mut config = CompareConfig::default();
        config.generator.threads_count = 0;
        assert!(matches!(config.validate(), Err(CompareError::Generator(_))));
    }
}
