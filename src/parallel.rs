//! Rayon thread pool configuration
//!
//! The per-pixel kernels (resampling, proximity, temporal sums) run on Rayon's global
//! pool; this module sizes it once at startup.

use crate::errors::{PipelineError, Result};
use rayon::ThreadPoolBuilder;

/// Configuration for parallel processing
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Set up the global Rayon thread pool; `None` keeps Rayon's default sizing
    pub fn setup_global_pool(&self) -> Result<()> {
        match self.num_threads {
            Some(0) => Err(PipelineError::ThreadPoolError(
                "thread count must be at least 1".to_string(),
            )),
            Some(num_threads) => {
                ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build_global()
                    .map_err(|e| {
                        PipelineError::ThreadPoolError(format!(
                            "Failed to initialize thread pool with {} threads: {}",
                            num_threads, e
                        ))
                    })?;
                log::info!("✅ Configured parallel processing with {} threads", num_threads);
                Ok(())
            }
            None => {
                log::debug!("Using default thread pool configuration");
                Ok(())
            }
        }
    }
}

/// Information about the parallel processing environment
#[derive(Debug, Clone)]
pub struct ParallelInfo {
    pub current_threads: usize,
    pub available_cores: usize,
}

pub fn parallel_info() -> ParallelInfo {
    ParallelInfo {
        current_threads: rayon::current_num_threads(),
        available_cores: num_cpus::get(),
    }
}

impl ParallelInfo {
    pub fn log(&self) {
        log::debug!(
            "Rayon threads: {}, CPU cores: {}",
            self.current_threads,
            self.available_cores
        );
    }
}
