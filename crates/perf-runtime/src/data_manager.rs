//! Load-once table cache owned by the application context.
//!
//! Each table is loaded on first access through [`LoadCache::get_or_load`]
//! and shared as an [`Arc`] for the lifetime of the [`DataContext`]. There is
//! no TTL and no invalidation: inputs are static for a session.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use perf_core::error::{PerfError, Result};
use perf_core::models::{GpsSessionRecord, PhysicalCapabilityRecord, RecoveryRecord};
use perf_core::settings::Settings;
use perf_data::reader::{load_embedded_physical, load_gps, load_physical, load_recovery, open_source};
use perf_data::simulate::{simulate_gps, simulate_recovery, SimulationConfig};

// ── LoadCache ─────────────────────────────────────────────────────────────────

/// Single-slot memo. The first successful load wins; later calls reuse it.
pub struct LoadCache<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> LoadCache<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// A cache that is already populated with `value`.
    pub fn with_value(value: T) -> Self {
        Self {
            slot: RwLock::new(Some(Arc::new(value))),
        }
    }

    /// Return the cached value, running `load` only if the slot is empty.
    ///
    /// Concurrent first callers serialise on the write lock and re-check the
    /// slot, so `load` runs at most once per successful population. A failed
    /// load leaves the slot empty and returns the error.
    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(value) = self.peek() {
            return Ok(value);
        }

        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(load()?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }

    /// The cached value, if any, without loading.
    pub fn peek(&self) -> Option<Arc<T>> {
        self.slot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(Arc::clone)
    }

    pub fn is_loaded(&self) -> bool {
        self.peek().is_some()
    }
}

impl<T> Default for LoadCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ── DataSource ────────────────────────────────────────────────────────────────

/// Where a table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// CSV file on disk.
    File(PathBuf),
    /// The physical-capability sample shipped with the binary.
    Embedded,
    /// Deterministic generator with the given seed.
    Simulated { seed: u64 },
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Embedded => f.write_str("embedded sample"),
            DataSource::Simulated { seed } => write!(f, "simulated (seed {})", seed),
        }
    }
}

fn unsupported(table: &str, source: &DataSource) -> PerfError {
    PerfError::Config(format!("{} data cannot be read from {}", table, source))
}

// ── DataContext ───────────────────────────────────────────────────────────────

/// Configured sources plus one cache per table.
pub struct DataContext {
    physical_source: DataSource,
    gps_source: DataSource,
    recovery_source: DataSource,
    physical: LoadCache<Vec<PhysicalCapabilityRecord>>,
    gps: LoadCache<Vec<GpsSessionRecord>>,
    recovery: LoadCache<Vec<RecoveryRecord>>,
}

impl DataContext {
    pub fn new(physical: DataSource, gps: DataSource, recovery: DataSource) -> Self {
        Self {
            physical_source: physical,
            gps_source: gps,
            recovery_source: recovery,
            physical: LoadCache::new(),
            gps: LoadCache::new(),
            recovery: LoadCache::new(),
        }
    }

    /// Sources chosen from the command line: files when given, otherwise the
    /// embedded sample and simulated tables.
    pub fn from_settings(settings: &Settings) -> Self {
        let simulated = DataSource::Simulated {
            seed: settings.seed,
        };
        let pick = |path: &Option<PathBuf>, fallback: DataSource| {
            path.clone().map(DataSource::File).unwrap_or(fallback)
        };
        Self::new(
            pick(&settings.physical_csv, DataSource::Embedded),
            pick(&settings.gps_csv, simulated.clone()),
            pick(&settings.recovery_csv, simulated),
        )
    }

    /// A context whose tables are already loaded, bypassing every source.
    pub fn with_tables(
        physical: Vec<PhysicalCapabilityRecord>,
        gps: Vec<GpsSessionRecord>,
        recovery: Vec<RecoveryRecord>,
    ) -> Self {
        Self {
            physical: LoadCache::with_value(physical),
            gps: LoadCache::with_value(gps),
            recovery: LoadCache::with_value(recovery),
            ..Self::new(DataSource::Embedded, DataSource::Embedded, DataSource::Embedded)
        }
    }

    pub fn physical(&self) -> Result<Arc<Vec<PhysicalCapabilityRecord>>> {
        self.physical.get_or_load(|| {
            tracing::debug!(source = %self.physical_source, "loading physical capability data");
            match &self.physical_source {
                DataSource::File(path) => load_physical(open_source(path)?),
                DataSource::Embedded => load_embedded_physical(),
                other => Err(unsupported("physical capability", other)),
            }
        })
    }

    pub fn gps(&self) -> Result<Arc<Vec<GpsSessionRecord>>> {
        self.gps.get_or_load(|| {
            tracing::debug!(source = %self.gps_source, "loading GPS data");
            match &self.gps_source {
                DataSource::File(path) => load_gps(open_source(path)?),
                DataSource::Simulated { seed } => {
                    Ok(simulate_gps(&SimulationConfig::with_seed(*seed)))
                }
                other => Err(unsupported("GPS", other)),
            }
        })
    }

    pub fn recovery(&self) -> Result<Arc<Vec<RecoveryRecord>>> {
        self.recovery.get_or_load(|| {
            tracing::debug!(source = %self.recovery_source, "loading recovery data");
            match &self.recovery_source {
                DataSource::File(path) => load_recovery(open_source(path)?),
                DataSource::Simulated { seed } => {
                    Ok(simulate_recovery(&SimulationConfig::with_seed(*seed)))
                }
                other => Err(unsupported("recovery", other)),
            }
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
