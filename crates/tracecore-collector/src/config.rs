//! `TraceConfig`: every enumerated configuration option a session needs,
//! from the selective-persistence knobs down to the ambient scheduler and
//! session tuning a real deployment has to set to run at all.

use crate::error::SessionError;
use crate::policy::TriggerSpec;
use std::path::PathBuf;
use std::time::Duration;
use tracecore_drain::DrainConfig;
use tracecore_registry::RegistryConfig;
use tracecore_ring::RingConfig;

#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// Shallow stack snapshot size carried by detail records; `0` disables
    /// stack capture entirely.
    pub stack_bytes: u16,
    pub pre_roll_ns: u64,
    pub post_roll_ns: u64,
    pub trigger_kinds: Vec<TriggerSpec>,
    pub excludes: Vec<String>,

    pub max_threads: u32,
    pub ring_capacity_records: u32,
    pub ring_pool_size_per_lane: u32,

    pub iteration_interval: Duration,
    pub max_rings_per_service: usize,
    pub credit_increment: u32,
    pub heartbeat_stall_threshold: Duration,
    pub startup_timeout: Duration,
    pub shutdown_deadline: Duration,
    pub session_root: PathBuf,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            stack_bytes: 0,
            pre_roll_ns: 0,
            post_roll_ns: 0,
            trigger_kinds: Vec::new(),
            excludes: Vec::new(),
            max_threads: tracecore_registry::MAX_THREADS as u32,
            ring_capacity_records: 1 << 10,
            ring_pool_size_per_lane: 3,
            iteration_interval: Duration::from_millis(5),
            max_rings_per_service: 1,
            credit_increment: 1,
            heartbeat_stall_threshold: Duration::from_millis(200),
            startup_timeout: Duration::from_secs(5),
            shutdown_deadline: Duration::from_secs(5),
            session_root: PathBuf::from("./trace-session"),
        }
    }
}

impl TraceConfig {
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.stack_bytes as usize > tracecore_ring::MAX_STACK_BYTES {
            return Err(SessionError::InvalidConfig(format!(
                "stack_bytes {} exceeds the {}-byte ceiling",
                self.stack_bytes,
                tracecore_ring::MAX_STACK_BYTES
            )));
        }
        if self.max_threads as usize > tracecore_registry::MAX_THREADS {
            return Err(SessionError::InvalidConfig(format!(
                "max_threads {} exceeds the registry's {}-slot ceiling",
                self.max_threads,
                tracecore_registry::MAX_THREADS
            )));
        }
        if self.ring_pool_size_per_lane < 2 {
            return Err(SessionError::InvalidConfig(
                "ring_pool_size_per_lane must be at least 2 (one active, one spare)".into(),
            ));
        }
        if !self.ring_capacity_records.is_power_of_two() {
            return Err(SessionError::InvalidConfig(
                "ring_capacity_records must be a power of two".into(),
            ));
        }
        Ok(())
    }

    fn ring_bits(&self) -> u8 {
        self.ring_capacity_records.trailing_zeros() as u8
    }

    pub fn registry_config(&self) -> RegistryConfig {
        let ring = RingConfig::new(self.ring_bits(), true);
        RegistryConfig {
            index_ring: ring,
            index_pool_size: self.ring_pool_size_per_lane as usize,
            detail_ring: ring,
            detail_pool_size: self.ring_pool_size_per_lane as usize,
        }
    }

    pub fn drain_config(&self) -> DrainConfig {
        DrainConfig {
            iteration_interval: self.iteration_interval,
            max_rings_per_service: self.max_rings_per_service,
            credit_increment: self.credit_increment,
            heartbeat_stall_threshold: self.heartbeat_stall_threshold,
        }
    }
}
