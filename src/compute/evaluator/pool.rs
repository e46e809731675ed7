//! One or more evaluators, each behind its own lock.

use std::sync::Mutex;

use rayon::prelude::*;

use crate::schema::DeviceConfig;

use super::{Evaluator, EvaluatorError, SimulatedArray};

/// Devices that jobs are dispatched over.
///
/// With a single device every job runs in order on the calling thread. With
/// several, job `k` goes to device `k % len` and devices work in parallel.
pub struct EvaluatorPool {
    devices: Vec<Mutex<Box<dyn Evaluator>>>,
}

impl EvaluatorPool {
    pub fn new(devices: Vec<Box<dyn Evaluator>>) -> Result<Self, EvaluatorError> {
        if devices.is_empty() {
            return Err(EvaluatorError::EmptyPool);
        }
        Ok(Self {
            devices: devices.into_iter().map(Mutex::new).collect(),
        })
    }

    pub fn single(device: impl Evaluator + 'static) -> Self {
        Self {
            devices: vec![Mutex::new(Box::new(device) as Box<dyn Evaluator>)],
        }
    }

    /// Software arrays as described by `config`.
    pub fn simulated(config: &DeviceConfig) -> Result<Self, EvaluatorError> {
        if !config.enabled {
            return Err(EvaluatorError::Unavailable("device disabled in config".into()));
        }
        let devices = (0..config.count)
            .map(|_| Box::new(SimulatedArray::from_config(config)) as Box<dyn Evaluator>)
            .collect();
        Self::new(devices)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Run `f` with exclusive access to device `index`.
    pub fn with_device<T, E>(
        &self,
        index: usize,
        f: impl FnOnce(&mut dyn Evaluator) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<EvaluatorError>,
    {
        let slot = self
            .devices
            .get(index)
            .ok_or(EvaluatorError::EmptyPool)?;
        let mut device = slot.lock().map_err(|_| EvaluatorError::Poisoned(index))?;
        f(&mut **device)
    }

    /// Run every job, returning results in job order.
    pub fn dispatch<J, T, E, F>(&self, jobs: &[J], f: F) -> Result<Vec<T>, E>
    where
        J: Sync,
        T: Send,
        E: Send + From<EvaluatorError>,
        F: Fn(&mut dyn Evaluator, &J) -> Result<T, E> + Sync,
    {
        let count = self.devices.len();
        if count == 1 {
            return jobs
                .iter()
                .map(|job| self.with_device(0, |device| f(device, job)))
                .collect();
        }
        jobs.par_iter()
            .enumerate()
            .map(|(k, job)| self.with_device(k % count, |device| f(device, job)))
            .collect()
    }
}

impl std::fmt::Debug for EvaluatorPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorPool")
            .field("devices", &self.devices.len())
            .finish()
    }
}
