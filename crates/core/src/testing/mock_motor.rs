//! Mock motor for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::hardware::{HardwareError, MotorDriver};

/// Mock implementation of the MotorDriver trait.
///
/// Records every rotation so tests can check direction and stride.
#[derive(Debug, Clone)]
pub struct MockMotor {
    /// Recorded rotations as (step delay, signed steps).
    rotations: Arc<RwLock<Vec<(Duration, i32)>>>,
    stops: Arc<RwLock<usize>>,
    /// If set, the next rotation fails with this error.
    next_error: Arc<RwLock<Option<HardwareError>>>,
}

impl Default for MockMotor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMotor {
    pub fn new() -> Self {
        Self {
            rotations: Arc::new(RwLock::new(Vec::new())),
            stops: Arc::new(RwLock::new(0)),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Get all recorded rotations.
    pub async fn rotations(&self) -> Vec<(Duration, i32)> {
        self.rotations.read().await.clone()
    }

    pub async fn rotation_count(&self) -> usize {
        self.rotations.read().await.len()
    }

    /// Sum of all signed steps.
    pub async fn position(&self) -> i64 {
        self.rotations
            .read()
            .await
            .iter()
            .map(|(_, steps)| i64::from(*steps))
            .sum()
    }

    pub async fn stop_count(&self) -> usize {
        *self.stops.read().await
    }

    /// Configure the next rotation to fail with the given error.
    pub async fn set_next_error(&self, error: HardwareError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl MotorDriver for MockMotor {
    async fn rotate(&self, step_delay: Duration, steps: i32) -> Result<(), HardwareError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        self.rotations.write().await.push((step_delay, steps));
        Ok(())
    }

    async fn stop(&self) -> Result<(), HardwareError> {
        *self.stops.write().await += 1;
        Ok(())
    }
}
