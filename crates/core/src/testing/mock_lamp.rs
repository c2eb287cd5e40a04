//! Mock lamp for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::hardware::{HardwareError, Lamp};

/// Lamp recording every switch.
#[derive(Debug, Clone, Default)]
pub struct MockLamp {
    history: Arc<RwLock<Vec<bool>>>,
}

impl MockLamp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every value passed to `set`, in order.
    pub async fn history(&self) -> Vec<bool> {
        self.history.read().await.clone()
    }

    pub async fn is_on(&self) -> bool {
        self.history.read().await.last().copied().unwrap_or(false)
    }
}

#[async_trait]
impl Lamp for MockLamp {
    async fn set(&self, on: bool) -> Result<(), HardwareError> {
        self.history.write().await.push(on);
        Ok(())
    }
}
