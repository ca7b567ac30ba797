// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Health probe with a fixed behavior.

use std::time::Duration;

use async_trait::async_trait;
use memebot_core::{HealthProbe, HealthStatus, MemebotError};

#[derive(Debug, Clone)]
pub enum ProbeBehavior {
    Report(HealthStatus),
    Fail(String),
    Panic,
    /// Never answers within any reasonable timeout.
    Hang,
}

pub struct StaticProbe {
    component: String,
    behavior: ProbeBehavior,
}

impl StaticProbe {
    pub fn new(component: &str, behavior: ProbeBehavior) -> Self {
        Self {
            component: component.to_string(),
            behavior,
        }
    }

    pub fn healthy(component: &str) -> Self {
        Self::new(component, ProbeBehavior::Report(HealthStatus::Healthy))
    }
}

#[async_trait]
impl HealthProbe for StaticProbe {
    fn component(&self) -> &str {
        &self.component
    }

    async fn probe(&self) -> Result<HealthStatus, MemebotError> {
        match &self.behavior {
            ProbeBehavior::Report(status) => Ok(status.clone()),
            ProbeBehavior::Fail(message) => Err(MemebotError::Internal(message.clone())),
            ProbeBehavior::Panic => panic!("probe {} panicked", self.component),
            ProbeBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(HealthStatus::Healthy)
            }
        }
    }
}
