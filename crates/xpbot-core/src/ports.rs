use async_trait::async_trait;

use crate::{registry::RegistryData, rewards::XpResult, Result};

/// Hexagonal port for the rewards API.
///
/// Implementations never fail outright: transport and payload problems are
/// folded into `XpResult::QueryError` so a handler can always answer.
#[async_trait]
pub trait RewardsPort: Send + Sync {
    async fn get_xp(&self, address: &str) -> XpResult;
}

/// Hexagonal port for registry persistence (whole-map load/save).
pub trait RegistryStore: Send + Sync {
    fn load(&self) -> Result<RegistryData>;
    fn save(&self, data: &RegistryData) -> Result<()>;
}
