//! Provider backend selection.

use super::{MemoryProvider, ProviderQuery, StackService};
use crate::error::{CirrusError, Result};
use std::sync::Arc;
use tracing::info;

/// The pair of capability handles the engine runs against.
#[derive(Clone)]
pub struct ProviderSet {
    pub query: Arc<dyn ProviderQuery>,
    pub stacks: Arc<dyn StackService>,
}

impl ProviderSet {
    /// Build a set from a single object implementing both capabilities.
    pub fn from_single<P>(provider: Arc<P>) -> Self
    where
        P: ProviderQuery + StackService + 'static,
    {
        Self { query: provider.clone(), stacks: provider }
    }
}

/// Resolve a provider backend by name.
///
/// Only the in-process `memory` backend is compiled in; cloud SDK transports
/// live outside this engine and plug in through [`ProviderSet`] directly.
pub fn for_name(name: &str) -> Result<ProviderSet> {
    match name {
        "memory" => {
            info!("Using in-memory provider backend");
            Ok(ProviderSet::from_single(Arc::new(MemoryProvider::new())))
        }
        other => Err(CirrusError::NotImplemented {
            feature: format!("provider backend '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_resolves() {
        assert!(for_name("memory").is_ok());
    }

    #[test]
    fn test_unknown_backend() {
        assert!(matches!(for_name("aws"), Err(CirrusError::NotImplemented { .. })));
    }
}
