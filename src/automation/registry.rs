use super::blume::{Blume, BLUME_CARRIER};
use super::{AutomatorContext, InvoiceAutomator};
use crate::invoices::carrier_key;
use std::collections::BTreeMap;
use std::sync::Arc;

type AutomatorFactory = Box<dyn Fn(&AutomatorContext) -> Arc<dyn InvoiceAutomator> + Send + Sync>;

/// Carrier id → automator constructor.
/// New carriers are added with [`AutomatorRegistry::register`]; dispatch never branches on names.
pub struct AutomatorRegistry {
    factories: BTreeMap<String, AutomatorFactory>,
}

impl AutomatorRegistry {
    /// Registry with no carriers
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with every carrier this build supports
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(BLUME_CARRIER, |ctx| {
            Arc::new(Blume::with_webdriver(ctx)) as Arc<dyn InvoiceAutomator>
        });
        registry
    }

    pub fn register<F>(&mut self, carrier: &str, factory: F)
    where
        F: Fn(&AutomatorContext) -> Arc<dyn InvoiceAutomator> + Send + Sync + 'static,
    {
        let key = carrier_key(carrier);
        if self.factories.insert(key.clone(), Box::new(factory)).is_some() {
            tracing::warn!("Automator for {} was replaced", key);
        }
    }

    pub fn is_registered(&self, carrier: &str) -> bool {
        self.factories.contains_key(&carrier_key(carrier))
    }

    /// Build the automator for `carrier` (case-insensitive), if one is registered
    pub fn build(&self, carrier: &str, ctx: &AutomatorContext) -> Option<Arc<dyn InvoiceAutomator>> {
        self.factories.get(&carrier_key(carrier)).map(|factory| factory(ctx))
    }

    /// Registered carrier ids, sorted
    pub fn carriers(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl Default for AutomatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::{CollectionSummary, LogSink};
    use crate::config::AutomationConfig;
    use crate::invoices::InvoiceRow;
    use anyhow::Result;
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl InvoiceAutomator for Named {
        fn carrier(&self) -> &str {
            self.0
        }

        async fn collect(&self, _rows: &[InvoiceRow], _log: &LogSink) -> Result<CollectionSummary> {
            Ok(CollectionSummary::default())
        }
    }

    fn ctx() -> AutomatorContext {
        AutomatorContext {
            save_directory: std::env::temp_dir(),
            config: AutomationConfig::default(),
        }
    }

    #[test]
    fn test_defaults_register_blume_only() {
        let registry = AutomatorRegistry::with_defaults();
        assert_eq!(registry.carriers(), vec!["BLUME"]);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = AutomatorRegistry::with_defaults();
        assert!(registry.is_registered("Blume"));
        assert!(registry.is_registered(" blume "));
        assert!(!registry.is_registered("VIVO"));
    }

    #[test]
    fn test_build_blume() {
        let registry = AutomatorRegistry::with_defaults();
        let automator = registry.build("blume", &ctx()).unwrap();
        assert_eq!(automator.carrier(), "BLUME");
    }

    #[test]
    fn test_build_unknown_is_none() {
        assert!(AutomatorRegistry::with_defaults().build("CLARO", &ctx()).is_none());
    }

    #[test]
    fn test_register_new_carrier() {
        let mut registry = AutomatorRegistry::new();
        assert!(registry.carriers().is_empty());

        registry.register("Vivo", |_| Arc::new(Named("VIVO")) as Arc<dyn InvoiceAutomator>);

        assert!(registry.is_registered("VIVO"));
        assert_eq!(registry.build("vivo", &ctx()).unwrap().carrier(), "VIVO");
    }
}
