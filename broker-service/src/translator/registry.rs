use super::{AirbnbTranslator, PayloadTranslator, YanoljaTranslator, YeogieottaeTranslator};
use shared::Platform;
use std::collections::HashMap;
use std::sync::Arc;

/// Platform to translator table, built once at startup.
#[derive(Clone)]
pub struct TranslatorRegistry {
    translators: HashMap<Platform, Arc<dyn PayloadTranslator>>,
}

impl TranslatorRegistry {
    /// One translator per supported platform.
    pub fn standard() -> Self {
        Self::from_translators([
            Arc::new(YanoljaTranslator) as Arc<dyn PayloadTranslator>,
            Arc::new(AirbnbTranslator),
            Arc::new(YeogieottaeTranslator),
        ])
    }

    /// Later entries for the same platform replace earlier ones.
    pub fn from_translators(translators: impl IntoIterator<Item = Arc<dyn PayloadTranslator>>) -> Self {
        let translators = translators
            .into_iter()
            .map(|t| (t.platform(), t))
            .collect();
        Self { translators }
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PayloadTranslator>> {
        self.translators.get(&platform).cloned()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| self.translators.contains_key(p))
            .collect()
    }
}

impl std::fmt::Debug for TranslatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatorRegistry")
            .field("platforms", &self.platforms())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_covers_every_platform() {
        let registry = TranslatorRegistry::standard();
        for platform in Platform::ALL {
            assert_eq!(registry.get(platform).map(|t| t.platform()), Some(platform));
        }
    }

    #[test]
    fn missing_platform_has_no_translator() {
        let registry = TranslatorRegistry::from_translators([Arc::new(AirbnbTranslator) as Arc<dyn PayloadTranslator>]);
        assert!(registry.get(Platform::Yanolja).is_none());
        assert_eq!(registry.platforms(), vec![Platform::Airbnb]);
    }
}
