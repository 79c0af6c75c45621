use crate::{
    controller::SubStateHandle,
    event::EventChannel,
    model::{Configuration, SynonymTable},
};

/// Edits the synonym table of the selected configuration
#[derive(Debug)]
pub struct SynonymController {
    synonyms: SubStateHandle<SynonymTable>,
    changed: EventChannel<SynonymTable>,
}

impl SynonymController {
    pub fn new(config: &Configuration) -> Self {
        Self {
            synonyms: SubStateHandle::new(config.synonyms.clone()),
            changed: EventChannel::new(),
        }
    }

    pub fn changed(&self) -> &EventChannel<SynonymTable> {
        &self.changed
    }

    pub fn bind(&self, config: &Configuration) {
        self.synonyms.rebind(config.synonyms.clone());
        self.changed.publish(&self.synonyms.snapshot());
    }

    pub fn is_bound_to(&self, config: &Configuration) -> bool {
        self.synonyms.is_bound_to(&config.synonyms)
    }

    pub fn synonyms(&self) -> SynonymTable {
        self.synonyms.snapshot()
    }

    /// Map `variant` to `canonical`; a term never maps to itself
    pub fn insert(&self, variant: &str, canonical: &str) -> bool {
        if variant == canonical || variant.is_empty() || canonical.is_empty() {
            return false;
        }
        self.synonyms.update(|t| t.insert(variant, canonical));
        self.changed.publish(&self.synonyms.snapshot());
        true
    }

    pub fn remove(&self, variant: &str) -> Option<String> {
        let removed = self.synonyms.update(|t| t.remove(variant));
        if removed.is_some() {
            self.changed.publish(&self.synonyms.snapshot());
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Language;

    #[test]
    fn insert_and_remove() {
        let config = Configuration::new("c", Language::English);
        let controller = SynonymController::new(&config);
        assert!(controller.insert("colour", "color"));
        assert!(!controller.insert("same", "same"));
        assert_eq!(config.synonyms.read().canonical("colour"), "color");
        assert_eq!(controller.remove("colour").as_deref(), Some("color"));
        assert_eq!(controller.remove("colour"), None);
        assert!(controller.synonyms().is_empty());
    }
}
