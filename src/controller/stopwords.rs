use crate::{
    controller::SubStateHandle,
    event::EventChannel,
    model::{Configuration, Language, StopwordSet},
};

/// Edits the stopword set of the selected configuration
#[derive(Debug)]
pub struct StopwordController {
    stopwords: SubStateHandle<StopwordSet>,
    changed: EventChannel<StopwordSet>,
}

impl StopwordController {
    pub fn new(config: &Configuration) -> Self {
        Self {
            stopwords: SubStateHandle::new(config.stopwords.clone()),
            changed: EventChannel::new(),
        }
    }

    pub fn changed(&self) -> &EventChannel<StopwordSet> {
        &self.changed
    }

    pub fn bind(&self, config: &Configuration) {
        self.stopwords.rebind(config.stopwords.clone());
        self.notify();
    }

    pub fn is_bound_to(&self, config: &Configuration) -> bool {
        self.stopwords.is_bound_to(&config.stopwords)
    }

    pub fn stopwords(&self) -> StopwordSet {
        self.stopwords.snapshot()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.stopwords.read(|s| s.contains(word))
    }

    pub fn add_extra(&self, word: &str) -> bool {
        let added = self.stopwords.update(|s| s.add_extra(word));
        if added {
            self.notify();
        }
        added
    }

    pub fn remove_extra(&self, word: &str) -> bool {
        let removed = self.stopwords.update(|s| s.remove_extra(word));
        if removed {
            self.notify();
        }
        removed
    }

    pub fn replace_base<I, S>(&self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stopwords.update(|s| s.replace_base(words));
        self.notify();
    }

    /// Reset the base list to the defaults of `language`, keeping extras
    pub fn use_language_defaults(&self, language: Language) {
        self.replace_base(language.default_stopwords().iter().copied());
    }

    fn notify(&self) {
        self.changed.publish(&self.stopwords.snapshot());
    }
}
