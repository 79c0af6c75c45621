use std::{path::Path, sync::Arc};

use tracing::{debug, info};

use crate::{
    controller::{
        ParameterController, RunnerChanged, StopwordController, SynonymController,
        TopicRunnerController, TrainingOutcome,
    },
    corpus::{
        preprocess::{Preprocessor, SimplePreprocessor},
        Corpus, CorpusProvider,
    },
    error::{SettingsError, TrainError, ViewError},
    event::Subscriber,
    model::{Configuration, Language, Registry},
    runner::training::TrainingInput,
    settings::{Settings, SettingsFormat},
    visualization::{attach, CacheKey, CachedVisualization, View, ViewCatalog},
};

/// Context object tying the corpus, the configuration registry, the domain
/// controllers and the visualization caches together
///
/// Construct one per process (or per test) and pass it by reference.
/// Selecting a configuration re-points every controller before any
/// subscriber hears about it; a runner change clears every visualization
/// cache before the next view is served.
pub struct Workspace {
    corpus: Corpus,
    preprocessor: Box<dyn Preprocessor>,
    registry: Registry,
    parameters: Arc<ParameterController>,
    stopwords: Arc<StopwordController>,
    synonyms: Arc<SynonymController>,
    topic_runner: Arc<TopicRunnerController>,
    views: ViewCatalog,
    visualizations: Vec<(Arc<dyn CachedVisualization>, Subscriber<RunnerChanged>)>,
}

impl Workspace {
    pub fn new(language: Language) -> Self {
        Self::with_preprocessor(language, Box::new(SimplePreprocessor::default()))
    }

    pub fn with_preprocessor(language: Language, preprocessor: Box<dyn Preprocessor>) -> Self {
        let corpus = Corpus::new();
        let registry = Registry::new(corpus.tracker(), language);
        let selected = registry.selected();
        let parameters = Arc::new(ParameterController::new(selected));
        let stopwords = Arc::new(StopwordController::new(selected));
        let synonyms = Arc::new(SynonymController::new(selected));
        let topic_runner = Arc::new(TopicRunnerController::new(selected, corpus.tracker()));

        {
            let parameters = Arc::clone(&parameters);
            let stopwords = Arc::clone(&stopwords);
            let synonyms = Arc::clone(&synonyms);
            let topic_runner = Arc::clone(&topic_runner);
            // the runner goes last so its event sees the other controllers re-pointed
            registry.config_switched().subscribe_fn(move |config: &Configuration| {
                parameters.bind(config);
                stopwords.bind(config);
                synonyms.bind(config);
                topic_runner.bind(config);
            });
        }

        let views = ViewCatalog::standard();
        views.attach_all(topic_runner.runner_changed());

        Self {
            corpus,
            preprocessor,
            registry,
            parameters,
            stopwords,
            synonyms,
            topic_runner,
            views,
            visualizations: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn parameters(&self) -> &ParameterController {
        &self.parameters
    }

    pub fn stopwords(&self) -> &StopwordController {
        &self.stopwords
    }

    pub fn synonyms(&self) -> &SynonymController {
        &self.synonyms
    }

    pub fn topic_runner(&self) -> &TopicRunnerController {
        &self.topic_runner
    }

    pub fn views(&self) -> &ViewCatalog {
        &self.views
    }

    /// Rendering knobs of the standard views; their setters clear the caches
    pub fn views_mut(&mut self) -> &mut ViewCatalog {
        &mut self.views
    }

    pub fn language(&self) -> Language {
        self.registry.language()
    }

    /// Language for the stopwords of configurations created from now on
    pub fn set_language(&mut self, language: Language) {
        self.registry.set_language(language);
    }

    pub fn selected_name(&self) -> &str {
        self.registry.selected_name()
    }

    pub fn configuration_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn add_configuration(&mut self, name: &str) -> bool {
        self.registry.add(name)
    }

    pub fn duplicate_configuration(&mut self, source: &str, name: &str) -> bool {
        self.registry.duplicate(source, name)
    }

    pub fn switch_configuration(&mut self, name: &str) -> bool {
        self.registry.switch(name)
    }

    pub fn delete_configuration(&mut self, name: &str) -> bool {
        self.registry.delete(name)
    }

    /// Replace the corpus with `(title, text)` documents
    /// The active model is discarded right away when it was trained on the
    /// previous import. Returns the new corpus version.
    pub fn import_documents<I, S, T>(&mut self, documents: I) -> u64
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: AsRef<str>,
    {
        let version = self.corpus.import(documents, self.preprocessor.as_ref());
        self.topic_runner.discard_if_stale();
        version
    }

    /// Train the selected configuration in the background
    pub fn train(&self) -> Result<(), TrainError> {
        self.train_configuration(self.registry.selected_name())
    }

    /// Train any registered configuration in the background
    ///
    /// The input is assembled now, from the configuration's current
    /// parameters, stopwords and synonyms. The result is committed by
    /// [`Workspace::poll_training`] or [`Workspace::wait_training`].
    pub fn train_configuration(&self, name: &str) -> Result<(), TrainError> {
        let Some(config) = self.registry.get(name) else {
            debug!(name, "training request for unknown configuration");
            return Err(TrainError::UnknownConfiguration {
                config: name.to_string(),
            });
        };
        if self.corpus.is_empty() {
            return Err(TrainError::EmptyCorpus);
        }
        let parameters = config.parameters.read().clone();
        let problems = parameters.validate();
        if !problems.is_empty() {
            return Err(TrainError::InvalidParameters(problems));
        }
        let input = TrainingInput::assemble(
            self.corpus.documents(),
            &config.stopwords.read(),
            &config.synonyms.read(),
            parameters,
            self.corpus.current_version_id(),
        );
        self.topic_runner.start(config, input)
    }

    /// Commit finished training runs without blocking
    pub fn poll_training(&self) -> Vec<TrainingOutcome> {
        self.topic_runner.poll(&self.registry)
    }

    /// Block until every pending training run is committed
    pub fn wait_training(&self) -> Vec<TrainingOutcome> {
        self.topic_runner.wait(&self.registry)
    }

    /// Add a custom visualization; its cache is cleared on every runner change
    pub fn register_visualization(&mut self, visualization: Arc<dyn CachedVisualization>) {
        let subscription = attach(self.topic_runner.runner_changed(), &visualization);
        self.visualizations.push((visualization, subscription));
    }

    /// Remove a custom visualization by name
    pub fn unregister_visualization(&mut self, name: &str) -> bool {
        let Some(index) = self.visualizations.iter().position(|(v, _)| v.name() == name) else {
            return false;
        };
        let (_, subscription) = self.visualizations.remove(index);
        self.topic_runner.runner_changed().unsubscribe(&subscription);
        true
    }

    /// Names of the standard and custom views the active runner can serve
    pub fn offered_visualizations(&self) -> Vec<String> {
        self.topic_runner.with_runner(|runner| {
            let Some(runner) = runner else {
                return Vec::new();
            };
            self.views
                .offered(runner)
                .into_iter()
                .map(str::to_string)
                .chain(
                    self.visualizations
                        .iter()
                        .filter(|(v, _)| v.is_offered(runner))
                        .map(|(v, _)| v.name().to_string()),
                )
                .collect()
        })
    }

    /// Serve a standard view of the active runner
    pub fn render(&self, view: &str, key: CacheKey) -> Result<Arc<View>, ViewError> {
        let slot = self.topic_runner.slot();
        let slot = slot.read();
        let model = slot.model().ok_or(ViewError::NoRunner)?;
        self.views.render(view, model, key)
    }

    pub fn settings(&self) -> Settings {
        Settings::capture(&self.registry)
    }

    pub fn save_settings(&self, format: SettingsFormat) -> Result<Vec<u8>, SettingsError> {
        self.settings().encode(format)
    }

    /// Replace every configuration with the ones in `bytes`
    /// On any problem the workspace is left exactly as it was.
    pub fn load_settings(&mut self, bytes: &[u8], format: SettingsFormat) -> Result<(), SettingsError> {
        let settings = Settings::decode(bytes, format)?;
        self.apply_settings(settings)
    }

    pub fn apply_settings(&mut self, settings: Settings) -> Result<(), SettingsError> {
        let problems = settings.validate();
        if !problems.is_empty() {
            return Err(SettingsError::Rejected { problems });
        }
        if !self
            .registry
            .replace_all(settings.to_configurations(), &settings.selected)
        {
            return Err(SettingsError::Rejected {
                problems: vec!["configurations could not be replaced".to_string()],
            });
        }
        self.registry.set_language(settings.language);
        info!(
            configurations = settings.configurations.len(),
            selected = %settings.selected,
            "settings applied"
        );
        Ok(())
    }

    pub fn save_settings_to(&self, path: &Path) -> Result<(), SettingsError> {
        self.settings().save(path, SettingsFormat::from_path(path))
    }

    pub fn load_settings_from(&mut self, path: &Path) -> Result<(), SettingsError> {
        let settings = Settings::load(path, SettingsFormat::from_path(path))?;
        self.apply_settings(settings)
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("corpus_version", &self.corpus.current_version_id())
            .field("documents", &self.corpus.doc_num())
            .field("registry", &self.registry)
            .field("topic_runner", &self.topic_runner)
            .finish()
    }
}
