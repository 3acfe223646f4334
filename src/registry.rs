//! Adapter selection.
//!
//! The registry is built once per analyzer from its config and shared by
//! handle; nothing here is process-global.

use crate::config::AnalyzerConfig;
use crate::parsing::python::PythonAdapter;
use crate::parsing::query::QueryAdapter;
use crate::parsing::{AdapterKind, LanguageAdapter};
use crate::types::Language;
use std::sync::Arc;

pub struct AdapterRegistry {
    query: Arc<dyn LanguageAdapter>,
    direct: Arc<dyn LanguageAdapter>,
    prefer_query: bool,
}

impl AdapterRegistry {
    pub fn new(config: &AnalyzerConfig) -> Self {
        let query: Arc<dyn LanguageAdapter> = if config.use_queries {
            Arc::new(QueryAdapter::new())
        } else {
            Arc::new(QueryAdapter::structural_only())
        };
        Self {
            query,
            direct: Arc::new(PythonAdapter::new()),
            prefer_query: config.prefer_query_adapter,
        }
    }

    /// Best adapter for `language`: the query adapter when it has a profile
    /// (unless the direct adapter is preferred and can take it), then the
    /// direct adapter, else none.
    pub fn adapter_for(&self, language: Language) -> Option<Arc<dyn LanguageAdapter>> {
        let query_ok = self.query.supports(language);
        let direct_ok = self.direct.supports(language);
        let chosen = match (query_ok, direct_ok) {
            (true, true) if !self.prefer_query => &self.direct,
            (true, _) => &self.query,
            (false, true) => &self.direct,
            (false, false) => return None,
        };
        tracing::debug!("Selected {} adapter for {}", chosen.kind().as_str(), language);
        Some(Arc::clone(chosen))
    }

    pub fn supports(&self, language: Language) -> bool {
        self.query.supports(language) || self.direct.supports(language)
    }

    /// Languages that can actually be analyzed.
    pub fn supported_languages(&self) -> Vec<Language> {
        Language::ALL
            .iter()
            .copied()
            .filter(|l| self.supports(*l))
            .collect()
    }

    pub fn kind_for(&self, language: Language) -> Option<AdapterKind> {
        self.adapter_for(language).map(|a| a.kind())
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new(&AnalyzerConfig::default())
    }
}
