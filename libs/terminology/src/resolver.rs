//! Dual-key terminology resolver
//!
//! `resolve` is total: it never fails and never returns an empty display.
//! A wrong or swallowed clinical code is a patient-safety defect, so every
//! path out of here produces either catalogue text or a fallback string
//! that carries the original code verbatim.

use crate::cache::{CacheKey, CacheStats, TermCache};
use crate::config::EngineConfig;
use crate::registry::{self, normalize_system_id, CodeSystem};
use crate::sanitize::clean_display;
use crate::store::{ConceptRecord, ConceptStatus, ConceptStore};
use crate::term::{Provenance, ResolvedTerm};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Resolves `(code, code-system)` pairs to localized display text.
///
/// Stateless apart from the shared cache; safe to call concurrently from
/// many extraction tasks without external locking.
pub struct TerminologyResolver {
    store: Arc<dyn ConceptStore>,
    cache: TermCache,
    config: EngineConfig,
}

impl TerminologyResolver {
    pub fn new(store: Arc<dyn ConceptStore>, config: EngineConfig) -> Self {
        let cache = TermCache::new(config.cache_capacity);
        Self {
            store,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop all cached terms. Intended for test isolation and for picking up
    /// catalogue updates immediately.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Resolve a code against the catalogue.
    ///
    /// The system identifier may be a CDA OID (bare or `urn:oid:`-prefixed)
    /// or a FHIR canonical URI; both normalize onto the same cache key.
    ///
    /// Callers holding a non-blank source display must use it verbatim and
    /// skip this call entirely (see [`ResolvedTerm`] provenance rules); the
    /// resolver only serves lookups where the source document carried no
    /// usable text.
    pub async fn resolve(&self, code: &str, code_system_id: &str) -> ResolvedTerm {
        let code = code.trim();
        let system_oid = normalize_system_id(code_system_id);

        let key = CacheKey {
            code_system_oid: system_oid.clone(),
            code: code.to_string(),
            language: self.config.target_language.clone(),
            country: self.config.target_country.clone(),
        };

        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let term = self.resolve_uncached(code, &system_oid).await;

        let ttl = if term.is_resolved() {
            self.config.cache_ttl_positive
        } else {
            self.config.cache_ttl_negative
        };
        self.cache.insert(key, term.clone(), ttl);

        term
    }

    async fn resolve_uncached(&self, code: &str, system_oid: &str) -> ResolvedTerm {
        let is_value_set = registry::is_value_set_oid(system_oid);

        // Unregistered system: no catalogue query can succeed, go straight
        // to the fallback string.
        if CodeSystem::identify(system_oid).is_none() && !is_value_set {
            return fallback_term(code, system_oid);
        }

        let concept = if is_value_set {
            // The entry was stamped with the value set's defining OID
            // instead of the concept's governing system.
            self.find_by_value_set_bounded(system_oid, code).await
        } else {
            match self.find_concept_bounded(code, system_oid).await {
                Some(concept) => Some(concept),
                // Cross-reference: some catalogues index the concept under
                // its value set rather than the governing system.
                None => self.find_by_value_set_bounded(system_oid, code).await,
            }
        };

        match concept {
            Some(concept) => self.display_for(&concept, code, system_oid).await,
            None => fallback_term(code, system_oid),
        }
    }

    async fn display_for(
        &self,
        concept: &ConceptRecord,
        code: &str,
        system_oid: &str,
    ) -> ResolvedTerm {
        let language = self.config.target_language.as_str();
        let country = self.config.target_country.as_deref();

        let translated = match self
            .bounded(self.store.find_translation(concept, language, country))
            .await
        {
            Some(Ok(row)) => row,
            Some(Err(error)) => {
                tracing::warn!(%code, system = %system_oid, %error, "translation lookup failed");
                None
            }
            None => {
                tracing::warn!(%code, system = %system_oid, "translation lookup timed out");
                None
            }
        };

        if let Some(display) = translated.as_deref().and_then(clean_display) {
            return ResolvedTerm {
                code: code.to_string(),
                code_system_oid: system_oid.to_string(),
                display,
                provenance: Provenance::Translation,
            };
        }

        match clean_display(&concept.default_display) {
            Some(display) => ResolvedTerm {
                code: code.to_string(),
                code_system_oid: system_oid.to_string(),
                display,
                provenance: Provenance::DefaultDisplay,
            },
            // Catalogue row with no usable text; the totality guarantee
            // still holds.
            None => fallback_term(code, system_oid),
        }
    }

    async fn find_concept_bounded(&self, code: &str, system_oid: &str) -> Option<ConceptRecord> {
        match self.bounded(self.store.find_concept(code, system_oid)).await {
            Some(Ok(Some(concept))) if concept.status == ConceptStatus::Active => Some(concept),
            Some(Ok(_)) => None,
            Some(Err(error)) => {
                tracing::warn!(%code, system = %system_oid, %error, "concept lookup failed");
                None
            }
            None => {
                tracing::warn!(%code, system = %system_oid, "concept lookup timed out");
                None
            }
        }
    }

    async fn find_by_value_set_bounded(
        &self,
        value_set_oid: &str,
        code: &str,
    ) -> Option<ConceptRecord> {
        match self
            .bounded(self.store.find_concept_by_value_set(value_set_oid, code))
            .await
        {
            Some(Ok(Some(concept))) if concept.status == ConceptStatus::Active => Some(concept),
            Some(Ok(_)) => None,
            Some(Err(error)) => {
                tracing::warn!(%code, value_set = %value_set_oid, %error, "value-set lookup failed");
                None
            }
            None => {
                tracing::warn!(%code, value_set = %value_set_oid, "value-set lookup timed out");
                None
            }
        }
    }

    /// Bound a store future by the configured timeout; `None` means expiry.
    async fn bounded<T>(&self, fut: impl std::future::Future<Output = T>) -> Option<T> {
        let limit = if self.config.store_timeout.is_zero() {
            // A zero timeout would starve even an in-memory store.
            Duration::from_millis(1)
        } else {
            self.config.store_timeout
        };
        timeout(limit, fut).await.ok()
    }
}

/// The audit-friendly string every unresolvable code degrades to. Contains
/// the original code verbatim so nothing is silently swallowed.
fn fallback_term(code: &str, system_oid: &str) -> ResolvedTerm {
    ResolvedTerm {
        code: code.to_string(),
        code_system_oid: system_oid.to_string(),
        display: format!("Code: {} (System: {})", code, system_oid),
        provenance: Provenance::Fallback,
    }
}
