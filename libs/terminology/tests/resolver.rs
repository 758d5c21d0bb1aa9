use async_trait::async_trait;
use salus_terminology::{
    ConceptRecord, ConceptStatus, ConceptStore, ConceptTranslation, EngineConfig,
    InMemoryConceptStore, Provenance, StoreError, StoreResult, TerminologyResolver,
};
use std::sync::Arc;
use std::time::Duration;

const SNOMED: &str = "2.16.840.1.113883.6.96";

fn snomed_concept(code: &str, display: &str) -> ConceptRecord {
    ConceptRecord {
        code: code.to_string(),
        code_system_oid: SNOMED.to_string(),
        status: ConceptStatus::Active,
        default_display: display.to_string(),
        value_set_oid: None,
    }
}

fn catalogue() -> InMemoryConceptStore {
    let mut store = InMemoryConceptStore::new();
    store.insert_concept(snomed_concept(
        "420134006",
        "Propensity to adverse reactions",
    ));
    store.insert_translation(
        "420134006",
        SNOMED,
        ConceptTranslation {
            language: "en".to_string(),
            country: None,
            display: "Propensity to adverse reactions".to_string(),
        },
    );
    store.insert_translation(
        "420134006",
        SNOMED,
        ConceptTranslation {
            language: "de".to_string(),
            country: None,
            display: "Neigung zu unerwünschten Reaktionen".to_string(),
        },
    );
    store.insert_concept(snomed_concept("260176001", "Kiwi fruit"));
    store
}

fn resolver_for(language: &str) -> TerminologyResolver {
    TerminologyResolver::new(
        Arc::new(catalogue()),
        EngineConfig::for_locale(language, None),
    )
}

#[tokio::test]
async fn translation_row_wins() {
    let resolver = resolver_for("en");
    let term = resolver.resolve("420134006", SNOMED).await;
    assert_eq!(term.display, "Propensity to adverse reactions");
    assert_eq!(term.provenance, Provenance::Translation);
}

#[tokio::test]
async fn missing_translation_falls_back_to_default_display() {
    let resolver = resolver_for("pt");
    let term = resolver.resolve("420134006", SNOMED).await;
    assert_eq!(term.display, "Propensity to adverse reactions");
    assert_eq!(term.provenance, Provenance::DefaultDisplay);
}

#[tokio::test]
async fn unregistered_system_produces_fallback_string() {
    let resolver = resolver_for("en");
    let term = resolver.resolve("999999", "9.9.9.9").await;
    assert_eq!(term.display, "Code: 999999 (System: 9.9.9.9)");
    assert_eq!(term.provenance, Provenance::Fallback);
    assert!(!term.is_resolved());
}

#[tokio::test]
async fn unknown_code_in_known_system_keeps_code_verbatim() {
    let resolver = resolver_for("en");
    let term = resolver.resolve("12345678", SNOMED).await;
    assert_eq!(term.provenance, Provenance::Fallback);
    assert!(term.display.contains("12345678"));
}

#[tokio::test]
async fn resolution_is_idempotent() {
    let resolver = resolver_for("de");
    let first = resolver.resolve("420134006", SNOMED).await;
    let second = resolver.resolve("420134006", SNOMED).await;
    assert_eq!(first.display, second.display);
    assert_eq!(first.provenance, second.provenance);
    // Second call must be served from the cache.
    assert!(resolver.cache_stats().hits >= 1);
}

#[tokio::test]
async fn resolve_is_total_for_garbage_input() {
    let resolver = resolver_for("en");
    for (code, system) in [
        ("", ""),
        ("💊", "not-an-oid"),
        ("<script>", "2.16.840.1.113883.6.96"),
        ("   ", "urn:oid:9.9.9.9"),
    ] {
        let term = resolver.resolve(code, system).await;
        assert!(
            !term.display.is_empty(),
            "display must never be empty for ({code:?}, {system:?})"
        );
    }
}

#[tokio::test]
async fn fhir_system_uri_resolves_like_the_oid() {
    let resolver = resolver_for("en");
    let by_uri = resolver.resolve("260176001", "http://snomed.info/sct").await;
    let by_oid = resolver.resolve("260176001", SNOMED).await;
    assert_eq!(by_uri.display, "Kiwi fruit");
    assert_eq!(by_uri.code_system_oid, by_oid.code_system_oid);
}

#[tokio::test]
async fn inactive_concepts_are_not_resolved() {
    let mut store = InMemoryConceptStore::new();
    store.insert_concept(ConceptRecord {
        code: "90560007".to_string(),
        code_system_oid: SNOMED.to_string(),
        status: ConceptStatus::Inactive,
        default_display: "Gout".to_string(),
        value_set_oid: None,
    });
    let resolver = TerminologyResolver::new(Arc::new(store), EngineConfig::default());

    let term = resolver.resolve("90560007", SNOMED).await;
    assert_eq!(term.provenance, Provenance::Fallback);
}

#[tokio::test]
async fn value_set_stamped_entries_resolve_via_cross_reference() {
    // The catalogue indexes the concept under a value-set OID; a source that
    // stamps entries with that OID instead of the governing system still
    // resolves.
    let value_set = "1.3.6.1.4.1.12559.11.10.1.3.1.42.10";
    let mut store = InMemoryConceptStore::new();
    store.insert_concept(ConceptRecord {
        code: "419511003".to_string(),
        code_system_oid: SNOMED.to_string(),
        status: ConceptStatus::Active,
        default_display: "Propensity to adverse reaction to drug".to_string(),
        value_set_oid: Some(value_set.to_string()),
    });
    let resolver = TerminologyResolver::new(Arc::new(store), EngineConfig::default());

    let term = resolver.resolve("419511003", value_set).await;
    assert_eq!(term.display, "Propensity to adverse reaction to drug");
    assert_eq!(term.provenance, Provenance::DefaultDisplay);

    let direct = resolver.resolve("419511003", SNOMED).await;
    assert_eq!(direct.display, term.display);
}

#[tokio::test]
async fn country_specific_translation_preferred() {
    let mut store = catalogue();
    store.insert_translation(
        "420134006",
        SNOMED,
        ConceptTranslation {
            language: "pt".to_string(),
            country: Some("PT".to_string()),
            display: "Propensão a reações adversas".to_string(),
        },
    );
    let resolver = TerminologyResolver::new(
        Arc::new(store),
        EngineConfig::for_locale("pt", Some("PT".to_string())),
    );

    let term = resolver.resolve("420134006", SNOMED).await;
    assert_eq!(term.display, "Propensão a reações adversas");
    assert_eq!(term.provenance, Provenance::Translation);
}

struct FailingStore;

#[async_trait]
impl ConceptStore for FailingStore {
    async fn find_concept(&self, _: &str, _: &str) -> StoreResult<Option<ConceptRecord>> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn find_translation(
        &self,
        _: &ConceptRecord,
        _: &str,
        _: Option<&str>,
    ) -> StoreResult<Option<String>> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn find_concept_by_value_set(
        &self,
        _: &str,
        _: &str,
    ) -> StoreResult<Option<ConceptRecord>> {
        Err(StoreError::Backend("connection refused".to_string()))
    }
}

#[tokio::test]
async fn store_failure_degrades_to_fallback() {
    let resolver = TerminologyResolver::new(Arc::new(FailingStore), EngineConfig::default());
    let term = resolver.resolve("420134006", SNOMED).await;
    assert_eq!(term.provenance, Provenance::Fallback);
    assert!(term.display.contains("420134006"));
}

struct StalledStore;

#[async_trait]
impl ConceptStore for StalledStore {
    async fn find_concept(&self, _: &str, _: &str) -> StoreResult<Option<ConceptRecord>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }

    async fn find_translation(
        &self,
        _: &ConceptRecord,
        _: &str,
        _: Option<&str>,
    ) -> StoreResult<Option<String>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }

    async fn find_concept_by_value_set(
        &self,
        _: &str,
        _: &str,
    ) -> StoreResult<Option<ConceptRecord>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }
}

#[tokio::test]
async fn stalled_store_is_bounded_by_the_timeout() {
    let config = EngineConfig {
        store_timeout: Duration::from_millis(20),
        ..EngineConfig::default()
    };
    let resolver = TerminologyResolver::new(Arc::new(StalledStore), config);

    let started = std::time::Instant::now();
    let term = resolver.resolve("420134006", SNOMED).await;
    assert_eq!(term.provenance, Provenance::Fallback);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn catalogue_loads_from_json() {
    let store = InMemoryConceptStore::from_json(
        r#"{
            "concepts": [
                {
                    "code": "420134006",
                    "codeSystemOid": "2.16.840.1.113883.6.96",
                    "status": "active",
                    "defaultDisplay": "Propensity to adverse reactions",
                    "translations": [
                        { "language": "de", "display": "Neigung zu unerwünschten Reaktionen" }
                    ]
                }
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(store.concept_count(), 1);

    let resolver = TerminologyResolver::new(Arc::new(store), EngineConfig::for_locale("de", None));
    let term = resolver.resolve("420134006", SNOMED).await;
    assert_eq!(term.display, "Neigung zu unerwünschten Reaktionen");
}
