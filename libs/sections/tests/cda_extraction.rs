use salus_sections::cda::{CdaAllergiesExtractor, CdaDocument, CdaMedicationsExtractor};
use salus_sections::{ClinicalDocument, Provenance, SectionExtractor};
use salus_terminology::{
    ConceptRecord, ConceptStatus, EngineConfig, InMemoryConceptStore, TerminologyResolver,
};
use std::sync::Arc;

const SNOMED: &str = "2.16.840.1.113883.6.96";

fn resolver_with_catalogue() -> Arc<TerminologyResolver> {
    let mut store = InMemoryConceptStore::new();
    store.insert_concept(ConceptRecord {
        code: "260176001".to_string(),
        code_system_oid: SNOMED.to_string(),
        status: ConceptStatus::Active,
        default_display: "Kiwi fruit".to_string(),
        value_set_oid: None,
    });
    store.insert_concept(ConceptRecord {
        code: "419511003".to_string(),
        code_system_oid: SNOMED.to_string(),
        status: ConceptStatus::Active,
        default_display: "Propensity to adverse reaction to drug".to_string(),
        value_set_oid: None,
    });
    Arc::new(TerminologyResolver::new(
        Arc::new(store),
        EngineConfig::default(),
    ))
}

fn cda(body_sections: &str) -> ClinicalDocument {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <ClinicalDocument xmlns="urn:hl7-org:v3" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
          <component>
            <structuredBody>
              {body_sections}
            </structuredBody>
          </component>
        </ClinicalDocument>"#
    );
    ClinicalDocument::Cda(CdaDocument::parse(&xml).unwrap())
}

const ALLERGY_SECTION: &str = r##"
    <component><section>
      <code code="48765-2" codeSystem="2.16.840.1.113883.6.1"/>
      <title>Allergies and Intolerances</title>
      <entry>
        <act classCode="ACT" moodCode="EVN">
          <id root="1.2.752.129.2.1.2.1" extension="allergy-1"/>
          <statusCode code="active"/>
          <entryRelationship typeCode="SUBJ">
            <observation classCode="OBS" moodCode="EVN">
              <text><reference value="#allergy-1"/></text>
              <value xsi:type="CD" code="419511003" codeSystem="2.16.840.1.113883.6.96"
                     displayName="Propensity to adverse reaction to drug"/>
              <effectiveTime><low value="20100321"/></effectiveTime>
              <participant typeCode="CSM">
                <participantRole classCode="MANU">
                  <playingEntity classCode="MMAT">
                    <code code="260176001" codeSystem="2.16.840.1.113883.6.96"
                          displayName="Kiwi fruit"/>
                  </playingEntity>
                </participantRole>
              </participant>
              <entryRelationship typeCode="MFST">
                <observation classCode="OBS" moodCode="EVN">
                  <value xsi:type="CD" code="247472004" codeSystem="2.16.840.1.113883.6.96"
                         displayName="Hives"/>
                </observation>
              </entryRelationship>
              <entryRelationship typeCode="SUBJ">
                <observation classCode="OBS" moodCode="EVN">
                  <code code="SEV" codeSystem="2.16.840.1.113883.5.4"/>
                  <value xsi:type="CD" code="6736007" codeSystem="2.16.840.1.113883.6.96"
                         displayName="Moderate"/>
                </observation>
              </entryRelationship>
            </observation>
          </entryRelationship>
        </act>
      </entry>
      <entry>
        <act classCode="ACT" moodCode="EVN">
          <statusCode code="active"/>
        </act>
      </entry>
    </section></component>"##;

#[tokio::test]
async fn extracts_allergy_entries() {
    let extractor = CdaAllergiesExtractor::new(resolver_with_catalogue());
    let section = extractor.extract(&cda(ALLERGY_SECTION)).await.unwrap();

    assert!(section.has_entries);
    assert!(section.is_coded_section);
    assert_eq!(section.section_code, "48765-2");
    // The second entry has no observation and is skipped, not fatal.
    assert_eq!(section.entries.len(), 1);

    let entry = &section.entries[0];
    assert_eq!(entry.entry_id, "1.2.752.129.2.1.2.1^allergy-1");
    assert_eq!(entry.display_text, "Kiwi fruit");
    assert_eq!(entry.clinical_status.as_deref(), Some("active"));
    assert_eq!(entry.severity.as_deref(), Some("Moderate"));
    assert_eq!(entry.source_reference.as_deref(), Some("#allergy-1"));
    assert_eq!(
        entry.onset_date,
        chrono::NaiveDate::from_ymd_opt(2010, 3, 21)
    );
    // Agent + propensity + manifestation.
    assert_eq!(entry.coded_concepts.len(), 3);
}

#[tokio::test]
async fn populated_display_name_bypasses_the_resolver() {
    let resolver = resolver_with_catalogue();
    let extractor = CdaAllergiesExtractor::new(resolver.clone());
    let section = extractor.extract(&cda(ALLERGY_SECTION)).await.unwrap();

    let agent = &section.entries[0].coded_concepts[0];
    assert_eq!(agent.display, "Kiwi fruit");
    assert_eq!(agent.provenance, Provenance::SourceDisplay);
    // Every display in the fixture is populated; nothing hit the cache/store.
    let stats = resolver.cache_stats();
    assert_eq!(stats.hits + stats.misses, 0);
}

#[tokio::test]
async fn empty_display_name_resolves_from_catalogue() {
    let section_xml = r#"
        <component><section>
          <code code="48765-2" codeSystem="2.16.840.1.113883.6.1"/>
          <entry>
            <act classCode="ACT" moodCode="EVN">
              <id root="1.2.3" extension="allergy-2"/>
              <statusCode code="active"/>
              <entryRelationship typeCode="SUBJ">
                <observation classCode="OBS" moodCode="EVN">
                  <participant typeCode="CSM">
                    <participantRole classCode="MANU">
                      <playingEntity classCode="MMAT">
                        <code code="260176001" codeSystem="2.16.840.1.113883.6.96" displayName=""/>
                      </playingEntity>
                    </participantRole>
                  </participant>
                </observation>
              </entryRelationship>
            </act>
          </entry>
        </section></component>"#;

    let extractor = CdaAllergiesExtractor::new(resolver_with_catalogue());
    let section = extractor.extract(&cda(section_xml)).await.unwrap();

    let agent = &section.entries[0].coded_concepts[0];
    assert_eq!(agent.display, "Kiwi fruit");
    assert_eq!(agent.provenance, Provenance::DefaultDisplay);
}

#[tokio::test]
async fn missing_section_yields_empty_section() {
    let extractor = CdaAllergiesExtractor::new(resolver_with_catalogue());
    let section = extractor.extract(&cda("")).await.unwrap();

    assert!(!section.has_entries);
    assert!(section.entries.is_empty());
    assert_eq!(section.title, "Allergies and Intolerances");
}

#[tokio::test]
async fn extracts_medication_entries() {
    let section_xml = r#"
        <component><section>
          <code code="10160-0" codeSystem="2.16.840.1.113883.6.1"/>
          <entry>
            <substanceAdministration classCode="SBADM" moodCode="EVN">
              <id root="1.2.3.4" extension="med-1"/>
              <statusCode code="active"/>
              <effectiveTime><low value="20210101"/></effectiveTime>
              <routeCode code="20053000" codeSystem="0.4.0.127.0.16.1.1.2.1"
                         displayName="Oral use"/>
              <doseQuantity value="500" unit="mg"/>
              <consumable>
                <manufacturedProduct>
                  <manufacturedMaterial>
                    <code code="387517004" codeSystem="2.16.840.1.113883.6.96"
                          displayName="Paracetamol"/>
                  </manufacturedMaterial>
                </manufacturedProduct>
              </consumable>
            </substanceAdministration>
          </entry>
        </section></component>"#;

    let extractor = CdaMedicationsExtractor::new(resolver_with_catalogue());
    let section = extractor.extract(&cda(section_xml)).await.unwrap();

    assert_eq!(section.entries.len(), 1);
    let entry = &section.entries[0];
    assert_eq!(entry.display_text, "Paracetamol");
    assert_eq!(entry.value_text.as_deref(), Some("500 mg"));
    assert_eq!(
        entry.onset_date,
        chrono::NaiveDate::from_ymd_opt(2021, 1, 1)
    );
    // Medication + route.
    assert_eq!(entry.coded_concepts.len(), 2);
    assert_eq!(entry.coded_concepts[1].display, "Oral use");
}

#[tokio::test]
async fn wrong_format_is_an_error() {
    let bundle = salus_sections::fhir::FhirBundle::parse(r#"{"resourceType":"Bundle"}"#).unwrap();
    let extractor = CdaAllergiesExtractor::new(resolver_with_catalogue());
    assert!(extractor
        .extract(&ClinicalDocument::Fhir(bundle))
        .await
        .is_err());
}
