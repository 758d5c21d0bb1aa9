//! Schema parity across source formats
//!
//! The single most important property of the engine: a CDA-sourced and a
//! FHIR-sourced section for the same clinical fact must expose identical
//! key sets, so rendering never branches on the wire format.

use salus_sections::cda::{CdaAllergiesExtractor, CdaDocument};
use salus_sections::fhir::{FhirAllergiesExtractor, FhirBundle};
use salus_sections::{ClinicalDocument, SectionExtractor};
use salus_terminology::{EngineConfig, InMemoryConceptStore, TerminologyResolver};
use std::sync::Arc;

fn resolver() -> Arc<TerminologyResolver> {
    Arc::new(TerminologyResolver::new(
        Arc::new(InMemoryConceptStore::new()),
        EngineConfig::default(),
    ))
}

fn object_keys(value: &serde_json::Value) -> Vec<String> {
    value
        .as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn equivalent_fact_produces_identical_key_sets() {
    let cda_xml = r#"<?xml version="1.0"?>
        <ClinicalDocument xmlns="urn:hl7-org:v3" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
          <component><structuredBody>
            <component><section>
              <code code="48765-2" codeSystem="2.16.840.1.113883.6.1"/>
              <entry>
                <act classCode="ACT" moodCode="EVN">
                  <id root="1.2.3" extension="allergy-1"/>
                  <statusCode code="active"/>
                  <entryRelationship typeCode="SUBJ">
                    <observation classCode="OBS" moodCode="EVN">
                      <effectiveTime><low value="20100321"/></effectiveTime>
                      <participant typeCode="CSM">
                        <participantRole classCode="MANU">
                          <playingEntity classCode="MMAT">
                            <code code="260176001" codeSystem="2.16.840.1.113883.6.96"
                                  displayName="Kiwi fruit"/>
                          </playingEntity>
                        </participantRole>
                      </participant>
                    </observation>
                  </entryRelationship>
                </act>
              </entry>
            </section></component>
          </structuredBody></component>
        </ClinicalDocument>"#;

    let fhir_json = r#"{
        "resourceType": "Bundle",
        "type": "collection",
        "entry": [ { "resource": {
            "resourceType": "AllergyIntolerance",
            "id": "allergy-1",
            "clinicalStatus": { "coding": [ { "code": "active" } ] },
            "code": { "coding": [ { "system": "http://snomed.info/sct", "code": "260176001", "display": "Kiwi fruit" } ] },
            "onsetDateTime": "2010-03-21"
        } } ]
    }"#;

    let cda_section = CdaAllergiesExtractor::new(resolver())
        .extract(&ClinicalDocument::Cda(CdaDocument::parse(cda_xml).unwrap()))
        .await
        .unwrap();
    let fhir_section = FhirAllergiesExtractor::new(resolver())
        .extract(&ClinicalDocument::Fhir(
            FhirBundle::parse(fhir_json).unwrap(),
        ))
        .await
        .unwrap();

    let cda_value = serde_json::to_value(&cda_section).unwrap();
    let fhir_value = serde_json::to_value(&fhir_section).unwrap();

    // Section-level schema parity.
    assert_eq!(object_keys(&cda_value), object_keys(&fhir_value));

    // Entry-level schema parity.
    assert_eq!(
        object_keys(&cda_value["entries"][0]),
        object_keys(&fhir_value["entries"][0])
    );

    // Concept-level schema parity.
    assert_eq!(
        object_keys(&cda_value["entries"][0]["codedConcepts"][0]),
        object_keys(&fhir_value["entries"][0]["codedConcepts"][0])
    );

    // And the semantics agree, not just the shape.
    assert_eq!(
        cda_section.entries[0].display_text,
        fhir_section.entries[0].display_text
    );
    assert_eq!(
        cda_section.entries[0].coded_concepts[0].code,
        fhir_section.entries[0].coded_concepts[0].code
    );
    assert_eq!(
        cda_section.entries[0].coded_concepts[0].code_system_oid,
        fhir_section.entries[0].coded_concepts[0].code_system_oid
    );
    assert_eq!(
        cda_section.entries[0].onset_date,
        fhir_section.entries[0].onset_date
    );
}
