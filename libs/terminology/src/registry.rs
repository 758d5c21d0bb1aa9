//! Code system registry
//!
//! Static table mapping code-system identifiers (HL7 OIDs and FHIR canonical
//! URIs) onto the systems the engine understands. Lookups are pure and
//! infallible: an unregistered identifier yields the `Unknown` marker used
//! for audit badges, never an error.
//!
//! Uses a compile-time perfect hash map (phf) so identification costs no
//! runtime allocation.

use phf::phf_map;

/// Marker returned by [`code_system_name`] for identifiers outside the table.
pub const UNKNOWN_SYSTEM: &str = "Unknown";

/// A code system known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeSystem {
    SnomedCt,
    Loinc,
    Icd10,
    Icd10Cm,
    RxNorm,
    Atc,
    Ucum,
    Edqm,
    /// HL7 RouteOfAdministration vocabulary (CDA `routeCode`).
    RouteOfAdministration,
    /// HL7 ActCode vocabulary (allergy/intolerance observation types).
    ActCode,
}

static SYSTEMS_BY_OID: phf::Map<&'static str, CodeSystem> = phf_map! {
    "2.16.840.1.113883.6.96" => CodeSystem::SnomedCt,
    "2.16.840.1.113883.6.1" => CodeSystem::Loinc,
    "2.16.840.1.113883.6.3" => CodeSystem::Icd10,
    "2.16.840.1.113883.6.90" => CodeSystem::Icd10Cm,
    "2.16.840.1.113883.6.88" => CodeSystem::RxNorm,
    "2.16.840.1.113883.6.73" => CodeSystem::Atc,
    "2.16.840.1.113883.6.8" => CodeSystem::Ucum,
    "0.4.0.127.0.16.1.1.2.1" => CodeSystem::Edqm,
    "2.16.840.1.113883.5.112" => CodeSystem::RouteOfAdministration,
    "2.16.840.1.113883.5.4" => CodeSystem::ActCode,
};

static SYSTEMS_BY_URI: phf::Map<&'static str, CodeSystem> = phf_map! {
    "http://snomed.info/sct" => CodeSystem::SnomedCt,
    "http://loinc.org" => CodeSystem::Loinc,
    "http://hl7.org/fhir/sid/icd-10" => CodeSystem::Icd10,
    "http://hl7.org/fhir/sid/icd-10-cm" => CodeSystem::Icd10Cm,
    "http://www.nlm.nih.gov/research/umls/rxnorm" => CodeSystem::RxNorm,
    "http://www.whocc.no/atc" => CodeSystem::Atc,
    "http://unitsofmeasure.org" => CodeSystem::Ucum,
    "https://standardterms.edqm.eu" => CodeSystem::Edqm,
    "http://standardterms.edqm.eu" => CodeSystem::Edqm,
    "http://terminology.hl7.org/CodeSystem/v3-RouteOfAdministration" => CodeSystem::RouteOfAdministration,
    "http://terminology.hl7.org/CodeSystem/v3-ActCode" => CodeSystem::ActCode,
};

impl CodeSystem {
    /// Canonical human-readable name, suitable for audit badges.
    pub fn name(&self) -> &'static str {
        match self {
            CodeSystem::SnomedCt => "SNOMED CT",
            CodeSystem::Loinc => "LOINC",
            CodeSystem::Icd10 => "ICD-10",
            CodeSystem::Icd10Cm => "ICD-10-CM",
            CodeSystem::RxNorm => "RxNorm",
            CodeSystem::Atc => "ATC",
            CodeSystem::Ucum => "UCUM",
            CodeSystem::Edqm => "EDQM",
            CodeSystem::RouteOfAdministration => "HL7 RouteOfAdministration",
            CodeSystem::ActCode => "HL7 ActCode",
        }
    }

    /// The governing OID, the system half of the engine's dual key.
    pub fn oid(&self) -> &'static str {
        match self {
            CodeSystem::SnomedCt => "2.16.840.1.113883.6.96",
            CodeSystem::Loinc => "2.16.840.1.113883.6.1",
            CodeSystem::Icd10 => "2.16.840.1.113883.6.3",
            CodeSystem::Icd10Cm => "2.16.840.1.113883.6.90",
            CodeSystem::RxNorm => "2.16.840.1.113883.6.88",
            CodeSystem::Atc => "2.16.840.1.113883.6.73",
            CodeSystem::Ucum => "2.16.840.1.113883.6.8",
            CodeSystem::Edqm => "0.4.0.127.0.16.1.1.2.1",
            CodeSystem::RouteOfAdministration => "2.16.840.1.113883.5.112",
            CodeSystem::ActCode => "2.16.840.1.113883.5.4",
        }
    }

    /// Identify a system from a bare or `urn:oid:`-prefixed OID.
    pub fn from_oid(identifier: &str) -> Option<CodeSystem> {
        let oid = strip_oid_prefix(identifier.trim());
        SYSTEMS_BY_OID.get(oid).copied()
    }

    /// Identify a system from a FHIR canonical system URI.
    pub fn from_uri(uri: &str) -> Option<CodeSystem> {
        SYSTEMS_BY_URI.get(uri.trim().trim_end_matches('/')).copied()
    }

    /// Identify a system from either identifier form.
    ///
    /// CDA sources carry OIDs, FHIR sources carry URIs; both routes land on
    /// the same dual key.
    pub fn identify(identifier: &str) -> Option<CodeSystem> {
        CodeSystem::from_oid(identifier).or_else(|| CodeSystem::from_uri(identifier))
    }
}

/// OID arc under which the EU cross-border catalogue defines its value
/// sets. Source documents regularly stamp coded entries with the value
/// set's defining OID instead of the concept's governing system; those
/// identifiers gate through to the resolver's value-set cross-reference
/// rather than straight to the fallback string.
const VALUE_SET_ARC: &str = "1.3.6.1.4.1.12559.11.10.1.3.1.42.";

/// Whether an identifier denotes a catalogued value set rather than a code
/// system.
pub fn is_value_set_oid(identifier: &str) -> bool {
    strip_oid_prefix(identifier.trim()).starts_with(VALUE_SET_ARC)
}

/// Badge helper for presentation layers.
pub fn code_system_name(identifier: &str) -> &'static str {
    CodeSystem::identify(identifier)
        .map(|cs| cs.name())
        .unwrap_or(UNKNOWN_SYSTEM)
}

/// Normalize a source-provided system identifier for the dual key.
///
/// Registered URIs collapse onto their OID so a FHIR `Coding.system` and a
/// CDA `@codeSystem` referring to the same system produce the same key;
/// unregistered identifiers pass through (minus any `urn:oid:` prefix) so
/// the fallback string can still name them.
pub fn normalize_system_id(identifier: &str) -> String {
    match CodeSystem::identify(identifier) {
        Some(system) => system.oid().to_string(),
        None => strip_oid_prefix(identifier.trim()).to_string(),
    }
}

fn strip_oid_prefix(identifier: &str) -> &str {
    identifier
        .strip_prefix("urn:oid:")
        .unwrap_or(identifier)
}
