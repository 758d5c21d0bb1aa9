//! Owned CDA document tree
//!
//! `roxmltree` borrows its input string, which would pin every extraction
//! future to the raw document's lifetime. One pass here converts the parse
//! into an owned element tree that is freely shareable across concurrently
//! running extractors. Tag matching uses local names only; CDA producers
//! disagree about namespace prefixes far too much to be strict about them.

use crate::error::Result;

/// An owned XML element: local name, attributes, children, direct text.
#[derive(Debug, Clone)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    fn from_node(node: roxmltree::Node<'_, '_>) -> XmlElement {
        let attributes = node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();

        let mut children = Vec::new();
        let mut text = String::new();
        for child in node.children() {
            if child.is_element() {
                children.push(XmlElement::from_node(child));
            } else if let Some(t) = child.text() {
                text.push_str(t);
            }
        }

        XmlElement {
            name: node.tag_name().name().to_string(),
            attributes,
            children,
            text: text.trim().to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given local name.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn all_children(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter()
    }

    /// Direct text content, trimmed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// First element matching the path of local names, walking direct
    /// children level by level.
    pub fn path(&self, names: &[&str]) -> Option<&XmlElement> {
        let mut current = self;
        for name in names {
            current = current.child(name)?;
        }
        Some(current)
    }

    /// Pre-order search of the whole subtree.
    pub fn find_descendant(&self, name: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(name) {
                return Some(found);
            }
        }
        None
    }
}

/// A parsed CDA document.
pub struct CdaDocument {
    root: XmlElement,
}

impl CdaDocument {
    /// Parse a raw CDA XML string into an owned tree.
    pub fn parse(xml: &str) -> Result<CdaDocument> {
        let doc = roxmltree::Document::parse(xml)?;
        Ok(CdaDocument {
            root: XmlElement::from_node(doc.root_element()),
        })
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Locate a structured-body section by its LOINC section code, falling
    /// back to a template-id match for producers that omit the code element.
    pub fn section(&self, loinc_code: &str, template_root: &str) -> Option<&XmlElement> {
        let body = self
            .root
            .child("component")
            .and_then(|c| c.child("structuredBody"))?;

        let mut fallback = None;
        for component in body.children("component") {
            let Some(section) = component.child("section") else {
                continue;
            };

            let code_matches = section
                .child("code")
                .and_then(|c| c.attr("code"))
                .is_some_and(|c| c == loinc_code);
            if code_matches {
                return Some(section);
            }

            let template_matches = section
                .children("templateId")
                .any(|t| t.attr("root") == Some(template_root));
            if template_matches && fallback.is_none() {
                fallback = Some(section);
            }
        }
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
        <ClinicalDocument xmlns="urn:hl7-org:v3">
          <component><structuredBody>
            <component><section>
              <templateId root="1.3.6.1.4.1.12559.11.10.1.3.1.2.2"/>
              <code code="48765-2" codeSystem="2.16.840.1.113883.6.1"/>
              <title>Allergies</title>
            </section></component>
          </structuredBody></component>
        </ClinicalDocument>"#;

    #[test]
    fn finds_section_by_loinc_code() {
        let doc = CdaDocument::parse(DOC).unwrap();
        let section = doc.section("48765-2", "no-such-template").unwrap();
        assert_eq!(section.child("title").unwrap().text(), "Allergies");
    }

    #[test]
    fn falls_back_to_template_id() {
        let doc = CdaDocument::parse(DOC).unwrap();
        assert!(doc
            .section("99999-9", "1.3.6.1.4.1.12559.11.10.1.3.1.2.2")
            .is_some());
        assert!(doc.section("99999-9", "9.9.9").is_none());
    }

    #[test]
    fn rejects_malformed_xml() {
        assert!(CdaDocument::parse("<ClinicalDocument>").is_err());
    }
}
