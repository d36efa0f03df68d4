// Portal XML rendition of a decision
//
// Akoma Ntoso flavoured judgment document: metadata in <akn:meta>, text
// sections in <akn:judgmentBody>.

use crate::domain::DocumentAggregate;
use crate::port::{ValidationError, XmlContent, XmlTransformer};

const AKN_NAMESPACE: &str = "http://docs.oasis-open.org/legaldocml/ns/akn/3.0/WD17";
const RIS_NAMESPACE: &str = "http://ldml.neuris.de/metadata/";

/// Default transformer used by the daemon
#[derive(Debug, Default, Clone)]
pub struct PortalXmlTransformer;

impl PortalXmlTransformer {
    pub fn new() -> Self {
        Self
    }

    fn check_mandatory(aggregate: &DocumentAggregate) -> Result<(), ValidationError> {
        let core = &aggregate.core_data;
        let texts = &aggregate.texts;
        let mut missing = Vec::new();

        if is_blank(&core.court) {
            missing.push("court");
        }
        if core.decision_date.is_none() {
            missing.push("decision date");
        }
        if is_blank(&core.document_type) {
            missing.push("document type");
        }
        if core.file_numbers.iter().all(|f| f.trim().is_empty()) {
            missing.push("file number");
        }
        if is_blank(&texts.grounds) && is_blank(&texts.decision_reasons) {
            missing.push("judgment body (grounds or decision reasons)");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(format!(
                "document {} is missing mandatory fields: {}",
                aggregate.document_number,
                missing.join(", ")
            )))
        }
    }

    fn render(aggregate: &DocumentAggregate) -> String {
        let core = &aggregate.core_data;
        let texts = &aggregate.texts;
        let mut w = XmlWriter::new();

        w.raw("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
        w.open_with_attrs(
            "akn:akomaNtoso",
            &[("xmlns:akn", AKN_NAMESPACE), ("xmlns:ris", RIS_NAMESPACE)],
        );
        w.open_with_attrs("akn:judgment", &[("name", "attributsemantik-noch-undefiniert")]);

        w.open("akn:meta");
        w.open("akn:identification");
        w.leaf("akn:FRBRthis", &aggregate.document_number);
        if let Some(ecli) = non_blank(&core.ecli) {
            w.leaf("akn:FRBRalias", ecli);
        }
        w.close();
        w.open("akn:proprietary");
        w.open("ris:meta");
        if let Some(court) = non_blank(&core.court) {
            w.leaf("ris:gericht", court);
        }
        if let Some(date) = core.decision_date {
            w.leaf("ris:entscheidungsdatum", &date.format("%Y-%m-%d").to_string());
        }
        if let Some(doc_type) = non_blank(&core.document_type) {
            w.leaf("ris:dokumenttyp", doc_type);
        }
        w.open("ris:aktenzeichenListe");
        for file_number in core.file_numbers.iter().filter(|f| !f.trim().is_empty()) {
            w.leaf("ris:aktenzeichen", file_number);
        }
        w.close();
        w.close();
        w.close();
        w.close();

        if let Some(headnote) = non_blank(&texts.headnote) {
            w.section("akn:header", "orientierungssatz", headnote);
        }

        w.open("akn:judgmentBody");
        for (name, text) in [
            ("leitsatz", &texts.guiding_principle),
            ("tenor", &texts.tenor),
            ("tatbestand", &texts.case_facts),
            ("gruende", &texts.grounds),
            ("entscheidungsgruende", &texts.decision_reasons),
        ] {
            if let Some(text) = non_blank(text) {
                w.section("akn:motivation", name, text);
            }
        }
        w.close();

        w.close();
        w.close();
        w.finish()
    }
}

impl XmlTransformer for PortalXmlTransformer {
    fn transform(&self, aggregate: &DocumentAggregate) -> Result<XmlContent, ValidationError> {
        Self::check_mandatory(aggregate)?;
        let xml = Self::render(aggregate);
        check_well_formed(&xml)?;
        Ok(XmlContent::new(xml))
    }
}

fn is_blank(value: &Option<String>) -> bool {
    non_blank(value).is_none()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Escape text and attribute content
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // not representable in XML 1.0
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

struct XmlWriter {
    out: String,
    stack: Vec<&'static str>,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            stack: Vec::new(),
        }
    }

    fn raw(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn open(&mut self, name: &'static str) {
        self.open_with_attrs(name, &[]);
    }

    fn open_with_attrs(&mut self, name: &'static str, attrs: &[(&str, &str)]) {
        self.out.push('<');
        self.out.push_str(name);
        for (key, value) in attrs {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&escape_xml(value));
            self.out.push('"');
        }
        self.out.push('>');
        self.stack.push(name);
    }

    fn close(&mut self) {
        if let Some(name) = self.stack.pop() {
            self.out.push_str("</");
            self.out.push_str(name);
            self.out.push('>');
        }
    }

    fn leaf(&mut self, name: &'static str, text: &str) {
        self.open(name);
        self.out.push_str(&escape_xml(text));
        self.close();
    }

    /// One text block; paragraphs split on blank lines
    fn section(&mut self, element: &'static str, name: &str, text: &str) {
        self.open_with_attrs(element, &[("name", name)]);
        for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            self.leaf("akn:p", paragraph);
        }
        self.close();
    }

    fn finish(mut self) -> String {
        while !self.stack.is_empty() {
            self.close();
        }
        self.out
    }
}

/// Minimal well-formedness check: balanced, properly nested elements and a
/// single root
fn check_well_formed(xml: &str) -> Result<(), ValidationError> {
    let mut stack: Vec<&str> = Vec::new();
    let mut roots = 0;
    let mut rest = xml;

    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let end = after
            .find('>')
            .ok_or_else(|| ValidationError::new("unterminated tag"))?;
        let tag = &after[..end];
        rest = &after[end + 1..];

        if tag.starts_with('?') || tag.starts_with('!') {
            continue;
        }
        if let Some(name) = tag.strip_prefix('/') {
            match stack.pop() {
                Some(open) if open == name.trim() => {}
                Some(open) => {
                    return Err(ValidationError::new(format!(
                        "mismatched closing tag </{}> for <{}>",
                        name, open
                    )))
                }
                None => return Err(ValidationError::new(format!("stray closing tag </{}>", name))),
            }
            continue;
        }

        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_end_matches('/')
            .split_whitespace()
            .next()
            .ok_or_else(|| ValidationError::new("empty tag"))?;
        if stack.is_empty() {
            roots += 1;
        }
        if !self_closing {
            stack.push(name);
        }
    }

    if let Some(open) = stack.last() {
        return Err(ValidationError::new(format!("unclosed element <{}>", open)));
    }
    if roots != 1 {
        return Err(ValidationError::new(format!(
            "expected one root element, found {}",
            roots
        )));
    }
    Ok(())
}
