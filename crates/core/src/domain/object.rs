// Object keys and the desired object set of a document

use crate::domain::document::Attachment;

/// Top-level directory of uploaded changelogs, never a document prefix
pub const CHANGELOG_DIR: &str = "changelogs";

/// Prefix of every uploaded changelog
pub const CHANGELOG_PREFIX: &str = "changelogs/";

/// Prefix under which all objects of a document live
pub fn document_prefix(document_number: &str) -> String {
    format!("{}/", document_number)
}

/// Key of the primary XML rendition: `{doc}/{doc}.xml`
pub fn xml_key(document_number: &str) -> String {
    format!("{}/{}.xml", document_number, document_number)
}

/// Key of an attachment: `{doc}/{filename}`
pub fn attachment_key(document_number: &str, filename: &str) -> String {
    format!("{}/{}", document_number, filename)
}

/// One object that must exist after reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredObject {
    pub key: String,
    pub content: Vec<u8>,
}

/// Full set of objects that must exist under a document prefix
///
/// Ordered: the XML rendition first, attachments in aggregate order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DesiredObjectSet {
    objects: Vec<DesiredObject>,
}

impl DesiredObjectSet {
    /// Desired set of a DELETE job
    pub fn empty() -> Self {
        Self::default()
    }

    /// Desired set of a PUBLISH job
    ///
    /// An attachment sharing the XML rendition's filename is dropped; the
    /// rendition wins.
    pub fn for_publication(
        document_number: &str,
        xml: Vec<u8>,
        attachments: &[Attachment],
    ) -> Self {
        let mut objects = Vec::with_capacity(attachments.len() + 1);
        objects.push(DesiredObject {
            key: xml_key(document_number),
            content: xml,
        });

        for attachment in attachments {
            let key = attachment_key(document_number, &attachment.filename);
            if objects.iter().any(|o| o.key == key) {
                tracing::warn!(
                    document_number = %document_number,
                    key = %key,
                    "Duplicate object key in desired set, keeping first"
                );
                continue;
            }
            objects.push(DesiredObject {
                key,
                content: attachment.content.clone(),
            });
        }

        Self { objects }
    }

    pub fn objects(&self) -> &[DesiredObject] {
        &self.objects
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.objects.iter().any(|o| o.key == key)
    }
}
