use nodesel::{AttributeValue, DataAttribute, Document, NodeId, Tag};
use nodesel::model::Taxonomy;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Ids of the nodes [`invoice`] creates, in creation order.
pub struct InvoiceIds {
    pub document: NodeId,
    pub section: NodeId,
    pub nested_paragraph: NodeId,
    pub paragraph: NodeId,
    pub vendor_line: NodeId,
    pub number_line: NodeId,
}

/// Builds
///
/// ```text
/// document
///   section
///     paragraph: Alpha Beta Gamma (words)
///   paragraph: Delta Epsilon Zeta (words)
///   line "Acme Corp"   tag:ORG (confidence 0.92, value "Acme Corporation")
///   line "Invoice 42"  tag:INVOICE_NO on "42"
/// ```
///
/// plus a data object whose `vendor` attribute came from the ORG tag.
pub fn invoice() -> (Document, InvoiceIds) {
    let mut doc = Document::new();
    let document = doc.create_root("document", None).unwrap();
    let section = doc.add_child(document, "section", None).unwrap();
    let nested_paragraph = doc.add_child(section, "paragraph", None).unwrap();
    for word in ["Alpha", "Beta", "Gamma"] {
        doc.add_child(nested_paragraph, "word", Some(word)).unwrap();
    }
    let paragraph = doc.add_child(document, "paragraph", None).unwrap();
    for word in ["Delta", "Epsilon", "Zeta"] {
        doc.add_child(paragraph, "word", Some(word)).unwrap();
    }
    let vendor_line = doc.add_child(document, "line", Some("Acme Corp")).unwrap();
    let number_line = doc.add_child(document, "line", Some("Invoice 42")).unwrap();

    let org = doc
        .tag(
            vendor_line,
            "ORG",
            Tag::new()
                .with_confidence(0.92)
                .with_value("Acme Corporation"),
        )
        .unwrap();
    doc.tag(number_line, "INVOICE_NO", Tag::spanning(8, 10).unwrap())
        .unwrap();

    let taxonomy = doc.add_taxonomy(Taxonomy::new("invoices", "Invoices"));
    let object = doc.add_data_object(None, Some(taxonomy)).unwrap();
    doc.add_data_attribute(
        object,
        DataAttribute::new("vendor", AttributeValue::String("Acme Corporation".into()))
            .from_tag(org),
    )
    .unwrap();

    (
        doc,
        InvoiceIds {
            document,
            section,
            nested_paragraph,
            paragraph,
            vendor_line,
            number_line,
        },
    )
}

/// A `document > chapter*` tree with `width` paragraphs of `width` words per
/// chapter, for larger traversals.
pub fn wide_document(chapters: usize, width: usize) -> Document {
    let mut doc = Document::new();
    let root = doc.create_root("document", None).unwrap();
    for c in 0..chapters {
        let chapter = doc.add_child(root, "chapter", None).unwrap();
        for p in 0..width {
            let paragraph = doc.add_child(chapter, "paragraph", None).unwrap();
            for w in 0..width {
                let word = doc
                    .add_child(paragraph, "word", Some(&format!("w{c}-{p}-{w}")))
                    .unwrap();
                if w % 3 == 0 {
                    doc.tag(word, "KEYWORD", Tag::new().with_confidence(0.5))
                        .unwrap();
                }
            }
        }
    }
    doc
}
