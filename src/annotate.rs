use std::collections::{BTreeMap, HashSet};

use lopdf::{dictionary, Document, Object, ObjectId};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geo::Rect;
use crate::logging::OUTPUT_ASSEMBLY;
use crate::scan::AnnotationSink;

/// Which pages survive into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputPolicy {
    /// Keep only pages with at least one recorded highlight.
    #[default]
    MatchedPagesOnly,
    /// Keep every page; highlights are still added where recorded.
    FullDocument,
}

/// Accumulates match regions and turns them into a highlighted document.
///
/// The annotator owns its own copy of the document so a scan can keep
/// reading from the original while regions arrive. Nothing is mutated
/// until `assemble`; a call with no recorded regions produces `None`
/// rather than an empty document.
pub struct PdfAnnotator {
    doc: Document,
    pending: BTreeMap<u32, Vec<Rect>>,
}

impl PdfAnnotator {
    pub fn new(doc: Document) -> Self {
        PdfAnnotator {
            doc,
            pending: BTreeMap::new(),
        }
    }

    pub fn recorded_regions(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }
}

impl AnnotationSink for PdfAnnotator {
    type Output = Document;

    fn record_highlight(&mut self, page_number: u32, region: Rect) {
        self.pending.entry(page_number).or_default().push(region);
    }

    fn assemble(mut self, policy: OutputPolicy) -> Result<Option<Document>> {
        if self.pending.is_empty() {
            info!(target: OUTPUT_ASSEMBLY, "no regions recorded, no output produced");
            return Ok(None);
        }

        let pages: BTreeMap<u32, ObjectId> = self.doc.get_pages();
        for (page_number, regions) in &self.pending {
            let page_id = *pages.get(page_number).ok_or_else(|| {
                Error::OutputAssembly(format!("page {page_number} is not in the page tree"))
            })?;
            for region in regions {
                let annotation_id = self.doc.add_object(highlight_annotation(region));
                attach_annotation(&mut self.doc, page_id, annotation_id)?;
            }
        }

        if policy == OutputPolicy::MatchedPagesOnly {
            let dropped: HashSet<ObjectId> = pages
                .iter()
                .filter(|(number, _)| !self.pending.contains_key(number))
                .map(|(_, id)| *id)
                .collect();
            if !dropped.is_empty() {
                let root = page_tree_root(&self.doc)?;
                let kept = prune_page_tree(&mut self.doc, root, &dropped)?;
                debug!(
                    target: OUTPUT_ASSEMBLY,
                    removed = dropped.len(),
                    kept,
                    "dropped pages without matches"
                );
            }
        }

        self.doc.compress();
        info!(
            target: OUTPUT_ASSEMBLY,
            pages = self.pending.len(),
            regions = self.pending.values().map(Vec::len).sum::<usize>(),
            "output assembled"
        );
        Ok(Some(self.doc))
    }
}

/// A yellow text-highlight annotation over `region`. Quad points run
/// upper-left, upper-right, lower-left, lower-right; `F 4` keeps the
/// mark printable.
fn highlight_annotation(region: &Rect) -> Object {
    let rect: Vec<Object> = vec![
        region.x0.into(),
        region.y0.into(),
        region.x1.into(),
        region.y1.into(),
    ];
    let quad_points: Vec<Object> = vec![
        region.x0.into(),
        region.y1.into(),
        region.x1.into(),
        region.y1.into(),
        region.x0.into(),
        region.y0.into(),
        region.x1.into(),
        region.y0.into(),
    ];
    Object::Dictionary(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Highlight",
        "Rect" => rect,
        "QuadPoints" => quad_points,
        "C" => vec![Object::Real(1.0), Object::Real(1.0), Object::Real(0.0)],
        "CA" => Object::Real(0.5),
        "F" => Object::Integer(4),
    })
}

enum AnnotsSlot {
    Reference(ObjectId),
    Inline(Vec<Object>),
    Missing,
}

/// Append an annotation reference to a page's `/Annots`, whether the
/// array is inline, behind a reference, or not there yet.
fn attach_annotation(doc: &mut Document, page_id: ObjectId, annotation_id: ObjectId) -> Result<()> {
    let slot = {
        let page = doc.get_dictionary(page_id).map_err(assembly_err)?;
        match page.get(b"Annots") {
            Ok(Object::Reference(id)) => AnnotsSlot::Reference(*id),
            Ok(Object::Array(items)) => AnnotsSlot::Inline(items.clone()),
            _ => AnnotsSlot::Missing,
        }
    };

    match slot {
        AnnotsSlot::Reference(array_id) => {
            let array = doc
                .get_object_mut(array_id)
                .and_then(|object| object.as_array_mut())
                .map_err(assembly_err)?;
            array.push(Object::Reference(annotation_id));
        }
        AnnotsSlot::Inline(mut items) => {
            items.push(Object::Reference(annotation_id));
            let page = doc
                .get_object_mut(page_id)
                .and_then(|object| object.as_dict_mut())
                .map_err(assembly_err)?;
            page.set("Annots", items);
        }
        AnnotsSlot::Missing => {
            let page = doc
                .get_object_mut(page_id)
                .and_then(|object| object.as_dict_mut())
                .map_err(assembly_err)?;
            page.set("Annots", vec![Object::Reference(annotation_id)]);
        }
    }
    Ok(())
}

fn page_tree_root(doc: &Document) -> Result<ObjectId> {
    let catalog = doc.catalog().map_err(assembly_err)?;
    catalog
        .get(b"Pages")
        .and_then(|object| object.as_reference())
        .map_err(assembly_err)
}

/// Remove leaf references to dropped pages from the tree under `node_id`
/// and recompute every `/Count` on the way back up. Returns how many leaf
/// pages remain below the node. Intermediate nodes left empty are removed
/// with their subtree.
fn prune_page_tree(doc: &mut Document, node_id: ObjectId, dropped: &HashSet<ObjectId>) -> Result<i64> {
    let kid_ids: Vec<ObjectId> = {
        let node = doc.get_dictionary(node_id).map_err(assembly_err)?;
        match node.get(b"Kids").and_then(|kids| kids.as_array()) {
            Ok(kids) => kids.iter().filter_map(|kid| kid.as_reference().ok()).collect(),
            Err(_) => Vec::new(),
        }
    };

    let mut kept = Vec::new();
    let mut count = 0i64;
    for kid_id in kid_ids {
        let node_type = match doc.get_dictionary(kid_id) {
            Ok(kid) => kid
                .get(b"Type")
                .and_then(Object::as_name)
                .map(<[u8]>::to_vec)
                .ok(),
            Err(_) => None,
        };
        if node_type.as_deref() == Some(b"Pages".as_slice()) {
            let below = prune_page_tree(doc, kid_id, dropped)?;
            if below > 0 {
                kept.push(Object::Reference(kid_id));
                count += below;
            }
        } else if !dropped.contains(&kid_id) {
            kept.push(Object::Reference(kid_id));
            count += 1;
        }
    }

    let node = doc
        .get_object_mut(node_id)
        .and_then(|object| object.as_dict_mut())
        .map_err(assembly_err)?;
    node.set("Kids", kept);
    node.set("Count", count);
    Ok(count)
}

fn assembly_err(err: lopdf::Error) -> Error {
    Error::OutputAssembly(err.to_string())
}
