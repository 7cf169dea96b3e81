//! PDF capability used by the embedding generator
//!
//! The generator only needs to read page geometry, embed raster images and
//! draw them; [`PdfCanvas`] captures exactly that. [`LopdfCanvas`] is the
//! implementation over `lopdf`.

use crate::types::{PageGeometry, Result, StampError};
use image::RgbaImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::collections::{BTreeMap, HashMap};

/// Default MediaBox for pages that do not declare one (US Letter)
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Guard against cyclic `/Parent` chains
const MAX_TREE_DEPTH: usize = 64;

/// Where to draw an image, in PDF points (origin bottom-left of the MediaBox)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub opacity: f32,
    /// Page `/Rotate` the image is counter-rotated against (0, 90, 180 or 270)
    pub page_rotation: u16,
}

impl DrawRect {
    /// `cm` operands mapping the image unit square onto this box.
    ///
    /// The image's top edge ends up at the top of the page as displayed.
    pub fn image_matrix(&self) -> [f64; 6] {
        let (x, y, w, h) = (self.x, self.y, self.width, self.height);
        match self.page_rotation {
            90 => [0.0, h, -w, 0.0, x + w, y],
            180 => [-w, 0.0, 0.0, -h, x + w, y + h],
            270 => [0.0, -h, w, 0.0, x, y + h],
            _ => [w, 0.0, 0.0, h, x, y],
        }
    }
}

/// What the generator needs from a PDF document
pub trait PdfCanvas {
    /// Handle to an embedded image
    type Image: Copy;

    fn page_count(&self) -> usize;

    /// Geometry of a 1-based page
    fn page_geometry(&self, page_number: u32) -> Result<PageGeometry>;

    fn embed_raster(&mut self, image: &RgbaImage) -> Result<Self::Image>;

    fn draw_image(&mut self, page_number: u32, image: Self::Image, rect: DrawRect) -> Result<()>;

    fn save(&mut self) -> Result<Vec<u8>>;

    /// Geometry of every page in order
    fn page_geometries(&self) -> Result<Vec<PageGeometry>> {
        (1..=self.page_count() as u32)
            .map(|page| self.page_geometry(page))
            .collect()
    }
}

/// Image XObject embedded by [`LopdfCanvas`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedImage {
    id: ObjectId,
    index: usize,
}

/// [`PdfCanvas`] over an `lopdf` document
pub struct LopdfCanvas {
    doc: Document,
    page_ids: Vec<ObjectId>,
    media_boxes: Vec<[f64; 4]>,
    rotations: Vec<i64>,
    /// Drawing operators per page, flushed into the page contents on save
    overlays: BTreeMap<usize, String>,
    /// ExtGState objects keyed by opacity in percent
    graphics_states: HashMap<u32, ObjectId>,
    images_embedded: usize,
}

impl LopdfCanvas {
    /// Parse PDF bytes
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes).map_err(|e| StampError::PdfLoad(e.to_string()))?;
        Self::from_document(doc)
    }

    pub fn from_document(doc: Document) -> Result<Self> {
        let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();

        let mut media_boxes = Vec::with_capacity(page_ids.len());
        let mut rotations = Vec::with_capacity(page_ids.len());
        for &page_id in &page_ids {
            media_boxes.push(read_media_box(&doc, page_id));
            rotations.push(
                inherited_attribute(&doc, page_id, b"Rotate")
                    .and_then(|obj| resolve(&doc, &obj).as_i64().ok())
                    .unwrap_or(0),
            );
        }

        Ok(Self {
            doc,
            page_ids,
            media_boxes,
            rotations,
            overlays: BTreeMap::new(),
            graphics_states: HashMap::new(),
            images_embedded: 0,
        })
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Flush pending overlays and hand back the document
    pub fn into_document(mut self) -> Result<Document> {
        self.flush_overlays()?;
        Ok(self.doc)
    }

    fn page_index(&self, page_number: u32) -> Result<usize> {
        let index = (page_number as usize)
            .checked_sub(1)
            .filter(|&i| i < self.page_ids.len())
            .ok_or_else(|| {
                StampError::Config(format!(
                    "Page {} is outside the document ({} pages)",
                    page_number,
                    self.page_ids.len()
                ))
            })?;
        Ok(index)
    }

    fn graphics_state(&mut self, opacity: f32) -> ObjectId {
        let key = (opacity.clamp(0.0, 1.0) * 100.0).round() as u32;
        *self.graphics_states.entry(key).or_insert_with(|| {
            let alpha = key as f32 / 100.0;
            self.doc.add_object(dictionary! {
                "Type" => "ExtGState",
                "CA" => Object::Real(alpha),
                "ca" => Object::Real(alpha),
            })
        })
    }

    /// Wrap each touched page's existing content in `q ... Q` and append its overlay.
    fn flush_overlays(&mut self) -> Result<()> {
        let overlays = std::mem::take(&mut self.overlays);
        for (index, ops) in overlays {
            let page_id = self.page_ids[index];

            let existing = match self.doc.get_dictionary(page_id)?.get(b"Contents") {
                // An indirect array is spliced in; nested arrays are not valid contents
                Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                    Ok(Object::Array(items)) => items.clone(),
                    _ => vec![Object::Reference(*id)],
                },
                Ok(Object::Array(items)) => items.clone(),
                _ => Vec::new(),
            };

            let open_id = self
                .doc
                .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            let overlay_id = self
                .doc
                .add_object(Stream::new(Dictionary::new(), format!("Q\n{ops}").into_bytes()));

            let mut contents = Vec::with_capacity(existing.len() + 2);
            contents.push(Object::Reference(open_id));
            contents.extend(existing);
            contents.push(Object::Reference(overlay_id));

            self.doc
                .get_object_mut(page_id)?
                .as_dict_mut()?
                .set("Contents", Object::Array(contents));
        }
        Ok(())
    }

    /// Make sure the page owns a `/Resources` entry (copying inherited ones)
    fn ensure_page_resources(&mut self, page_id: ObjectId) -> Result<ResourcesLocation> {
        match self.doc.get_dictionary(page_id)?.get(b"Resources") {
            Ok(Object::Reference(id)) => return Ok(ResourcesLocation::Indirect(*id)),
            Ok(Object::Dictionary(_)) => return Ok(ResourcesLocation::Inline),
            _ => {}
        }

        let inherited = inherited_attribute(&self.doc, page_id, b"Resources")
            .and_then(|obj| resolve(&self.doc, &obj).as_dict().ok().cloned())
            .unwrap_or_else(Dictionary::new);
        self.doc
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Resources", Object::Dictionary(inherited));
        Ok(ResourcesLocation::Inline)
    }

    fn resources_mut(
        &mut self,
        page_id: ObjectId,
        location: ResourcesLocation,
    ) -> Result<&mut Dictionary> {
        let dict = match location {
            ResourcesLocation::Indirect(id) => self.doc.get_object_mut(id)?.as_dict_mut()?,
            ResourcesLocation::Inline => self
                .doc
                .get_object_mut(page_id)?
                .as_dict_mut()?
                .get_mut(b"Resources")?
                .as_dict_mut()?,
        };
        Ok(dict)
    }

    /// Add `name -> id` to the page's `/Resources/<category>` dictionary
    fn register_resource(
        &mut self,
        page_id: ObjectId,
        category: &[u8],
        name: &str,
        id: ObjectId,
    ) -> Result<()> {
        let location = self.ensure_page_resources(page_id)?;

        let existing = {
            let resources = self.resources_mut(page_id, location)?;
            match resources.get(category) {
                Ok(Object::Reference(r)) => Some(Some(*r)),
                Ok(Object::Dictionary(_)) => Some(None),
                _ => None,
            }
        };

        let category_dict = match existing {
            Some(Some(indirect)) => self.doc.get_object_mut(indirect)?.as_dict_mut()?,
            Some(None) => self
                .resources_mut(page_id, location)?
                .get_mut(category)?
                .as_dict_mut()?,
            None => {
                let resources = self.resources_mut(page_id, location)?;
                resources.set(category.to_vec(), Dictionary::new());
                resources.get_mut(category)?.as_dict_mut()?
            }
        };
        category_dict.set(name.as_bytes().to_vec(), Object::Reference(id));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum ResourcesLocation {
    Indirect(ObjectId),
    Inline,
}

impl PdfCanvas for LopdfCanvas {
    type Image = EmbeddedImage;

    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_geometry(&self, page_number: u32) -> Result<PageGeometry> {
        let index = self.page_index(page_number)?;
        let [llx, lly, urx, ury] = self.media_boxes[index];
        Ok(PageGeometry::from_points(
            (urx - llx).abs(),
            (ury - lly).abs(),
            self.rotations[index],
        ))
    }

    /// Embed as an RGB image with the alpha channel in an `/SMask`
    fn embed_raster(&mut self, image: &RgbaImage) -> Result<EmbeddedImage> {
        let (width, height) = image.dimensions();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in image.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let mut smask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        );
        smask.compress()?;
        let smask_id = self.doc.add_object(smask);

        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "SMask" => smask_id,
            },
            rgb,
        );
        stream.compress()?;
        let id = self.doc.add_object(stream);

        self.images_embedded += 1;
        Ok(EmbeddedImage {
            id,
            index: self.images_embedded,
        })
    }

    fn draw_image(&mut self, page_number: u32, image: EmbeddedImage, rect: DrawRect) -> Result<()> {
        let index = self.page_index(page_number)?;
        let page_id = self.page_ids[index];
        let [llx, lly, _, _] = self.media_boxes[index];

        let image_name = format!("StampIm{}", image.index);
        let gs_id = self.graphics_state(rect.opacity);
        let gs_name = format!("StampGs{}", gs_id.0);

        self.register_resource(page_id, b"XObject", &image_name, image.id)?;
        self.register_resource(page_id, b"ExtGState", &gs_name, gs_id)?;

        let [a, b, c, d, e, f] = rect.image_matrix();
        let ops = format!(
            "q /{} gs {} {} {} {} {:.4} {:.4} cm /{} Do Q\n",
            gs_name,
            operand(a),
            operand(b),
            operand(c),
            operand(d),
            llx + e,
            lly + f,
            image_name
        );
        self.overlays.entry(index).or_default().push_str(&ops);
        Ok(())
    }

    fn save(&mut self) -> Result<Vec<u8>> {
        self.flush_overlays()?;
        let mut writer = Vec::new();
        self.doc.save_to(&mut writer)?;
        Ok(writer)
    }
}

// =============================================================================
// Page Tree Helpers
// =============================================================================

/// Look up a page attribute, walking `/Parent` for inheritable keys
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Follow a single indirect reference
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn read_media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let Some(obj) = inherited_attribute(doc, page_id, b"MediaBox") else {
        return DEFAULT_MEDIA_BOX;
    };
    let Ok(values) = resolve(doc, &obj).as_array() else {
        return DEFAULT_MEDIA_BOX;
    };
    if values.len() != 4 {
        return DEFAULT_MEDIA_BOX;
    }

    let mut media_box = DEFAULT_MEDIA_BOX;
    for (slot, value) in media_box.iter_mut().zip(values) {
        match extract_number(resolve(doc, value)) {
            Some(n) => *slot = n,
            None => return DEFAULT_MEDIA_BOX,
        }
    }
    media_box
}

/// Format a matrix operand, writing exact zeros as `0`
fn operand(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{:.4}", value)
    }
}

/// Extract numeric value from a PDF object
fn extract_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}
