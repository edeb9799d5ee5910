use super::simulation_box::SimulationBox;
use super::topology::Bond;
use nalgebra::{Point3, Vector3};
use std::collections::BTreeMap;

pub const BOX_SECTION: &str = "box";
pub const POSITION_SECTION: &str = "position";
pub const IMAGE_SECTION: &str = "image";
pub const TYPE_SECTION: &str = "type";
pub const BOND_SECTION: &str = "bond";

/// Attribute map of an element. Section keys are stored lower-cased.
pub type Attributes = BTreeMap<String, String>;

/// An element that wraps the sections: the document root or the configuration element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: Attributes,
    pub text: Option<String>, // Trimmed non-whitespace text directly under the element
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }
}

/// Typed payload of a section.
///
/// Sections with a known name carry a parsed body; all others keep their rows as opaque tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionData {
    Box(SimulationBox),
    Positions(Vec<Point3<f64>>),
    Images(Vec<Vector3<i64>>),
    Bonds(Vec<Bond>),
    Rows(Vec<Vec<String>>),
}

impl SectionData {
    pub fn row_count(&self) -> usize {
        match self {
            SectionData::Box(_) => 0,
            SectionData::Positions(rows) => rows.len(),
            SectionData::Images(rows) => rows.len(),
            SectionData::Bonds(rows) => rows.len(),
            SectionData::Rows(rows) => rows.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    name: String,
    pub attributes: Attributes,
    pub data: SectionData,
}

impl Section {
    pub fn new(name: impl Into<String>, attributes: Attributes, data: SectionData) -> Self {
        Self {
            name: name.into(),
            attributes,
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> usize {
        self.data.row_count()
    }
}
