use super::section::{
    BOND_SECTION, BOX_SECTION, Element, IMAGE_SECTION, POSITION_SECTION, Section, SectionData,
};
use super::simulation_box::SimulationBox;
use super::topology::Bond;
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Section <{0}> appears more than once")]
pub struct DuplicateSection(pub String);

/// In-memory form of a hierarchical particle-system record.
///
/// A document has one root element, one configuration element below it, and a sequence of
/// uniquely named sections below the configuration. Sections are stored by name; the order in
/// which they were added is tracked separately so that serialization reproduces it.
///
/// Particle data lives in parallel sections: row `i` of `position`, `image` and `type` all
/// describe particle `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub root: Element,
    pub configuration: Element,
    sections: HashMap<String, Section>,
    order: Vec<String>,
}

impl Document {
    pub fn new(root: Element, configuration: Element) -> Self {
        Self {
            root,
            configuration,
            ..Default::default()
        }
    }

    /// Appends a section after all existing ones.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateSection`] if a section with the same name is already present.
    pub fn push_section(&mut self, section: Section) -> Result<(), DuplicateSection> {
        let position = self.order.len();
        self.insert_section_at(position, section)
    }

    /// Stores `section`, replacing a same-named section in place, or otherwise inserting it
    /// directly after `anchor` (appending when `anchor` is absent).
    ///
    /// # Return
    ///
    /// Returns the section that was replaced, if any.
    pub fn upsert_section_after(&mut self, anchor: &str, section: Section) -> Option<Section> {
        if let Some(existing) = self.sections.get_mut(section.name()) {
            return Some(std::mem::replace(existing, section));
        }
        let position = self
            .order
            .iter()
            .position(|name| name == anchor)
            .map_or(self.order.len(), |i| i + 1);
        let name = section.name().to_string();
        self.order.insert(position, name.clone());
        self.sections.insert(name, section);
        None
    }

    fn insert_section_at(&mut self, position: usize, section: Section) -> Result<(), DuplicateSection> {
        if self.sections.contains_key(section.name()) {
            return Err(DuplicateSection(section.name().to_string()));
        }
        let name = section.name().to_string();
        self.order.insert(position, name.clone());
        self.sections.insert(name, section);
        Ok(())
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.get_mut(name)
    }

    /// Section names in document order.
    pub fn section_names(&self) -> &[String] {
        &self.order
    }

    /// Iterates over the sections in document order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.order.iter().filter_map(|name| self.sections.get(name))
    }

    pub fn row_count(&self, name: &str) -> Option<usize> {
        self.section(name).map(Section::row_count)
    }

    pub fn simulation_box(&self) -> Option<&SimulationBox> {
        match &self.section(BOX_SECTION)?.data {
            SectionData::Box(b) => Some(b),
            _ => None,
        }
    }

    pub fn positions(&self) -> Option<&[Point3<f64>]> {
        match &self.section(POSITION_SECTION)?.data {
            SectionData::Positions(p) => Some(p),
            _ => None,
        }
    }

    pub fn positions_mut(&mut self) -> Option<&mut Vec<Point3<f64>>> {
        match &mut self.section_mut(POSITION_SECTION)?.data {
            SectionData::Positions(p) => Some(p),
            _ => None,
        }
    }

    pub fn images(&self) -> Option<&[Vector3<i64>]> {
        match &self.section(IMAGE_SECTION)?.data {
            SectionData::Images(i) => Some(i),
            _ => None,
        }
    }

    /// Mutable access to positions and images at once.
    pub fn particles_mut(&mut self) -> Option<(&mut Vec<Point3<f64>>, &mut Vec<Vector3<i64>>)> {
        let mut positions = None;
        let mut images = None;
        for (name, section) in self.sections.iter_mut() {
            match (name.as_str(), &mut section.data) {
                (POSITION_SECTION, SectionData::Positions(p)) => positions = Some(p),
                (IMAGE_SECTION, SectionData::Images(i)) => images = Some(i),
                _ => {}
            }
        }
        Some((positions?, images?))
    }

    pub fn bonds(&self) -> Option<&[Bond]> {
        match &self.section(BOND_SECTION)?.data {
            SectionData::Bonds(b) => Some(b),
            _ => None,
        }
    }
}
