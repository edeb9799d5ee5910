use crate::core::io::traits::RecordFile;
use crate::core::models::document::{Document, DuplicateSection};
use crate::core::models::section::{
    Attributes, BOND_SECTION, BOX_SECTION, Element, IMAGE_SECTION, POSITION_SECTION, Section,
    SectionData,
};
use crate::core::models::simulation_box::{Axis, SimulationBox};
use crate::core::models::topology::Bond;
use nalgebra::{Point3, Vector3};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use thiserror::Error;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

#[derive(Debug, Error)]
pub enum HoomdError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("XML syntax error near byte {position}: {message}")]
    Xml { position: u64, message: String },
    #[error("Malformed document: {0}")]
    Structure(String),
    #[error("Malformed document: section <{0}> appears more than once")]
    DuplicateSection(String),
    #[error("Parse error in <{section}> row {row}: {kind}")]
    Parse {
        section: String,
        row: usize,
        kind: HoomdParseErrorKind,
    },
    #[error("Invalid box: {0}")]
    InvalidBox(String),
}

#[derive(Debug, Error)]
pub enum HoomdParseErrorKind {
    #[error("Invalid integer in column {column} (value: '{value}')")]
    InvalidInt { column: usize, value: String },
    #[error("Invalid float in column {column} (value: '{value}')")]
    InvalidFloat { column: usize, value: String },
    #[error("Non-finite float in column {column} (value: '{value}')")]
    NonFiniteFloat { column: usize, value: String },
    #[error("Expected {expected} columns, found {found}")]
    WrongWidth { expected: usize, found: usize },
}

impl From<DuplicateSection> for HoomdError {
    fn from(err: DuplicateSection) -> Self {
        HoomdError::DuplicateSection(err.0)
    }
}

type Row = Vec<String>;

struct PendingSection {
    name: String,
    attributes: Attributes,
    text: String,
}

fn utf8(bytes: &[u8]) -> Result<String, HoomdError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| HoomdError::Structure(format!("Tag or attribute is not valid UTF-8: {}", e)))
}

fn read_element(start: &BytesStart, lowercase_keys: bool) -> Result<Element, HoomdError> {
    let tag = utf8(start.name().as_ref())?;
    let mut attributes = Attributes::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| {
            HoomdError::Structure(format!("Invalid attribute on <{}>: {}", tag, e))
        })?;
        let mut key = utf8(attr.key.as_ref())?;
        if lowercase_keys {
            key = key.to_lowercase();
        }
        let value = attr
            .unescape_value()
            .map_err(|e| {
                HoomdError::Structure(format!("Invalid value for '{}' on <{}>: {}", key, tag, e))
            })?
            .into_owned();
        if attributes.insert(key.clone(), value).is_some() {
            return Err(HoomdError::Structure(format!(
                "Attribute '{}' appears more than once on <{}>",
                key, tag
            )));
        }
    }
    Ok(Element {
        tag,
        attributes,
        text: None,
    })
}

fn append_text(target: &mut Option<String>, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    match target {
        Some(existing) => {
            existing.push('\n');
            existing.push_str(text);
        }
        None => *target = Some(text.to_string()),
    }
}

/// Splits section text into rows: one row per non-blank line, tokens split on whitespace.
fn split_rows(text: &str) -> Vec<Row> {
    text.lines()
        .map(|line| line.split_whitespace().map(str::to_string).collect::<Row>())
        .filter(|row| !row.is_empty())
        .collect()
}

fn parse_token<T: FromStr>(
    section: &str,
    row: usize,
    column: usize,
    value: &str,
    kind: fn(usize, String) -> HoomdParseErrorKind,
) -> Result<T, HoomdError> {
    value.parse::<T>().map_err(|_| HoomdError::Parse {
        section: section.to_string(),
        row,
        kind: kind(column, value.to_string()),
    })
}

fn invalid_int(column: usize, value: String) -> HoomdParseErrorKind {
    HoomdParseErrorKind::InvalidInt { column, value }
}

fn invalid_float(column: usize, value: String) -> HoomdParseErrorKind {
    HoomdParseErrorKind::InvalidFloat { column, value }
}

fn check_width(section: &str, row: usize, tokens: &Row, expected: usize) -> Result<(), HoomdError> {
    if tokens.len() != expected {
        return Err(HoomdError::Parse {
            section: section.to_string(),
            row,
            kind: HoomdParseErrorKind::WrongWidth {
                expected,
                found: tokens.len(),
            },
        });
    }
    Ok(())
}

fn parse_positions(section: &str, rows: &[Row]) -> Result<Vec<Point3<f64>>, HoomdError> {
    rows.iter()
        .enumerate()
        .map(|(i, tokens)| {
            let row = i + 1;
            check_width(section, row, tokens, 3)?;
            let mut coords = [0.0; 3];
            for (c, token) in tokens.iter().enumerate() {
                let value: f64 = parse_token(section, row, c + 1, token, invalid_float)?;
                if !value.is_finite() {
                    return Err(HoomdError::Parse {
                        section: section.to_string(),
                        row,
                        kind: HoomdParseErrorKind::NonFiniteFloat {
                            column: c + 1,
                            value: token.clone(),
                        },
                    });
                }
                coords[c] = value;
            }
            Ok(Point3::from(coords))
        })
        .collect()
}

fn parse_images(section: &str, rows: &[Row]) -> Result<Vec<Vector3<i64>>, HoomdError> {
    rows.iter()
        .enumerate()
        .map(|(i, tokens)| {
            let row = i + 1;
            check_width(section, row, tokens, 3)?;
            let mut flags = [0i64; 3];
            for (c, token) in tokens.iter().enumerate() {
                flags[c] = parse_token(section, row, c + 1, token, invalid_int)?;
            }
            Ok(Vector3::from(flags))
        })
        .collect()
}

fn parse_bonds(section: &str, rows: &[Row]) -> Result<Vec<Bond>, HoomdError> {
    rows.iter()
        .enumerate()
        .map(|(i, tokens)| {
            let row = i + 1;
            check_width(section, row, tokens, 3)?;
            let a = parse_token(section, row, 2, &tokens[1], invalid_int)?;
            let b = parse_token(section, row, 3, &tokens[2], invalid_int)?;
            Ok(Bond::new(tokens[0].clone(), a, b))
        })
        .collect()
}

fn parse_box(attributes: &Attributes, rows: &[Row]) -> Result<SimulationBox, HoomdError> {
    if !rows.is_empty() {
        return Err(HoomdError::InvalidBox(format!(
            "<{}> must not carry rows, found {}",
            BOX_SECTION,
            rows.len()
        )));
    }
    let mut lengths = [0.0; 3];
    for axis in Axis::ALL {
        let key = axis.length_key();
        let raw = attributes
            .get(key)
            .ok_or_else(|| HoomdError::InvalidBox(format!("missing attribute '{}'", key)))?;
        lengths[axis.index()] = raw.trim().parse().map_err(|_| {
            HoomdError::InvalidBox(format!("attribute '{}' is not a number: '{}'", key, raw))
        })?;
    }
    SimulationBox::new(lengths[0], lengths[1], lengths[2]).ok_or_else(|| {
        HoomdError::InvalidBox(format!(
            "edge lengths must be positive and finite, got ({}, {}, {})",
            lengths[0], lengths[1], lengths[2]
        ))
    })
}

fn build_section(pending: PendingSection) -> Result<Section, HoomdError> {
    let PendingSection {
        name,
        attributes,
        text,
    } = pending;
    let rows = split_rows(&text);
    let data = match name.as_str() {
        BOX_SECTION => SectionData::Box(parse_box(&attributes, &rows)?),
        POSITION_SECTION => SectionData::Positions(parse_positions(&name, &rows)?),
        IMAGE_SECTION => SectionData::Images(parse_images(&name, &rows)?),
        BOND_SECTION => SectionData::Bonds(parse_bonds(&name, &rows)?),
        _ => SectionData::Rows(rows),
    };
    Ok(Section::new(name, attributes, data))
}

fn write_start_tag(
    writer: &mut impl Write,
    tag: &str,
    attributes: &Attributes,
    self_closing: bool,
) -> io::Result<()> {
    write!(writer, "<{}", tag)?;
    for (key, value) in attributes {
        write!(writer, " {}=\"{}\"", key, escape(value.as_str()))?;
    }
    if self_closing {
        writeln!(writer, "/>")
    } else {
        writeln!(writer, ">")
    }
}

fn write_rows(writer: &mut impl Write, data: &SectionData) -> io::Result<()> {
    match data {
        SectionData::Box(_) => {}
        SectionData::Positions(positions) => {
            for p in positions {
                writeln!(writer, "{}\t{}\t{}", p.x, p.y, p.z)?;
            }
        }
        SectionData::Images(images) => {
            for i in images {
                writeln!(writer, "{}\t{}\t{}", i.x, i.y, i.z)?;
            }
        }
        SectionData::Bonds(bonds) => {
            for bond in bonds {
                writeln!(writer, "{}\t{}\t{}", escape(bond.label.as_str()), bond.a, bond.b)?;
            }
        }
        SectionData::Rows(rows) => {
            for row in rows {
                let line: Vec<_> = row.iter().map(|t| escape(t.as_str())).collect();
                writeln!(writer, "{}", line.join("\t"))?;
            }
        }
    }
    Ok(())
}

/// Reader and writer for the HOOMD-blue XML particle record.
///
/// The root and configuration tags are treated as opaque and written back verbatim.
/// Sections named `box`, `position`, `image` and `bond` are parsed into typed bodies;
/// every other section keeps its whitespace-delimited tokens untouched.
pub struct HoomdXmlFile;

impl HoomdXmlFile {
    /// Parses a document from its textual form.
    ///
    /// # Errors
    ///
    /// Returns [`HoomdError`] for XML syntax errors, a missing or repeated configuration element,
    /// repeated section tags, nested elements inside a section, or unparsable typed rows.
    pub fn read_from_str(content: &str) -> Result<Document, HoomdError> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut root: Option<Element> = None;
        let mut configuration: Option<Element> = None;
        let mut sections: Vec<Section> = Vec::new();
        let mut pending: Option<PendingSection> = None;
        let mut depth = 0usize;
        let mut root_closed = false;

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    return Err(HoomdError::Xml {
                        position: reader.buffer_position() as u64,
                        message: e.to_string(),
                    });
                }
            };

            match event {
                Event::Start(ref start) | Event::Empty(ref start) => {
                    let self_closing = matches!(event, Event::Empty(_));
                    if root_closed {
                        return Err(HoomdError::Structure(
                            "Found content after the root element".into(),
                        ));
                    }
                    match depth {
                        0 => {
                            root = Some(read_element(start, false)?);
                            if self_closing {
                                root_closed = true;
                            }
                        }
                        1 => {
                            if let Some(existing) = &configuration {
                                return Err(HoomdError::Structure(format!(
                                    "Root element has more than one configuration child (<{}> after <{}>)",
                                    utf8(start.name().as_ref())?,
                                    existing.tag
                                )));
                            }
                            configuration = Some(read_element(start, false)?);
                        }
                        2 => {
                            let header = read_element(start, true)?;
                            if sections.iter().any(|s| s.name() == header.tag) {
                                return Err(HoomdError::DuplicateSection(header.tag));
                            }
                            let section = PendingSection {
                                name: header.tag,
                                attributes: header.attributes,
                                text: String::new(),
                            };
                            if self_closing {
                                sections.push(build_section(section)?);
                            } else {
                                pending = Some(section);
                            }
                        }
                        _ => {
                            let section = pending.as_ref().map_or("", |p| p.name.as_str());
                            return Err(HoomdError::Structure(format!(
                                "Element <{}> is nested inside section <{}>",
                                utf8(start.name().as_ref())?,
                                section
                            )));
                        }
                    }
                    if !self_closing {
                        depth += 1;
                    }
                }
                Event::End(_) => {
                    match depth {
                        0 => {
                            return Err(HoomdError::Structure("Unbalanced closing tag".into()));
                        }
                        1 => root_closed = true,
                        3 => {
                            if let Some(section) = pending.take() {
                                sections.push(build_section(section)?);
                            }
                        }
                        _ => {}
                    }
                    depth -= 1;
                }
                Event::Text(ref text) => {
                    let text = text.unescape().map_err(|e| HoomdError::Xml {
                        position: reader.buffer_position() as u64,
                        message: e.to_string(),
                    })?;
                    Self::route_text(
                        &text,
                        depth,
                        &mut root,
                        &mut configuration,
                        &mut pending,
                    )?;
                }
                Event::CData(cdata) => {
                    let text = utf8(&cdata.into_inner())?;
                    Self::route_text(
                        &text,
                        depth,
                        &mut root,
                        &mut configuration,
                        &mut pending,
                    )?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if depth != 0 {
            return Err(HoomdError::Structure(
                "Document ended before all elements were closed".into(),
            ));
        }
        let root = root.ok_or_else(|| HoomdError::Structure("Document has no root element".into()))?;
        let configuration = configuration.ok_or_else(|| {
            HoomdError::Structure(format!(
                "Root element <{}> has no configuration child",
                root.tag
            ))
        })?;

        let mut document = Document::new(root, configuration);
        for section in sections {
            document.push_section(section)?;
        }
        Ok(document)
    }

    fn route_text(
        text: &str,
        depth: usize,
        root: &mut Option<Element>,
        configuration: &mut Option<Element>,
        pending: &mut Option<PendingSection>,
    ) -> Result<(), HoomdError> {
        match (depth, root.as_mut(), configuration.as_mut(), pending.as_mut()) {
            (1, Some(root), _, _) => append_text(&mut root.text, text),
            (2, _, Some(config), _) => append_text(&mut config.text, text),
            (3, _, _, Some(section)) => {
                section.text.push_str(text);
                section.text.push('\n');
            }
            _ => {
                if !text.trim().is_empty() {
                    return Err(HoomdError::Structure(
                        "Found text outside the root element".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Serializes a document into a string.
    pub fn write_to_string(document: &Document) -> Result<String, HoomdError> {
        let mut buffer = Vec::new();
        Self::write_to(document, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| HoomdError::Structure(format!("Serialized output is not UTF-8: {}", e)))
    }
}

impl RecordFile for HoomdXmlFile {
    type Error = HoomdError;

    fn read_from(reader: &mut impl BufRead) -> Result<Document, Self::Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Self::read_from_str(&content)
    }

    fn write_to(document: &Document, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "{}", XML_DECLARATION)?;

        let root = &document.root;
        write_start_tag(writer, &root.tag, &root.attributes, false)?;
        if let Some(text) = &root.text {
            writeln!(writer, "{}", escape(text.as_str()))?;
        }

        let config = &document.configuration;
        write_start_tag(writer, &config.tag, &config.attributes, false)?;
        if let Some(text) = &config.text {
            writeln!(writer, "{}", escape(text.as_str()))?;
        }

        for section in document.sections() {
            if section.row_count() == 0 {
                write_start_tag(writer, section.name(), &section.attributes, true)?;
                continue;
            }
            write_start_tag(writer, section.name(), &section.attributes, false)?;
            write_rows(writer, &section.data)?;
            writeln!(writer, "</{}>", section.name())?;
        }

        writeln!(writer, "</{}>", config.tag)?;
        writeln!(writer, "</{}>", root.tag)?;
        Ok(())
    }
}
