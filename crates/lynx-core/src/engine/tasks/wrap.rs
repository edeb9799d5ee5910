use crate::core::models::document::Document;
use crate::core::models::section::{Attributes, IMAGE_SECTION, POSITION_SECTION, Section, SectionData};
use crate::core::models::simulation_box::{Axis, SimulationBox};
use crate::engine::error::EngineError;
use crate::engine::utils::query;
use nalgebra::{Point3, Vector3};
use tracing::{debug, info, instrument};

const NUM_ATTRIBUTE: &str = "num";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WrapSummary {
    pub wrapped_particles: usize,
}

/// Largest image count a single wrap may record, keeping `k * L` and the `i64` cast exact.
const MAX_IMAGE_SHIFT: f64 = 9_007_199_254_740_992.0; // 2^53

/// Resets every image flag to `(0, 0, 0)`.
///
/// The image section is created directly after `position` if the document lacks one, and its
/// `num` attribute is synchronised with the position section's.
#[instrument(skip_all, name = "zero_images_task")]
pub fn zero_images(document: &mut Document, particle_count: usize) -> Result<(), EngineError> {
    let position_num = document
        .section(POSITION_SECTION)
        .ok_or(EngineError::MissingSection(POSITION_SECTION))?
        .attributes
        .get(NUM_ATTRIBUTE)
        .cloned();

    let mut attributes = match document.section(IMAGE_SECTION) {
        Some(section) => section.attributes.clone(),
        None => {
            debug!("Document has no <image> section; creating one after <position>.");
            Attributes::new()
        }
    };
    if let Some(num) = position_num {
        attributes.insert(NUM_ATTRIBUTE.to_string(), num);
    }

    let zeros = SectionData::Images(vec![Vector3::zeros(); particle_count]);
    document.upsert_section_after(
        POSITION_SECTION,
        Section::new(IMAGE_SECTION, attributes, zeros),
    );
    Ok(())
}

/// Number of whole box lengths to subtract so that `value` lands in `[-L/2, L/2]`.
fn image_shift(value: f64, length: f64) -> f64 {
    let half = length / 2.0;
    if value > half {
        ((value - half) / length).ceil().max(1.0)
    } else if value < -half {
        ((value + half) / length).floor().min(-1.0)
    } else {
        0.0
    }
}

/// Brings one particle into the primary cell, updating its image flags.
///
/// Each axis is handled independently. A coordinate above `+L/2` moves down by the smallest
/// whole number of box lengths that brings it into range, incrementing the image by the same
/// count; a coordinate below `-L/2` moves up likewise. Coordinates exactly on `±L/2` are left
/// alone. The shift is computed in one step, so the cost does not depend on how far away the
/// particle starts.
///
/// # Return
///
/// Returns `true` if the particle was moved along any axis.
///
/// # Errors
///
/// Returns [`EngineError::UnwrappableCoordinate`] if a coordinate is so far outside the cell
/// that its image count cannot be represented exactly, or if rounding keeps it out of range.
pub fn wrap_particle(
    particle: usize,
    position: &mut Point3<f64>,
    image: &mut Vector3<i64>,
    simulation_box: &SimulationBox,
) -> Result<bool, EngineError> {
    let mut moved = false;
    for axis in Axis::ALL {
        let i = axis.index();
        let value = position[i];
        let unwrappable = || EngineError::UnwrappableCoordinate {
            particle,
            axis,
            value,
        };
        if !value.is_finite() {
            return Err(unwrappable());
        }

        let length = simulation_box.length(axis);
        let half = length / 2.0;
        let mut shift = image_shift(value, length);
        if shift == 0.0 {
            continue;
        }
        if shift.abs() > MAX_IMAGE_SHIFT {
            return Err(unwrappable());
        }

        let mut wrapped = value - shift * length;
        // Rounding in the division can leave the result one box length short.
        if wrapped > half {
            wrapped -= length;
            shift += 1.0;
        } else if wrapped < -half {
            wrapped += length;
            shift -= 1.0;
        }
        if !(-half..=half).contains(&wrapped) {
            return Err(unwrappable());
        }

        image[i] = image[i]
            .checked_add(shift as i64)
            .ok_or_else(unwrappable)?;
        position[i] = wrapped;
        moved = true;
    }
    Ok(moved)
}

/// Wraps every particle of the document into the primary cell.
///
/// Afterwards `wrapped + image * L` equals the position each particle had before the call.
#[instrument(skip_all, name = "wrap_task")]
pub fn wrap(document: &mut Document) -> Result<WrapSummary, EngineError> {
    let simulation_box = query::require_box(document)?;
    if document.positions().is_none() {
        return Err(EngineError::MissingSection(POSITION_SECTION));
    }
    let (positions, images) = document
        .particles_mut()
        .ok_or(EngineError::MissingSection(IMAGE_SECTION))?;
    if positions.len() != images.len() {
        return Err(EngineError::InconsistentParticleCount {
            section: IMAGE_SECTION,
            positions: positions.len(),
            found: images.len(),
        });
    }

    let mut wrapped_particles = 0;
    for (particle, (position, image)) in positions.iter_mut().zip(images.iter_mut()).enumerate() {
        if wrap_particle(particle, position, image, &simulation_box)? {
            wrapped_particles += 1;
        }
    }

    info!(
        wrapped = wrapped_particles,
        total = positions.len(),
        "Wrapped particles into the primary cell."
    );
    Ok(WrapSummary { wrapped_particles })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::hoomd::HoomdXmlFile;

    fn cube(l: f64) -> SimulationBox {
        SimulationBox::new(l, l, l).unwrap()
    }

    fn document(positions: &str) -> Document {
        let content = format!(
            r#"<hoomd_xml><configuration><box lx="10" ly="10" lz="10"/><position num="3">{}</position><type>A
B
C</type></configuration></hoomd_xml>"#,
            positions
        );
        HoomdXmlFile::read_from_str(&content).unwrap()
    }

    mod particle {
        use super::*;

        #[test]
        fn wraps_positive_and_negative_overflow() {
            let b = cube(10.0);
            let mut p = Point3::new(12.0, -17.0, 3.0);
            let mut img = Vector3::zeros();
            assert!(wrap_particle(0, &mut p, &mut img, &b).unwrap());
            assert!((p.x - 2.0).abs() < 1e-12);
            assert!((p.y - 3.0).abs() < 1e-12);
            assert_eq!(p.z, 3.0);
            assert_eq!(img, Vector3::new(1, -2, 0));
        }

        #[test]
        fn boundary_values_are_left_in_place() {
            let b = cube(10.0);
            let mut p = Point3::new(5.0, -5.0, 0.0);
            let mut img = Vector3::zeros();
            assert!(!wrap_particle(0, &mut p, &mut img, &b).unwrap());
            assert_eq!(p, Point3::new(5.0, -5.0, 0.0));
            assert_eq!(img, Vector3::zeros());
        }

        #[test]
        fn existing_image_flags_accumulate() {
            let b = SimulationBox::new(4.0, 6.0, 8.0).unwrap();
            let mut p = Point3::new(2.5, 0.0, -4.5);
            let mut img = Vector3::new(3, 0, -1);
            wrap_particle(0, &mut p, &mut img, &b).unwrap();
            assert_eq!(img, Vector3::new(4, 0, -2));
        }

        #[test]
        fn distant_coordinate_wraps_in_a_single_step() {
            let b = cube(10.0);
            let mut p = Point3::new(1e18, -1e18, 0.0);
            let mut img = Vector3::zeros();
            assert!(wrap_particle(0, &mut p, &mut img, &b).unwrap());
            assert_eq!(p, Point3::new(0.0, 0.0, 0.0));
            assert_eq!(img, Vector3::new(100_000_000_000_000_000, -100_000_000_000_000_000, 0));
        }

        #[test]
        fn unrepresentable_image_count_is_rejected() {
            let b = cube(10.0);
            let mut p = Point3::new(0.0, 1e300, 0.0);
            let mut img = Vector3::zeros();
            let err = wrap_particle(7, &mut p, &mut img, &b).unwrap_err();
            assert!(matches!(
                err,
                EngineError::UnwrappableCoordinate {
                    particle: 7,
                    axis: Axis::Y,
                    ..
                }
            ));
            assert_eq!(img, Vector3::zeros());
        }

        #[test]
        fn image_overflow_is_rejected() {
            let b = cube(10.0);
            let mut p = Point3::new(15.0, 0.0, 0.0);
            let mut img = Vector3::new(i64::MAX, 0, 0);
            assert!(matches!(
                wrap_particle(0, &mut p, &mut img, &b),
                Err(EngineError::UnwrappableCoordinate { axis: Axis::X, .. })
            ));
        }
    }

    mod document_level {
        use super::*;

        #[test]
        fn zero_images_creates_section_after_positions() {
            let mut doc = document("0 0 0\n1 1 1\n2 2 2");
            zero_images(&mut doc, 3).unwrap();
            assert_eq!(doc.section_names(), &["box", "position", "image", "type"]);
            assert_eq!(doc.images().unwrap(), &[Vector3::<i64>::zeros(); 3]);
            assert_eq!(
                doc.section(IMAGE_SECTION).unwrap().attributes.get("num").unwrap(),
                "3"
            );
        }

        #[test]
        fn zero_images_overwrites_existing_flags() {
            let mut doc = document("0 0 0\n1 1 1\n2 2 2");
            doc.push_section(Section::new(
                IMAGE_SECTION,
                Attributes::new(),
                SectionData::Images(vec![Vector3::new(1, 2, 3); 3]),
            ))
            .unwrap();
            zero_images(&mut doc, 3).unwrap();
            assert_eq!(doc.images().unwrap(), &[Vector3::<i64>::zeros(); 3]);
            assert_eq!(doc.section_names().last().unwrap(), IMAGE_SECTION);
        }

        #[test]
        fn wrap_requires_image_section() {
            let mut doc = document("0 0 0\n1 1 1\n2 2 2");
            assert!(matches!(
                wrap(&mut doc),
                Err(EngineError::MissingSection(IMAGE_SECTION))
            ));
        }

        #[test]
        fn wrap_bounds_every_coordinate_and_reconstructs_true_positions() {
            let mut doc = document("7.5 -12.25 0\n-5.01 4.99 31.0\n0.1 -0.1 -25.0");
            let original: Vec<_> = doc.positions().unwrap().to_vec();
            zero_images(&mut doc, 3).unwrap();
            let summary = wrap(&mut doc).unwrap();
            assert_eq!(summary.wrapped_particles, 3);

            let b = doc.simulation_box().copied().unwrap();
            let half = b.half_lengths();
            for (i, (p, img)) in doc
                .positions()
                .unwrap()
                .iter()
                .zip(doc.images().unwrap())
                .enumerate()
            {
                for axis in 0..3 {
                    assert!(p[axis] >= -half[axis] && p[axis] <= half[axis]);
                    let reconstructed = p[axis] + img[axis] as f64 * b.lengths()[axis];
                    assert!((reconstructed - original[i][axis]).abs() < 1e-9);
                }
            }
        }

        #[test]
        fn wrap_handles_far_away_particles_from_parsed_input() {
            let mut doc = document("1e18 0 0\n0 0 0\n0 0 0");
            zero_images(&mut doc, 3).unwrap();
            let summary = wrap(&mut doc).unwrap();
            assert_eq!(summary.wrapped_particles, 1);
            assert_eq!(doc.positions().unwrap()[0], Point3::new(0.0, 0.0, 0.0));
            assert_eq!(doc.images().unwrap()[0].x, 100_000_000_000_000_000);
        }

        #[test]
        fn wrap_is_idempotent() {
            let mut doc = document("7.5 -12.25 0\n-5.01 4.99 31.0\n0.1 -0.1 -25.0");
            zero_images(&mut doc, 3).unwrap();
            wrap(&mut doc).unwrap();
            let positions = doc.positions().unwrap().to_vec();
            let images = doc.images().unwrap().to_vec();

            let summary = wrap(&mut doc).unwrap();
            assert_eq!(summary.wrapped_particles, 0);
            assert_eq!(doc.positions().unwrap(), positions.as_slice());
            assert_eq!(doc.images().unwrap(), images.as_slice());
        }
    }
}
