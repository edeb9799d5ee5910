use crate::core::io::hoomd::{HoomdError, HoomdXmlFile};
use crate::core::io::traits::RecordFile;
use crate::core::models::document::Document;
use crate::core::models::topology::BondGraph;
use crate::engine::config::RepairConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tasks::{relocate, scan, wrap};
use crate::engine::utils::query;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument, warn};

pub use crate::engine::progress::RepairPhase;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub particle_count: usize,
    pub bond_count: usize,
    pub wrapped_particles: usize,
    pub violations: usize,
    pub relocated_particles: usize, // Distinct particles moved by relocation
    pub residual_violations: usize, // Bonds still spanning the boundary afterwards
}

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("Failed to read document: {0}")]
    Document(#[from] HoomdError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Failed to write output file '{path}': {source}", path = path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Repairs an in-memory document.
///
/// The document is validated before anything is mutated: the `box`, `position` and `bond`
/// sections must exist, the `image` and `type` row counts must match the position count, and
/// every bond must reference an existing particle. Image flags are then zeroed, particles are
/// wrapped, boundary-spanning bonds are collected, and the cluster around the first particle of
/// each flagged bond is relocated. A final scan counts any violations left behind; those are
/// logged and reported but are not an error.
///
/// # Errors
///
/// Returns [`EngineError`] on validation failure or when a relocation does not converge. The
/// document may be partially repaired in the latter case.
#[instrument(skip_all, name = "repair_workflow")]
pub fn run(
    document: &mut Document,
    config: &RepairConfig,
    reporter: &ProgressReporter,
) -> Result<RepairReport, EngineError> {
    let simulation_box = query::require_box(document)?;
    let particle_count = query::particle_count(document)?;
    let graph = BondGraph::new(particle_count, query::require_bonds(document)?)?;
    let budget = config.relocation.budget_for(graph.bond_count());
    info!(
        particles = particle_count,
        bonds = graph.bond_count(),
        budget,
        "Document validated; starting repair."
    );

    // === Phase 1: Reset image flags ===
    reporter.phase(RepairPhase::ImagesZeroed, || {
        wrap::zero_images(document, particle_count)
    })?;

    // === Phase 2: Wrap into the primary cell ===
    let wrap_summary = reporter.phase(RepairPhase::Wrapped, || wrap::wrap(document))?;

    // === Phase 3: Find bonds spanning the boundary ===
    let violations = reporter.phase(RepairPhase::ViolationsFound, || {
        scan::find_violations(document)
    })?;

    // === Phase 4: Relocate clusters ===
    let (relocated, residual_violations) = reporter.phase(RepairPhase::Relocated, || {
        reporter.report(Progress::RelocationStart {
            violations: violations.len() as u64,
        });
        let mut relocated = BTreeSet::new();
        for violation in &violations {
            let outcome = relocate::relocate(
                violation.a,
                document,
                &graph,
                &simulation_box,
                budget,
            )?;
            reporter.report(Progress::ClusterRelocated {
                anchor: violation.a,
                moved: outcome.moved.len(),
            });
            relocated.extend(outcome.moved);
        }

        let residual = scan::find_violations(document)?.len();
        if residual > 0 {
            warn!(
                residual,
                "Bonds still span the periodic boundary after relocation."
            );
            reporter.report(Progress::Warning(format!(
                "{} bond(s) still span the periodic boundary",
                residual
            )));
        }
        Ok::<_, EngineError>((relocated, residual))
    })?;

    let report = RepairReport {
        particle_count,
        bond_count: graph.bond_count(),
        wrapped_particles: wrap_summary.wrapped_particles,
        violations: violations.len(),
        relocated_particles: relocated.len(),
        residual_violations,
    };
    info!(
        wrapped = report.wrapped_particles,
        violations = report.violations,
        relocated = report.relocated_particles,
        "Repair complete."
    );
    Ok(report)
}

/// Reads `input`, repairs it, and writes the result to `output`.
///
/// The repaired document is serialized into memory first and written with a single call at the
/// very end, so a failure at any earlier stage leaves `output` untouched. `input` and `output`
/// may name the same file.
#[instrument(skip_all, name = "repair_file_workflow", fields(input = %input.display()))]
pub fn run_file(
    input: &Path,
    output: &Path,
    config: &RepairConfig,
    reporter: &ProgressReporter,
) -> Result<RepairReport, RepairError> {
    let mut document = reporter.phase(RepairPhase::Parsed, || {
        HoomdXmlFile::read_from_path(input)
    })?;

    let report = run(&mut document, config, reporter)?;

    let buffer = reporter.phase(RepairPhase::Serialized, || {
        let mut buffer = Vec::new();
        HoomdXmlFile::write_to(&document, &mut buffer)?;
        fs::write(output, &buffer).map_err(|source| RepairError::Output {
            path: output.to_path_buf(),
            source,
        })?;
        Ok::<_, RepairError>(buffer)
    })?;

    info!(output = %output.display(), bytes = buffer.len(), "Repaired document written.");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::RepairConfigBuilder;
    use crate::engine::error::NonConvergence;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    const SPLIT_PAIR: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<hoomd_xml version="1.6">
<configuration time_step="0" dimensions="3" natoms="2">
<box lx="10" ly="10" lz="10"/>
<position num="2">
4.9 0 0
-4.9 0 0
</position>
<image num="2">
0 0 0
0 0 0
</image>
<type num="2">
A
A
</type>
<bond num="1">
A-A 0 1
</bond>
</configuration>
</hoomd_xml>
"#;

    const WRAPPED_RING: &str = r#"<hoomd_xml><configuration>
<box lx="10" ly="10" lz="10"/>
<position num="4">
-3.75 0 0
-1.25 0 0
1.25 0 0
3.75 0 0
</position>
<image num="4">
0 0 0
0 0 0
0 0 0
0 0 0
</image>
<bond num="4">
A-A 0 1
A-A 1 2
A-A 2 3
A-A 3 0
</bond>
</configuration></hoomd_xml>"#;

    fn config() -> RepairConfig {
        RepairConfig::default()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    mod in_memory {
        use super::*;

        #[test]
        fn split_pair_is_repaired() {
            let mut doc = HoomdXmlFile::read_from_str(SPLIT_PAIR).unwrap();
            let report = run(&mut doc, &config(), &ProgressReporter::new()).unwrap();

            assert_eq!(
                report,
                RepairReport {
                    particle_count: 2,
                    bond_count: 1,
                    wrapped_particles: 0,
                    violations: 1,
                    relocated_particles: 1,
                    residual_violations: 0,
                }
            );
            let positions = doc.positions().unwrap();
            assert_close(positions[0].x, 4.9);
            assert_close(positions[1].x, 5.1);
            assert_close((positions[0] - positions[1]).x, -0.2);
        }

        #[test]
        fn out_of_cell_particles_are_wrapped_and_counted() {
            let content = r#"<r><c><box lx="10" ly="10" lz="10"/>
<position>12 0 0
0 -7 0</position>
<bond/>
</c></r>"#;
            let mut doc = HoomdXmlFile::read_from_str(content).unwrap();
            let report = run(&mut doc, &config(), &ProgressReporter::new()).unwrap();
            assert_eq!(report.wrapped_particles, 2);
            assert_eq!(report.violations, 0);
            assert_eq!(doc.images().unwrap()[0].x, 1);
            assert_eq!(doc.images().unwrap()[1].y, -1);
        }

        #[test]
        fn missing_image_section_is_created() {
            let content = r#"<r><c><box lx="10" ly="10" lz="10"/>
<position num="2">0 0 0
1 0 0</position>
<type>A
B</type>
<bond>A-B 0 1</bond>
</c></r>"#;
            let mut doc = HoomdXmlFile::read_from_str(content).unwrap();
            run(&mut doc, &config(), &ProgressReporter::new()).unwrap();
            assert_eq!(
                doc.section_names(),
                &["box", "position", "image", "type", "bond"]
            );
            assert_eq!(doc.images().unwrap().len(), 2);
        }

        #[test]
        fn inconsistent_counts_fail_before_mutation() {
            let content = r#"<r><c><box lx="10" ly="10" lz="10"/>
<position>12 0 0
1 0 0</position>
<image>3 3 3</image>
<bond>A-A 0 1</bond>
</c></r>"#;
            let mut doc = HoomdXmlFile::read_from_str(content).unwrap();
            let before = doc.clone();
            let err = run(&mut doc, &config(), &ProgressReporter::new()).unwrap_err();
            assert!(matches!(
                err,
                EngineError::InconsistentParticleCount {
                    section: "image",
                    positions: 2,
                    found: 1
                }
            ));
            assert_eq!(doc, before);
        }

        #[test]
        fn missing_bond_section_is_reported() {
            let content = r#"<r><c><box lx="10" ly="10" lz="10"/><position>0 0 0</position></c></r>"#;
            let mut doc = HoomdXmlFile::read_from_str(content).unwrap();
            assert!(matches!(
                run(&mut doc, &config(), &ProgressReporter::new()),
                Err(EngineError::MissingSection("bond"))
            ));
        }

        #[test]
        fn ring_wrapping_the_box_is_non_convergent() {
            let mut doc = HoomdXmlFile::read_from_str(WRAPPED_RING).unwrap();
            let err = run(&mut doc, &config(), &ProgressReporter::new()).unwrap_err();
            assert!(matches!(
                err,
                EngineError::NonConvergentRelocation {
                    anchor: 3,
                    cause: NonConvergence::ContradictoryShift { .. },
                    ..
                }
            ));
        }

        #[test]
        fn configured_budget_is_honoured() {
            let content = r#"<r><c><box lx="10" ly="10" lz="10"/>
<position>4.5 0 0
-4.8 0 0
-4.0 0 0</position>
<bond>A-A 0 1
A-A 1 2</bond>
</c></r>"#;
            let mut doc = HoomdXmlFile::read_from_str(content).unwrap();
            let config = RepairConfigBuilder::new()
                .max_relocation_steps(Some(1))
                .build()
                .unwrap();
            let err = run(&mut doc, &config, &ProgressReporter::new()).unwrap_err();
            assert!(matches!(
                err,
                EngineError::NonConvergentRelocation {
                    cause: NonConvergence::BudgetExhausted { budget: 1 },
                    ..
                }
            ));
        }

        #[test]
        fn phases_and_relocations_are_reported_in_order() {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = seen.clone();
            let reporter = ProgressReporter::with_callback(Box::new(move |event| {
                sink.lock().unwrap().push(event);
            }));
            let mut doc = HoomdXmlFile::read_from_str(SPLIT_PAIR).unwrap();
            run(&mut doc, &config(), &reporter).unwrap();

            use RepairPhase::*;
            assert_eq!(
                *seen.lock().unwrap(),
                vec![
                    Progress::PhaseStart(ImagesZeroed),
                    Progress::PhaseFinish(ImagesZeroed),
                    Progress::PhaseStart(Wrapped),
                    Progress::PhaseFinish(Wrapped),
                    Progress::PhaseStart(ViolationsFound),
                    Progress::PhaseFinish(ViolationsFound),
                    Progress::PhaseStart(Relocated),
                    Progress::RelocationStart { violations: 1 },
                    Progress::ClusterRelocated { anchor: 0, moved: 1 },
                    Progress::PhaseFinish(Relocated),
                ]
            );
        }

        #[test]
        fn failed_relocation_leaves_its_phase_open() {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = seen.clone();
            let reporter = ProgressReporter::with_callback(Box::new(move |event| {
                sink.lock().unwrap().push(event);
            }));
            let mut doc = HoomdXmlFile::read_from_str(WRAPPED_RING).unwrap();
            assert!(run(&mut doc, &config(), &reporter).is_err());

            let seen = seen.lock().unwrap();
            assert_eq!(
                seen.last(),
                Some(&Progress::RelocationStart { violations: 1 })
            );
            assert!(!seen.contains(&Progress::PhaseFinish(RepairPhase::Relocated)));
        }

        #[test]
        fn far_away_particle_is_wrapped_before_relocation() {
            let content = r#"<r><c><box lx="10" ly="10" lz="10"/>
<position>1e18 0 0
0 0 0</position>
<bond/>
</c></r>"#;
            let mut doc = HoomdXmlFile::read_from_str(content).unwrap();
            let report = run(&mut doc, &config(), &ProgressReporter::new()).unwrap();
            assert_eq!(report.wrapped_particles, 1);
            assert_eq!(doc.images().unwrap()[0].x, 100_000_000_000_000_000);
        }
    }

    mod files {
        use super::*;

        #[test]
        fn repaired_document_is_written_to_output() {
            let dir = tempdir().unwrap();
            let input = dir.path().join("in.xml");
            let output = dir.path().join("out.xml");
            fs::write(&input, SPLIT_PAIR).unwrap();

            let report = run_file(&input, &output, &config(), &ProgressReporter::new()).unwrap();
            assert_eq!(report.relocated_particles, 1);

            let repaired = HoomdXmlFile::read_from_path(&output).unwrap();
            assert_close(repaired.positions().unwrap()[1].x, 5.1);
            assert_eq!(repaired.root.attributes.get("version").unwrap(), "1.6");
            assert_eq!(
                repaired.section_names(),
                &["box", "position", "image", "type", "bond"]
            );
            assert_eq!(fs::read_to_string(&input).unwrap(), SPLIT_PAIR);
        }

        #[test]
        fn input_can_be_rewritten_in_place() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("record.xml");
            fs::write(&path, SPLIT_PAIR).unwrap();

            run_file(&path, &path, &config(), &ProgressReporter::new()).unwrap();
            let repaired = HoomdXmlFile::read_from_path(&path).unwrap();
            assert_close(repaired.positions().unwrap()[1].x, 5.1);
        }

        #[test]
        fn failed_repair_writes_nothing() {
            let dir = tempdir().unwrap();
            let input = dir.path().join("ring.xml");
            let output = dir.path().join("out.xml");
            fs::write(&input, WRAPPED_RING).unwrap();

            let err = run_file(&input, &output, &config(), &ProgressReporter::new()).unwrap_err();
            assert!(matches!(
                err,
                RepairError::Engine(EngineError::NonConvergentRelocation { .. })
            ));
            assert!(!output.exists());
        }

        #[test]
        fn failed_in_place_repair_leaves_input_untouched() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("ring.xml");
            fs::write(&path, WRAPPED_RING).unwrap();

            assert!(run_file(&path, &path, &config(), &ProgressReporter::new()).is_err());
            assert_eq!(fs::read_to_string(&path).unwrap(), WRAPPED_RING);
        }

        #[test]
        fn missing_input_is_a_document_error() {
            let dir = tempdir().unwrap();
            let err = run_file(
                &dir.path().join("absent.xml"),
                &dir.path().join("out.xml"),
                &config(),
                &ProgressReporter::new(),
            )
            .unwrap_err();
            assert!(matches!(err, RepairError::Document(HoomdError::Io(_))));
        }

        #[test]
        fn unwritable_output_is_reported_with_its_path() {
            let dir = tempdir().unwrap();
            let input = dir.path().join("in.xml");
            fs::write(&input, SPLIT_PAIR).unwrap();
            let output = dir.path().join("missing-dir").join("out.xml");

            let err = run_file(&input, &output, &config(), &ProgressReporter::new()).unwrap_err();
            match err {
                RepairError::Output { path, .. } => assert_eq!(path, output),
                other => panic!("Unexpected error: {:?}", other),
            }
        }
    }
}
