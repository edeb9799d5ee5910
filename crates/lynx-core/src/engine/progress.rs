use tracing::debug;

/// The stages of a repair, in the only order they are ever entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RepairPhase {
    Parsed,
    ImagesZeroed,
    Wrapped,
    ViolationsFound,
    Relocated,
    Serialized,
}

impl RepairPhase {
    pub const ALL: [RepairPhase; 6] = [
        RepairPhase::Parsed,
        RepairPhase::ImagesZeroed,
        RepairPhase::Wrapped,
        RepairPhase::ViolationsFound,
        RepairPhase::Relocated,
        RepairPhase::Serialized,
    ];

    /// Human-readable name of the work that leads into this phase.
    pub fn label(self) -> &'static str {
        match self {
            RepairPhase::Parsed => "Parsing Document",
            RepairPhase::ImagesZeroed => "Zeroing Images",
            RepairPhase::Wrapped => "Wrapping Particles",
            RepairPhase::ViolationsFound => "Scanning Bonds",
            RepairPhase::Relocated => "Relocating Clusters",
            RepairPhase::Serialized => "Serializing Document",
        }
    }
}

/// Events emitted by the repair workflow while it runs.
///
/// Every phase that completes is bracketed by `PhaseStart`/`PhaseFinish`. A phase that fails
/// only emits its start. Relocation additionally announces how many flagged bonds it will work
/// through and reports each cluster as it is moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    PhaseStart(RepairPhase),
    PhaseFinish(RepairPhase),

    RelocationStart { violations: u64 },
    ClusterRelocated { anchor: usize, moved: usize },

    Warning(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards [`Progress`] events to an optional callback. Without one, reporting is a no-op.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Runs `work` as `phase`, reporting its start and, if it succeeds, its finish.
    pub fn phase<T, E>(
        &self,
        phase: RepairPhase,
        work: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        debug!(?phase, "Entering repair phase.");
        self.report(Progress::PhaseStart(phase));
        let value = work()?;
        self.report(Progress::PhaseFinish(phase));
        Ok(value)
    }
}
