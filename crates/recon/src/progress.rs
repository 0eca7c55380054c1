//! Pipeline progress observer.

/// Fixed pipeline milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Started,
    Ingested,
    CatalogLoaded,
    Reconciled,
    Diffed,
    Finished,
}

impl Stage {
    pub fn percent(&self) -> u8 {
        match self {
            Self::Started => 0,
            Self::Ingested => 30,
            Self::CatalogLoaded => 50,
            Self::Reconciled => 75,
            Self::Diffed => 90,
            Self::Finished => 100,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Started => "reading stock export",
            Self::Ingested => "stock export ingested",
            Self::CatalogLoaded => "catalog loaded",
            Self::Reconciled => "stock filtered",
            Self::Diffed => "delta computed",
            Self::Finished => "done",
        }
    }
}

/// Called synchronously at each milestone. Implementations must not influence
/// the pipeline; they only observe it.
pub trait Progress {
    fn milestone(&mut self, _stage: Stage) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// Records every milestone it sees. Useful in tests and for callers that want
/// to inspect the run afterwards.
#[derive(Debug, Default, Clone)]
pub struct RecordingProgress {
    pub stages: Vec<Stage>,
}

impl Progress for RecordingProgress {
    fn milestone(&mut self, stage: Stage) {
        self.stages.push(stage);
    }
}
