use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Preparing,
    Gathering,
    Done,
}

impl ScanPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "waiting for a scan",
            Self::Preparing => "preparing metadata caches",
            Self::Gathering => "gathering applicable programs and their DLC",
            Self::Done => "scan finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Program,
    Dlc,
}

/// Raw pipeline events. Producers never touch the counters directly;
/// everything funnels into the single-threaded reporter.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    PhaseChanged(ScanPhase),
    UnitDiscovered(UnitKind, String),
    UnitCompleted(UnitKind, String),
}

/// What consumers see: a bounded percentage, a phase label, and the names of
/// units still in flight. Raw counters stay private to the reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub percent: u8,
    pub phase: ScanPhase,
    pub remaining_programs: Vec<String>,
    pub remaining_dlc: Vec<String>,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            percent: 0,
            phase: ScanPhase::Idle,
            remaining_programs: Vec::new(),
            remaining_dlc: Vec::new(),
        }
    }
}

/// Cloneable producer handle given to every scan task.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSink {
    pub fn phase(&self, phase: ScanPhase) {
        let _ = self.tx.send(ProgressEvent::PhaseChanged(phase));
    }

    pub fn discovered(&self, kind: UnitKind, label: impl Into<String>) {
        let _ = self
            .tx
            .send(ProgressEvent::UnitDiscovered(kind, label.into()));
    }

    pub fn completed(&self, kind: UnitKind, label: impl Into<String>) {
        let _ = self
            .tx
            .send(ProgressEvent::UnitCompleted(kind, label.into()));
    }
}

/// Monotonic counters aggregated at a single point: `discovered` grows each
/// time a program or DLC enters the pipeline, `completed` each time one
/// finishes, success or drop. The percentage is recomputed on every event
/// and clamped; a zero total reports zero instead of faulting.
#[derive(Debug)]
pub struct ProgressReporter {
    discovered: u64,
    completed: u64,
    phase: ScanPhase,
    remaining_programs: Vec<String>,
    remaining_dlc: Vec<String>,
    publish: watch::Sender<ProgressSnapshot>,
}

impl ProgressReporter {
    fn new(publish: watch::Sender<ProgressSnapshot>) -> Self {
        Self {
            discovered: 0,
            completed: 0,
            phase: ScanPhase::Idle,
            remaining_programs: Vec::new(),
            remaining_dlc: Vec::new(),
            publish,
        }
    }

    fn remaining_for(&mut self, kind: UnitKind) -> &mut Vec<String> {
        match kind {
            UnitKind::Program => &mut self.remaining_programs,
            UnitKind::Dlc => &mut self.remaining_dlc,
        }
    }

    pub fn apply(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::PhaseChanged(phase) => self.phase = phase,
            ProgressEvent::UnitDiscovered(kind, label) => {
                self.discovered += 1;
                let remaining = self.remaining_for(kind);
                if !remaining.contains(&label) {
                    remaining.push(label);
                }
            }
            ProgressEvent::UnitCompleted(kind, label) => {
                self.completed += 1;
                self.remaining_for(kind).retain(|entry| *entry != label);
            }
        }
        let snapshot = self.snapshot();
        let _ = self.publish.send(snapshot);
    }

    pub fn percent(&self) -> u8 {
        if self.discovered == 0 {
            return 0;
        }
        ((self.completed * 100) / self.discovered).clamp(0, 100) as u8
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            percent: self.percent(),
            phase: self.phase,
            remaining_programs: self.remaining_programs.clone(),
            remaining_dlc: self.remaining_dlc.clone(),
        }
    }
}

/// Wires a sink/reporter pair: tasks clone the sink, one drain loop applies
/// events, consumers watch snapshots.
pub struct ProgressHub {
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
    reporter: ProgressReporter,
}

impl ProgressHub {
    pub fn new() -> (ProgressSink, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (publish, _) = watch::channel(ProgressSnapshot::default());
        (
            ProgressSink { tx },
            Self {
                rx,
                reporter: ProgressReporter::new(publish),
            },
        )
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.reporter.publish.subscribe()
    }

    /// Drains events until every sink clone is dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            self.reporter.apply(event);
        }
    }
}

#[cfg(test)]
#[path = "../../../tests/app/scan_service/progress_tests.rs"]
mod tests;
