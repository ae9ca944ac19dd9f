//! Race Reporting Boundary
//!
//! Races are the detector's product, not its errors: they leave the engine
//! through a [`ReportSink`] and analysis continues behind them. The sink
//! decides de-duplication policy and tells the engine when a site has been
//! seen enough ([`SinkDirective::Advance`]), after which the engine stops
//! building reports for that site entirely.

use crate::domain::event::SourceLocation;
use dashmap::DashMap;
use parking_lot::Mutex;
use racetrack_core::{SiteId, Tid};
use std::fmt;
use tracing::warn;

/// The four happens-before violations FastTrack distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RaceKind {
    /// Unordered write then read
    WriteRead,
    /// Unordered read then write
    ReadWrite,
    /// Unordered write then write
    WriteWrite,
    /// Write unordered with one or more shared-mode reads
    SharedReadWrite,
}

impl RaceKind {
    /// What the earlier access was doing
    pub fn prev_op(self) -> &'static str {
        match self {
            RaceKind::WriteRead | RaceKind::WriteWrite => "Write by",
            RaceKind::ReadWrite | RaceKind::SharedReadWrite => "Read by",
        }
    }

    /// What the current access is doing
    pub fn cur_op(self) -> &'static str {
        match self {
            RaceKind::WriteRead => "Read by",
            RaceKind::ReadWrite | RaceKind::WriteWrite | RaceKind::SharedReadWrite => "Write by",
        }
    }
}

impl fmt::Display for RaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RaceKind::WriteRead => "Write-Read Race",
            RaceKind::ReadWrite => "Read-Write Race",
            RaceKind::WriteWrite => "Write-Write Race",
            RaceKind::SharedReadWrite => "Read(Shared)-Write Race",
        };
        f.write_str(name)
    }
}

/// One detected happens-before violation
#[derive(Debug, Clone)]
pub struct RaceReport {
    /// Which violation shape was observed
    pub kind: RaceKind,
    /// Identity of the accessed location, e.g. `c3.balance`
    pub description: String,
    /// Tid of the earlier, conflicting access
    pub prev_op_tid: Tid,
    /// Tid of the access that exposed the race
    pub cur_op_tid: Tid,
    /// Dump of the variable's shadow state at detection time
    pub shadow_state: String,
    /// Dump of the current thread's clocks
    pub thread_dump: String,
    /// Site the report de-duplicates on
    pub site: SiteId,
    /// Source position of the access
    pub location: SourceLocation,
    /// Stack of the current thread, when the platform provides one
    pub stack: String,
}

impl fmt::Display for RaceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} at {} ({} {}, {} {})",
            self.kind,
            self.description,
            self.location,
            self.kind.prev_op(),
            self.prev_op_tid,
            self.kind.cur_op(),
            self.cur_op_tid,
        )
    }
}

/// What the sink wants the engine to do with a site after a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkDirective {
    /// Keep sending reports from this site
    KeepLooking,
    /// The site is no longer interesting; stop reporting from it
    Advance,
}

/// Consumer of race reports
pub trait ReportSink: Send + Sync {
    /// Deliver one report; the return value steers future reports from
    /// the same site
    fn report(&self, report: &RaceReport) -> SinkDirective;
}

impl<S: ReportSink + ?Sized> ReportSink for std::sync::Arc<S> {
    fn report(&self, report: &RaceReport) -> SinkDirective {
        (**self).report(report)
    }
}

/// Default sink: logs each report through `tracing` and advances a site
/// once it has emitted `per_site_cap` reports for it.
pub struct TracingSink {
    emitted: DashMap<SiteId, u32>,
    per_site_cap: u32,
}

impl TracingSink {
    /// A sink that reports each site at most `per_site_cap` times
    pub fn new(per_site_cap: u32) -> Self {
        Self {
            emitted: DashMap::new(),
            per_site_cap: per_site_cap.max(1),
        }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ReportSink for TracingSink {
    fn report(&self, report: &RaceReport) -> SinkDirective {
        warn!(
            site = report.site.0,
            shadow = %report.shadow_state,
            thread = %report.thread_dump,
            "{}",
            report
        );
        let mut count = self.emitted.entry(report.site).or_insert(0);
        *count += 1;
        if *count >= self.per_site_cap {
            SinkDirective::Advance
        } else {
            SinkDirective::KeepLooking
        }
    }
}

/// Sink that retains every report; for harnesses and tests
#[derive(Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<RaceReport>>,
}

impl CollectingSink {
    /// An empty collecting sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports received so far
    pub fn reports(&self) -> Vec<RaceReport> {
        self.reports.lock().clone()
    }

    /// Number of reports received
    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    /// True if nothing has been reported
    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

impl ReportSink for CollectingSink {
    fn report(&self, report: &RaceReport) -> SinkDirective {
        self.reports.lock().push(report.clone());
        SinkDirective::KeepLooking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report(site: u64) -> RaceReport {
        RaceReport {
            kind: RaceKind::WriteRead,
            description: "c1.balance".into(),
            prev_op_tid: Tid::new(0),
            cur_op_tid: Tid::new(1),
            shadow_state: "[W=t0@2 R=ZERO]".into(),
            thread_dump: "[tid=1  C=[0 2] E=t1@2]".into(),
            site: SiteId::new(site),
            location: SourceLocation {
                method: "Account.read".into(),
                line: 7,
            },
            stack: String::new(),
        }
    }

    #[test]
    fn kind_labels_match_participants() {
        assert_eq!(RaceKind::WriteRead.prev_op(), "Write by");
        assert_eq!(RaceKind::WriteRead.cur_op(), "Read by");
        assert_eq!(RaceKind::SharedReadWrite.prev_op(), "Read by");
        assert_eq!(RaceKind::SharedReadWrite.cur_op(), "Write by");
        assert_eq!(RaceKind::WriteWrite.to_string(), "Write-Write Race");
    }

    #[test]
    fn report_display_names_both_threads() {
        let text = sample_report(1).to_string();
        assert!(text.contains("Write-Read Race"));
        assert!(text.contains("Write by t0"));
        assert!(text.contains("Read by t1"));
        assert!(text.contains("Account.read:7"));
    }

    #[test]
    fn tracing_sink_advances_at_cap() {
        let sink = TracingSink::new(2);
        let report = sample_report(5);
        assert_eq!(sink.report(&report), SinkDirective::KeepLooking);
        assert_eq!(sink.report(&report), SinkDirective::Advance);
    }

    #[test]
    fn default_tracing_sink_advances_immediately() {
        let sink = TracingSink::default();
        assert_eq!(sink.report(&sample_report(6)), SinkDirective::Advance);
    }

    #[test]
    fn collecting_sink_keeps_everything() {
        let sink = CollectingSink::new();
        assert!(sink.is_empty());
        for _ in 0..3 {
            assert_eq!(sink.report(&sample_report(9)), SinkDirective::KeepLooking);
        }
        assert_eq!(sink.len(), 3);
        assert_eq!(sink.reports()[0].site, SiteId::new(9));
    }
}
