//! Import orchestrator
//!
//! Drives one run over a dump: members first, then the member identity map,
//! then images, likes and messages. Every tuple yields a [`RecordOutcome`];
//! no single record (or empty kind) stops the run.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use th_common::{ImportTally, KindTally, RecordKind};
use tracing::{debug, info, warn};

use crate::config::{ImportConfig, PrimaryImagePolicy};
use crate::dump::{extract, tokenize, ExtractionSummary};
use crate::error::{ImportError, Result};
use crate::identity::IdentityMap;
use crate::models::{FieldValue, NormalizedRecord};
use crate::normalize::{Clock, Normalizer};
use crate::report::{ImportReport, KindReport, SkipCounts, SkipReason};
use crate::schema::Schema;
use crate::store::DestinationStore;

/// Progress is logged every this many imported members
const MEMBER_PROGRESS_INTERVAL: u64 = 10;

/// Result of attempting one tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Imported,
    Skipped(SkipReason),
}

/// Lifecycle of one record kind within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum KindPhase {
    NotStarted,
    Extracting,
    NormalizingAndInserting,
    Done,
}

/// Mutable counters for a kind while it runs
///
/// Consumed by [`KindRun::finish`], after which the counts cannot change.
#[derive(Debug)]
pub struct KindRun {
    kind: RecordKind,
    phase: KindPhase,
    tally: KindTally,
    skips: SkipCounts,
}

impl KindRun {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            phase: KindPhase::NotStarted,
            tally: KindTally::default(),
            skips: SkipCounts::default(),
        }
    }

    pub fn phase(&self) -> KindPhase {
        self.phase
    }

    pub fn tally(&self) -> KindTally {
        self.tally
    }

    /// Move forward to `next`; phases never go back
    pub fn advance(&mut self, next: KindPhase) {
        if next > self.phase {
            debug!(kind = %self.kind, from = ?self.phase, to = ?next, "Phase change");
            self.phase = next;
        }
    }

    pub fn record(&mut self, outcome: RecordOutcome) {
        debug_assert_eq!(self.phase, KindPhase::NormalizingAndInserting);
        match outcome {
            RecordOutcome::Imported => self.tally.imported += 1,
            RecordOutcome::Skipped(reason) => {
                self.tally.skipped += 1;
                self.skips.add(reason);
            },
        }
    }

    pub fn finish(mut self, extraction: ExtractionSummary) -> KindReport {
        self.advance(KindPhase::Done);
        KindReport {
            kind: self.kind,
            tally: self.tally,
            skips: self.skips,
            extraction,
        }
    }
}

/// Decides which imported images are flagged `is_primary`
struct PrimaryImages {
    policy: PrimaryImagePolicy,
    any_imported: bool,
    members: HashSet<String>,
}

impl PrimaryImages {
    fn new(policy: PrimaryImagePolicy) -> Self {
        Self {
            policy,
            any_imported: false,
            members: HashSet::new(),
        }
    }

    fn is_next_primary(&self, member: Option<&str>) -> bool {
        match self.policy {
            PrimaryImagePolicy::FirstOverall => !self.any_imported,
            PrimaryImagePolicy::FirstPerMember => {
                member.is_some_and(|m| !self.members.contains(m))
            },
        }
    }

    fn imported(&mut self, member: Option<&str>) {
        self.any_imported = true;
        if let Some(member) = member {
            self.members.insert(member.to_string());
        }
    }
}

/// Runs imports against one destination store
pub struct ImportOrchestrator {
    store: Arc<dyn DestinationStore>,
    config: ImportConfig,
    normalizer: Normalizer,
}

impl ImportOrchestrator {
    pub fn new(store: Arc<dyn DestinationStore>, config: ImportConfig) -> Self {
        let normalizer = Normalizer::new(&config);
        Self {
            store,
            config,
            normalizer,
        }
    }

    /// Read "now" from `clock` instead of the system clock
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.normalizer = self.normalizer.with_clock(clock);
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Read a dump file and import it
    ///
    /// A dump that cannot be read fails before any kind is attempted.
    pub async fn run_file(&self, path: impl AsRef<Path>) -> Result<ImportReport> {
        let path = path.as_ref();
        let dump = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ImportError::source_unavailable(path, e))?;

        info!(path = %path.display(), bytes = dump.len(), "Read dump");
        Ok(self.run_report(&dump).await)
    }

    /// Import a dump and return the per-kind tally
    pub async fn run(&self, dump: &str) -> ImportTally {
        self.run_report(dump).await.tally
    }

    /// Import a dump and return the full report
    pub async fn run_report(&self, dump: &str) -> ImportReport {
        let mut report = ImportReport::default();

        if let Some(limit) = self.config.parse_limit {
            warn!(limit = limit, "Parse limit is set, only the first {} tuples of each kind will be attempted", limit);
        }

        info!("Phase 1: Importing members");
        report.push(
            self.import_kind(RecordKind::Members, dump, &IdentityMap::default())
                .await,
        );

        info!("Phase 2: Building member identity map");
        let identity =
            IdentityMap::load(self.store.as_ref(), self.config.member_id_offset()).await;

        for (phase, kind) in [RecordKind::Images, RecordKind::Likes, RecordKind::Messages]
            .into_iter()
            .enumerate()
        {
            info!("Phase {}: Importing {}", phase + 3, kind);
            report.push(self.import_kind(kind, dump, &identity).await);
        }

        info!(
            imported = report.tally.total_imported(),
            skipped = report.tally.total_skipped(),
            "Import run finished"
        );

        report
    }

    async fn import_kind(&self, kind: RecordKind, dump: &str, identity: &IdentityMap) -> KindReport {
        let mut run = KindRun::new(kind);
        let schema = Schema::for_kind(kind);

        run.advance(KindPhase::Extracting);
        let extraction = extract(dump, kind.table());
        let limit = self.config.parse_limit.unwrap_or(usize::MAX);

        run.advance(KindPhase::NormalizingAndInserting);
        let mut primary = PrimaryImages::new(self.config.primary_image);

        for tuple in extraction.tuples.iter().take(limit) {
            let outcome = self.import_tuple(schema, tuple, identity, &mut primary).await;
            run.record(outcome);

            if kind == RecordKind::Members
                && outcome == RecordOutcome::Imported
                && run.tally().imported % MEMBER_PROGRESS_INTERVAL == 0
            {
                info!("Imported {} members...", run.tally().imported);
            }
        }

        let report = run.finish(extraction.summary);
        info!(
            "{} import complete: {} imported, {} skipped",
            kind, report.tally.imported, report.tally.skipped
        );
        report
    }

    async fn import_tuple(
        &self,
        schema: &Schema,
        tuple: &str,
        identity: &IdentityMap,
        primary: &mut PrimaryImages,
    ) -> RecordOutcome {
        let kind = schema.kind;

        let raw = match tokenize(tuple) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Skipped malformed tuple");
                return RecordOutcome::Skipped(SkipReason::Parse);
            },
        };

        let mut record = match self.normalizer.normalize(schema, &raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Skipped record with invalid field");
                return RecordOutcome::Skipped(SkipReason::Normalize);
            },
        };

        if let Err(field) = resolve_references(schema, &mut record, identity) {
            debug!(kind = %kind, field = field, "Skipped record with unresolved member reference");
            return RecordOutcome::Skipped(SkipReason::Unresolved);
        }

        let member = record.get_str("member_id").map(str::to_string);
        if kind == RecordKind::Images {
            let is_primary = primary.is_next_primary(member.as_deref());
            record.set("is_primary", FieldValue::Boolean(is_primary));
        }

        match self.store.insert(kind, &record).await {
            Ok(()) => {
                if kind == RecordKind::Images {
                    primary.imported(member.as_deref());
                }
                RecordOutcome::Imported
            },
            Err(e) => {
                let label = schema.label_field().and_then(|f| record.get_str(f));
                warn!(kind = %kind, name = ?label, error = %e, "Skipped record rejected by store");
                RecordOutcome::Skipped(SkipReason::Rejected)
            },
        }
    }
}

/// Replace every member reference with its destination id
///
/// Returns the first field that does not resolve.
fn resolve_references(
    schema: &Schema,
    record: &mut NormalizedRecord,
    identity: &IdentityMap,
) -> std::result::Result<(), &'static str> {
    for field in schema.references() {
        let resolved = record
            .get_str(field)
            .and_then(|legacy| identity.resolve_raw(legacy))
            .cloned();

        match resolved {
            Some(id) => record.set(field, FieldValue::Text(id.as_str().to_string())),
            None => return Err(field),
        }
    }
    Ok(())
}
