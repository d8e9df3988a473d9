//! The filter engine.
//!
//! [`FilterEngine`] keeps one page free of content from blocked users and
//! boards. It loads the block list on start and scans once, then
//! [`FilterEngine::run`] reacts to two event sources on a single task:
//!
//! - mutation batches from the page, which arm a debounced re-scan when
//!   they bring in an interesting fragment;
//! - block list broadcasts, which replace the active set and re-scan at once.
//!
//! A lagged broadcast receiver means updates were missed, so the engine
//! reloads from its store instead of trusting the next message.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dom::Markup;
use crate::entity::{ActiveBlockSet, BlockList, EntityKind};
use crate::error::Result;
use crate::filter::{self, Action, FilterSettings, RedactionLedger, ScanContext};
use crate::message::Message;
use crate::store::BlockStore;
use crate::watch::{wait_for, Debouncer, MutationBatch, MutationWatcher, SharedDocument};

/// Compiled engine configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// What a scan does.
    pub filter: FilterSettings,
    /// Which insertions matter.
    pub watcher: MutationWatcher,
    /// Re-scan delay after a relevant insertion.
    pub debounce: Duration,
    /// Put redacted fragments back when their owner is unblocked.
    pub restore_on_unblock: bool,
}

impl EngineSettings {
    /// Compile engine settings from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a selector or pattern does not compile.
    pub fn from_config(config: &Config) -> Result<Self> {
        let filter = FilterSettings::from_config(config)?;
        let watcher = MutationWatcher::for_surfaces(&config.engine.observe_root, &filter.surfaces)?;
        Ok(Self {
            filter,
            watcher,
            debounce: config.debounce(),
            restore_on_unblock: config.engine.restore_on_unblock,
        })
    }
}

/// What one scan did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Fragments hidden for their board.
    pub hidden: usize,
    /// Fragments redacted for their user.
    pub redacted: usize,
    /// Message windows withheld.
    pub withheld: usize,
    /// Fragments restored after their owner was unblocked.
    pub restored: usize,
    /// Fragments skipped as already processed.
    pub skipped: usize,
    /// Commands that changed the document.
    pub commands_applied: usize,
    /// Commands whose target had gone.
    pub commands_skipped: usize,
}

impl ScanReport {
    /// Number of fragments changed in either direction.
    #[must_use]
    pub fn changed(&self) -> usize {
        self.hidden + self.redacted + self.withheld + self.restored
    }

    fn absorb(&mut self, other: &Self) {
        self.hidden += other.hidden;
        self.redacted += other.redacted;
        self.withheld += other.withheld;
        self.restored += other.restored;
        self.skipped += other.skipped;
        self.commands_applied += other.commands_applied;
        self.commands_skipped += other.commands_skipped;
    }
}

/// Counters over the life of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Scans run, including the initial one.
    pub scans: usize,
    /// Scans triggered by the debouncer.
    pub debounced_scans: usize,
    /// Block list updates received.
    pub updates: usize,
    /// Reloads from the store after missed updates.
    pub reloads: usize,
    /// Mutation batches seen.
    pub mutation_batches: usize,
    /// Mutation batches that armed the debouncer.
    pub relevant_batches: usize,
    /// Sum of every scan report.
    pub totals: ScanReport,
}

/// Keeps one page filtered.
#[derive(Debug)]
pub struct FilterEngine {
    settings: EngineSettings,
    store: Box<dyn BlockStore>,
    document: SharedDocument,
    blocks: ActiveBlockSet,
    ledger: RedactionLedger,
    debouncer: Debouncer,
    stats: EngineStats,
}

impl FilterEngine {
    /// Load the block list, project it and scan the page once.
    ///
    /// A store that fails to load is logged and treated as empty, so the
    /// engine still comes up and can take updates.
    pub fn start(
        settings: EngineSettings,
        store: Box<dyn BlockStore>,
        document: SharedDocument,
    ) -> Self {
        let list = load_or_empty(store.as_ref());
        let blocks = ActiveBlockSet::project(&list);
        info!(
            users = blocks.user_count(),
            boards = blocks.board_count(),
            "Filter engine starting"
        );

        let debouncer = Debouncer::new(settings.debounce);
        let mut engine = Self {
            settings,
            store,
            document,
            blocks,
            ledger: RedactionLedger::new(),
            debouncer,
            stats: EngineStats::default(),
        };
        engine.rescan();
        engine
    }

    /// Handle page mutations and block list updates until the page goes away.
    ///
    /// Returns when the mutation channel closes. A re-scan still pending at
    /// that point runs before returning.
    pub async fn run(
        &mut self,
        mut mutations: mpsc::UnboundedReceiver<MutationBatch>,
        mut updates: broadcast::Receiver<Message>,
    ) -> EngineStats {
        let mut updates_open = true;

        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                batch = mutations.recv() => {
                    let Some(batch) = batch else {
                        break;
                    };
                    self.handle_mutation(&batch);
                }
                update = updates.recv(), if updates_open => {
                    match update {
                        Ok(message) => {
                            self.apply_update(&message.into_block_list());
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(missed, "Missed block list updates, reloading from store");
                            self.reload();
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Update channel closed");
                            updates_open = false;
                        }
                    }
                }
                () = wait_for(deadline), if deadline.is_some() => {
                    self.debouncer.cancel();
                    self.stats.debounced_scans += 1;
                    self.rescan();
                }
            }
        }

        if self.debouncer.cancel() {
            debug!("Flushing pending re-scan");
            self.stats.debounced_scans += 1;
            self.rescan();
        }

        info!(
            scans = self.stats.scans,
            redacted = self.stats.totals.redacted,
            hidden = self.stats.totals.hidden,
            "Filter engine stopped"
        );
        self.stats
    }

    /// Inspect a mutation batch and arm the debouncer if it matters.
    /// Returns whether it did.
    pub fn handle_mutation(&mut self, batch: &MutationBatch) -> bool {
        self.stats.mutation_batches += 1;
        let relevant = self
            .settings
            .watcher
            .is_relevant(&self.document.borrow(), batch);
        if relevant {
            self.stats.relevant_batches += 1;
            let replaced = self.debouncer.schedule();
            debug!(replaced, "Re-scan scheduled");
        }
        relevant
    }

    /// Replace the active set with a projection of `list` and re-scan.
    pub fn apply_update(&mut self, list: &BlockList) -> ScanReport {
        self.stats.updates += 1;
        self.refresh(list)
    }

    /// Reload the block list from the store and re-scan.
    pub fn reload(&mut self) -> ScanReport {
        self.stats.reloads += 1;
        let list = load_or_empty(self.store.as_ref());
        self.refresh(&list)
    }

    fn refresh(&mut self, list: &BlockList) -> ScanReport {
        self.blocks = ActiveBlockSet::project(list);
        info!(
            users = self.blocks.user_count(),
            boards = self.blocks.board_count(),
            "Active block set updated"
        );

        let restored = if self.settings.restore_on_unblock {
            self.restore_unblocked()
        } else {
            0
        };
        self.stats.totals.restored += restored;

        let mut report = self.rescan();
        report.restored = restored;
        report
    }

    fn restore_unblocked(&mut self) -> usize {
        let blocks = &self.blocks;
        let entries = self.ledger.drain_where(|redaction| match redaction.owner_kind {
            EntityKind::User => !blocks.is_user_blocked(&redaction.owner),
            EntityKind::Board => !blocks.is_board_blocked(&redaction.owner),
        });

        let mut doc = self.document.borrow_mut();
        let mut restored = 0;
        for entry in entries {
            let node = entry.redaction.node;
            match entry.snapshot {
                Some(snapshot) if doc.is_attached(node) => match doc.restore(node, &snapshot) {
                    Ok(()) => {
                        debug!(owner = %entry.redaction.owner, %node, "Restored fragment");
                        restored += 1;
                    }
                    Err(e) => warn!(%node, error = %e, "Could not restore fragment"),
                },
                _ => debug!(%node, "Fragment gone or not snapshotted, nothing to restore"),
            }
        }
        restored
    }

    /// Run one full scan now.
    pub fn rescan(&mut self) -> ScanReport {
        self.scan_at(Utc::now())
    }

    /// Run one full scan with `now` as the blocked time.
    pub fn scan_at(&mut self, now: DateTime<Utc>) -> ScanReport {
        let mut doc = self.document.borrow_mut();
        let gone = self
            .ledger
            .drain_where(|redaction| !doc.is_attached(redaction.node))
            .len();
        if gone > 0 {
            debug!(gone, "Dropped ledger entries for fragments that left the page");
        }

        let ctx = ScanContext::new(&self.settings.filter, &self.blocks, now).with_ledger(&self.ledger);
        let plan = filter::plan(&doc, &ctx);

        let snapshots: Vec<Option<Markup>> = plan
            .redactions
            .iter()
            .map(|redaction| {
                if self.settings.restore_on_unblock {
                    doc.snapshot(redaction.node)
                } else {
                    None
                }
            })
            .collect();
        let outcome = filter::apply(&mut doc, &plan.commands);
        drop(doc);

        let report = ScanReport {
            hidden: plan.count(Action::Hidden),
            redacted: plan.count(Action::Redacted),
            withheld: plan.count(Action::Withheld),
            restored: 0,
            skipped: plan.skipped,
            commands_applied: outcome.applied,
            commands_skipped: outcome.skipped,
        };
        for (redaction, snapshot) in plan.redactions.into_iter().zip(snapshots) {
            if redaction.action == Action::Withheld {
                self.ledger.replace(redaction, snapshot);
            } else {
                self.ledger.record(redaction, snapshot);
            }
        }

        self.stats.scans += 1;
        self.stats.totals.absorb(&report);
        if report.changed() > 0 {
            info!(
                hidden = report.hidden,
                redacted = report.redacted,
                withheld = report.withheld,
                "Scan complete"
            );
        } else {
            debug!(skipped = report.skipped, "Scan complete, nothing new");
        }
        report
    }

    /// The active block set.
    #[must_use]
    pub fn blocks(&self) -> &ActiveBlockSet {
        &self.blocks
    }

    /// Fragments processed so far.
    #[must_use]
    pub fn ledger(&self) -> &RedactionLedger {
        &self.ledger
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// The page being filtered.
    #[must_use]
    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    /// Whether a debounced re-scan is pending.
    #[must_use]
    pub fn is_rescan_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

fn load_or_empty(store: &dyn BlockStore) -> BlockList {
    match store.load() {
        Ok(list) => list,
        Err(e) => {
            warn!(error = %e, "Could not load block list, starting empty");
            BlockList::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::dom::{Document, NodeId, Selector};
    use crate::entity::BlockedEntity;
    use crate::error::Error;
    use crate::message::Broadcaster;
    use crate::store::MemoryStore;
    use crate::watch::page_channel;

    const PAGE: &str = r#"<html><body><div id="list">
        <div class="reply" id="r1">
            <span class="userMessage-userName">alice</span>
            <div class="substance">original text</div>
            <div class="signature">sig</div>
        </div>
        <div class="reply" id="r2">
            <span class="userMessage-userName">bob</span>
            <div class="substance">bob text</div>
        </div>
    </div></body></html>"#;

    #[derive(Debug)]
    struct FailingStore;

    impl BlockStore for FailingStore {
        fn load(&self) -> Result<BlockList> {
            Err(Error::internal("disk on fire"))
        }

        fn save(&mut self, _list: &BlockList) -> Result<()> {
            Err(Error::internal("disk on fire"))
        }
    }

    fn settings() -> EngineSettings {
        EngineSettings::from_config(&Config::default()).unwrap()
    }

    fn alice() -> BlockList {
        BlockList::new(vec![BlockedEntity::new("alice", Utc::now())], vec![])
    }

    fn shared(html: &str) -> SharedDocument {
        Rc::new(RefCell::new(Document::parse(html)))
    }

    fn by_id(doc: &SharedDocument, id: &str) -> NodeId {
        let doc = doc.borrow();
        doc.select_first(doc.root(), &Selector::parse(&format!("#{id}")).unwrap())
            .unwrap()
    }

    fn is_redacted(doc: &SharedDocument, id: &str) -> bool {
        let node = by_id(doc, id);
        doc.borrow().has_attr(node, "data-cc98-filter-redacted")
    }

    fn alice_reply(n: usize) -> String {
        format!(
            r#"<div class="reply" id="n{n}"><span class="userMessage-userName">alice</span><div class="substance">new {n}</div></div>"#
        )
    }

    #[test]
    fn test_start_runs_initial_scan() {
        let doc = shared(PAGE);
        let engine = FilterEngine::start(
            settings(),
            Box::new(MemoryStore::with_list(alice())),
            Rc::clone(&doc),
        );

        assert!(is_redacted(&doc, "r1"));
        assert!(!is_redacted(&doc, "r2"));
        assert_eq!(engine.stats().scans, 1);
        assert_eq!(engine.stats().totals.redacted, 1);
        assert_eq!(engine.ledger().len(), 1);
        assert!(engine.blocks().is_user_blocked("alice"));
    }

    #[test]
    fn test_start_with_failing_store_is_empty() {
        let doc = shared(PAGE);
        let engine = FilterEngine::start(settings(), Box::new(FailingStore), Rc::clone(&doc));
        assert!(engine.blocks().is_empty());
        assert!(!is_redacted(&doc, "r1"));
    }

    #[test]
    fn test_apply_update_rescans() {
        let doc = shared(PAGE);
        let mut engine =
            FilterEngine::start(settings(), Box::new(MemoryStore::new()), Rc::clone(&doc));
        assert!(!is_redacted(&doc, "r1"));

        let report = engine.apply_update(&alice());
        assert_eq!(report.redacted, 1);
        assert!(is_redacted(&doc, "r1"));
        assert_eq!(engine.stats().updates, 1);
    }

    #[test]
    fn test_unblock_restores_original_markup() {
        let doc = shared(PAGE);
        let before = doc.borrow().outer_html(by_id(&doc, "r1"));
        let mut engine = FilterEngine::start(
            settings(),
            Box::new(MemoryStore::with_list(alice())),
            Rc::clone(&doc),
        );
        assert!(is_redacted(&doc, "r1"));

        let report = engine.apply_update(&BlockList::default());
        assert_eq!(report.restored, 1);
        assert!(!is_redacted(&doc, "r1"));
        assert_eq!(doc.borrow().outer_html(by_id(&doc, "r1")), before);
        assert!(engine.ledger().is_empty());

        // Blocking again redacts again.
        let report = engine.apply_update(&alice());
        assert_eq!(report.redacted, 1);
        assert!(is_redacted(&doc, "r1"));
    }

    #[test]
    fn test_unblock_without_restore_is_one_way() {
        let mut config = Config::default();
        config.engine.restore_on_unblock = false;
        let settings = EngineSettings::from_config(&config).unwrap();

        let doc = shared(PAGE);
        let mut engine = FilterEngine::start(
            settings,
            Box::new(MemoryStore::with_list(alice())),
            Rc::clone(&doc),
        );
        let report = engine.apply_update(&BlockList::default());
        assert_eq!(report.restored, 0);
        assert!(is_redacted(&doc, "r1"));
    }

    #[test]
    fn test_restore_keeps_still_blocked_fragments() {
        let doc = shared(PAGE);
        let both = BlockList::new(
            vec![
                BlockedEntity::new("alice", Utc::now()),
                BlockedEntity::new("bob", Utc::now()),
            ],
            vec![],
        );
        let mut engine = FilterEngine::start(
            settings(),
            Box::new(MemoryStore::with_list(both)),
            Rc::clone(&doc),
        );
        assert!(is_redacted(&doc, "r2"));

        let report = engine.apply_update(&alice());
        assert_eq!(report.restored, 1);
        assert!(is_redacted(&doc, "r1"));
        assert!(!is_redacted(&doc, "r2"));
    }

    #[test]
    fn test_irrelevant_mutation_does_not_schedule() {
        let doc = shared(PAGE);
        let mut engine =
            FilterEngine::start(settings(), Box::new(MemoryStore::new()), Rc::clone(&doc));
        let list = by_id(&doc, "list");
        let added = doc.borrow_mut().append_html(list, "<p>ad</p>").unwrap();
        assert!(!engine.handle_mutation(&MutationBatch::new(added)));
        assert!(!engine.is_rescan_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_rescan() {
        let doc = shared(PAGE);
        let (page, mutations) = page_channel(Rc::clone(&doc));
        let broadcaster = Broadcaster::default();
        let mut engine = FilterEngine::start(
            settings(),
            Box::new(MemoryStore::with_list(alice())),
            Rc::clone(&doc),
        );
        let list = by_id(&doc, "list");

        let (stats, ()) = tokio::join!(engine.run(mutations, broadcaster.subscribe()), async {
            for n in 0..5 {
                page.insert_html(list, &alice_reply(n)).unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
            drop(page);
        });

        assert_eq!(stats.relevant_batches, 5);
        assert_eq!(stats.debounced_scans, 1);
        assert_eq!(stats.scans, 2);
        for n in 0..5 {
            assert!(is_redacted(&doc, &format!("n{n}")));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_rescan_separately() {
        let doc = shared(PAGE);
        let (page, mutations) = page_channel(Rc::clone(&doc));
        let broadcaster = Broadcaster::default();
        let mut engine = FilterEngine::start(
            settings(),
            Box::new(MemoryStore::with_list(alice())),
            Rc::clone(&doc),
        );
        let list = by_id(&doc, "list");

        let (stats, ()) = tokio::join!(engine.run(mutations, broadcaster.subscribe()), async {
            page.insert_html(list, &alice_reply(0)).unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
            page.insert_html(list, &alice_reply(1)).unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
            drop(page);
        });

        assert_eq!(stats.debounced_scans, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_rescan_flushed_on_close() {
        let doc = shared(PAGE);
        let (page, mutations) = page_channel(Rc::clone(&doc));
        let broadcaster = Broadcaster::default();
        let mut engine = FilterEngine::start(
            settings(),
            Box::new(MemoryStore::with_list(alice())),
            Rc::clone(&doc),
        );
        let list = by_id(&doc, "list");
        page.insert_html(list, &alice_reply(7)).unwrap();
        drop(page);

        let stats = engine.run(mutations, broadcaster.subscribe()).await;
        assert_eq!(stats.debounced_scans, 1);
        assert!(is_redacted(&doc, "n7"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_update_rescans() {
        let doc = shared(PAGE);
        let (page, mutations) = page_channel(Rc::clone(&doc));
        let broadcaster = Broadcaster::default();
        let mut engine =
            FilterEngine::start(settings(), Box::new(MemoryStore::new()), Rc::clone(&doc));
        let updates = broadcaster.subscribe();

        let (stats, ()) = tokio::join!(engine.run(mutations, updates), async {
            broadcaster.publish(Message::update(&alice()));
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(page);
        });

        assert_eq!(stats.updates, 1);
        assert!(is_redacted(&doc, "r1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lagged_receiver_reloads_from_store() {
        let doc = shared(PAGE);
        let (page, mutations) = page_channel(Rc::clone(&doc));
        let broadcaster = Broadcaster::new(1);
        let store = MemoryStore::new();
        let mut writer = store.clone();
        let mut engine = FilterEngine::start(settings(), Box::new(store), Rc::clone(&doc));
        assert!(!is_redacted(&doc, "r1"));

        writer.save(&alice()).unwrap();
        let updates = broadcaster.subscribe();
        for _ in 0..3 {
            broadcaster.publish(Message::update(&alice()));
        }

        let (stats, ()) = tokio::join!(engine.run(mutations, updates), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(page);
        });

        assert_eq!(stats.reloads, 1);
        assert_eq!(stats.updates, 1);
        assert!(is_redacted(&doc, "r1"));
    }

    #[test]
    fn test_reload_reads_store() {
        let doc = shared(PAGE);
        let store = MemoryStore::new();
        let mut writer = store.clone();
        let mut engine = FilterEngine::start(settings(), Box::new(store), Rc::clone(&doc));
        assert!(!is_redacted(&doc, "r1"));

        writer.save(&alice()).unwrap();
        let report = engine.reload();
        assert_eq!(report.redacted, 1);
        assert_eq!(engine.stats().reloads, 1);
    }

    #[test]
    fn test_ledger_forgets_fragments_that_left_the_page() {
        let doc = shared(PAGE);
        let (page, _mutations) = page_channel(Rc::clone(&doc));
        let mut engine = FilterEngine::start(
            settings(),
            Box::new(MemoryStore::with_list(alice())),
            Rc::clone(&doc),
        );
        let list = by_id(&doc, "list");

        for n in 0..50 {
            page.insert_html(list, &alice_reply(n)).unwrap();
        }
        engine.rescan();
        assert_eq!(engine.ledger().len(), 51);

        for n in 0..50 {
            let node = by_id(&doc, &format!("n{n}"));
            doc.borrow_mut().detach(node).unwrap();
        }
        engine.rescan();
        assert_eq!(engine.ledger().len(), 1);
        assert!(engine
            .ledger()
            .redactions()
            .all(|redaction| doc.borrow().is_attached(redaction.node)));
    }

    const MESSAGE_PAGE: &str = r#"<html><body>
        <div class="message-message-window" id="w">
            <div class="message-message-wTitle">与 alice 的私信</div>
            <div class="message-list">first secret</div>
        </div>
    </body></html>"#;

    fn reopen_conversation(doc: &SharedDocument, text: &str) {
        let window = by_id(doc, "w");
        doc.borrow_mut()
            .replace_children(
                window,
                &[
                    Markup::element("div")
                        .attr("class", "message-message-wTitle")
                        .child(Markup::text("与 alice 的私信")),
                    Markup::element("div")
                        .attr("class", "message-list")
                        .child(Markup::text(text)),
                ],
            )
            .unwrap();
    }

    #[test]
    fn test_reused_window_is_withheld_on_rescan() {
        let doc = shared(MESSAGE_PAGE);
        let mut engine = FilterEngine::start(
            settings(),
            Box::new(MemoryStore::with_list(alice())),
            Rc::clone(&doc),
        );
        assert_eq!(engine.stats().totals.withheld, 1);

        reopen_conversation(&doc, "alice secret again");
        let report = engine.rescan();
        assert_eq!(report.withheld, 1);
        let window = by_id(&doc, "w");
        assert!(!doc.borrow().text_content(window).contains("secret"));
        assert_eq!(engine.ledger().len(), 1);
    }

    #[test]
    fn test_unblock_restores_latest_conversation() {
        let doc = shared(MESSAGE_PAGE);
        let mut engine = FilterEngine::start(
            settings(),
            Box::new(MemoryStore::with_list(alice())),
            Rc::clone(&doc),
        );
        reopen_conversation(&doc, "second conversation");
        engine.rescan();

        let report = engine.apply_update(&BlockList::default());
        assert_eq!(report.restored, 1);
        let window = by_id(&doc, "w");
        let text = doc.borrow().text_content(window);
        assert!(text.contains("second conversation"));
        assert!(!text.contains("first secret"));
    }

    #[test]
    fn test_scan_report_changed() {
        let report = ScanReport {
            hidden: 1,
            redacted: 2,
            withheld: 1,
            restored: 1,
            ..ScanReport::default()
        };
        assert_eq!(report.changed(), 5);
    }
}
