//! The cooperative single-step driver.
//!
//! [`AnalysisContext::perform_analysis_task`] is designed to be called
//! repeatedly from a host-owned loop. Each call performs the smallest unit
//! of work that makes forward progress on the most urgent pending source
//! (classify, then parse, then resolve, then element bookkeeping) and
//! returns promptly; `None` signals the fixed point.
//!
//! A partially processed source is re-inserted at the head of its class so
//! it is finished before new arrivals are started. A source whose content
//! cannot be read reaches the error state in one attempt and leaves the
//! queue for good; it never stalls the rest of the universe.

use tracing::{debug, trace};

use crate::base::{Source, SourceKind};
use crate::cache::CacheState;

use super::changes::ChangeNotice;
use super::AnalysisContext;

impl AnalysisContext {
    /// Perform one bounded unit of analysis.
    ///
    /// Returns `None` when no work is pending. Otherwise returns the change
    /// notices for whatever newly became available — possibly empty, when
    /// only internal bookkeeping advanced.
    pub fn perform_analysis_task(&mut self) -> Option<Vec<ChangeNotice>> {
        let source = self.work.next_source()?;
        trace!(path = %self.registry.path(source), "advancing source");
        let hint = self.registry.kind_hint(source);
        self.cache.entry_mut(source, hint);
        let notices = if self.is_markup_source(source) {
            self.advance_markup(source)
        } else {
            self.advance_unit(source)
        };
        Some(notices)
    }

    /// Drive analysis to its fixed point, returning every notice produced.
    ///
    /// Convenience for hosts without their own budgeted loop; the engine
    /// guarantees the fixed point is reached in finitely many steps.
    pub fn analyze_to_fixed_point(&mut self) -> Vec<ChangeNotice> {
        let mut notices = Vec::new();
        while let Some(batch) = self.perform_analysis_task() {
            notices.extend(batch);
        }
        notices
    }

    fn advance_markup(&mut self, source: Source) -> Vec<ChangeNotice> {
        let parse_state = match self.cache.get(source) {
            Some(entry) => entry.parse_state(),
            None => return self.finish(source),
        };
        match parse_state {
            CacheState::Invalid => match self.ensure_markup_parsed(source) {
                Ok(_) => {
                    self.reinsert(source);
                    vec![self.notice_after_parse(source)]
                }
                Err(_) => self.finish(source),
            },
            CacheState::Valid => {
                let resolution_state = self
                    .cache
                    .get(source)
                    .and_then(|entry| entry.markup())
                    .map(|data| data.resolution_errors.state())
                    .unwrap_or(CacheState::Valid);
                if resolution_state == CacheState::Invalid {
                    match self.ensure_markup_resolved(source) {
                        Ok(_) => {
                            let notice = self.notice_with_errors(source);
                            self.finish_with(source, vec![notice])
                        }
                        Err(_) => self.finish(source),
                    }
                } else {
                    self.finish(source)
                }
            }
            CacheState::Error | CacheState::InProcess => self.finish(source),
        }
    }

    fn advance_unit(&mut self, source: Source) -> Vec<ChangeNotice> {
        let parse_state = match self.cache.get(source) {
            Some(entry) => entry.parse_state(),
            None => return self.finish(source),
        };
        match parse_state {
            CacheState::Invalid => match self.ensure_unit_parsed(source) {
                Ok(_) => {
                    // Parsing classified the source; move it to its
                    // kind-derived class and keep going next call.
                    self.reinsert(source);
                    vec![self.notice_after_parse(source)]
                }
                Err(_) => self.finish(source),
            },
            CacheState::Valid => self.advance_parsed_unit(source),
            CacheState::Error | CacheState::InProcess => self.finish(source),
        }
    }

    fn advance_parsed_unit(&mut self, source: Source) -> Vec<ChangeNotice> {
        let kind = self
            .cache
            .get(source)
            .and_then(|entry| entry.kind.get().copied())
            .unwrap_or(SourceKind::Unknown);
        let owners: Vec<Source> = match kind {
            SourceKind::Library => vec![source],
            SourceKind::Part => self.libraries_containing(source),
            // A markup entry never reaches here; anything else has no
            // deducible resolution work.
            _ => Vec::new(),
        };
        let next_owner = owners.into_iter().find(|&library| {
            self.cache
                .get(source)
                .and_then(|entry| entry.unit())
                .map_or(false, |data| {
                    data.resolution(library)
                        .map_or(true, |r| r.resolved_unit.state() == CacheState::Invalid)
                })
        });

        if let Some(library) = next_owner {
            return match self.ensure_unit_resolved(source, library) {
                Ok(_) => {
                    let notice = self.notice_with_errors(source);
                    if self.has_outstanding_unit_work(source) {
                        self.reinsert(source);
                    } else {
                        self.work.remove(source);
                    }
                    vec![notice]
                }
                Err(_) => self.finish(source),
            };
        }

        if kind == SourceKind::Library && self.needs_element_work(source) {
            debug!(path = %self.registry.path(source), "materializing library element");
            // Element and flags are internal bookkeeping; no new
            // user-visible diagnostics either way.
            let _ = self
                .ensure_library_element(source)
                .and_then(|_| self.ensure_client_flag(source));
        }
        self.finish(source)
    }

    // ---- bookkeeping helpers ----

    /// Remove a finished (or terminally failed) source from the queue.
    fn finish(&mut self, source: Source) -> Vec<ChangeNotice> {
        self.work.remove(source);
        Vec::new()
    }

    fn finish_with(&mut self, source: Source, notices: Vec<ChangeNotice>) -> Vec<ChangeNotice> {
        self.work.remove(source);
        notices
    }

    /// Requeue a partially processed source at the head of its class, so it
    /// is finished before new arrivals. Pinned sources stay where they are.
    fn reinsert(&mut self, source: Source) {
        if self.work.is_pinned(source) {
            return;
        }
        let class = self.class_for(source);
        self.work.add_first(source, class);
    }

    fn needs_element_work(&self, source: Source) -> bool {
        self.cache
            .get(source)
            .and_then(|entry| entry.unit())
            .is_some_and(|data| {
                data.element.state() == CacheState::Invalid
                    || data.is_client.state() == CacheState::Invalid
            })
    }

    fn has_outstanding_unit_work(&self, source: Source) -> bool {
        let Some(entry) = self.cache.get(source) else {
            return false;
        };
        let Some(data) = entry.unit() else {
            return false;
        };
        match entry.kind.get() {
            Some(SourceKind::Library) => {
                data.resolution(source)
                    .is_none_or(|r| r.resolved_unit.state() == CacheState::Invalid)
                    || data.element.state() == CacheState::Invalid
                    || data.is_client.state() == CacheState::Invalid
            }
            Some(SourceKind::Part) => self.libraries_containing(source).iter().any(|&library| {
                data.resolution(library)
                    .is_none_or(|r| r.resolved_unit.state() == CacheState::Invalid)
            }),
            _ => false,
        }
    }

    fn notice_after_parse(&self, source: Source) -> ChangeNotice {
        let mut notice = ChangeNotice::new(source);
        if let Some(entry) = self.cache.get(source) {
            notice.line_info = entry.line_info.get().cloned();
            notice.errors = entry.parse_errors().map(|errors| errors.to_vec());
        }
        notice
    }

    fn notice_with_errors(&self, source: Source) -> ChangeNotice {
        let mut notice = ChangeNotice::new(source);
        if let Some(entry) = self.cache.get(source) {
            notice.line_info = entry.line_info.get().cloned();
        }
        notice.errors = Some(self.collect_available_errors(source));
        notice
    }
}
