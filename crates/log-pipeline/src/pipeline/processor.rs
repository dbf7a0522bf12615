//! 줄 단위 처리 -- classify → extract → enrich → record
//!
//! [`LineProcessor::process`]는 줄 하나를 동기적으로 끝까지 처리합니다.
//! 파이프라인 태스크는 도착 순서대로 이 함수를 호출합니다.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use logmeter_core::event::{Event, LineRecord};
use logmeter_core::metrics as m;
use metrics::counter;
use serde::Serialize;
use tracing::trace;

use super::source::EventSource;
use crate::enrich::Enricher;
use crate::rule::Classification;
use crate::sink::MetricSink;

/// 줄 하나의 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// 이벤트로 기록됨 (`located`: location 카운터도 증가)
    Recorded { located: bool },
    /// 무시 규칙에 걸림
    Ignored,
    /// 어떤 규칙과도 매칭되지 않음
    Unmatched,
}

/// 파이프라인 처리 통계
///
/// 파이프라인과 처리 태스크가 공유합니다. 카운트와 함께 마지막으로 기록된
/// 이벤트를 진단용으로 보관합니다.
#[derive(Debug, Default)]
pub struct PipelineStats {
    lines_read: AtomicU64,
    events_recorded: AtomicU64,
    locations_recorded: AtomicU64,
    lines_ignored: AtomicU64,
    lines_unmatched: AtomicU64,
    last_line_unix_ms: AtomicU64,
    last_event: Mutex<Option<Event>>,
}

/// 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// 읽은 줄 수
    pub lines_read: u64,
    /// 기록된 이벤트 수
    pub events_recorded: u64,
    /// 위치가 기록된 이벤트 수
    pub locations_recorded: u64,
    /// 무시된 줄 수
    pub lines_ignored: u64,
    /// 매칭 실패 줄 수
    pub lines_unmatched: u64,
    /// 마지막 줄 도착 시각 (Unix epoch 밀리초, 없으면 0)
    pub last_line_unix_ms: u64,
}

impl PipelineStats {
    /// 현재 값을 읽습니다.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            events_recorded: self.events_recorded.load(Ordering::Relaxed),
            locations_recorded: self.locations_recorded.load(Ordering::Relaxed),
            lines_ignored: self.lines_ignored.load(Ordering::Relaxed),
            lines_unmatched: self.lines_unmatched.load(Ordering::Relaxed),
            last_line_unix_ms: self.last_line_unix_ms.load(Ordering::Relaxed),
        }
    }

    /// 마지막으로 기록된 이벤트를 반환합니다.
    pub fn last_event(&self) -> Option<Event> {
        match self.last_event.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_last_event(&self, event: Event) {
        let mut guard = match self.last_event.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(event);
    }

    fn line_read(&self, arrived_at: SystemTime) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
        let ms = arrived_at
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        self.last_line_unix_ms.store(ms, Ordering::Relaxed);
    }
}

/// 소스 하나의 줄 처리기
pub struct LineProcessor<S> {
    source: S,
    enricher: Arc<Enricher>,
    sink: MetricSink,
    stats: Arc<PipelineStats>,
}

impl<S: EventSource> LineProcessor<S> {
    /// 새 처리기를 생성합니다.
    pub fn new(source: S, enricher: Arc<Enricher>) -> Self {
        Self {
            source,
            enricher,
            sink: MetricSink::new(),
            stats: Arc::new(PipelineStats::default()),
        }
    }

    /// 공유 통계 핸들을 반환합니다.
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// 줄 하나를 처리합니다.
    pub fn process(&self, record: &LineRecord) -> LineOutcome {
        let source = S::KIND.as_str();
        self.stats.line_read(record.arrived_at);
        counter!(m::LINES_READ_TOTAL, m::LABEL_SOURCE => source).increment(1);

        match self.source.rules().classify(&record.text) {
            Classification::Matched(matched) => {
                let mut event = self.source.extract(&matched, record);
                let location = self.enricher.enrich(&mut event);
                self.sink.record(&event, location.as_ref());

                self.stats.events_recorded.fetch_add(1, Ordering::Relaxed);
                if location.is_some() {
                    self.stats.locations_recorded.fetch_add(1, Ordering::Relaxed);
                }
                trace!(%event, "recorded event");
                self.stats.set_last_event(event);
                LineOutcome::Recorded {
                    located: location.is_some(),
                }
            }
            Classification::Ignored => {
                self.stats.lines_ignored.fetch_add(1, Ordering::Relaxed);
                counter!(m::LINES_IGNORED_TOTAL, m::LABEL_SOURCE => source).increment(1);
                trace!(source, line = %record.text, "ignored log line");
                LineOutcome::Ignored
            }
            Classification::Unmatched => {
                self.stats.lines_unmatched.fetch_add(1, Ordering::Relaxed);
                counter!(m::LINES_UNMATCHED_TOTAL, m::LABEL_SOURCE => source).increment(1);
                self.source.report_unmatched(record);
                LineOutcome::Unmatched
            }
        }
    }
}
