//! 소스 종류별 분류/추출 정책
//!
//! 두 소스는 같은 처리 루프를 공유하고, 규칙 집합과 이벤트 추출,
//! 분류 실패 시 진단 메시지만 다릅니다.

use std::sync::Arc;

use logmeter_core::event::{Event, LineRecord, SourceKind};
use tracing::warn;

use crate::extract::{extract_auth, extract_request};
use crate::rule::{RuleMatch, RuleSet};

/// 소스 종류별 정책
pub trait EventSource: Send + Sync + 'static {
    /// 소스 종류
    const KIND: SourceKind;

    /// 분류에 사용하는 규칙 집합
    fn rules(&self) -> &RuleSet;

    /// 매칭 결과에서 이벤트를 만듭니다.
    fn extract(&self, m: &RuleMatch<'_>, record: &LineRecord) -> Event;

    /// 어떤 규칙과도 매칭되지 않은 줄을 보고합니다.
    fn report_unmatched(&self, record: &LineRecord);
}

/// 인증 로그 소스
#[derive(Debug, Clone)]
pub struct AuthSource {
    rules: Arc<RuleSet>,
}

impl AuthSource {
    /// 공유 규칙 집합으로 생성합니다.
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }
}

impl EventSource for AuthSource {
    const KIND: SourceKind = SourceKind::Auth;

    fn rules(&self) -> &RuleSet {
        &self.rules
    }

    fn extract(&self, m: &RuleMatch<'_>, record: &LineRecord) -> Event {
        Event::Auth(extract_auth(m, record))
    }

    fn report_unmatched(&self, record: &LineRecord) {
        warn!(source = "auth", line = %record.text, "unknown auth log line");
    }
}

/// 요청 로그 소스
#[derive(Debug, Clone)]
pub struct RequestSource {
    rules: Arc<RuleSet>,
}

impl RequestSource {
    /// 요청 패턴 규칙 집합으로 생성합니다.
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }
}

impl EventSource for RequestSource {
    const KIND: SourceKind = SourceKind::Request;

    fn rules(&self) -> &RuleSet {
        &self.rules
    }

    fn extract(&self, m: &RuleMatch<'_>, record: &LineRecord) -> Event {
        Event::Request(extract_request(m, record))
    }

    fn report_unmatched(&self, record: &LineRecord) {
        warn!(source = "request", line = %record.text, "could not parse request line");
    }
}
