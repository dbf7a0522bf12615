#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use logmeter_core::config::DEFAULT_REQUEST_PATTERN;
use logmeter_core::event::LineRecord;
use logmeter_log_pipeline::extract::extract_request;
use logmeter_log_pipeline::{Classification, request_ruleset};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 사용자 정의 패턴 (None이면 기본 패턴)
    pattern: Option<String>,
    /// 매칭 대상 줄
    line: String,
}

fuzz_target!(|input: FuzzInput| {
    let pattern = input.pattern.as_deref().unwrap_or(DEFAULT_REQUEST_PATTERN);

    // 필수 그룹이 없거나 잘못된 패턴은 에러로 거부되어야 하고 크래시는 안 됨
    let Ok(rules) = request_ruleset(pattern) else {
        return;
    };

    let record = LineRecord::now(input.line.as_str());
    if let Classification::Matched(m) = rules.classify(&record.text) {
        let _ = extract_request(&m, &record);
    }
});
