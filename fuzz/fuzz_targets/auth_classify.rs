#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::LazyLock;

use logmeter_core::event::LineRecord;
use logmeter_log_pipeline::extract::extract_auth;
use logmeter_log_pipeline::{Classification, RuleSet, auth_ruleset};

static RULES: LazyLock<Option<RuleSet>> = LazyLock::new(|| auth_ruleset().ok());

fuzz_target!(|data: &[u8]| {
    let Some(rules) = RULES.as_ref() else {
        return;
    };

    // tail은 손실 변환된 UTF-8 줄을 전달함
    let text = String::from_utf8_lossy(data);
    let record = LineRecord::now(text.as_ref());

    if let Classification::Matched(m) = rules.classify(&record.text) {
        let event = extract_auth(&m, &record);
        // 매칭된 규칙 이름이 그대로 type 레이블이 되어야 함
        assert_eq!(event.event_type, m.rule);
    }
});
