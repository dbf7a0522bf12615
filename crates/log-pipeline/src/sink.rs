//! 메트릭 싱크 -- 이벤트를 레이블이 붙은 카운터 증가로 변환
//!
//! 이벤트 하나당 "line" 카운터를 항상 1 증가시키고, 위치 정보가 있으면
//! "location" 카운터를 추가로 1 증가시킵니다.
//!
//! 레이블 값은 모두 유한한 집합에서 나옵니다. 원시 IP와 원문은 레이블로 쓰지 않습니다.

use logmeter_core::event::{Event, GeoLocation};
use logmeter_core::metrics as m;
use metrics::{Label, counter};

/// 카운터 이름과 순서 있는 레이블 튜플
///
/// 같은 논리 이벤트는 항상 같은 키를 만들어 같은 시계열로 집계됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricKey {
    /// 카운터 이름
    pub name: &'static str,
    /// (레이블 이름, 값) 목록
    pub labels: Vec<(&'static str, String)>,
}

impl MetricKey {
    /// `metrics` 레이블 목록으로 변환합니다.
    pub fn to_labels(&self) -> Vec<Label> {
        self.labels
            .iter()
            .map(|(k, v)| Label::new(*k, v.clone()))
            .collect()
    }

    /// 레이블 값을 이름으로 찾습니다.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// 이벤트를 카운터로 기록하는 싱크
#[derive(Debug, Clone, Default)]
pub struct MetricSink;

impl MetricSink {
    /// 싱크를 생성하고 카운터 설명을 등록합니다.
    pub fn new() -> Self {
        m::describe_all();
        Self
    }

    /// 이벤트의 "line" 카운터 키를 만듭니다.
    pub fn line_key(event: &Event) -> MetricKey {
        match event {
            Event::Auth(e) => MetricKey {
                name: m::AUTH_LINES_TOTAL,
                labels: vec![
                    (m::LABEL_HOSTNAME, e.hostname.clone()),
                    (m::LABEL_PROCESS, e.process.clone()),
                    (m::LABEL_TYPE, e.event_type.clone()),
                    (m::LABEL_USER, e.username.clone().unwrap_or_default()),
                    (m::LABEL_INTERNAL, e.internal.to_string()),
                ],
            },
            Event::Request(e) => MetricKey {
                name: m::REQUEST_LINES_TOTAL,
                labels: vec![
                    (m::LABEL_DOMAIN, e.domain.clone()),
                    (m::LABEL_METHOD, e.method.clone()),
                    (m::LABEL_STATUS, e.status.to_string()),
                    (m::LABEL_INTERNAL, e.internal.to_string()),
                ],
            },
        }
    }

    /// 이벤트의 "location" 카운터 키를 만듭니다. 요청 이벤트는 `domain`이 맨 앞입니다.
    pub fn location_key(event: &Event, location: &GeoLocation) -> MetricKey {
        let (name, mut labels) = match event {
            Event::Auth(_) => (m::AUTH_LOCATIONS_TOTAL, Vec::with_capacity(5)),
            Event::Request(e) => {
                let mut labels = Vec::with_capacity(6);
                labels.push((m::LABEL_DOMAIN, e.domain.clone()));
                (m::REQUEST_LOCATIONS_TOTAL, labels)
            }
        };
        labels.extend([
            (m::LABEL_CONTINENT_CODE, location.continent_code.clone()),
            (m::LABEL_CONTINENT_NAME, location.continent_name.clone()),
            (m::LABEL_COUNTRY_CODE, location.country_code.clone()),
            (m::LABEL_COUNTRY_NAME, location.country_name.clone()),
            (m::LABEL_CITY, location.city.clone()),
        ]);
        MetricKey { name, labels }
    }

    /// 이벤트를 기록합니다.
    pub fn record(&self, event: &Event, location: Option<&GeoLocation>) {
        let key = Self::line_key(event);
        counter!(key.name, key.to_labels()).increment(1);

        if let Some(location) = location {
            let key = Self::location_key(event, location);
            counter!(key.name, key.to_labels()).increment(1);
        }
    }
}
