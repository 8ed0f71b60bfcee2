use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::model::global_error::AppError;

// 교시 선택: 이름표 + 고정 HH:MM 시각 쌍 + 과목 집합.
// 교시 구성은 호출자가 요청에 실어 보내며 엔진이 따로 저장하지 않는다.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotSelection {
    pub label: String,
    pub start_time: String,
    pub end_time: String,
    pub subjects: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// 0=일요일 .. 6=토요일
    pub weekdays: Vec<u8>,
    pub slots: Vec<SlotSelection>,
    pub description: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// 0=일요일 .. 6=토요일
    pub weekdays: Vec<u8>,
    pub teacher_id: Option<i32>,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub target: String,
    pub error: AppError,
}

// 항목별 성공/실패를 누적하는 배치 결과. 카운터 대신 값으로 모은다.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub successes: Vec<T>,
    pub failures: Vec<BatchFailure>,
}

impl<T> BatchOutcome<T> {
    pub fn new() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|failure| format!("{} 처리 중 오류: {}", failure.target, failure.error))
            .collect()
    }
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchResultResponse {
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<String>,
}

impl<T> From<&BatchOutcome<T>> for BatchResultResponse {
    fn from(outcome: &BatchOutcome<T>) -> Self {
        Self {
            success_count: outcome.success_count(),
            failure_count: outcome.failure_count(),
            errors: outcome.error_messages(),
        }
    }
}
