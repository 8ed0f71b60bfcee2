use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use crate::model::global_error::{AppError, ErrorCode};

/// 구간 [start_date, end_date]에서 요일 집합(0=일..6=토)에 속하는 날짜를
/// 오름차순으로 돌려준다. 구간이 비었거나 요일 집합이 비면 빈 벡터.
pub fn generate_dates(start_date: NaiveDate, end_date: NaiveDate, weekdays: &[u8]) -> Vec<NaiveDate> {
    if weekdays.is_empty() || start_date > end_date {
        return Vec::new();
    }

    let mut dates = Vec::new();
    let mut current = start_date;
    loop {
        let day_of_week = current.weekday().num_days_from_sunday() as u8;
        if weekdays.contains(&day_of_week) {
            dates.push(current);
        }
        if current >= end_date {
            break;
        }
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }

    dates
}

/// 날짜와 교시의 고정 HH:MM 쌍을 합쳐 UTC 시각 쌍으로 만든다.
pub fn resolve_slot_times(
    date: NaiveDate,
    start: &str,
    end: &str,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let start_time = parse_slot_time(start)?;
    let end_time = parse_slot_time(end)?;

    let start_at = date.and_time(start_time).and_utc();
    let end_at = date.and_time(end_time).and_utc();

    if start_at >= end_at {
        return Err(AppError::bad_request(ErrorCode::InvalidTimeRange));
    }

    Ok((start_at, end_at))
}

fn parse_slot_time(value: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| AppError::with_detail(
            ErrorCode::ValidationError,
            format!("잘못된 시간 형식입니다: {}", value),
        ))
}

/// 과목 집합을 쉼표 문자열로 직렬화한다. 공백 항목은 버리고
/// 첫 등장 순서를 유지한 채 중복을 제거한다.
pub fn join_subjects(subjects: &[String]) -> String {
    let mut joined: Vec<&str> = Vec::new();
    for subject in subjects {
        let trimmed = subject.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !joined.contains(&trimmed) {
            joined.push(trimmed);
        }
    }

    joined.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::global_error::ErrorCode;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn generate_dates_picks_matching_weekdays() {
        // 2024-01-01은 월요일
        let dates = generate_dates(date(2024, 1, 1), date(2024, 1, 14), &[1, 3]);

        assert_eq!(
            dates,
            vec![
                date(2024, 1, 1),
                date(2024, 1, 3),
                date(2024, 1, 8),
                date(2024, 1, 10),
            ]
        );
    }

    #[test]
    fn generate_dates_empty_weekday_set_yields_nothing() {
        assert!(generate_dates(date(2024, 1, 1), date(2024, 1, 31), &[]).is_empty());
    }

    #[test]
    fn generate_dates_inverted_range_yields_nothing() {
        assert!(generate_dates(date(2024, 1, 14), date(2024, 1, 1), &[1]).is_empty());
    }

    #[test]
    fn generate_dates_single_day_range() {
        // 2024-01-07은 일요일(0)
        assert_eq!(
            generate_dates(date(2024, 1, 7), date(2024, 1, 7), &[0]),
            vec![date(2024, 1, 7)]
        );
        assert!(generate_dates(date(2024, 1, 7), date(2024, 1, 7), &[6]).is_empty());
    }

    #[test]
    fn generate_dates_duplicate_weekday_input_does_not_duplicate_dates() {
        let dates = generate_dates(date(2024, 1, 1), date(2024, 1, 7), &[1, 1, 1]);
        assert_eq!(dates, vec![date(2024, 1, 1)]);
    }

    #[test]
    fn generate_dates_covers_saturday_boundary() {
        // 2024-01-06은 토요일(6)
        let dates = generate_dates(date(2024, 1, 1), date(2024, 1, 7), &[6]);
        assert_eq!(dates, vec![date(2024, 1, 6)]);
    }

    #[test]
    fn resolve_slot_times_combines_date_and_clock() {
        let (start, end) = resolve_slot_times(date(2024, 3, 4), "18:45", "20:05").unwrap();

        assert_eq!(start.to_rfc3339(), "2024-03-04T18:45:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-03-04T20:05:00+00:00");
    }

    #[test]
    fn resolve_slot_times_rejects_inverted_or_equal_pair() {
        let err = resolve_slot_times(date(2024, 3, 4), "20:05", "18:45").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTimeRange);

        let err = resolve_slot_times(date(2024, 3, 4), "18:45", "18:45").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTimeRange);
    }

    #[test]
    fn resolve_slot_times_rejects_malformed_clock() {
        let err = resolve_slot_times(date(2024, 3, 4), "25:61", "26:00").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn join_subjects_dedupes_and_keeps_first_occurrence_order() {
        let subjects = vec![
            "수학".to_string(),
            "영어".to_string(),
            " 수학 ".to_string(),
            "".to_string(),
            "과학".to_string(),
        ];

        assert_eq!(join_subjects(&subjects), "수학, 영어, 과학");
    }

    #[test]
    fn join_subjects_all_blank_yields_empty_string() {
        let subjects = vec!["".to_string(), "   ".to_string()];
        assert_eq!(join_subjects(&subjects), "");
    }
}
