use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Calendar date of a UTC instant after shifting by `offset_minutes` east of
/// UTC. The daily streak and weekly activity are computed over these dates.
pub fn local_date(dt: DateTime<Utc>, offset_minutes: i32) -> NaiveDate {
    let offset = FixedOffset::east_opt(offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    dt.with_timezone(&offset).date_naive()
}

pub fn today_local(offset_minutes: i32) -> NaiveDate {
    local_date(Utc::now(), offset_minutes)
}
