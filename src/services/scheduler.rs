use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::services::agent::{run_full_batch, BatchAgent};

/// The full-batch run fires on alternate calendar weeks: even ISO week
/// numbers only. Pure predicate, no side effects.
pub fn is_even_week(date: NaiveDate) -> bool {
    date.iso_week().week() % 2 == 0
}

/// Next Sunday 01:00 UTC strictly after `now`.
pub fn next_batch_window(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let days_until_sunday = (7 - today.weekday().num_days_from_sunday()) % 7;
    let batch_time = NaiveTime::from_hms_opt(1, 0, 0).unwrap_or_default();

    let candidate = today + chrono::Days::new(days_until_sunday as u64);
    let mut window = Utc.from_utc_datetime(&candidate.and_time(batch_time));
    if window <= now {
        window += Duration::days(7);
    }
    window
}

/// Detached weekly loop: sleep until the next batch window, consult the
/// week gate, run the full batch on even weeks.
pub fn spawn_weekly_batch(agent: Arc<dyn BatchAgent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let window = next_batch_window(now);
            let wait = (window - now).to_std().unwrap_or(std::time::Duration::ZERO);
            tracing::info!(window = %window, "Next full-batch window scheduled");
            tokio::time::sleep(wait).await;

            let today = Utc::now().date_naive();
            let week = today.iso_week().week();
            if is_even_week(today) {
                tracing::info!(week = week, "Even week, running recommendation batch");
                run_full_batch(agent.as_ref()).await;
            } else {
                tracing::info!(week = week, "Odd week, batch agent rests");
            }
        }
    })
}
