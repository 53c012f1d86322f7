//! The restricted `time`/`clock` administrative command.
//!
//! One line in, one human-readable status line out. Every mutation goes
//! through the facade and every status line reports the post-operation
//! authoritative value, so an operator always sees what the clock
//! actually holds -- including after a rejected or skipped write.
//!
//! ```text
//! time set <hour> <minute> [second]
//! time get
//! time date <day> <month> <year>
//! time pause [true|false]          (bare form toggles)
//! time sync
//! time save
//! time day|night start get|set <hour>
//! time day|night ms get|set <milliseconds>
//! ```

use timekeeper_core::facade::ClockFacade;
use timekeeper_types::ClockReading;

/// The usage line returned for unrecognized input.
const USAGE: &str = "usage: time set <h> <m> [s] | get | date <d> <mo> <y> | pause [true|false] | sync | save | day|night start|ms get|set <value>";

/// Parse an argument at `index`, falling back to `default` when it is
/// missing or unparseable.
fn arg_as<T: core::str::FromStr>(args: &[&str], index: usize, default: T) -> T {
    args.get(index)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// Execute one administrative command line against the facade and return
/// the status line.
pub async fn execute(line: &str, facade: &ClockFacade) -> String {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    // Accept both a bare subcommand and the full `time <sub>` form.
    let args = match tokens.split_first() {
        Some((&first, rest)) if first == "time" || first == "clock" => rest,
        _ => tokens.as_slice(),
    };
    let sub = args.first().map(|s| s.to_lowercase()).unwrap_or_default();

    match sub.as_str() {
        "set" => {
            let hour = arg_as(args, 1, 0_u32);
            let minute = arg_as(args, 2, 0_u32);
            let second = arg_as(args, 3, 0_u32);
            facade.set_time(hour, minute, second).await;
            format!(
                "Clock set to {:02}:{:02}:{:02}",
                facade.hours(0),
                facade.minutes(0),
                facade.seconds(0)
            )
        }
        "get" => {
            let reading = facade.reading(ClockReading::epoch_default());
            format!(
                "Current clock is {:04}-{:02}-{:02} {:02}:{:02}:{:02} ({}){}",
                reading.year,
                reading.month,
                reading.day,
                reading.hour,
                reading.minute,
                reading.second,
                if reading.is_day { "day" } else { "night" },
                if reading.paused { ", paused" } else { "" }
            )
        }
        "date" => {
            let current = facade.reading(ClockReading::epoch_default());
            let day = arg_as(args, 1, current.day);
            let month = arg_as(args, 2, current.month);
            let year = arg_as(args, 3, current.year);
            facade.set_date(day, month, year).await;
            let reading = facade.reading(ClockReading::epoch_default());
            format!(
                "Clock date set to {:04}-{:02}-{:02}",
                reading.year, reading.month, reading.day
            )
        }
        "pause" | "freeze" => {
            match args.get(1).copied() {
                Some("true") => {
                    facade.set_paused(true).await;
                }
                Some("false") => {
                    facade.set_paused(false).await;
                }
                _ => {
                    let paused = facade.paused(false);
                    facade.set_paused(!paused).await;
                }
            }
            if facade.paused(false) {
                String::from("Clock has been paused")
            } else {
                String::from("Clock has been unpaused")
            }
        }
        "sync" => {
            facade.sync().await;
            String::from("Clock state republished to all observers")
        }
        "save" => {
            facade.save().await;
            String::from("Clock state saved")
        }
        "day" | "night" => day_night(&sub, args, facade).await,
        _ => String::from(USAGE),
    }
}

/// Handle the `day`/`night` subcommands (`start` and `ms`, `get`/`set`).
async fn day_night(period: &str, args: &[&str], facade: &ClockFacade) -> String {
    let is_day = period == "day";
    let label = if is_day { "Day" } else { "Night" };

    match args.get(1).copied() {
        Some("start") => {
            let current = if is_day {
                facade.day_start_hour(timekeeper_types::defaults::DAY_START_HOUR)
            } else {
                facade.night_start_hour(timekeeper_types::defaults::NIGHT_START_HOUR)
            };
            match args.get(2).copied().unwrap_or("get") {
                "set" => {
                    let hour = arg_as(args, 3, i64::from(current));
                    if is_day {
                        facade.set_day_start_hour(hour).await;
                    } else {
                        facade.set_night_start_hour(hour).await;
                    }
                    let stored = if is_day {
                        facade.day_start_hour(timekeeper_types::defaults::DAY_START_HOUR)
                    } else {
                        facade.night_start_hour(timekeeper_types::defaults::NIGHT_START_HOUR)
                    };
                    format!("{label} start hour set to {stored}")
                }
                _ => format!("{label} currently starts at {current}"),
            }
        }
        Some("ms") => {
            let current = if is_day {
                facade.day_ms_per_minute(timekeeper_types::defaults::MS_PER_GAME_MINUTE)
            } else {
                facade.night_ms_per_minute(timekeeper_types::defaults::MS_PER_GAME_MINUTE)
            };
            match args.get(2).copied().unwrap_or("get") {
                "set" => {
                    let ms = arg_as(args, 3, i64::from(current));
                    if is_day {
                        facade.set_day_ms_per_minute(ms).await;
                    } else {
                        facade.set_night_ms_per_minute(ms).await;
                    }
                    let stored = if is_day {
                        facade.day_ms_per_minute(timekeeper_types::defaults::MS_PER_GAME_MINUTE)
                    } else {
                        facade.night_ms_per_minute(timekeeper_types::defaults::MS_PER_GAME_MINUTE)
                    };
                    format!("{label} minute now lasts {stored}ms")
                }
                _ => format!("{label} minute currently lasts {current}ms"),
            }
        }
        _ => String::from(USAGE),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use timekeeper_core::authority::ClockAuthority;
    use timekeeper_core::config::ClockConfig;
    use timekeeper_core::facade::{ClockApi, ClockFacade};
    use timekeeper_store::{MemoryStore, TickStore};
    use timekeeper_types::GameInstant;

    use super::*;

    async fn facade_at(hour: u32, minute: u32) -> (ClockFacade, Arc<ClockAuthority>) {
        let encoded = GameInstant::from_ticks(0)
            .unwrap()
            .with_date(2024, 6, 15)
            .unwrap()
            .with_time(hour, minute, 0)
            .unwrap()
            .encode();
        let store = Arc::new(MemoryStore::with_value(&encoded));
        let authority =
            ClockAuthority::start(&ClockConfig::default(), store as Arc<dyn TickStore>).await;
        let facade = ClockFacade::new();
        facade.attach(Arc::clone(&authority) as Arc<dyn ClockApi>);
        (facade, authority)
    }

    #[tokio::test]
    async fn set_reports_the_post_operation_time() {
        let (facade, authority) = facade_at(3, 0).await;
        let status = execute("time set 10 30", &facade).await;
        assert_eq!(status, "Clock set to 10:30:00");
        assert_eq!(authority.reading().hour, 10);
    }

    #[tokio::test]
    async fn get_reports_date_time_and_regime() {
        let (facade, _authority) = facade_at(10, 30).await;
        let status = execute("time get", &facade).await;
        assert_eq!(status, "Current clock is 2024-06-15 10:30:00 (day)");
    }

    #[tokio::test]
    async fn date_jump_reports_the_new_date() {
        let (facade, authority) = facade_at(10, 30).await;
        let status = execute("time date 1 1 2030", &facade).await;
        assert_eq!(status, "Clock date set to 2030-01-01");
        assert_eq!(authority.reading().year, 2030);
        // Time of day survives the jump.
        assert_eq!(authority.reading().hour, 10);
    }

    #[tokio::test]
    async fn invalid_date_reports_the_unchanged_value() {
        let (facade, authority) = facade_at(10, 30).await;
        let status = execute("time date 30 2 2023", &facade).await;
        // The write was rejected; the status line shows what the clock
        // still holds.
        assert_eq!(status, "Clock date set to 2024-06-15");
        assert_eq!(authority.reading().day, 15);
    }

    #[tokio::test]
    async fn pause_toggles_without_an_argument() {
        let (facade, authority) = facade_at(10, 30).await;
        assert_eq!(execute("time pause", &facade).await, "Clock has been paused");
        assert!(authority.reading().paused);
        assert_eq!(
            execute("time pause", &facade).await,
            "Clock has been unpaused"
        );
        assert!(!authority.reading().paused);
        assert_eq!(
            execute("time pause true", &facade).await,
            "Clock has been paused"
        );
        assert!(authority.reading().paused);
    }

    #[tokio::test]
    async fn freeze_is_an_alias_for_pause() {
        let (facade, _authority) = facade_at(10, 30).await;
        assert_eq!(
            execute("clock freeze true", &facade).await,
            "Clock has been paused"
        );
    }

    #[tokio::test]
    async fn day_start_get_and_set() {
        let (facade, authority) = facade_at(10, 30).await;
        assert_eq!(
            execute("time day start", &facade).await,
            "Day currently starts at 6"
        );
        assert_eq!(
            execute("time day start set 8", &facade).await,
            "Day start hour set to 8"
        );
        assert_eq!(authority.reading().day_start_hour, 8);
        // Out-of-range input is clamped, and the clamped value is
        // reported.
        assert_eq!(
            execute("time night start set 99", &facade).await,
            "Night start hour set to 23"
        );
    }

    #[tokio::test]
    async fn duration_set_reports_rejections_via_the_unchanged_value() {
        let (facade, authority) = facade_at(10, 30).await;
        assert_eq!(
            execute("time day ms set 500", &facade).await,
            "Day minute now lasts 500ms"
        );
        assert_eq!(authority.reading().day_ms_per_minute, 500);
        // A non-positive duration is rejected; the status shows the value
        // still in effect.
        assert_eq!(
            execute("time night ms set 0", &facade).await,
            "Night minute now lasts 2000ms"
        );
        assert_eq!(authority.reading().night_ms_per_minute, 2000);
    }

    #[tokio::test]
    async fn unknown_input_yields_usage_not_an_error() {
        let (facade, _authority) = facade_at(10, 30).await;
        let status = execute("time shuffle", &facade).await;
        assert!(status.starts_with("usage:"));
        let status = execute("", &facade).await;
        assert!(status.starts_with("usage:"));
    }

    #[tokio::test]
    async fn inactive_facade_still_answers_with_defaults() {
        let facade = ClockFacade::new();
        let status = execute("time get", &facade).await;
        // Degraded but well-formed: the epoch default reading.
        assert_eq!(status, "Current clock is 0001-01-01 00:00:00 (night)");
        let status = execute("time set 10 30", &facade).await;
        assert_eq!(status, "Clock set to 00:00:00");
    }
}
