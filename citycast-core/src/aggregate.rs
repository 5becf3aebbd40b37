//! Collapses the 3-hour forecast feed into daily summaries.

use chrono::NaiveDate;

use crate::model::{FORECAST_DAYS, Forecast, RawReading};

/// Latest local hour a reading may have and still describe the day.
pub const REPRESENTATIVE_HOUR: u32 = 14;

/// Builds up to [`FORECAST_DAYS`] daily forecasts from readings in ascending
/// time order.
///
/// Only days strictly after `today` are kept. Readings are grouped by local
/// date in one pass, so an out-of-order feed produces split days rather than
/// being sorted. Entry `i` of the result is the i-th future day present in
/// the feed, which is not necessarily `today + i + 1`.
pub fn aggregate(readings: &[RawReading], today: NaiveDate) -> Vec<Forecast> {
    let mut days = Vec::with_capacity(FORECAST_DAYS);
    let mut open: Option<DayBucket> = None;

    for reading in readings {
        let date = reading.local_date();
        if date <= today {
            continue;
        }

        let bucket = match open.take() {
            Some(bucket) if bucket.date == date => bucket,
            Some(finished) => {
                days.push(finished.finish());
                if days.len() == FORECAST_DAYS {
                    break;
                }
                DayBucket::new(date)
            }
            None => DayBucket::new(date),
        };

        open = Some(bucket.absorb(reading));
    }

    if let Some(last) = open {
        if days.len() < FORECAST_DAYS {
            days.push(last.finish());
        }
    }

    tracing::debug!(readings = readings.len(), days = days.len(), "aggregated forecast feed");
    days
}

struct DayBucket {
    date: NaiveDate,
    min: f64,
    max: f64,
    snapshot: Forecast,
}

impl DayBucket {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            snapshot: Forecast::default(),
        }
    }

    fn absorb(mut self, reading: &RawReading) -> Self {
        self.min = self.min.min(reading.temp_min);
        self.max = self.max.max(reading.temp_max);

        if reading.local_hour() <= REPRESENTATIVE_HOUR {
            let snapshot = &mut self.snapshot;
            snapshot.observed_at = Some(reading.timestamp);
            snapshot.icon = reading.icon.clone();
            snapshot.description = reading.description.clone();
            snapshot.temperature = reading.temperature;
            snapshot.feels_like = reading.feels_like;
            snapshot.humidity = reading.humidity;
            snapshot.wind = reading.wind_speed;
            snapshot.wind_degrees = reading.wind_degrees;
            snapshot.wind_gust = reading.wind_gust;
        }

        self
    }

    fn finish(self) -> Forecast {
        Forecast {
            date: Some(self.date),
            min: self.min,
            max: self.max,
            has_data: true,
            ..self.snapshot
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn reading(day: u32, hour: u32, temp_min: f64, temp_max: f64, icon: &str) -> RawReading {
        let local: NaiveDateTime = NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        RawReading {
            timestamp: Utc.from_utc_datetime(&local),
            local,
            temperature: (temp_min + temp_max) / 2.0,
            feels_like: temp_min,
            temp_min,
            temp_max,
            icon: icon.to_string(),
            description: format!("sky {icon}"),
            humidity: 60,
            wind_speed: 4.2,
            wind_degrees: 180,
            wind_gust: 7.5,
        }
    }

    /// Eight readings per day, 00:00 through 21:00.
    fn full_days(first_day: u32, count: u32) -> Vec<RawReading> {
        (first_day..first_day + count)
            .flat_map(|day| (0..8).map(move |slot| reading(day, slot * 3, 10.0, 20.0, "02d")))
            .collect()
    }

    #[test]
    fn empty_feed_gives_no_days() {
        assert!(aggregate(&[], today()).is_empty());
    }

    #[test]
    fn min_and_max_span_the_whole_day() {
        let readings = vec![
            reading(11, 6, 5.0, 15.0, "01d"),
            reading(11, 9, 3.0, 20.0, "01d"),
            reading(11, 12, 9.0, 12.0, "01d"),
        ];

        let days = aggregate(&readings, today());

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].min, 3.0);
        assert_eq!(days[0].max, 20.0);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 6, 11));
        assert!(days[0].has_data);
    }

    #[test]
    fn last_reading_up_to_two_pm_represents_the_day() {
        let readings = vec![
            reading(11, 9, 10.0, 20.0, "01d"),
            reading(11, 12, 10.0, 20.0, "02d"),
            reading(11, 15, 10.0, 20.0, "03d"),
            reading(11, 18, 10.0, 20.0, "04d"),
        ];

        let days = aggregate(&readings, today());

        assert_eq!(days[0].icon, "02d");
        assert_eq!(days[0].description, "sky 02d");
    }

    #[test]
    fn day_without_midday_reading_keeps_empty_snapshot() {
        let readings = vec![reading(11, 15, 8.0, 16.0, "10n"), reading(11, 21, 6.0, 12.0, "11n")];

        let days = aggregate(&readings, today());

        assert_eq!(days.len(), 1);
        assert!(days[0].has_data);
        assert!(days[0].icon.is_empty());
        assert_eq!(days[0].min, 6.0);
        assert_eq!(days[0].max, 16.0);
    }

    #[test]
    fn readings_for_today_and_earlier_are_ignored() {
        let mut readings = vec![reading(9, 21, -40.0, 60.0, "50d"), reading(10, 12, -40.0, 60.0, "50d")];
        readings.extend(full_days(11, 2));

        let days = aggregate(&readings, today());

        assert_eq!(days.len(), 2);
        assert!(days.iter().all(|d| d.date > Some(today())));
        assert!(days.iter().all(|d| d.icon != "50d" && d.min == 10.0 && d.max == 20.0));
    }

    #[test]
    fn output_is_capped_at_five_days() {
        let days = aggregate(&full_days(11, 7), today());

        assert_eq!(days.len(), FORECAST_DAYS);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 6, 11));
        assert_eq!(days[4].date, NaiveDate::from_ymd_opt(2024, 6, 15));
    }

    #[test]
    fn trailing_day_is_flushed_at_end_of_input() {
        // A typical feed: partial today, four full days, partial fifth day.
        let mut readings = vec![reading(10, 18, 0.0, 0.0, "01n"), reading(10, 21, 0.0, 0.0, "01n")];
        readings.extend(full_days(11, 4));
        readings.push(reading(15, 0, 1.0, 2.0, "09d"));
        readings.push(reading(15, 3, 0.5, 3.0, "13d"));

        let days = aggregate(&readings, today());

        assert_eq!(days.len(), 5);
        let last = &days[4];
        assert_eq!(last.date, NaiveDate::from_ymd_opt(2024, 6, 15));
        assert_eq!(last.icon, "13d");
        assert_eq!(last.min, 0.5);
        assert_eq!(last.max, 3.0);
    }

    #[test]
    fn short_feed_yields_fewer_days() {
        let days = aggregate(&full_days(12, 3), today());

        assert_eq!(days.len(), 3);
        // first slot is the first future day present, not tomorrow
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 6, 12));
    }

    #[test]
    fn out_of_order_feed_splits_a_day_instead_of_sorting() {
        let readings = vec![
            reading(11, 9, 10.0, 12.0, "01d"),
            reading(12, 9, 20.0, 22.0, "02d"),
            reading(11, 12, 5.0, 30.0, "03d"),
        ];

        let days = aggregate(&readings, today());

        let dates: Vec<_> = days.iter().map(|d| d.date).collect();
        assert_eq!(
            dates,
            [
                NaiveDate::from_ymd_opt(2024, 6, 11),
                NaiveDate::from_ymd_opt(2024, 6, 12),
                NaiveDate::from_ymd_opt(2024, 6, 11),
            ]
        );
        assert_eq!((days[0].min, days[0].max), (10.0, 12.0));
        assert_eq!(days[0].icon, "01d");
        assert_eq!((days[1].min, days[1].max), (20.0, 22.0));
        assert_eq!((days[2].min, days[2].max), (5.0, 30.0));
        assert_eq!(days[2].icon, "03d");
    }

    #[test]
    fn length_never_exceeds_five_for_any_prefix() {
        let readings = full_days(8, 10);
        for end in 0..=readings.len() {
            let days = aggregate(&readings[..end], today());
            assert!(days.len() <= FORECAST_DAYS, "prefix {end} produced {} days", days.len());
        }
    }
}
