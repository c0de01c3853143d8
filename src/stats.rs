//! Release counts bucketed by year, month, ISO week and day.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Weekday};

use crate::release::ReleaseEvent;

/// Time-bucket resolution of a [`StatRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Granularity {
    Yearly,
    Monthly,
    Weekly,
    Daily,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Yearly,
        Granularity::Monthly,
        Granularity::Weekly,
        Granularity::Daily,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Yearly => "yearly",
            Granularity::Monthly => "monthly",
            Granularity::Weekly => "weekly",
            Granularity::Daily => "daily",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("unknown period {s:?}"))
    }
}

/// Calendar fields identifying a bucket within one granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    Yearly { year: i32 },
    Monthly { year: i32, month: u32 },
    /// `year` is the calendar year of the day, not the ISO week-year.
    Weekly { year: i32, week: u32 },
    Daily { day: NaiveDate },
}

impl Period {
    pub fn granularity(&self) -> Granularity {
        match self {
            Period::Yearly { .. } => Granularity::Yearly,
            Period::Monthly { .. } => Granularity::Monthly,
            Period::Weekly { .. } => Granularity::Weekly,
            Period::Daily { .. } => Granularity::Daily,
        }
    }

    /// The four buckets a timestamp falls into, read in its own offset.
    fn all_for(ts: &DateTime<FixedOffset>) -> [Period; 4] {
        let year = ts.year();
        [
            Period::Yearly { year },
            Period::Monthly {
                year,
                month: ts.month(),
            },
            Period::Weekly {
                year,
                week: ts.iso_week().week(),
            },
            Period::Daily {
                day: ts.date_naive(),
            },
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub repository: String,
    pub period: Period,
}

/// One aggregated count.
///
/// `month`, `week` and `day` are only set for the granularity they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatRow {
    pub repository: String,
    pub granularity: Granularity,
    pub year: i32,
    pub month: Option<u32>,
    pub week: Option<u32>,
    pub day: Option<NaiveDate>,
    pub count: u64,
}

impl StatRow {
    pub fn from_bucket(key: BucketKey, count: u64) -> Self {
        let mut row = StatRow {
            repository: key.repository,
            granularity: key.period.granularity(),
            year: 0,
            month: None,
            week: None,
            day: None,
            count,
        };
        match key.period {
            Period::Yearly { year } => row.year = year,
            Period::Monthly { year, month } => {
                row.year = year;
                row.month = Some(month);
            }
            Period::Weekly { year, week } => {
                row.year = year;
                row.week = Some(week);
            }
            Period::Daily { day } => {
                row.year = day.year();
                row.day = Some(day);
            }
        }
        row
    }

    /// The bucket this row counts, or `None` if its calendar fields do not
    /// match its granularity.
    pub fn key(&self) -> Option<BucketKey> {
        let period = match self.granularity {
            Granularity::Yearly => Period::Yearly { year: self.year },
            Granularity::Monthly => Period::Monthly {
                year: self.year,
                month: self.month?,
            },
            Granularity::Weekly => Period::Weekly {
                year: self.year,
                week: self.week?,
            },
            Granularity::Daily => Period::Daily { day: self.day? },
        };
        Some(BucketKey {
            repository: self.repository.clone(),
            period,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateOptions {
    /// Drop releases published on Saturday or Sunday before bucketing.
    pub exclude_weekends: bool,
}

/// Whether `ts` falls on Saturday or Sunday in its own offset.
pub fn is_weekend(ts: &DateTime<FixedOffset>) -> bool {
    matches!(ts.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Counts `events` into yearly, monthly, weekly and daily buckets.
///
/// The result is sorted by bucket key and independent of input order.
/// Draft and pre-release events are counted like any other.
pub fn aggregate(events: &[ReleaseEvent], options: AggregateOptions) -> Vec<StatRow> {
    let mut counts: BTreeMap<BucketKey, u64> = BTreeMap::new();

    for event in events {
        if options.exclude_weekends && is_weekend(&event.published_at) {
            continue;
        }

        for period in Period::all_for(&event.published_at) {
            let key = BucketKey {
                repository: event.repository.clone(),
                period,
            };
            *counts.entry(key).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|(key, count)| StatRow::from_bucket(key, count))
        .collect()
}
