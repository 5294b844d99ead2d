//! Schedule parsing and next occurrence calculation.
//!
//! Supports standard cron expressions, extended 6-field cron (with seconds),
//! shortcuts (@daily, @hourly, etc.), and interval expressions (@every).

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing or using schedules.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Invalid cron expression.
    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    /// Invalid interval expression.
    #[error("invalid interval expression: {0}")]
    InvalidInterval(String),

    /// Invalid timezone.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// No more occurrences.
    #[error("no more occurrences")]
    NoMoreOccurrences,
}

/// A parsed recurring schedule.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// The original expression string.
    expression: String,
    /// The timezone cron fields are evaluated in.
    timezone: Tz,
    /// Parsed schedule type.
    schedule_type: ScheduleType,
}

#[derive(Debug, Clone)]
enum ScheduleType {
    /// Standard cron schedule. Two schedules when both day fields are
    /// restricted: a time matching either one fires.
    Cron(Vec<CronSchedule>),
    /// Interval-based schedule (e.g., @every 5m).
    Interval(chrono::Duration),
}

impl Schedule {
    /// Create a new schedule from a cron expression, evaluated in UTC.
    ///
    /// Supports:
    /// - Standard 5-field cron: `minute hour day month weekday`
    /// - Extended 6-field cron: `second minute hour day month weekday`
    /// - Shortcuts: `@yearly`, `@monthly`, `@weekly`, `@daily`, `@hourly`
    /// - Intervals: `@every 5m`, `@every 1h30m`
    pub fn new(expression: impl Into<String>) -> Result<Self, ScheduleError> {
        Self::with_timezone(expression, "UTC")
    }

    /// Create a new schedule with a specific timezone.
    pub fn with_timezone(
        expression: impl Into<String>,
        timezone: impl AsRef<str>,
    ) -> Result<Self, ScheduleError> {
        let expression = expression.into();
        let timezone = timezone.as_ref();

        let timezone = timezone
            .parse::<Tz>()
            .map_err(|_| ScheduleError::InvalidTimezone(timezone.to_string()))?;

        let schedule_type = Self::parse_expression(&expression)?;

        Ok(Self {
            expression,
            timezone,
            schedule_type,
        })
    }

    /// Parse the expression into a schedule type.
    fn parse_expression(expression: &str) -> Result<ScheduleType, ScheduleError> {
        let trimmed = expression.trim();

        if trimmed.starts_with('@') {
            return Self::parse_shortcut(trimmed);
        }

        Self::parse_cron(trimmed)
    }

    /// Parse a shortcut expression (@daily, @every, etc.).
    fn parse_shortcut(expression: &str) -> Result<ScheduleType, ScheduleError> {
        match expression.to_lowercase().as_str() {
            "@yearly" | "@annually" => Self::parse_cron("0 0 1 1 *"),
            "@monthly" => Self::parse_cron("0 0 1 * *"),
            "@weekly" => Self::parse_cron("0 0 * * SUN"),
            "@daily" | "@midnight" => Self::parse_cron("0 0 * * *"),
            "@hourly" => Self::parse_cron("0 * * * *"),
            s if s.starts_with("@every ") => Self::parse_interval(&s[7..]),
            _ => Err(ScheduleError::InvalidCron(format!(
                "unknown shortcut: {}",
                expression
            ))),
        }
    }

    /// Parse an interval expression (e.g., "5m", "1h30m").
    fn parse_interval(interval: &str) -> Result<ScheduleType, ScheduleError> {
        let invalid = || ScheduleError::InvalidInterval(interval.to_string());
        let duration = Self::parse_duration(interval.trim())?;
        let duration = chrono::Duration::from_std(duration).map_err(|_| invalid())?;
        // An interval that cannot be added to the current time never fires
        Utc::now().checked_add_signed(duration).ok_or_else(invalid)?;
        Ok(ScheduleType::Interval(duration))
    }

    /// Parse a duration string like "5m", "1h", "1h30m", "30s".
    fn parse_duration(s: &str) -> Result<std::time::Duration, ScheduleError> {
        let invalid = || ScheduleError::InvalidInterval(s.to_string());
        let mut total_secs: u64 = 0;
        let mut current_num = String::new();

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_num.push(c);
            } else {
                let num: u64 = current_num.parse().map_err(|_| invalid())?;
                current_num.clear();

                let unit: u64 = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    _ => return Err(invalid()),
                };
                total_secs = num
                    .checked_mul(unit)
                    .and_then(|secs| total_secs.checked_add(secs))
                    .ok_or_else(invalid)?;
            }
        }

        // Trailing digits without a unit
        if !current_num.is_empty() || total_secs == 0 {
            return Err(invalid());
        }

        Ok(std::time::Duration::from_secs(total_secs))
    }

    /// Parse a cron expression.
    fn parse_cron(expression: &str) -> Result<ScheduleType, ScheduleError> {
        let mut fields: Vec<String> = expression
            .split_whitespace()
            .map(str::to_string)
            .collect();

        match fields.len() {
            5 => fields.insert(0, "0".to_string()),
            6 => {}
            n => {
                return Err(ScheduleError::InvalidCron(format!(
                    "expected 5 or 6 fields, got {}",
                    n
                )));
            }
        }

        fields[5] = normalize_day_of_week(&fields[5])?;

        let parse = |fields: &[String]| {
            CronSchedule::from_str(&fields.join(" "))
                .map_err(|e| ScheduleError::InvalidCron(e.to_string()))
        };

        // Day-of-month and day-of-week match as OR when both are restricted
        if is_restricted(&fields[3]) && is_restricted(&fields[5]) {
            let mut by_month_day = fields.clone();
            by_month_day[5] = "*".to_string();
            let mut by_week_day = fields;
            by_week_day[3] = "*".to_string();
            return Ok(ScheduleType::Cron(vec![
                parse(&by_month_day)?,
                parse(&by_week_day)?,
            ]));
        }

        Ok(ScheduleType::Cron(vec![parse(&fields)?]))
    }

    /// Get the next occurrence strictly after the given time.
    pub fn next_after(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        match &self.schedule_type {
            ScheduleType::Cron(schedules) => {
                // Convert to timezone, find next, convert back to UTC
                let local_time = after.with_timezone(&self.timezone);
                schedules
                    .iter()
                    .filter_map(|schedule| schedule.after(&local_time).next())
                    .map(|dt| dt.with_timezone(&Utc))
                    .min()
                    .ok_or(ScheduleError::NoMoreOccurrences)
            }
            ScheduleType::Interval(duration) => after
                .checked_add_signed(*duration)
                .ok_or(ScheduleError::NoMoreOccurrences),
        }
    }

    /// Get the next occurrence from now.
    pub fn next(&self) -> Result<DateTime<Utc>, ScheduleError> {
        self.next_after(Utc::now())
    }

    /// Get the next N occurrences after the given time.
    pub fn next_n_after(&self, after: DateTime<Utc>, n: usize) -> Vec<DateTime<Utc>> {
        let mut results = Vec::with_capacity(n);
        let mut current = after;
        while results.len() < n {
            match self.next_after(current) {
                Ok(next) => {
                    results.push(next);
                    current = next;
                }
                Err(_) => break,
            }
        }
        results
    }

    /// Get the original expression string.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Get the timezone name.
    pub fn timezone(&self) -> &str {
        self.timezone.name()
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Whether a day field limits which days match.
fn is_restricted(field: &str) -> bool {
    field != "*" && field != "?"
}

/// Rewrite numeric day-of-week values from standard cron numbering
/// (0-7, Sunday is 0 or 7) into day names, which the `cron` crate reads
/// unambiguously. Numeric ranges are expanded into explicit lists so that
/// ranges ending on 7 do not wrap.
fn normalize_day_of_week(field: &str) -> Result<String, ScheduleError> {
    let mut days: Vec<String> = Vec::new();
    let mut push = |day: String| {
        if !days.contains(&day) {
            days.push(day);
        }
    };

    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (part, None),
        };

        let bounds = match range.split_once('-') {
            Some((start, end)) => start.parse::<usize>().ok().zip(end.parse::<usize>().ok()),
            None if step.is_none() => range.parse::<usize>().ok().map(|day| (day, day)),
            None => None,
        };

        let Some((start, end)) = bounds else {
            push(part.to_string());
            continue;
        };

        let step = match step {
            Some(step) => step
                .parse::<usize>()
                .ok()
                .filter(|step| *step > 0)
                .ok_or_else(|| ScheduleError::InvalidCron(format!("invalid step: {}", part)))?,
            None => 1,
        };

        if start > end {
            return Err(ScheduleError::InvalidCron(format!(
                "day of week range is reversed: {}",
                part
            )));
        }

        for day in (start..=end).step_by(step) {
            push(day_name(day)?.to_string());
        }
    }

    Ok(days.join(","))
}

fn day_name(day: usize) -> Result<&'static str, ScheduleError> {
    const DAYS: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

    DAYS.get(day)
        .copied()
        .ok_or_else(|| ScheduleError::InvalidCron(format!("day of week out of range: {}", day)))
}
