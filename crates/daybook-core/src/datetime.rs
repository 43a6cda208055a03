use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "daybook-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "DAYBOOK_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "DAYBOOK_TIME_CONFIG";
const DEFAULT_PROJECT_TIMEZONE: &str =
  "UTC";

/// Six full weeks.
pub const GRID_DAYS: usize = 42;

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

pub fn project_timezone() -> &'static Tz
{
  static PROJECT_TZ: OnceLock<Tz> =
    OnceLock::new();
  PROJECT_TZ.get_or_init(
    resolve_project_timezone
  )
}

#[must_use]
pub fn to_local_date(
  dt: DateTime<Utc>
) -> NaiveDate {
  dt.with_timezone(project_timezone())
    .date_naive()
}

#[must_use]
pub fn format_local_date(
  dt: DateTime<Utc>
) -> String {
  dt.with_timezone(project_timezone())
    .format("%Y-%m-%d")
    .to_string()
}

/// 12-hour clock, e.g. `10:00 AM`.
#[must_use]
pub fn format_local_time(
  dt: DateTime<Utc>
) -> String {
  dt.with_timezone(project_timezone())
    .format("%-I:%M %p")
    .to_string()
}

/// The calendar date `now` falls on in
/// the project timezone.
#[must_use]
pub fn today(
  now: DateTime<Utc>
) -> NaiveDate {
  to_local_date(now)
}

#[must_use]
pub fn is_same_day(
  a: NaiveDate,
  b: NaiveDate
) -> bool {
  a == b
}

#[must_use]
pub fn is_today(
  date: NaiveDate,
  today: NaiveDate
) -> bool {
  is_same_day(date, today)
}

#[must_use]
pub fn is_weekend(
  date: NaiveDate
) -> bool {
  matches!(
    date.weekday(),
    Weekday::Sat | Weekday::Sun
  )
}

/// Returns the 42 consecutive dates shown
/// for a month, starting on the Sunday on
/// or before the 1st.
///
/// `month0` is 0-based; values past 11
/// carry into the following years.
pub fn month_grid(
  year: i32,
  month0: u32
) -> Vec<NaiveDate> {
  let year = year.saturating_add(
    (month0 / 12) as i32
  );
  let month = month0 % 12 + 1;
  let first =
    first_day_of_month(year, month);
  let lead = first
    .weekday()
    .num_days_from_sunday()
    as i64;
  let start = add_days(first, -lead);

  (0..GRID_DAYS as i64)
    .map(|offset| {
      add_days(start, offset)
    })
    .collect()
}

pub fn grid_for(
  date: NaiveDate
) -> Vec<NaiveDate> {
  month_grid(date.year(), date.month0())
}

/// Moves `date` by whole months, clamping
/// the day to the target month's length.
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let mut year = date.year();
  let mut month =
    date.month() as i32 + months;

  while month < 1 {
    month += 12;
    year = year.saturating_sub(1);
  }
  while month > 12 {
    month -= 12;
    year = year.saturating_add(1);
  }

  let month = month as u32;
  let day = date
    .day()
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or(date)
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
  .day()
}

pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

/// "Just now", "5h ago", "3d ago", else
/// the plain date.
pub fn format_relative_time(
  then: DateTime<Utc>,
  now: DateTime<Utc>
) -> String {
  let diff = now - then;
  let hours = diff.num_hours();
  let days = diff.num_days();

  if diff < Duration::hours(1) {
    "Just now".to_string()
  } else if hours < 24 {
    format!("{hours}h ago")
  } else if days < 7 {
    format!("{days}d ago")
  } else {
    format_local_date(then)
  }
}

pub fn format_due(
  due: DateTime<Utc>,
  now: DateTime<Utc>
) -> String {
  let diff = due - now;
  let hours = diff.num_hours();
  let days = diff.num_days();

  if diff < Duration::zero() {
    "Overdue".to_string()
  } else if diff < Duration::hours(1) {
    "Due now".to_string()
  } else if hours < 24 {
    format!("Due in {hours}h")
  } else if days < 7 {
    format!("Due in {days}d")
  } else {
    format!(
      "Due {}",
      format_local_date(due)
    )
  }
}

fn resolve_project_timezone() -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_PROJECT_TIMEZONE,
    "DEFAULT_PROJECT_TIMEZONE"
  )
  .unwrap_or_else(|| {
    tracing::error!(
      "failed to parse fallback \
       timezone; using UTC"
    );
    chrono_tz::UTC
  })
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured project timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Converts a wall-clock time in the
/// project timezone to UTC.
pub fn local_to_utc(
  local_naive: NaiveDateTime,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  resolve_local(
    project_timezone(),
    local_naive,
    context
  )
}

/// Like [`local_to_utc`], but a time
/// skipped by a DST jump resolves to the
/// first valid minute after the gap.
pub fn local_to_utc_after_gap(
  local_naive: NaiveDateTime,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  resolve_local_after_gap(
    project_timezone(),
    local_naive,
    context
  )
}

const MAX_GAP_MINUTES: i64 = 24 * 60;

fn resolve_local_after_gap<T: TimeZone>(
  tz: &T,
  local_naive: NaiveDateTime,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  for step in 0..=MAX_GAP_MINUTES {
    let candidate = local_naive
      .checked_add_signed(
        Duration::minutes(step)
      )
      .ok_or_else(|| {
        anyhow!(
          "local datetime out of \
           range: {context}"
        )
      })?;
    if let Ok(resolved) =
      resolve_local(tz, candidate, context)
    {
      if step > 0 {
        tracing::debug!(
          context,
          skipped_minutes = step,
          "local datetime fell in a DST gap"
        );
      }
      return Ok(resolved);
    }
  }

  Err(anyhow!(
    "no valid local datetime near \
     {local_naive}: {context}"
  ))
}

fn resolve_local<T: TimeZone>(
  tz: &T,
  local_naive: NaiveDateTime,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  match tz.from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      let first = first.with_timezone(&Utc);
      let second =
        second.with_timezone(&Utc);
      tracing::warn!(
        context,
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      Ok(first.min(second))
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime does not \
         exist in configured \
         timezone: {context}"
      ))
    }
  }
}

fn local_midnight(
  date: NaiveDate,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  let midnight = date
    .and_hms_opt(0, 0, 0)
    .ok_or_else(|| {
      anyhow!(
        "failed to construct \
         midnight for {context}"
      )
    })?;
  local_to_utc(midnight, context)
}

/// Parses the date expressions accepted
/// for task due dates and calendar
/// selection.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  now: DateTime<Utc>
) -> anyhow::Result<DateTime<Utc>> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let local_today = today(now);

  match lower.as_str() {
    | "now" => return Ok(now),
    | "today" => {
      return local_midnight(
        local_today,
        "today"
      );
    }
    | "tomorrow" => {
      return local_midnight(
        add_days(local_today, 1),
        "tomorrow"
      );
    }
    | "yesterday" => {
      return local_midnight(
        add_days(local_today, -1),
        "yesterday"
      );
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    let target_date = next_weekday_date(
      local_today,
      target_weekday
    );
    return local_midnight(
      target_date,
      "weekday-name"
    );
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dhm])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(token)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let duration = match unit {
      | "d" => Duration::try_days(num),
      | "h" => Duration::try_hours(num),
      | "m" => Duration::try_minutes(num),
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ))
      }
    };

    let shifted =
      duration.and_then(|duration| {
        if sign == "-" {
          now.checked_sub_signed(duration)
        } else {
          now.checked_add_signed(duration)
        }
      });

    return shifted.ok_or_else(|| {
      anyhow!(
        "relative offset out of range: \
         {token}"
      )
    });
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.with_timezone(&Utc));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return local_midnight(date, "date");
  }

  for fmt in
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
  {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return local_to_utc(ndt, fmt);
    }
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     now/today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/+Nh/+Nm, RFC3339, \
     YYYY-MM-DD, YYYY-MM-DDTHH:MM, \
     YYYY-MM-DD HH:MM"
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(from, delta)
}
