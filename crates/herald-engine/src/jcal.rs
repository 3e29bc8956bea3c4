//! jCal (RFC 7265) decoding of a CalDAV calendar export.
//!
//! Only `vevent` components are read. Each property is
//! `[name, {params}, type, value...]`; multi-valued properties keep their first
//! value, except `exdate`.
//!
//! A vevent with `recurrence-id` is a detached override: it becomes a single
//! event at its own start, and its original instant is excluded from the
//! master with the same uid.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::{Map, Value};

use crate::component::{CalendarComponent, EventStart};
use crate::error::{HeraldError, Result};

/// Decode a jCal document (one `vcalendar` or an array of them).
///
/// # Errors
/// `HeraldError::InvalidComponent` for malformed JSON, a document that is not
/// jCal, or a `vevent` missing `uid` or `dtstart`.
pub fn parse_jcal(input: &str) -> Result<Vec<CalendarComponent>> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| HeraldError::InvalidComponent(format!("malformed jCal: {}", e)))?;
    components_from_value(&value)
}

pub fn components_from_value(value: &Value) -> Result<Vec<CalendarComponent>> {
    let mut events: Vec<DecodedEvent> = Vec::new();
    match value.as_array() {
        Some(items) if items.first().is_some_and(Value::is_string) => {
            collect_events(value, &mut events)?
        }
        Some(items) => {
            for item in items {
                collect_events(item, &mut events)?;
            }
        }
        None => {
            return Err(HeraldError::InvalidComponent(
                "jCal document must be an array".to_string(),
            ))
        }
    }
    Ok(detach_overrides(events))
}

struct DecodedEvent {
    component: CalendarComponent,
    /// Original instant replaced by this override.
    recurrence_id: Option<DateTime<Utc>>,
}

fn detach_overrides(events: Vec<DecodedEvent>) -> Vec<CalendarComponent> {
    let mut moved: HashMap<String, Vec<DateTime<Utc>>> = HashMap::new();
    for event in &events {
        if let Some(original) = event.recurrence_id {
            moved
                .entry(event.component.uid.clone())
                .or_default()
                .push(original);
        }
    }

    events
        .into_iter()
        .map(|event| {
            let mut component = event.component;
            if event.recurrence_id.is_none() {
                if let Some(originals) = moved.get(&component.uid) {
                    component.exdates.extend(originals.iter().copied());
                }
            }
            component
        })
        .collect()
}

fn collect_events(component: &Value, out: &mut Vec<DecodedEvent>) -> Result<()> {
    let parts = component
        .as_array()
        .filter(|parts| parts.len() == 3)
        .ok_or_else(|| HeraldError::InvalidComponent(format!("not a jCal component: {}", component)))?;
    let name = parts[0].as_str().unwrap_or_default();

    if name.eq_ignore_ascii_case("vevent") {
        out.push(decode_event(&parts[1])?);
    }
    for child in parts[2].as_array().into_iter().flatten() {
        collect_events(child, out)?;
    }
    Ok(())
}

struct Property<'a> {
    params: Option<&'a Map<String, Value>>,
    kind: &'a str,
    value: &'a Value,
}

fn property<'a>(properties: &'a Value, name: &str) -> Option<Property<'a>> {
    properties.as_array()?.iter().find_map(|prop| {
        let prop = prop.as_array()?;
        if !prop.first()?.as_str()?.eq_ignore_ascii_case(name) {
            return None;
        }
        Some(Property {
            params: prop.get(1).and_then(Value::as_object),
            kind: prop.get(2).and_then(Value::as_str).unwrap_or("unknown"),
            value: prop.get(3)?,
        })
    })
}

fn text(properties: &Value, name: &str) -> Option<String> {
    property(properties, name)
        .and_then(|p| p.value.as_str().map(str::to_string))
        .filter(|s| !s.is_empty())
}

fn decode_event(properties: &Value) -> Result<DecodedEvent> {
    let uid = text(properties, "uid")
        .ok_or_else(|| HeraldError::InvalidComponent("vevent without uid".to_string()))?;
    let dtstart = property(properties, "dtstart")
        .ok_or_else(|| HeraldError::InvalidComponent(format!("vevent {} without dtstart", uid)))?;
    let start = decode_time(&uid, "dtstart", &dtstart)?;
    let recurrence_id = property(properties, "recurrence-id")
        .map(|p| decode_time(&uid, "recurrence-id", &p).map(|t| t.instant))
        .transpose()?;
    let rrule = match recurrence_id {
        Some(_) => None,
        None => property(properties, "rrule").and_then(|p| recur_text(p.value)),
    };
    let exdates = exdates(properties, &uid)?;

    let component = CalendarComponent {
        summary: text(properties, "summary").unwrap_or_default(),
        location: text(properties, "location"),
        description: text(properties, "description"),
        url: text(properties, "url"),
        start,
        rrule,
        exdates,
        uid,
    };
    Ok(DecodedEvent {
        component,
        recurrence_id,
    })
}

/// Every value of every `exdate` property.
fn exdates(properties: &Value, uid: &str) -> Result<Vec<DateTime<Utc>>> {
    let mut instants = Vec::new();
    let props = properties.as_array().into_iter().flatten().filter_map(Value::as_array);
    for prop in props {
        let is_exdate = prop
            .first()
            .and_then(Value::as_str)
            .is_some_and(|name| name.eq_ignore_ascii_case("exdate"));
        if !is_exdate {
            continue;
        }
        let params = prop.get(1).and_then(Value::as_object);
        let kind = prop.get(2).and_then(Value::as_str).unwrap_or("unknown");
        for value in prop.iter().skip(3) {
            let excluded = decode_time(uid, "exdate", &Property { params, kind, value })?;
            instants.push(excluded.instant);
        }
    }
    Ok(instants)
}

fn decode_time(uid: &str, name: &str, prop: &Property<'_>) -> Result<EventStart> {
    let invalid =
        || HeraldError::InvalidComponent(format!("vevent {} has an unreadable {}", uid, name));
    let raw = prop.value.as_str().ok_or_else(invalid)?;
    let tzid = prop
        .params
        .and_then(|params| params.get("tzid"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(EventStart {
            instant: instant.with_timezone(&Utc),
            tzid: None,
        });
    }

    let local = match prop.kind {
        "date" => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0)),
        _ => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok(),
    };
    let local = local.ok_or_else(invalid)?;

    let instant = match tzid.as_deref().map(str::parse::<Tz>) {
        Some(Ok(tz)) => tz
            .from_local_datetime(&local)
            .earliest()
            .ok_or_else(invalid)?
            .with_timezone(&Utc),
        Some(Err(_)) => {
            // Keep the tzid so expansion reports it; the wall time stands in as UTC.
            tracing::warn!(uid, property = name, tzid = ?tzid, "unknown timezone");
            Utc.from_utc_datetime(&local)
        }
        None => Utc.from_utc_datetime(&local),
    };

    Ok(EventStart { instant, tzid })
}

/// Textual RRULE from a jCal `recur` value (object) or a plain string.
fn recur_text(value: &Value) -> Option<String> {
    if let Some(raw) = value.as_str() {
        return Some(raw.to_string()).filter(|s| !s.is_empty());
    }
    let recur = value.as_object()?;
    let freq = recur.get("freq")?.as_str()?;

    let mut parts = vec![format!("FREQ={}", freq.to_ascii_uppercase())];
    for (key, value) in recur.iter().filter(|(k, _)| *k != "freq") {
        let key = key.to_ascii_uppercase();
        let rendered = match value {
            Value::Array(items) => items.iter().map(recur_scalar).collect::<Vec<_>>().join(","),
            other => recur_scalar(other),
        };
        let rendered = if key == "UNTIL" {
            rendered.replace(['-', ':'], "")
        } else {
            rendered
        };
        parts.push(format!("{}={}", key, rendered));
    }
    Some(parts.join(";"))
}

fn recur_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recur_object_renders_as_rrule_text() {
        let value = json!({"freq": "weekly", "interval": 2, "byday": ["MO", "WE"], "until": "2024-05-01T00:00:00Z"});
        assert_eq!(
            recur_text(&value).as_deref(),
            Some("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;UNTIL=20240501T000000Z")
        );
    }

    #[test]
    fn recur_string_passes_through() {
        assert_eq!(
            recur_text(&json!("FREQ=DAILY;COUNT=3")).as_deref(),
            Some("FREQ=DAILY;COUNT=3")
        );
    }
}
