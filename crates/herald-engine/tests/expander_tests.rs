//! Tests for recurrence expansion against windows.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use herald_engine::{expand_recurring, CalendarComponent, HeraldError, RecurrenceRule, Window};

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn days(instants: &[DateTime<Utc>]) -> Vec<(i32, u32, u32)> {
    instants.iter().map(|d| (d.year(), d.month(), d.day())).collect()
}

// ---------------------------------------------------------------------------
// Window membership
// ---------------------------------------------------------------------------

#[test]
fn biweekly_monday_over_january() {
    // 2024-01-01 is a Monday.
    let component = CalendarComponent::new("standup", "Standup", utc(2024, 1, 1, 9, 0))
        .with_rrule("FREQ=WEEKLY;INTERVAL=2");
    let window = Window::inclusive(utc(2024, 1, 1, 0, 0), utc(2024, 2, 1, 0, 0));

    let occurrences = expand_recurring(&component, &window, false).expect("should expand");
    let starts: Vec<_> = occurrences.iter().map(|o| o.start_instant).collect();

    assert_eq!(days(&starts), vec![(2024, 1, 1), (2024, 1, 15), (2024, 1, 29)]);
}

#[test]
fn exclusive_window_drops_occurrences_on_both_edges() {
    let component = CalendarComponent::new("daily", "Daily", utc(2024, 6, 1, 0, 0))
        .with_rrule("FREQ=DAILY");
    let window = Window::exclusive(utc(2024, 6, 10, 0, 0), utc(2024, 6, 12, 0, 0));

    let rule = RecurrenceRule::for_component(&component).unwrap();
    assert_eq!(rule.instants_in(&window), vec![utc(2024, 6, 11, 0, 0)]);
}

#[test]
fn inclusive_window_keeps_occurrences_on_both_edges() {
    let component = CalendarComponent::new("daily", "Daily", utc(2024, 6, 1, 0, 0))
        .with_rrule("FREQ=DAILY");
    let window = Window::inclusive(utc(2024, 6, 10, 0, 0), utc(2024, 6, 12, 0, 0));

    let rule = RecurrenceRule::for_component(&component).unwrap();
    assert_eq!(
        rule.instants_in(&window),
        vec![utc(2024, 6, 10, 0, 0), utc(2024, 6, 11, 0, 0), utc(2024, 6, 12, 0, 0)]
    );
}

#[test]
fn window_before_anchor_is_empty() {
    let component = CalendarComponent::new("later", "Later", utc(2025, 1, 1, 12, 0))
        .with_rrule("FREQ=DAILY");
    let window = Window::inclusive(utc(2024, 12, 1, 0, 0), utc(2024, 12, 31, 0, 0));

    assert!(expand_recurring(&component, &window, false).unwrap().is_empty());
}

#[test]
fn count_limits_expansion() {
    let component = CalendarComponent::new("three", "Three times", utc(2024, 6, 1, 8, 0))
        .with_rrule("FREQ=DAILY;COUNT=3");
    let window = Window::inclusive(utc(2024, 6, 1, 0, 0), utc(2024, 7, 1, 0, 0));

    assert_eq!(expand_recurring(&component, &window, false).unwrap().len(), 3);
}

#[test]
fn utc_until_is_honoured() {
    let component = CalendarComponent::new("until", "Until", utc(2024, 6, 1, 8, 0))
        .with_rrule("FREQ=DAILY;UNTIL=20240603T080000Z");
    let window = Window::inclusive(utc(2024, 6, 1, 0, 0), utc(2024, 7, 1, 0, 0));

    assert_eq!(expand_recurring(&component, &window, false).unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// Time zones
// ---------------------------------------------------------------------------

#[test]
fn zoned_anchor_keeps_local_time_across_dst() {
    // 09:00 in New York: EST (UTC-5) before 2024-03-10, EDT (UTC-4) after.
    let component = CalendarComponent::new("ny", "New York call", utc(2024, 3, 4, 14, 0))
        .with_tzid("America/New_York")
        .with_rrule("FREQ=WEEKLY");
    let window = Window::inclusive(utc(2024, 3, 1, 0, 0), utc(2024, 3, 15, 0, 0));

    let rule = RecurrenceRule::for_component(&component).unwrap();
    assert_eq!(
        rule.instants_in(&window),
        vec![utc(2024, 3, 4, 14, 0), utc(2024, 3, 11, 13, 0)]
    );
}

#[test]
fn zoned_anchor_uses_local_weekday() {
    // Monday 00:30 in Berlin is Sunday 23:30 UTC; BYDAY=MO must follow Berlin.
    let component = CalendarComponent::new("berlin", "Late", utc(2024, 1, 7, 23, 30))
        .with_tzid("Europe/Berlin")
        .with_rrule("FREQ=WEEKLY;BYDAY=MO");
    let window = Window::inclusive(utc(2024, 1, 7, 0, 0), utc(2024, 1, 22, 0, 0));

    let rule = RecurrenceRule::for_component(&component).unwrap();
    assert_eq!(
        rule.instants_in(&window),
        vec![utc(2024, 1, 7, 23, 30), utc(2024, 1, 14, 23, 30), utc(2024, 1, 21, 23, 30)]
    );
}

#[test]
fn utc_until_with_zoned_anchor() {
    let component = CalendarComponent::new("until-tz", "Until", utc(2024, 6, 3, 7, 0))
        .with_tzid("Europe/Berlin")
        .with_rrule("FREQ=WEEKLY;UNTIL=20240617T070000Z");
    let window = Window::inclusive(utc(2024, 6, 1, 0, 0), utc(2024, 7, 31, 0, 0));

    let occurrences = expand_recurring(&component, &window, false).unwrap();
    assert_eq!(occurrences.len(), 3);
}

// ---------------------------------------------------------------------------
// Dense rules and exclusions
// ---------------------------------------------------------------------------

#[test]
fn dense_rule_yields_every_instance_in_window() {
    // 720 hourly instances, more than one page of the rrule query.
    let component = CalendarComponent::new("hourly", "Hourly", utc(2024, 6, 1, 0, 0))
        .with_rrule("FREQ=HOURLY");
    let window = Window::exclusive(utc(2024, 6, 10, 10, 30), utc(2024, 7, 10, 10, 30));

    let instants = RecurrenceRule::for_component(&component).unwrap().instants_in(&window);

    assert_eq!(instants.len(), 720);
    assert_eq!(instants.first(), Some(&utc(2024, 6, 10, 11, 0)));
    assert_eq!(instants.last(), Some(&utc(2024, 7, 10, 10, 0)));
    assert!(instants.windows(2).all(|w| w[1] - w[0] == chrono::Duration::hours(1)));
}

#[test]
fn exdate_removes_one_instance() {
    let component = CalendarComponent::new("daily", "Daily", utc(2024, 6, 1, 18, 0))
        .with_rrule("FREQ=DAILY")
        .with_exdate(utc(2024, 6, 11, 18, 0));
    let window = Window::inclusive(utc(2024, 6, 10, 0, 0), utc(2024, 6, 13, 0, 0));

    let rule = RecurrenceRule::for_component(&component).unwrap();
    assert_eq!(
        rule.instants_in(&window),
        vec![utc(2024, 6, 10, 18, 0), utc(2024, 6, 12, 18, 0)]
    );
}

#[test]
fn exdate_with_zoned_anchor() {
    // 19:00 Berlin (CEST) is 17:00 UTC.
    let component = CalendarComponent::new("club", "Club", utc(2024, 6, 3, 17, 0))
        .with_tzid("Europe/Berlin")
        .with_rrule("FREQ=WEEKLY")
        .with_exdate(utc(2024, 6, 10, 17, 0));
    let window = Window::inclusive(utc(2024, 6, 1, 0, 0), utc(2024, 6, 20, 0, 0));

    let rule = RecurrenceRule::for_component(&component).unwrap();
    assert_eq!(
        rule.instants_in(&window),
        vec![utc(2024, 6, 3, 17, 0), utc(2024, 6, 17, 17, 0)]
    );
}

// ---------------------------------------------------------------------------
// Produced occurrences
// ---------------------------------------------------------------------------

#[test]
fn occurrences_copy_fields_and_drop_url() {
    let component = CalendarComponent::new("uid-1", "Meetup", utc(2024, 1, 1, 18, 0))
        .with_rrule("FREQ=WEEKLY")
        .with_location("Hackerspace")
        .with_description("Bring snacks")
        .with_url("https://example.org/meetup");
    let window = Window::inclusive(utc(2024, 1, 1, 0, 0), utc(2024, 1, 8, 0, 0));

    let occurrences = expand_recurring(&component, &window, false).unwrap();
    assert_eq!(occurrences.len(), 1);
    let o = &occurrences[0];
    assert_eq!(o.uid, "uid-1");
    assert_eq!(o.summary, "Meetup");
    assert_eq!(o.location.as_deref(), Some("Hackerspace"));
    assert_eq!(o.description.as_deref(), Some("Bring snacks"));
    assert_eq!(o.raw_rule, None);

    let json = serde_json::to_value(o).unwrap();
    assert!(json.get("url").is_none());
    assert_eq!(json["startInstant"], "2024-01-01T18:00:00Z");
}

#[test]
fn keep_rule_attaches_raw_rule() {
    let component = CalendarComponent::new("uid-1", "Meetup", utc(2024, 1, 1, 18, 0))
        .with_rrule("FREQ=WEEKLY;BYDAY=MO");
    let window = Window::inclusive(utc(2024, 1, 1, 0, 0), utc(2024, 1, 16, 0, 0));

    let occurrences = expand_recurring(&component, &window, true).unwrap();
    assert_eq!(occurrences.len(), 3);
    assert!(occurrences
        .iter()
        .all(|o| o.raw_rule.as_deref() == Some("FREQ=WEEKLY;BYDAY=MO")));
}

#[test]
fn rrule_prefix_is_accepted() {
    let component = CalendarComponent::new("p", "Prefixed", utc(2024, 1, 1, 18, 0))
        .with_rrule("RRULE:FREQ=DAILY;COUNT=2");
    let window = Window::inclusive(utc(2024, 1, 1, 0, 0), utc(2024, 1, 31, 0, 0));

    assert_eq!(expand_recurring(&component, &window, false).unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn malformed_rule_names_the_uid() {
    let component = CalendarComponent::new("broken@example.org", "Broken", utc(2024, 1, 1, 9, 0))
        .with_rrule("FREQ=SOMETIMES");
    let window = Window::inclusive(utc(2024, 1, 1, 0, 0), utc(2024, 2, 1, 0, 0));

    let err = expand_recurring(&component, &window, false).unwrap_err();
    assert!(matches!(err, HeraldError::InvalidRule { .. }), "got {:?}", err);
    assert_eq!(err.uid(), Some("broken@example.org"));
    assert!(err.to_string().contains("broken@example.org"));
}

#[test]
fn unknown_timezone_is_rejected() {
    let component = CalendarComponent::new("mars", "Mars", utc(2024, 1, 1, 9, 0))
        .with_tzid("Mars/Olympus_Mons")
        .with_rrule("FREQ=DAILY");

    let err = RecurrenceRule::for_component(&component).unwrap_err();
    assert!(matches!(err, HeraldError::InvalidTimezone { .. }), "got {:?}", err);
    assert_eq!(err.uid(), Some("mars"));
}

#[test]
fn missing_rule_is_rejected() {
    let component = CalendarComponent::new("single", "Single", utc(2024, 1, 1, 9, 0));
    assert!(matches!(
        RecurrenceRule::for_component(&component),
        Err(HeraldError::InvalidRule { .. })
    ));
}
