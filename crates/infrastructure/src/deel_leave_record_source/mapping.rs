//! Mapping from Deel time-off payloads to leave records.
//!
//! Deel responses have varied over API versions, so the item list, the
//! cursor, and the worker email are each looked up under several keys.

use leavesync_application::LeavePage;
use leavesync_domain::{LeaveRecord, LeaveRecordInput, LeaveStatus, parse_leave_date};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const ITEM_KEYS: [&str; 4] = ["data", "time_offs", "items", "results"];
const DIRECT_EMAIL_KEYS: [&str; 3] = ["user_email", "email", "work_email"];
const NESTED_EMAIL_OWNERS: [&str; 7] = [
    "worker",
    "user",
    "person",
    "profile",
    "hris_profile",
    "recipient_profile",
    "requester_profile",
];
const NESTED_EMAIL_KEYS: [&str; 3] = ["email", "work_email", "personal_email"];

pub(super) fn parse_time_off_page(body: &Value) -> LeavePage {
    let items = page_items(body);
    if items.is_empty() {
        debug!("Deel returned no time-off items");
        return LeavePage::default();
    }

    let records = items.iter().filter_map(parse_time_off).collect();

    let has_next_page = body
        .get("has_next_page")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let next_cursor = ["next", "cursor"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|cursor| !cursor.is_empty())
        .filter(|_| has_next_page)
        .map(str::to_owned);

    LeavePage {
        records,
        next_cursor,
    }
}

fn page_items(body: &Value) -> &[Value] {
    if let Some(items) = body.as_array() {
        return items.as_slice();
    }

    ITEM_KEYS
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_array))
        .find(|items| !items.is_empty())
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn parse_time_off(item: &Value) -> Option<LeaveRecord> {
    let entry = item.as_object()?;
    let Some(email) = extract_email(entry) else {
        debug!(
            time_off_id = entry.get("id").and_then(serde_json::Value::as_str).unwrap_or("<unknown>"),
            "skipping time-off entry without an email"
        );
        return None;
    };

    // The listing is requested with status=APPROVED, so a missing status is
    // taken as approved.
    let status = entry
        .get("status")
        .and_then(Value::as_str)
        .map_or(LeaveStatus::Approved, LeaveStatus::parse);

    let input = LeaveRecordInput {
        user_identifier: email,
        status,
        start_date: date_field(entry, "start_date"),
        end_date: date_field(entry, "end_date"),
        amount_days: amount_field(entry),
    };

    match LeaveRecord::new(input) {
        Ok(record) => Some(record),
        Err(error) => {
            warn!(error = %error, "skipping invalid time-off entry");
            None
        }
    }
}

fn extract_email(entry: &Map<String, Value>) -> Option<String> {
    let direct = DIRECT_EMAIL_KEYS
        .iter()
        .filter_map(|key| non_empty_str(entry.get(*key)))
        .next();
    if let Some(email) = direct {
        return Some(email.to_lowercase());
    }

    NESTED_EMAIL_OWNERS
        .iter()
        .filter_map(|owner| entry.get(*owner).and_then(Value::as_object))
        .flat_map(|nested| {
            NESTED_EMAIL_KEYS
                .iter()
                .filter_map(move |key| non_empty_str(nested.get(*key)))
        })
        .next()
        .map(str::to_lowercase)
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn date_field(entry: &Map<String, Value>, key: &str) -> Option<chrono::NaiveDate> {
    let raw = non_empty_str(entry.get(key))?;
    let parsed = parse_leave_date(raw);
    if parsed.is_none() {
        warn!(field = key, value = raw, "could not parse time-off date");
    }
    parsed
}

fn amount_field(entry: &Map<String, Value>) -> Option<f64> {
    match entry.get("amount")? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let parsed = text.trim().parse::<f64>().ok();
            if parsed.is_none() {
                debug!(value = %text, "non-numeric time-off amount");
            }
            parsed
        }
        _ => None,
    }
}
