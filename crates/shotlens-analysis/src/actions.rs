//! Suggested actions derived from entities and records.

use std::collections::HashSet;

use reqwest::Url;

use shotlens_core::{
    ActionKind, BasicEntities, ClassificationResult, ContactRecord, EventRecord, ScreenshotType,
    SuggestedAction,
};

/// Everything action generation reads.
#[derive(Debug, Clone, Copy)]
pub struct ActionInputs<'a> {
    pub entities: &'a BasicEntities,
    pub event: Option<&'a EventRecord>,
    pub contact: Option<&'a ContactRecord>,
    pub classification: &'a ClassificationResult,
    pub barcode_payload: Option<&'a str>,
    pub raw_text: &'a str,
}

/// Prioritized, deduplicated action list capped at `max_actions`.
pub fn generate_actions(inputs: &ActionInputs<'_>, max_actions: usize) -> Vec<SuggestedAction> {
    let mut actions = Vec::new();

    if let Some(event) = inputs.event.filter(|e| e.is_valid()) {
        let name = event
            .name
            .as_deref()
            .or(event.location.as_deref())
            .unwrap_or("event");
        let payload = event
            .start
            .map(|s| s.format("%Y-%m-%dT%H:%M:%S").to_string())
            .unwrap_or_default();
        actions.push(action(
            ActionKind::AddToCalendar,
            format!("Add \"{name}\" to Calendar"),
            payload,
            1,
        ));
    }

    if let Some(contact) = inputs.contact.filter(|c| c.is_valid()) {
        let name = contact.name.clone().unwrap_or_default();
        actions.push(action(ActionKind::SaveContact, format!("Save {name}"), name, 1));
    }

    if let Some(url) = inputs.barcode_payload.and_then(web_url) {
        actions.push(action(ActionKind::OpenUrl, open_label(&url), url.to_string(), 1));
    }

    for m in &inputs.entities.urls {
        let label = Url::parse(&m.value)
            .map(|u| open_label(&u))
            .unwrap_or_else(|_| format!("Open {}", m.value));
        actions.push(action(ActionKind::OpenUrl, label, m.value.clone(), 2));
    }

    for m in &inputs.entities.phones {
        actions.push(action(
            ActionKind::Call,
            format!("Call {}", m.value),
            dial_string(&m.value),
            3,
        ));
    }

    for m in &inputs.entities.emails {
        actions.push(action(
            ActionKind::SendEmail,
            format!("Email {}", m.value),
            m.value.clone(),
            3,
        ));
    }

    for address in &inputs.entities.addresses {
        actions.push(action(
            ActionKind::OpenInMaps,
            "Open in Maps".to_string(),
            address.formatted(),
            4,
        ));
    }

    // Card text stays off the clipboard.
    let text = inputs.raw_text.trim();
    if !text.is_empty() && inputs.classification.type_label != ScreenshotType::CreditCard {
        actions.push(action(
            ActionKind::CopyText,
            "Copy Text".to_string(),
            text.to_string(),
            9,
        ));
    }

    let mut seen = HashSet::new();
    actions.retain(|a| seen.insert((a.kind, a.payload.clone())));
    actions.sort_by_key(|a| a.priority);
    actions.truncate(max_actions);
    actions
}

fn action(kind: ActionKind, label: String, payload: String, priority: u8) -> SuggestedAction {
    SuggestedAction {
        kind,
        label,
        payload,
        priority,
    }
}

fn web_url(payload: &str) -> Option<Url> {
    Url::parse(payload.trim())
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
}

fn open_label(url: &Url) -> String {
    match url.host_str() {
        Some(host) => format!("Open {host}"),
        None => "Open Link".to_string(),
    }
}

/// Digits with an optional leading `+`.
fn dial_string(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if phone.trim_start().starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    }
}
