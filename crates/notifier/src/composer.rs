//! Email subject and body for a service alert.

use std::fmt::Display;

use chrono::{DateTime, SecondsFormat, TimeZone};

use alerts_common::types::{NotificationRequest, SERVICE_ALERTS_KIND_ID};

/// Render the email body.
///
/// ```text
/// Alert from {product}[, service instance {id}]:
///
/// {content}
///
/// [Alert generated at {RFC3339 timestamp}]
/// ```
pub fn compose<Tz>(
    product: &str,
    service_instance_id: &str,
    content: &str,
    timestamp: &DateTime<Tz>,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let source = if service_instance_id.is_empty() {
        product.to_string()
    } else {
        format!("{product}, service instance {service_instance_id}")
    };
    format!(
        "Alert from {source}:\n\n{content}\n\n[Alert generated at {}]",
        timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

pub fn compose_subject(product: &str, subject: &str) -> String {
    format!("[Service Alert][{product}] {subject}")
}

/// Full notification payload for one alert.
pub fn compose_request<Tz>(
    product: &str,
    subject: &str,
    service_instance_id: &str,
    content: &str,
    reply_to: Option<&str>,
    timestamp: &DateTime<Tz>,
) -> NotificationRequest
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    NotificationRequest {
        kind_id: SERVICE_ALERTS_KIND_ID.to_string(),
        subject: compose_subject(product, subject),
        text: compose(product, service_instance_id, content, timestamp),
        reply_to: reply_to.filter(|r| !r.is_empty()).map(str::to_string),
    }
}
