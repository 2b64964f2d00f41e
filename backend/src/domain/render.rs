//! # Report Rendering
//!
//! Turns an [`ExpiryReport`] into the email subject, the HTML email body and
//! the push notification content. All wording is picked from the headline
//! bucket so the two channels always announce the same severity.

use serde_json::{json, Map, Value};
use shared::UrgencyBucket;

use super::report::{ClassifiedDriver, ExpiryReport};

const NAMES_IN_SUMMARY: usize = 3;

/// Push notification text for one report, shared by all recipients
#[derive(Debug, Clone, PartialEq)]
pub struct PushContent {
    pub subject_key: String,
    pub subject_params: Map<String, Value>,
    pub message: String,
    pub message_params: Map<String, Value>,
    pub rich_subject: String,
    pub rich_message: String,
}

/// "{n} driver license has" / "{n} driver licenses have" style agreement
fn plural<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 {
        singular
    } else {
        plural
    }
}

pub fn email_subject(report: &ExpiryReport) -> String {
    let horizon = report.window.horizon_days;
    match report.headline() {
        Some(UrgencyBucket::Expired) => {
            let n = report.count(UrgencyBucket::Expired);
            format!(
                "🚨 CRITICAL: {} driver {} EXPIRED",
                n,
                plural(n, "license has", "licenses have")
            )
        }
        Some(UrgencyBucket::Critical) => {
            let n = report.count(UrgencyBucket::Critical);
            format!(
                "🚨 CRITICAL: {} driver {} within 24 hours",
                n,
                plural(n, "license expires", "licenses expire")
            )
        }
        Some(UrgencyBucket::Urgent) => {
            let n = report.count(UrgencyBucket::Urgent);
            format!(
                "⚠️ URGENT: {} driver {} within 7 days",
                n,
                plural(n, "license expires", "licenses expire")
            )
        }
        Some(UrgencyBucket::Warning) | None => {
            let n = report.total_count;
            format!(
                "📢 NOTICE: {} driver {} within {} days",
                n,
                plural(n, "license expires", "licenses expire"),
                horizon
            )
        }
    }
}

/// First names of the report plus "and N more"
pub fn driver_names(report: &ExpiryReport) -> String {
    let mut names: Vec<String> = report
        .drivers()
        .take(NAMES_IN_SUMMARY)
        .map(|driver| driver.record.full_name())
        .collect();
    if report.total_count > NAMES_IN_SUMMARY {
        names.push(format!("and {} more", report.total_count - NAMES_IN_SUMMARY));
    }
    names.join(", ")
}

pub fn push_content(report: &ExpiryReport) -> PushContent {
    let expired = report.count(UrgencyBucket::Expired);
    let critical = report.count(UrgencyBucket::Critical);
    let urgent = report.count(UrgencyBucket::Urgent);
    let warning = report.count(UrgencyBucket::Warning);
    let horizon = report.window.horizon_days;

    let headline = report.headline().unwrap_or(UrgencyBucket::Warning);
    let (message, rich_subject) = match headline {
        UrgencyBucket::Expired => (
            format!(
                "{} driver {} EXPIRED!",
                expired,
                plural(expired, "license has", "licenses have")
            ),
            format!(
                "🚨 CRITICAL: {} {} expired",
                expired,
                plural(expired, "license", "licenses")
            ),
        ),
        UrgencyBucket::Critical => (
            format!(
                "{} driver {} within 24 hours!",
                critical,
                plural(critical, "license expires", "licenses expire")
            ),
            format!(
                "🚨 URGENT: {} {} in 24h",
                critical,
                plural(critical, "license expires", "licenses expire")
            ),
        ),
        UrgencyBucket::Urgent => (
            format!(
                "{} driver {} within 7 days",
                urgent,
                plural(urgent, "license expires", "licenses expire")
            ),
            format!(
                "⚠️ WARNING: {} {} this week",
                urgent,
                plural(urgent, "license expires", "licenses expire")
            ),
        ),
        UrgencyBucket::Warning => (
            format!(
                "{} driver {} within {} days",
                warning,
                plural(warning, "license expires", "licenses expire"),
                horizon
            ),
            format!(
                "📢 NOTICE: {} {} this month",
                warning,
                plural(warning, "license expires", "licenses expire")
            ),
        ),
    };

    let names = driver_names(report);

    let mut subject_params = Map::new();
    subject_params.insert("count".to_string(), json!(report.total_count));
    subject_params.insert("expired".to_string(), json!(expired));
    subject_params.insert("critical".to_string(), json!(critical));
    subject_params.insert("urgent".to_string(), json!(urgent));
    subject_params.insert("warning".to_string(), json!(warning));
    subject_params.insert("horizon".to_string(), json!(horizon));

    let mut message_params = Map::new();
    message_params.insert("message".to_string(), json!(message));
    message_params.insert("drivers".to_string(), json!(names));

    PushContent {
        subject_key: format!("driver_licenses_{}", headline.as_str()),
        subject_params,
        rich_message: format!("{}: {}", message, names),
        message,
        message_params,
        rich_subject,
    }
}

/// Escape text for inclusion in HTML element content and attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

struct RowStyle {
    row: &'static str,
    cell: &'static str,
    status: &'static str,
    icon: &'static str,
}

fn row_style(bucket: UrgencyBucket) -> RowStyle {
    match bucket {
        UrgencyBucket::Expired => RowStyle {
            row: "background-color: #721c24; color: white;",
            cell: "font-weight: bold;",
            status: "font-weight: bold;",
            icon: "💀",
        },
        UrgencyBucket::Critical => RowStyle {
            row: "background-color: #f8d7da;",
            cell: "font-weight: bold;",
            status: "font-weight: bold; color: #721c24;",
            icon: "🚨",
        },
        UrgencyBucket::Urgent => RowStyle {
            row: "background-color: #fff3cd;",
            cell: "",
            status: "font-weight: bold; color: #856404;",
            icon: "⚠️",
        },
        UrgencyBucket::Warning => RowStyle {
            row: "",
            cell: "",
            status: "color: #0c5460;",
            icon: "📢",
        },
    }
}

const CELL: &str = "padding: 12px; border: 1px solid #dee2e6;";

fn write_row(html: &mut String, driver: &ClassifiedDriver) {
    let style = row_style(driver.classification.bucket);
    let record = &driver.record;

    html.push_str(&format!(r#"<tr style="{} border-bottom: 1px solid #dee2e6;">"#, style.row));
    html.push_str(&format!(
        r#"<td style="{} {}">{}</td>"#,
        CELL,
        style.cell,
        escape_html(&record.name)
    ));
    html.push_str(&format!(
        r#"<td style="{} {}">{}</td>"#,
        CELL,
        style.cell,
        escape_html(&record.surname)
    ));
    html.push_str(&format!(
        r#"<td style="{} font-family: monospace; font-weight: bold;">{}</td>"#,
        CELL,
        escape_html(&record.license_number)
    ));
    html.push_str(&format!(
        r#"<td style="{} {}">{}</td>"#,
        CELL,
        style.cell,
        record.license_expiry.format("%d/%m/%Y")
    ));
    html.push_str(&format!(
        r#"<td style="{} text-align: center; {}">{} {}</td>"#,
        CELL,
        style.status,
        style.icon,
        escape_html(&driver.classification.urgency_text)
    ));
    html.push_str("</tr>");
}

fn summary_line(bucket: UrgencyBucket, horizon: u32) -> (String, &'static str) {
    match bucket {
        UrgencyBucket::Expired => ("🚨 EXPIRED:".to_string(), "#dc3545"),
        UrgencyBucket::Critical => ("🚨 Critical (≤1 day):".to_string(), "#dc3545"),
        UrgencyBucket::Urgent => ("⚠️ Urgent (2-7 days):".to_string(), "#fd7e14"),
        UrgencyBucket::Warning => (format!("📢 Notice (8-{} days):", horizon), "#0d6efd"),
    }
}

pub fn email_html(report: &ExpiryReport, recipient_group: &str) -> String {
    let horizon = report.window.horizon_days;
    let mut html = String::from(
        r#"<html><body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">"#,
    );

    // Header
    html.push_str(
        r#"<div style="background-color: #f8f9fa; padding: 20px; border-radius: 8px; margin-bottom: 20px;">"#,
    );
    html.push_str(r#"<h2 style="color: #0082c9; margin: 0;">🚗 Driver License Expiry Report</h2>"#);
    html.push_str(&format!(
        r#"<p style="margin: 5px 0 0 0; color: #666;">Generated on {}</p>"#,
        report.generated_at.format("%d/%m/%Y %H:%M:%S")
    ));
    html.push_str("</div>");

    // Summary
    html.push_str(
        r#"<div style="background-color: #e7f3ff; padding: 15px; border-radius: 5px; margin-bottom: 20px; border-left: 4px solid #007bff;">"#,
    );
    html.push_str(r#"<h3 style="margin-top: 0; color: #004085;">📊 Summary</h3>"#);
    html.push_str(&format!(
        r#"<p style="margin-bottom: 0;"><strong>Total drivers with expiring licenses:</strong> {}</p>"#,
        report.total_count
    ));
    for bucket in UrgencyBucket::ALL {
        let count = report.count(bucket);
        if count > 0 {
            let (label, color) = summary_line(bucket, horizon);
            html.push_str(&format!(
                r#"<p style="margin: 5px 0; color: {};"><strong>{}</strong> {}</p>"#,
                color, label, count
            ));
        }
    }
    html.push_str("</div>");

    html.push_str(&format!(
        r#"<div style="margin-bottom: 20px;"><p><strong>The following drivers have their driving licenses expiring within the next {} days:</strong></p></div>"#,
        horizon
    ));

    // Drivers table, most urgent bucket first
    html.push_str(
        r#"<table style="width: 100%; border-collapse: collapse; margin-bottom: 20px; background-color: white; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">"#,
    );
    html.push_str(r#"<thead><tr style="background-color: #0082c9; color: white;">"#);
    for header in ["Name", "Surname", "License Number", "Expiry Date"] {
        html.push_str(&format!(r#"<th style="{} text-align: left;">{}</th>"#, CELL, header));
    }
    html.push_str(&format!(r#"<th style="{} text-align: center;">Status</th>"#, CELL));
    html.push_str("</tr></thead><tbody>");
    for driver in report.drivers() {
        write_row(&mut html, driver);
    }
    html.push_str("</tbody></table>");

    // Action items
    html.push_str(
        r#"<div style="background-color: #e7f3ff; padding: 15px; border-radius: 5px; margin-bottom: 20px; border-left: 4px solid #007bff;">"#,
    );
    html.push_str(
        r#"<h3 style="margin-top: 0; color: #004085;">🎯 Action Required:</h3><ul style="margin-bottom: 0;">"#,
    );
    if report.count(UrgencyBucket::Expired) > 0 {
        html.push_str(
            r#"<li><strong style="color: #721c24;">EXPIRED LICENSES: Immediate action required - drivers cannot legally drive!</strong></li>"#,
        );
    }
    if report.count(UrgencyBucket::Critical) > 0 {
        html.push_str(
            r#"<li><strong style="color: #dc3545;">IMMEDIATE ACTION: Contact drivers with licenses expiring within 24 hours!</strong></li>"#,
        );
    }
    if report.count(UrgencyBucket::Urgent) > 0 {
        html.push_str(
            r#"<li><strong style="color: #fd7e14;">URGENT: Schedule renewals for drivers expiring within 7 days</strong></li>"#,
        );
    }
    html.push_str("<li>Contact all drivers to arrange license renewal appointments</li>");
    html.push_str("<li>Ensure renewals are completed before expiry dates</li>");
    html.push_str("<li>Update the Driver Manager system once renewals are confirmed</li>");
    html.push_str("<li>Monitor the system daily for new expiring licenses</li>");
    html.push_str("</ul></div>");

    // Footer
    html.push_str(
        r#"<div style="margin-top: 30px; padding-top: 20px; border-top: 1px solid #dee2e6; font-size: 12px; color: #6c757d;">"#,
    );
    html.push_str(
        "<p><strong>Driver Manager System</strong> - Automated License Expiry Notification</p>",
    );
    html.push_str(&format!(
        "<p>This is a daily notification sent to members of the \"{}\" group.</p>",
        escape_html(recipient_group)
    ));
    html.push_str("<p>Push notifications have also been sent to mobile app users.</p>");
    html.push_str(
        "<p>To stop receiving these notifications, ask your administrator to remove you from the group.</p>",
    );
    html.push_str("</div></body></html>");

    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::{ExpiryWindow, ReportBuilder};
    use crate::test_utils::{driver, generated_at};
    use chrono::{Duration, NaiveDate};
    use shared::DriverRecord;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn report(records: Vec<DriverRecord>) -> ExpiryReport {
        ReportBuilder::build(records, ExpiryWindow::new(today(), 30, 30), generated_at(today()))
    }

    fn mixed_report() -> ExpiryReport {
        report(vec![
            driver(1, "Ana", "Alba", today() - Duration::days(5)),
            driver(2, "Ben", "Bell", today() + Duration::days(4)),
            driver(3, "Cid", "Cole", today() + Duration::days(20)),
        ])
    }

    #[test]
    fn test_expired_headline_wording() {
        let report = mixed_report();

        let subject = email_subject(&report);
        assert_eq!(subject, "🚨 CRITICAL: 1 driver license has EXPIRED");

        let push = push_content(&report);
        assert_eq!(push.subject_key, "driver_licenses_expired");
        assert!(push.message.starts_with("1 driver license has EXPIRED"));
        assert_eq!(push.rich_subject, "🚨 CRITICAL: 1 license expired");
        assert_eq!(
            push.rich_message,
            "1 driver license has EXPIRED!: Ana Alba, Ben Bell, Cid Cole"
        );
        assert_eq!(push.subject_params.get("count"), Some(&json!(3)));
        assert_eq!(push.subject_params.get("urgent"), Some(&json!(1)));
        assert_eq!(push.subject_params.get("horizon"), Some(&json!(30)));
    }

    #[test]
    fn test_plural_subjects() {
        let critical = report(vec![
            driver(1, "Ana", "Alba", today()),
            driver(2, "Ben", "Bell", today() + Duration::days(1)),
        ]);
        assert_eq!(
            email_subject(&critical),
            "🚨 CRITICAL: 2 driver licenses expire within 24 hours"
        );
        assert_eq!(
            push_content(&critical).message,
            "2 driver licenses expire within 24 hours!"
        );

        let urgent = report(vec![driver(1, "Ana", "Alba", today() + Duration::days(6))]);
        assert_eq!(
            email_subject(&urgent),
            "⚠️ URGENT: 1 driver license expires within 7 days"
        );
        assert_eq!(
            push_content(&urgent).rich_subject,
            "⚠️ WARNING: 1 license expires this week"
        );

        let warning = report(vec![
            driver(1, "Ana", "Alba", today() + Duration::days(10)),
            driver(2, "Ben", "Bell", today() + Duration::days(12)),
        ]);
        assert_eq!(
            email_subject(&warning),
            "📢 NOTICE: 2 driver licenses expire within 30 days"
        );
        assert_eq!(
            push_content(&warning).subject_key,
            "driver_licenses_warning"
        );
    }

    #[test]
    fn test_driver_names_truncated() {
        let records = (0..5)
            .map(|i| driver(i, &format!("N{}", i), "Moss", today() + Duration::days(10 + i)))
            .collect();
        let report = report(records);
        assert_eq!(
            driver_names(&report),
            "N0 Moss, N1 Moss, N2 Moss, and 2 more"
        );
    }

    #[test]
    fn test_email_html_content() {
        let mut records = vec![driver(1, "<Ana>", "O'Hara & Co", today() - Duration::days(5))];
        records.push(driver(2, "Ben", "Bell", today() + Duration::days(20)));
        let html = email_html(&report(records), "driver notifications");

        assert!(html.contains("🚗 Driver License Expiry Report"));
        assert!(html.contains("Generated on 01/03/2025 06:00:00"));
        assert!(html.contains("&lt;Ana&gt;"));
        assert!(html.contains("O&#039;Hara &amp; Co"));
        assert!(!html.contains("<Ana>"));
        assert!(html.contains("24/02/2025"));
        assert!(html.contains("💀 EXPIRED 5 days ago"));
        assert!(html.contains("📢 Expires in 20 days"));
        assert!(html.contains("<strong>🚨 EXPIRED:</strong> 1"));
        assert!(!html.contains("Critical (≤1 day)"));
        assert!(html.contains("EXPIRED LICENSES: Immediate action required"));
        assert!(!html.contains("IMMEDIATE ACTION"));
        assert!(
            html.contains("members of the \"driver notifications\" group")
        );

        // Expired rows come before later buckets
        let expired_at = html.find("💀").unwrap();
        let warning_at = html.find("📢 Expires").unwrap();
        assert!(expired_at < warning_at);
    }
}
