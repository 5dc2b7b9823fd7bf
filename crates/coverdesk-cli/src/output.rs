//! Plain-text and CSV rendering for CLI output.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};

use coverdesk_core::DashboardStats;
use coverdesk_core::models::{ClientSubmission, QuoteRequest, Submissions};
use coverdesk_core::util::{format_currency, relative_time, truncate};

pub fn submissions_table(submissions: &Submissions, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str(&quote_requests_table(&submissions.quote_requests, now));
    out.push('\n');
    out.push_str(&client_submissions_table(&submissions.client_submissions, now));
    out
}

pub fn quote_requests_table(requests: &[QuoteRequest], now: DateTime<Utc>) -> String {
    let mut out = format!("Quote requests ({})\n", requests.len());
    if requests.is_empty() {
        out.push_str("  No quote requests yet.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<14} {:<24} {:<20} {:<14} {:<28} {:<16} {:<36}",
        "SUBMITTED", "NAME", "TYPE", "COVERAGE", "EMAIL", "PHONE", "ID"
    );
    for request in requests {
        let _ = writeln!(
            out,
            "{:<14} {:<24} {:<20} {:<14} {:<28} {:<16} {:<36}",
            relative_time(request.submitted_at, now),
            truncate(&request.full_name, 24),
            request.insurance_type.label(),
            truncate(request.coverage_amount.as_deref().unwrap_or("-"), 14),
            truncate(&request.email, 28),
            request.phone,
            request.id,
        );
    }
    out
}

pub fn client_submissions_table(submissions: &[ClientSubmission], now: DateTime<Utc>) -> String {
    let mut out = format!("Client submissions ({})\n", submissions.len());
    if submissions.is_empty() {
        out.push_str("  No client submissions yet.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<14} {:<24} {:<28} {:<16} {:<24} {:<36}",
        "SUBMITTED", "NAME", "EMAIL", "PHONE", "LOCATION", "ID"
    );
    for submission in submissions {
        let location = format!(
            "{}, {} {}",
            submission.city, submission.state, submission.zip_code
        );
        let _ = writeln!(
            out,
            "{:<14} {:<24} {:<28} {:<16} {:<24} {:<36}",
            relative_time(submission.submitted_at, now),
            truncate(&submission.full_name(), 24),
            truncate(&submission.email, 28),
            submission.phone,
            truncate(&location, 24),
            submission.id,
        );
    }
    out
}

pub fn dashboard(stats: &DashboardStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total quotes    {}", stats.total_quotes);
    let _ = writeln!(out, "Active          {}", stats.active_quotes);
    let _ = writeln!(out, "Won             {}", stats.won_quotes);
    let _ = writeln!(out, "Lost            {}", stats.lost_quotes);
    let _ = writeln!(out, "Win rate        {}%", stats.win_rate);
    let _ = writeln!(
        out,
        "Revenue         {}",
        format_currency(Some(stats.total_revenue))
    );
    let _ = writeln!(
        out,
        "Coverage        {}",
        format_currency(Some(stats.total_coverage))
    );

    if !stats.pipeline.is_empty() {
        out.push_str("\nPipeline\n");
        for stage in &stats.pipeline {
            let _ = writeln!(out, "  {:<16} {}", stage.display_name, stage.count);
        }
    }
    out
}

pub fn write_quote_requests_csv<W: Write>(writer: W, requests: &[QuoteRequest]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "id",
        "submitted_at",
        "full_name",
        "email",
        "phone",
        "insurance_type",
        "coverage_amount",
        "additional_info",
        "status",
    ])?;
    for request in requests {
        csv.write_record([
            request.id.to_string(),
            request.submitted_at.to_rfc3339(),
            request.full_name.clone(),
            request.email.clone(),
            request.phone.clone(),
            request.insurance_type.as_str().to_string(),
            request.coverage_amount.clone().unwrap_or_default(),
            request.additional_info.clone().unwrap_or_default(),
            request.status.as_str().to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_client_submissions_csv<W: Write>(
    writer: W,
    submissions: &[ClientSubmission],
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "id",
        "submitted_at",
        "first_name",
        "last_name",
        "email",
        "phone",
        "date_of_birth",
        "address",
        "city",
        "state",
        "zip_code",
    ])?;
    for submission in submissions {
        csv.write_record([
            submission.id.to_string(),
            submission.submitted_at.to_rfc3339(),
            submission.first_name.clone(),
            submission.last_name.clone(),
            submission.email.clone(),
            submission.phone.clone(),
            submission.date_of_birth.clone().unwrap_or_default(),
            submission.address.clone(),
            submission.city.clone(),
            submission.state.clone(),
            submission.zip_code.clone(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}
