//! Migration summary email via SMTP.
//!
//! [`SummaryEmail`] renders the ledger rows into a plain-text and HTML
//! multipart message; [`EmailDelivery`] sends it over a STARTTLS relay with
//! the `lettre` async transport.

use std::fmt::Write as _;

use dashmig_core::types::DashboardRecord;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// Sending was requested but a required setting is missing.
    #[error("Email not configured: {0}")]
    NotConfigured(&'static str),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP relay.
pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";

/// Default SMTP port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Longest error excerpt shown per row.
const MAX_ERROR_CHARS: usize = 100;

#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub from_address: Option<String>,
    pub recipients: Vec<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("from_address", &self.from_address)
            .field("recipients", &self.recipients)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: DEFAULT_SMTP_SERVER.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            from_address: None,
            recipients: Vec::new(),
            smtp_username: None,
            smtp_password: None,
        }
    }
}

impl EmailConfig {
    /// Split a comma-separated recipient list.
    pub fn parse_recipients(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Check that everything needed to send is present.
    pub fn check(&self) -> Result<(), EmailError> {
        if self.recipients.is_empty() {
            return Err(EmailError::NotConfigured("no recipients (--email-to)"));
        }
        if self.from_address.as_deref().map_or(true, str::is_empty) {
            return Err(EmailError::NotConfigured("no sender address (--email-from)"));
        }
        if self.smtp_username.is_none() || self.smtp_password.is_none() {
            return Err(EmailError::NotConfigured(
                "SMTP credentials missing (SMTP_USERNAME / SMTP_PASSWORD)",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SummaryEmail
// ---------------------------------------------------------------------------

/// Rendered summary message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl SummaryEmail {
    /// Render the legacy-origin rows of a ledger.
    ///
    /// `publish` and `delete_legacy` add the corresponding counters when
    /// those steps were requested. Under `dry_run`, rows that were neither
    /// migrated nor failed are reported as "would migrate".
    pub fn render(
        records: &[&DashboardRecord],
        publish: bool,
        delete_legacy: bool,
        dry_run: bool,
        log_file: &str,
    ) -> Self {
        let rows: Vec<&DashboardRecord> = records
            .iter()
            .copied()
            .filter(|r| !r.legacy_id.is_empty())
            .collect();
        let total = rows.len();
        let migrated = rows.iter().filter(|r| r.migrated).count();
        let would_migrate = rows
            .iter()
            .filter(|r| row_status(r, dry_run) == RowStatus::WouldMigrate)
            .count();
        let failed = total - migrated - would_migrate;
        let published = rows.iter().filter(|r| r.published).count();
        let deleted = rows.iter().filter(|r| r.deleted_legacy).count();

        let (title, subject) = if dry_run {
            (
                "Dashboard Migration Summary (DRY RUN)",
                format!(
                    "Dashboard Migration Summary (DRY RUN) - {would_migrate}/{total} would migrate"
                ),
            )
        } else {
            (
                "Dashboard Migration Summary",
                format!("Dashboard Migration Summary - {migrated}/{total} migrated"),
            )
        };

        let mut text = format!("{title}\n\n");
        let _ = writeln!(text, "Total Dashboards: {total}");
        if dry_run {
            let _ = writeln!(text, "Would Migrate: {would_migrate}");
        }
        let _ = writeln!(text, "Successfully Migrated: {migrated}");
        let _ = writeln!(text, "Failed Migrations: {failed}");
        if publish {
            let _ = writeln!(text, "Published: {published}");
        }
        if delete_legacy {
            let _ = writeln!(text, "Deleted Legacy: {deleted}");
        }
        let _ = write!(text, "\nFull details available in log file: {log_file}\n");

        let mut html = String::from(HTML_HEAD);
        let _ = writeln!(html, "<h2>{title}</h2>");
        html.push_str("<div class=\"summary\">\n<h3>Migration Statistics</h3>\n<ul>\n");
        let _ = writeln!(html, "<li><strong>Total Dashboards:</strong> {total}</li>");
        if dry_run {
            let _ = writeln!(
                html,
                "<li><strong class=\"pending\">Would Migrate:</strong> {would_migrate}</li>"
            );
        }
        let _ = writeln!(
            html,
            "<li><strong class=\"success\">Successfully Migrated:</strong> {migrated}</li>"
        );
        let _ = writeln!(
            html,
            "<li><strong class=\"error\">Failed Migrations:</strong> {failed}</li>"
        );
        if publish {
            let _ = writeln!(html, "<li><strong>Published:</strong> {published}</li>");
        }
        if delete_legacy {
            let _ = writeln!(html, "<li><strong>Deleted Legacy:</strong> {deleted}</li>");
        }
        html.push_str("</ul>\n</div>\n<h3>Migration Details</h3>\n<table>\n");
        html.push_str(
            "<tr><th>Legacy ID</th><th>Name</th><th>Path</th>\
             <th>Lakeview ID</th><th>Status</th><th>Error</th></tr>\n",
        );
        for row in &rows {
            let (status, class) = match row_status(row, dry_run) {
                RowStatus::Migrated => ("Migrated", "success"),
                RowStatus::WouldMigrate => ("Would migrate", "pending"),
                RowStatus::Failed => ("Failed", "error"),
            };
            let error: String = row.error.chars().take(MAX_ERROR_CHARS).collect();
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
                 <td class=\"{class}\">{status}</td><td>{}</td></tr>",
                escape(&row.legacy_id),
                escape(&row.legacy_name),
                escape(&row.legacy_path),
                escape(&row.lakeview_id),
                escape(&error),
            );
        }
        let _ = write!(
            html,
            "</table>\n<p><em>Full details available in log file: {}</em></p>\n</body>\n</html>\n",
            escape(log_file)
        );

        Self {
            subject,
            text,
            html,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowStatus {
    Migrated,
    WouldMigrate,
    Failed,
}

fn row_status(row: &DashboardRecord, dry_run: bool) -> RowStatus {
    if row.migrated {
        RowStatus::Migrated
    } else if dry_run && row.error.is_empty() {
        RowStatus::WouldMigrate
    } else {
        RowStatus::Failed
    }
}

const HTML_HEAD: &str = "<html>\n<head>\n<style>\n\
body { font-family: Arial, sans-serif; }\n\
table { border-collapse: collapse; width: 100%; margin: 20px 0; }\n\
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }\n\
th { background-color: #4CAF50; color: white; }\n\
.success { color: green; }\n\
.error { color: red; }\n\
.pending { color: #1565c0; }\n\
.summary { background-color: #f2f2f2; padding: 15px; margin: 20px 0; }\n\
</style>\n</head>\n<body>\n";

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends summary emails via SMTP.
pub struct EmailDelivery {
    config: EmailConfig,
}

impl EmailDelivery {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Send `email` to every configured recipient.
    pub async fn deliver(&self, email: &SummaryEmail) -> Result<(), EmailError> {
        use lettre::{
            message::MultiPart, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
            AsyncTransport, Message, Tokio1Executor,
        };

        self.config.check()?;
        let from = self
            .config
            .from_address
            .as_deref()
            .ok_or(EmailError::NotConfigured("no sender address (--email-from)"))?;

        let mut builder = Message::builder()
            .from(from.parse()?)
            .subject(email.subject.clone())
            .date_now();
        for recipient in &self.config.recipients {
            builder = builder.to(recipient.parse()?);
        }
        let message = builder
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_username, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(message).await?;

        tracing::info!(
            to = %self.config.recipients.join(", "),
            subject = %email.subject,
            "Summary email sent",
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
