use anyhow::Context;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::config::Config;

pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailService {
    /// Returns None if SMTP is not fully configured.
    pub fn new(config: &Config) -> Option<Self> {
        let host = config.smtp_host.as_deref()?;
        let username = config.smtp_username.clone()?;
        let password = config.smtp_password.clone()?;
        let from_addr = config.smtp_from.as_deref()?;

        let port = config.smtp_port.unwrap_or(587);
        let creds = Credentials::new(username, password);

        let transport = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .ok()?
                .credentials(creds)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .ok()?
                .credentials(creds)
                .build()
        };

        let from: Mailbox = from_addr.parse().ok()?;

        Some(Self { transport, from })
    }

    fn new_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain())
    }

    /// Wraps inner HTML content in a consistent plain email layout.
    fn wrap_html(content: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width,initial-scale=1">
  <title>tutorspace</title>
</head>
<body style="margin:0;padding:0;background-color:#f1f5f9;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Helvetica,Arial,sans-serif">
  <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="background-color:#f1f5f9;padding:40px 16px">
    <tr>
      <td align="center">
        <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="max-width:520px">
          <tr>
            <td align="center" style="padding-bottom:28px">
              <p style="margin:0;font-size:20px;font-weight:700;color:#0f172a;text-align:center">tutorspace</p>
            </td>
          </tr>
          <tr>
            <td style="background:#ffffff;border-radius:12px;padding:40px;box-shadow:0 1px 3px rgba(0,0,0,0.08),0 8px 24px rgba(0,0,0,0.04)">
              {content}
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>"#
        )
    }

    async fn send_email(
        &self,
        to: Mailbox,
        subject: &str,
        text: &str,
        html: &str,
    ) -> anyhow::Result<()> {
        let email = Message::builder()
            .message_id(Some(self.new_message_id()))
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            )
            .context("Failed to build email message")?;

        self.transport
            .send(email)
            .await
            .context("Failed to send email")?;
        Ok(())
    }

    pub async fn send_password_reset(
        &self,
        to: &str,
        display_name: &str,
        reset_url: &str,
    ) -> anyhow::Result<()> {
        let to: Mailbox = to.parse().context("Invalid recipient address")?;
        let text = format!(
            "Hello {display_name},\n\n\
             A password reset was requested for your tutorspace account.\n\
             Open this link to choose a new password (valid for one hour):\n\n{reset_url}\n\n\
             If you did not request this, you can ignore this email."
        );
        let html = Self::wrap_html(&format!(
            r#"<p style="margin:0 0 16px">Hello {display_name},</p>
<p style="margin:0 0 16px">A password reset was requested for your tutorspace account.</p>
<p style="margin:0 0 24px"><a href="{reset_url}" style="background:#0f172a;color:#ffffff;text-decoration:none;padding:12px 20px;border-radius:8px;display:inline-block">Choose a new password</a></p>
<p style="margin:0;color:#64748b;font-size:13px">The link is valid for one hour. If you did not request this, you can ignore this email.</p>"#
        ));
        self.send_email(to, "Reset your tutorspace password", &text, &html)
            .await
    }

    /// Invoice delivery: the rendered PDF rides along as an attachment so the
    /// emailed figure is the same document the teacher downloaded.
    pub async fn send_invoice(
        &self,
        to: &str,
        student_name: &str,
        teacher_name: &str,
        invoice_number: &str,
        total_amount: f64,
        pdf_bytes: Vec<u8>,
    ) -> anyhow::Result<()> {
        let to: Mailbox = to.parse().context("Invalid recipient address")?;
        let text = format!(
            "Hello {student_name},\n\n\
             {teacher_name} sent you invoice {invoice_number} for {total_amount:.2}.\n\
             The invoice is attached as a PDF.\n"
        );
        let html = Self::wrap_html(&format!(
            r#"<p style="margin:0 0 16px">Hello {student_name},</p>
<p style="margin:0 0 16px">{teacher_name} sent you invoice <strong>{invoice_number}</strong> for <strong>{total_amount:.2}</strong>.</p>
<p style="margin:0;color:#64748b;font-size:13px">The invoice is attached as a PDF.</p>"#
        ));

        let attachment = Attachment::new(format!("{invoice_number}.pdf")).body(
            pdf_bytes,
            ContentType::parse("application/pdf").context("Invalid attachment content type")?,
        );

        let email = Message::builder()
            .message_id(Some(self.new_message_id()))
            .from(self.from.clone())
            .to(to)
            .subject(format!("Invoice {invoice_number} from {teacher_name}"))
            .multipart(
                MultiPart::mixed()
                    .multipart(
                        MultiPart::alternative()
                            .singlepart(
                                SinglePart::builder()
                                    .header(ContentType::TEXT_PLAIN)
                                    .body(text),
                            )
                            .singlepart(
                                SinglePart::builder()
                                    .header(ContentType::TEXT_HTML)
                                    .body(html),
                            ),
                    )
                    .singlepart(attachment),
            )
            .context("Failed to build email message")?;

        self.transport
            .send(email)
            .await
            .context("Failed to send email")?;
        Ok(())
    }
}
