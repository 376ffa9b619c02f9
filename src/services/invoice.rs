use chrono::NaiveDate;

use crate::models::billing::BillingGroup;

// A4 in PDF points.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;

const ROW_STEP: f32 = 20.0;
const ROWS_FIRST_PAGE: usize = 24;
const ROWS_PER_PAGE: usize = 32;

const COL_DATE: f32 = 50.0;
const COL_TITLE: f32 = 150.0;
const COL_AMOUNT: f32 = 470.0;

pub struct InvoiceService;

impl InvoiceService {
    pub fn invoice_number(group: &BillingGroup, issued_on: NaiveDate) -> String {
        let id = group.student_id.simple().to_string();
        format!("INV-{}-{}", issued_on.format("%Y%m%d"), &id[..8])
    }

    /// Renders one billing group as a paginated PDF. The footer total prints
    /// the group's accumulated `total_amount` as-is so the document always
    /// matches the on-screen summary figure.
    pub fn render_pdf(
        group: &BillingGroup,
        teacher_name: &str,
        teacher_email: &str,
        issued_on: NaiveDate,
    ) -> Vec<u8> {
        let chunks = paginate(&group.classes, ROWS_FIRST_PAGE, ROWS_PER_PAGE);
        let page_count = chunks.len();
        let mut streams = Vec::with_capacity(page_count);

        for (page_no, chunk) in chunks.iter().enumerate() {
            let mut s = String::new();
            let rows_top = if page_no == 0 {
                render_first_page_header(&mut s, group, teacher_name, teacher_email, issued_on);
                650.0
            } else {
                render_continuation_header(&mut s, group, page_no + 1, page_count);
                790.0
            };

            table_heading(&mut s, rows_top);
            let mut y = rows_top - 22.0;
            for line in *chunk {
                text_at(&mut s, COL_DATE, y, "F1", 10, &line.date.format("%Y-%m-%d").to_string());
                text_at(&mut s, COL_TITLE, y, "F1", 10, &line.title);
                text_at(&mut s, COL_AMOUNT, y, "F1", 10, &format!("{:.2}", line.amount));
                y -= ROW_STEP;
            }

            if page_no == page_count - 1 {
                y -= 10.0;
                rule(&mut s, COL_DATE, y + 14.0, PAGE_WIDTH - 50.0);
                text_at(&mut s, 380.0, y, "F2", 12, "TOTAL DUE");
                text_at(
                    &mut s,
                    COL_AMOUNT,
                    y,
                    "F2",
                    12,
                    &format!("{:.2}", group.total_amount),
                );
            }

            streams.push(s);
        }

        assemble(&streams)
    }
}

/// Splits line items into page-sized chunks; the first page holds fewer rows
/// to leave room for the header block. An empty group still gets one page.
fn paginate<T>(items: &[T], first: usize, rest: usize) -> Vec<&[T]> {
    let mut chunks = Vec::new();
    let head_len = items.len().min(first);
    chunks.push(&items[..head_len]);
    let mut offset = head_len;
    while offset < items.len() {
        let end = (offset + rest).min(items.len());
        chunks.push(&items[offset..end]);
        offset = end;
    }
    chunks
}

fn render_first_page_header(
    s: &mut String,
    group: &BillingGroup,
    teacher_name: &str,
    teacher_email: &str,
    issued_on: NaiveDate,
) {
    let title = "INVOICE";
    text_at(s, centered_x(title, 22.0), 780.0, "F2", 22, title);

    text_at(s, 50.0, 740.0, "F2", 11, "Billed to");
    text_at(s, 50.0, 724.0, "F1", 11, &group.student_name);
    let mut y = 710.0;
    if let Some(email) = &group.student_email {
        text_at(s, 50.0, y, "F1", 10, email);
        y -= 14.0;
    }
    if let Some(subject) = &group.subject {
        text_at(s, 50.0, y, "F1", 10, subject);
        y -= 14.0;
    }
    text_at(s, 50.0, y, "F1", 10, &format!("Rate: {:.2} per class", group.hourly_rate));

    text_at(s, 360.0, 740.0, "F2", 11, "From");
    text_at(s, 360.0, 724.0, "F1", 11, teacher_name);
    text_at(s, 360.0, 710.0, "F1", 10, teacher_email);
    text_at(
        s,
        360.0,
        688.0,
        "F1",
        10,
        &InvoiceService::invoice_number(group, issued_on),
    );
    text_at(
        s,
        360.0,
        674.0,
        "F1",
        10,
        &format!("Issued {}", issued_on.format("%Y-%m-%d")),
    );
}

fn render_continuation_header(s: &mut String, group: &BillingGroup, page: usize, pages: usize) {
    text_at(s, 50.0, 810.0, "F1", 10, &group.student_name);
    text_at(s, 470.0, 810.0, "F1", 10, &format!("Page {page} of {pages}"));
}

fn table_heading(s: &mut String, y: f32) {
    text_at(s, COL_DATE, y, "F2", 11, "Date");
    text_at(s, COL_TITLE, y, "F2", 11, "Class");
    text_at(s, COL_AMOUNT, y, "F2", 11, "Amount");
    rule(s, COL_DATE, y - 6.0, PAGE_WIDTH - 50.0);
}

fn text_at(s: &mut String, x: f32, y: f32, font: &str, size: u32, text: &str) {
    s.push_str(&format!(
        "BT /{font} {size} Tf {x:.1} {y:.1} Td ({}) Tj ET\n",
        pdf_escape(text)
    ));
}

fn rule(s: &mut String, x1: f32, y: f32, x2: f32) {
    s.push_str(&format!("{x1:.1} {y:.1} m {x2:.1} {y:.1} l S\n"));
}

/// Approximate centering for Helvetica (average glyph ~half the font size).
fn centered_x(text: &str, size: f32) -> f32 {
    let width = text.chars().count() as f32 * size * 0.5;
    ((PAGE_WIDTH - width) / 2.0).max(0.0)
}

/// Escape special PDF string characters.
fn pdf_escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Assembles page content streams into a PDF, tracking byte offsets for the
/// xref table. Objects: 1 catalog, 2 pages, then a page/content pair per
/// stream.
fn assemble(streams: &[String]) -> Vec<u8> {
    let n = streams.len();
    let mut body = String::new();
    let mut offsets: Vec<usize> = Vec::with_capacity(2 + 2 * n);

    body += "%PDF-1.4\n";

    offsets.push(body.len());
    body += "1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n";

    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    offsets.push(body.len());
    body += &format!(
        "2 0 obj\n<< /Type /Pages /Kids [{}] /Count {} >>\nendobj\n",
        kids.join(" "),
        n
    );

    for (i, stream) in streams.iter().enumerate() {
        let page_id = 3 + 2 * i;
        let content_id = page_id + 1;

        offsets.push(body.len());
        body += &format!("{page_id} 0 obj\n");
        body += &format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH:.0} {PAGE_HEIGHT:.0}]\n"
        );
        body += "/Resources << /Font << \
                 /F1 << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> \
                 /F2 << /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold >> >> >>\n";
        body += &format!("/Contents {content_id} 0 R >>\nendobj\n");

        offsets.push(body.len());
        body += &format!(
            "{content_id} 0 obj\n<< /Length {} >>\nstream\n{}endstream\nendobj\n",
            stream.len(),
            stream
        );
    }

    let xref_pos = body.len();
    body += &format!("xref\n0 {}\n", offsets.len() + 1);
    body += "0000000000 65535 f \n";
    for offset in &offsets {
        body += &format!("{:010} 00000 n \n", offset);
    }
    body += &format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        offsets.len() + 1,
        xref_pos
    );

    body.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::billing::BillingLine;
    use uuid::Uuid;

    fn group_with(lines: usize, rate: f64) -> BillingGroup {
        let classes: Vec<BillingLine> = (0..lines)
            .map(|i| BillingLine {
                class_id: Uuid::new_v4(),
                title: format!("Lesson {}", i + 1),
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                amount: rate,
            })
            .collect();
        BillingGroup {
            student_id: Uuid::new_v4(),
            student_name: "Ana Torres".to_string(),
            student_email: Some("ana@example.com".to_string()),
            subject: Some("Math".to_string()),
            hourly_rate: rate,
            classes,
            total_amount: rate * lines as f64,
        }
    }

    fn render(group: &BillingGroup) -> String {
        let bytes = InvoiceService::render_pdf(
            group,
            "Lena Moreau",
            "lena@example.com",
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        );
        String::from_utf8(bytes).unwrap()
    }

    fn page_count(pdf: &str) -> usize {
        pdf.matches("<< /Type /Page /Parent").count()
    }

    #[test]
    fn short_invoice_is_a_single_page() {
        let pdf = render(&group_with(3, 20.0));
        assert!(pdf.starts_with("%PDF-1.4"));
        assert!(pdf.ends_with("%%EOF\n"));
        assert_eq!(page_count(&pdf), 1);
        assert!(pdf.contains("(INVOICE)"));
        assert!(pdf.contains("(Ana Torres)"));
    }

    #[test]
    fn long_invoice_paginates() {
        let pdf = render(&group_with(40, 20.0));
        assert_eq!(page_count(&pdf), 2);
        assert!(pdf.contains("(Page 2 of 2)"));
    }

    #[test]
    fn footer_total_matches_group_total() {
        let group = group_with(3, 20.0);
        let pdf = render(&group);
        assert!(pdf.contains("(TOTAL DUE)"));
        assert!(pdf.contains("(60.00)"));
    }

    #[test]
    fn empty_group_still_renders_one_page() {
        let pdf = render(&group_with(0, 20.0));
        assert_eq!(page_count(&pdf), 1);
        assert!(pdf.contains("(0.00)"));
    }

    #[test]
    fn titles_with_parens_are_escaped() {
        let mut group = group_with(1, 20.0);
        group.classes[0].title = "Algebra (intro)".to_string();
        let pdf = render(&group);
        assert!(pdf.contains("(Algebra \\(intro\\))"));
    }

    #[test]
    fn invoice_number_is_stable_for_a_day() {
        let group = group_with(1, 20.0);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let a = InvoiceService::invoice_number(&group, date);
        let b = InvoiceService::invoice_number(&group, date);
        assert_eq!(a, b);
        assert!(a.starts_with("INV-20240601-"));
    }
}
