//! Receipt PDF assembly.
//!
//! The page is laid out against an explicit vertical cursor; every
//! insertion, including the QR image, moves the cursor, so trailing
//! sections can never land on top of the QR region. The layout report
//! returned alongside the bytes makes that invariant testable.

use std::io::{BufWriter, Write};

use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject,
    IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point, Px,
    Rgb,
};
use rust_decimal::Decimal;

use super::{qr, ReceiptError};
use crate::models::{Event, Registration, User};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 18.0;

pub const QR_SIZE_MM: f32 = 42.0;
/// Minimum gap between the QR bottom edge and whatever follows it.
pub const QR_CLEARANCE_MM: f32 = 6.0;

const QR_SCALE: usize = 4;

const PT_TO_MM: f32 = 0.3528;
const LEADING: f32 = 1.4;
// Average glyph advance for Helvetica, as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;

/// Vertical extents of the interesting regions, in mm from the page
/// bottom. `footer_top` must sit at or below `qr_bottom` minus the
/// clearance.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptLayout {
    pub qr_top: f32,
    pub qr_bottom: f32,
    pub footer_top: f32,
}

struct Cursor {
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        }
    }

    fn advance(&mut self, dy: f32) {
        self.y -= dy;
    }

    /// Move the cursor to an absolute position below its current one.
    fn drop_to(&mut self, y: f32) {
        debug_assert!(y <= self.y, "cursor may only move down the page");
        self.y = y;
    }
}

fn line_height(size_pt: f32) -> f32 {
    size_pt * PT_TO_MM * LEADING
}

fn approx_width_mm(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * size_pt * AVG_GLYPH_EM * PT_TO_MM
}

fn centered_x(text: &str, size_pt: f32) -> f32 {
    ((PAGE_WIDTH_MM - approx_width_mm(text, size_pt)) / 2.0).max(MARGIN_MM)
}

/// Greedy word wrap against the printable width.
fn wrap(text: &str, size_pt: f32) -> Vec<String> {
    let usable = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
    let max_chars = ((usable / (size_pt * AVG_GLYPH_EM * PT_TO_MM)) as usize).max(8);

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

struct Page {
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    cursor: Cursor,
}

impl Page {
    fn text_line(&mut self, font: &IndirectFontRef, size_pt: f32, x: f32, text: &str) {
        self.cursor.advance(line_height(size_pt));
        self.layer
            .use_text(text, size_pt, Mm(x), Mm(self.cursor.y), font);
    }

    fn wrapped(&mut self, font: &IndirectFontRef, size_pt: f32, text: &str) {
        for line in wrap(text, size_pt) {
            self.text_line(font, size_pt, MARGIN_MM, &line);
        }
    }

    fn centered(&mut self, font: &IndirectFontRef, size_pt: f32, text: &str) {
        for line in wrap(text, size_pt) {
            let x = centered_x(&line, size_pt);
            self.text_line(font, size_pt, x, &line);
        }
    }

    fn fill_color(&self, r: f32, g: f32, b: f32) {
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
    }

    fn divider(&mut self) {
        self.cursor.advance(4.0);
        let y = self.cursor.y;
        let line = Line {
            points: vec![
                (Point::new(Mm(MARGIN_MM), Mm(y)), false),
                (Point::new(Mm(PAGE_WIDTH_MM - MARGIN_MM), Mm(y)), false),
            ],
            is_closed: false,
        };
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.73, 0.73, 0.73, None)));
        self.layer.set_outline_thickness(0.7);
        self.layer.add_line(line);
        self.cursor.advance(3.0);
    }
}

/// Render the receipt into `sink`.
///
/// The QR is encoded before any byte reaches the sink, so a QR failure
/// leaves the sink untouched.
pub fn render<W: Write>(
    registration: &Registration,
    user: &User,
    event: &Event,
    verify_url: &str,
    sink: &mut W,
) -> Result<ReceiptLayout, ReceiptError> {
    let raster = qr::encode(verify_url, QR_SCALE)?;
    let (doc, layout) = build_document(registration, user, event, &raster, verify_url, Utc::now());

    let mut writer = BufWriter::new(sink);
    doc.save(&mut writer)
        .map_err(|e| ReceiptError::Pdf(e.to_string()))?;
    writer.flush()?;
    Ok(layout)
}

fn build_document(
    registration: &Registration,
    user: &User,
    event: &Event,
    raster: &qr::QrRaster,
    verify_url: &str,
    generated_at: DateTime<Utc>,
) -> (PdfDocumentReference, ReceiptLayout) {
    let (doc, page_idx, layer_idx) = PdfDocument::new(
        "Event Registration Receipt",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "receipt",
    );
    let layer = doc.get_page(page_idx).get_layer(layer_idx);

    // Builtin fonts cannot fail to load.
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .expect("builtin font");
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .expect("builtin font");

    let mut page = Page {
        layer,
        regular,
        bold,
        cursor: Cursor::new(),
    };

    // Title
    page.fill_color(0.17, 0.24, 0.31);
    let bold = page.bold.clone();
    let regular = page.regular.clone();
    page.centered(&bold, 20.0, "Event Registration Receipt");
    page.cursor.advance(6.0);

    // Participant block
    page.fill_color(0.27, 0.27, 0.27);
    page.text_line(&bold, 14.0, MARGIN_MM, "Participant Information");
    page.fill_color(0.0, 0.0, 0.0);
    page.text_line(
        &regular,
        12.0,
        MARGIN_MM,
        &format!("Registration ID: {}", registration.id),
    );
    page.wrapped(&regular, 12.0, &format!("Name: {}", user.name));
    page.wrapped(&regular, 12.0, &format!("Email: {}", user.email));
    page.cursor.advance(4.0);

    // Event block
    page.fill_color(0.27, 0.27, 0.27);
    page.text_line(&bold, 14.0, MARGIN_MM, "Event Details");
    page.fill_color(0.0, 0.0, 0.0);
    page.wrapped(&regular, 12.0, &format!("Event Title: {}", event.title));
    page.wrapped(&regular, 12.0, &format!("Domain: {}", event.category));
    page.text_line(
        &regular,
        12.0,
        MARGIN_MM,
        &format!("Date: {}", event.event_date.format("%Y-%m-%d")),
    );
    page.text_line(
        &regular,
        12.0,
        MARGIN_MM,
        &format!("Time: {}", event.event_time.format("%H:%M")),
    );
    page.text_line(&regular, 12.0, MARGIN_MM, &format!("Price: {}", price_label(event.price)));
    page.text_line(
        &regular,
        12.0,
        MARGIN_MM,
        &format!(
            "Registered On: {}",
            registration.registered_at.format("%Y-%m-%d %H:%M UTC")
        ),
    );
    page.text_line(
        &regular,
        12.0,
        MARGIN_MM,
        &format!("Status: {}", registration.status),
    );
    page.text_line(
        &regular,
        12.0,
        MARGIN_MM,
        &format!("Payment: {}", registration.payment_status),
    );

    page.divider();

    // QR block: place the image, then explicitly drop the cursor past
    // its bottom edge plus clearance.
    page.cursor.advance(4.0);
    let qr_top = page.cursor.y;
    let qr_bottom = qr_top - QR_SIZE_MM;
    let qr_x = (PAGE_WIDTH_MM - QR_SIZE_MM) / 2.0;
    let dpi = raster.width() as f32 * 25.4 / QR_SIZE_MM;

    let image = Image::from(ImageXObject {
        width: Px(raster.width()),
        height: Px(raster.width()),
        color_space: ColorSpace::Greyscale,
        bits_per_component: ColorBits::Bit8,
        interpolate: false,
        image_data: raster.pixels().to_vec(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });
    image.add_to_layer(
        page.layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(qr_x)),
            translate_y: Some(Mm(qr_bottom)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
    page.cursor.drop_to(qr_bottom - QR_CLEARANCE_MM);

    page.fill_color(0.0, 0.0, 0.0);
    page.centered(&regular, 10.0, "Scan to verify this registration");
    page.centered(&regular, 9.0, verify_url);

    page.divider();

    // Footer
    let footer_top = page.cursor.y;
    page.fill_color(0.5, 0.5, 0.5);
    page.centered(
        &regular,
        10.0,
        "This is a system-generated receipt and does not require a physical signature.",
    );
    page.centered(
        &regular,
        9.0,
        &format!("Generated at {}", generated_at.format("%Y-%m-%d %H:%M UTC")),
    );
    page.cursor.advance(3.0);
    page.fill_color(0.15, 0.68, 0.38);
    page.centered(&bold, 13.0, "Thank you for registering!");

    let layout = ReceiptLayout {
        qr_top,
        qr_bottom,
        footer_top,
    };
    (doc, layout)
}

fn price_label(price: Decimal) -> String {
    if price.is_zero() {
        "Free".to_string()
    } else {
        format!("INR {price}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventCategory, PaymentStatus, RegistrationStatus};
    use crate::token;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn fixtures(title: &str) -> (Registration, User, Event) {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            role: crate::models::Role::User,
            refresh_token_hash: None,
            created_at: now,
            updated_at: now,
        };
        let event = Event {
            id: Uuid::new_v4(),
            title: title.into(),
            event_date: "2026-09-12".parse().unwrap(),
            event_time: "10:30:00".parse().unwrap(),
            description: "desc".into(),
            image_path: "/uploads/x.png".into(),
            category: EventCategory::AiMl,
            rule_book_path: None,
            price: Decimal::ZERO,
            registration_fields: Json(vec![]),
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        let registration = Registration {
            id: Uuid::new_v4(),
            user_id: user.id,
            event_id: event.id,
            registered_at: now,
            verification_token: token::generate(),
            token_expires_at: token::expiry(now),
            status: RegistrationStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            created_at: now,
            updated_at: now,
        };
        (registration, user, event)
    }

    #[test]
    fn renders_a_pdf_document() {
        let (reg, user, event) = fixtures("Hack Night");
        let url = format!("http://localhost:3000/verify/{}", reg.verification_token);
        let mut sink = Vec::new();
        let layout = render(&reg, &user, &event, &url, &mut sink).unwrap();
        assert!(sink.starts_with(b"%PDF"));
        assert!(layout.qr_top > layout.qr_bottom);
    }

    #[test]
    fn footer_never_overlaps_qr_even_with_long_titles() {
        let long_title = "International Championship of Absurdly Long Event Titles \
                          That Keep Wrapping Across Many Lines of the Receipt Layout "
            .repeat(3);
        let (reg, user, event) = fixtures(&long_title);
        let url = format!("http://localhost:3000/verify/{}", reg.verification_token);

        let raster = qr::encode(&url, QR_SCALE).unwrap();
        let (_doc, layout) = build_document(&reg, &user, &event, &raster, &url, Utc::now());

        // y decreases down the page: footer must start at or below the
        // QR bottom minus clearance.
        assert!(
            layout.footer_top <= layout.qr_bottom - QR_CLEARANCE_MM,
            "footer top {} intrudes into QR region ending at {}",
            layout.footer_top,
            layout.qr_bottom
        );
    }

    #[test]
    fn qr_failure_leaves_sink_empty() {
        let (reg, user, event) = fixtures("Hack Night");
        let oversized_url = format!("http://localhost:3000/verify/{}", "x".repeat(3000));
        let mut sink = Vec::new();
        let result = render(&reg, &user, &event, &oversized_url, &mut sink);
        assert!(matches!(result, Err(ReceiptError::Qr(_))));
        assert!(sink.is_empty());
    }
}
