use chrono::{DateTime, FixedOffset, Utc};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, CustomPdfConformance, IndirectFontRef, Line, Mm, PdfConformance,
    PdfDocument, PdfLayerReference, Point, Polygon, Rgb,
};
use time::OffsetDateTime;

use crate::config::BrandingConfig;
use crate::errors::{AppError, Result};
use crate::models::receipt::ReceiptData;
use crate::money::format_inr;

const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const BOTTOM_MARGIN_MM: f64 = 20.0;

const PURPLE: (f64, f64, f64) = (0.545, 0.361, 0.965);
const LIGHT_PURPLE: (f64, f64, f64) = (0.929, 0.914, 0.996);
const DARK: (f64, f64, f64) = (0.122, 0.161, 0.216);
const GRAY: (f64, f64, f64) = (0.420, 0.447, 0.502);
const WHITE: (f64, f64, f64) = (1.0, 1.0, 1.0);

/// Offsets applied to the drawing canvas for each emitted page. Content of
/// height `content_height` tiled onto pages of `page_height` yields
/// 0, -page_height, -2·page_height, … with no blank trailing page when the
/// content ends exactly on a page boundary.
pub fn page_offsets(content_height: f64, page_height: f64) -> Vec<f64> {
    if page_height <= 0.0 || content_height <= 0.0 {
        return vec![0.0];
    }

    let pages = (content_height / page_height).ceil().max(1.0) as usize;
    (0..pages).map(|page| -(page as f64) * page_height).collect()
}

/// Greedy word wrap against a character budget per line. Words longer
/// than the budget are split hard so nothing overflows the column.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let chunk: String = word.drain(..max_chars).collect();
            lines.push(chunk);
        }

        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        if current.is_empty() {
            current = word;
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(&word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Drawable primitives positioned on a continuous top-down canvas; the
/// canvas is tiled onto pages afterwards.
enum Element {
    Text {
        x: f64,
        y: f64,
        size: f64,
        bold: bool,
        color: (f64, f64, f64),
        text: String,
    },
    FillRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: (f64, f64, f64),
    },
    Rule {
        x1: f64,
        x2: f64,
        y: f64,
        color: (f64, f64, f64),
    },
}

impl Element {
    fn y(&self) -> f64 {
        match self {
            Element::Text { y, .. } => *y,
            Element::FillRect { y, .. } => *y,
            Element::Rule { y, .. } => *y,
        }
    }

    fn bottom(&self) -> f64 {
        match self {
            Element::Text { y, .. } => *y,
            Element::FillRect { y, height, .. } => *y + *height,
            Element::Rule { y, .. } => *y,
        }
    }
}

fn text(x: f64, y: f64, size: f64, bold: bool, color: (f64, f64, f64), value: &str) -> Element {
    Element::Text {
        x,
        y,
        size,
        bold,
        color,
        text: value.to_string(),
    }
}

fn rgb((r, g, b): (f64, f64, f64)) -> Color {
    Color::Rgb(Rgb::new(r as f32, g as f32, b as f32, None))
}

fn ist_timestamp(at: DateTime<Utc>) -> String {
    let offset = FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("IST offset is valid");
    at.with_timezone(&offset)
        .format("%d %b %Y, %I:%M %p IST")
        .to_string()
}

/// Renders receipt PDFs. Output is deterministic for a given receipt:
/// document id and dates derive from the receipt itself, so re-downloads
/// are byte-identical.
#[derive(Clone)]
pub struct PdfService {
    branding: BrandingConfig,
}

impl PdfService {
    pub fn new(branding: BrandingConfig) -> Self {
        PdfService { branding }
    }

    pub fn render_receipt(&self, data: &ReceiptData) -> Result<Vec<u8>> {
        let doc_date = OffsetDateTime::from_unix_timestamp(data.receipt.generated_at.timestamp())
            .map_err(|e| AppError::pdf(format!("Invalid receipt timestamp: {}", e)))?;

        let (doc, first_page, first_layer) = PdfDocument::new(
            format!("Receipt {}", data.receipt.receipt_number),
            Mm(PAGE_WIDTH_MM as f32),
            Mm(PAGE_HEIGHT_MM as f32),
            "Layer 1",
        );

        let doc = doc
            .with_conformance(PdfConformance::Custom(CustomPdfConformance {
                requires_icc_profile: false,
                requires_xmp_metadata: false,
                ..Default::default()
            }))
            .with_document_id(format!("akrix-receipt-{}", data.receipt.receipt_number))
            .with_creation_date(doc_date)
            .with_mod_date(doc_date)
            .with_metadata_date(doc_date);

        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::pdf(e.to_string()))?;

        let elements = self.layout(data);
        let content_height =
            elements.iter().map(Element::bottom).fold(0.0_f64, f64::max) + BOTTOM_MARGIN_MM;
        let offsets = page_offsets(content_height, PAGE_HEIGHT_MM);

        let mut layers = vec![doc.get_page(first_page).get_layer(first_layer)];
        for _ in 1..offsets.len() {
            let (page, layer) =
                doc.add_page(Mm(PAGE_WIDTH_MM as f32), Mm(PAGE_HEIGHT_MM as f32), "Layer 1");
            layers.push(doc.get_page(page).get_layer(layer));
        }

        for (offset, layer) in offsets.iter().zip(layers.iter()) {
            for element in &elements {
                let shifted = element.y() + offset;
                if shifted < 0.0 || shifted >= PAGE_HEIGHT_MM {
                    continue;
                }
                draw(layer, element, shifted, &regular, &bold);
            }
        }

        doc.save_to_bytes().map_err(|e| AppError::pdf(e.to_string()))
    }

    fn layout(&self, data: &ReceiptData) -> Vec<Element> {
        let mut out = Vec::new();

        out.push(Element::FillRect {
            x: 0.0,
            y: 0.0,
            width: PAGE_WIDTH_MM,
            height: 40.0,
            color: PURPLE,
        });
        out.push(text(15.0, 20.0, 24.0, true, WHITE, &self.branding.business_name));
        out.push(text(15.0, 30.0, 10.0, false, WHITE, &self.branding.tagline));
        out.push(text(160.0, 20.0, 20.0, true, WHITE, "RECEIPT"));
        out.push(text(
            160.0,
            30.0,
            10.0,
            false,
            WHITE,
            &format!("#{}", data.receipt.receipt_number),
        ));

        out.push(text(15.0, 55.0, 14.0, true, DARK, "Customer Details"));
        out.push(text(110.0, 55.0, 14.0, true, DARK, "Payment Details"));

        let customer_rows = [
            ("Name:", data.user.name.clone()),
            ("Email:", data.user.email.clone()),
            ("Phone:", data.user.phone.clone()),
            ("Address:", data.user.address.clone()),
        ];
        let mut left_y = 65.0;
        for (label, value) in customer_rows {
            out.push(text(15.0, left_y, 10.0, false, GRAY, label));
            for line in wrap_text(&value, 34) {
                out.push(text(40.0, left_y, 10.0, false, DARK, &line));
                left_y += 6.0;
            }
            left_y += 2.0;
        }

        let mut payment_rows = vec![
            ("Receipt No:", data.receipt.receipt_number.clone()),
            ("Date:", ist_timestamp(data.receipt.generated_at)),
            ("Mode:", data.payment.payment_mode.label().to_string()),
            ("Status:", data.payment.status.as_str().to_uppercase()),
        ];
        if let Some(order_id) = &data.payment.razorpay_order_id {
            payment_rows.push(("Order ID:", order_id.clone()));
        }
        if let Some(payment_id) = &data.payment.razorpay_payment_id {
            payment_rows.push(("Payment ID:", payment_id.clone()));
        }
        if let Some(utr) = &data.payment.utr_number {
            payment_rows.push(("UTR:", utr.clone()));
        }
        let mut right_y = 65.0;
        for (label, value) in payment_rows {
            out.push(text(110.0, right_y, 10.0, false, GRAY, label));
            for line in wrap_text(&value, 24) {
                out.push(text(135.0, right_y, 10.0, false, DARK, &line));
                right_y += 6.0;
            }
            right_y += 2.0;
        }

        let mut y = left_y.max(right_y) + 4.0;

        if let Some(description) = &data.payment.description {
            out.push(text(15.0, y, 11.0, true, DARK, "Description"));
            y += 6.0;
            for line in wrap_text(description, 90) {
                out.push(text(15.0, y, 10.0, false, GRAY, &line));
                y += 5.0;
            }
            y += 4.0;
        }

        out.push(Element::FillRect {
            x: 15.0,
            y,
            width: 180.0,
            height: 25.0,
            color: LIGHT_PURPLE,
        });
        out.push(text(20.0, y + 9.0, 11.0, false, GRAY, "Amount Paid"));
        // Builtin Helvetica has no rupee glyph; the PDF spells it out.
        let amount = format_inr(data.payment.amount).replace('₹', "Rs. ");
        out.push(text(20.0, y + 19.0, 18.0, true, PURPLE, &amount));
        y += 40.0;

        out.push(Element::Rule {
            x1: 15.0,
            x2: 195.0,
            y,
            color: GRAY,
        });
        out.push(text(
            15.0,
            y + 8.0,
            10.0,
            false,
            DARK,
            &format!("Thank you for choosing {}!", self.branding.business_name),
        ));
        out.push(text(
            15.0,
            y + 14.0,
            8.0,
            false,
            GRAY,
            "This is a computer generated receipt.",
        ));

        out
    }
}

fn draw(
    layer: &PdfLayerReference,
    element: &Element,
    shifted_y: f64,
    regular: &IndirectFontRef,
    bold_font: &IndirectFontRef,
) {
    match element {
        Element::Text {
            x,
            size,
            bold,
            color,
            text,
            ..
        } => {
            layer.set_fill_color(rgb(*color));
            let font = if *bold { bold_font } else { regular };
            layer.use_text(
                text.clone(),
                *size as f32,
                Mm(*x as f32),
                Mm((PAGE_HEIGHT_MM - shifted_y) as f32),
                font,
            );
        }
        Element::FillRect {
            x, width, height, color, ..
        } => {
            let top = PAGE_HEIGHT_MM - shifted_y;
            let ring = vec![
                (Point::new(Mm(*x as f32), Mm(top as f32)), false),
                (Point::new(Mm((*x + *width) as f32), Mm(top as f32)), false),
                (
                    Point::new(Mm((*x + *width) as f32), Mm((top - *height) as f32)),
                    false,
                ),
                (Point::new(Mm(*x as f32), Mm((top - *height) as f32)), false),
            ];
            layer.set_fill_color(rgb(*color));
            layer.add_polygon(Polygon {
                rings: vec![ring],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
        }
        Element::Rule { x1, x2, color, .. } => {
            let y = PAGE_HEIGHT_MM - shifted_y;
            layer.set_outline_color(rgb(*color));
            layer.set_outline_thickness(0.5);
            layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(*x1 as f32), Mm(y as f32)), false),
                    (Point::new(Mm(*x2 as f32), Mm(y as f32)), false),
                ],
                is_closed: false,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mongodb::bson::oid::ObjectId;

    use crate::config::BrandingConfig;
    use crate::models::payment::{Payment, PaymentMode, PaymentStatus};
    use crate::models::receipt::{Receipt, ReceiptData};
    use crate::models::user::User;
    use crate::money::Paise;

    fn service() -> PdfService {
        PdfService::new(BrandingConfig {
            business_name: "Akrix.ai".to_string(),
            tagline: "Algorithms with Ambition".to_string(),
            business_email: "akrix.ai@gmail.com".to_string(),
        })
    }

    fn sample_data() -> ReceiptData {
        let generated = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 0).unwrap();
        let user_id = ObjectId::parse_str("665f1f77bcf86cd799439012").unwrap();
        let payment_id = ObjectId::parse_str("665f1f77bcf86cd799439011").unwrap();

        ReceiptData {
            receipt: Receipt {
                id: Some(ObjectId::parse_str("665f1f77bcf86cd799439013").unwrap()),
                payment_id,
                receipt_number: "AKRX-20250108-0001".to_string(),
                generated_at: generated,
            },
            payment: Payment {
                id: Some(payment_id),
                user_id,
                amount: Paise(150000),
                payment_mode: PaymentMode::Upi,
                status: PaymentStatus::Success,
                razorpay_order_id: Some("order_xyz".to_string()),
                razorpay_payment_id: Some("pay_abc".to_string()),
                razorpay_signature: Some("sig_123".to_string()),
                utr_number: None,
                proof_file: None,
                description: None,
                created_at: generated,
                updated_at: generated,
            },
            user: User {
                id: Some(user_id),
                name: "John Doe".to_string(),
                email: "john@example.com".to_string(),
                phone: "9876543210".to_string(),
                address: "123 Main Street, Mumbai".to_string(),
                created_at: generated,
                updated_at: generated,
            },
        }
    }

    #[test]
    fn renders_a_pdf_document() {
        let bytes = service().render_receipt(&sample_data()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn rendering_twice_is_byte_identical() {
        let service = service();
        let data = sample_data();
        let first = service.render_receipt(&data).unwrap();
        let second = service.render_receipt(&data).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn short_content_fits_one_page() {
        assert_eq!(page_offsets(200.0, 297.0), vec![0.0]);
        assert_eq!(page_offsets(0.0, 297.0), vec![0.0]);
    }

    #[test]
    fn long_content_tiles_with_negative_offsets() {
        assert_eq!(page_offsets(600.0, 297.0), vec![0.0, -297.0, -594.0]);
    }

    #[test]
    fn exact_multiple_emits_no_blank_trailing_page() {
        assert_eq!(page_offsets(594.0, 297.0), vec![0.0, -297.0]);
        assert_eq!(page_offsets(297.0, 297.0), vec![0.0]);
    }

    #[test]
    fn wraps_long_lines_at_the_budget() {
        let lines = wrap_text("123 Main Street Apartment 4B Near Central Park Mumbai", 20);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.chars().count() <= 20, "line too long: {}", line);
        }
    }

    #[test]
    fn keeps_short_text_on_one_line() {
        assert_eq!(wrap_text("John Doe", 34), vec!["John Doe".to_string()]);
        assert_eq!(wrap_text("", 34), vec![String::new()]);
    }

    #[test]
    fn hard_splits_oversized_words() {
        let lines = wrap_text("averyveryverylongunbrokenword", 10);
        assert_eq!(lines[0].chars().count(), 10);
        assert!(lines.len() >= 3);
    }
}
