//! UPI QR flow: scan, pay, then prove payment with a UTR number and a
//! screenshot. The stages mirror the checkout flow in `checkout`, with
//! proof validation gating the only forward transition.

/// A UPI transaction reference is exactly twelve digits.
pub const UTR_LENGTH: usize = 12;

pub fn is_valid_utr(utr: &str) -> bool {
    utr.len() == UTR_LENGTH && utr.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum QrStage {
    /// QR code and UPI id on screen, payment record not yet registered.
    QrDisplay,
    /// Customer claims to have paid; collecting UTR and screenshot.
    UtrSubmission { payment_id: String },
    /// Proof accepted and receipted.
    Verified {
        receipt_number: String,
        utr_number: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum QrEvent {
    PaymentRegistered { payment_id: String },
    ProofEntered {
        utr_number: String,
        screenshot: Option<String>,
    },
    VerificationSucceeded {
        receipt_number: String,
        utr_number: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum QrCommand {
    SubmitProof {
        payment_id: String,
        utr_number: String,
        screenshot: String,
    },
}

/// Proof without a valid UTR or without a screenshot keeps the customer
/// on the submission screen instead of firing a doomed request.
#[allow(dead_code)]
pub fn advance(stage: QrStage, event: QrEvent) -> (QrStage, Option<QrCommand>) {
    match (stage, event) {
        (QrStage::QrDisplay, QrEvent::PaymentRegistered { payment_id }) => {
            (QrStage::UtrSubmission { payment_id }, None)
        }

        (
            QrStage::UtrSubmission { payment_id },
            QrEvent::ProofEntered {
                utr_number,
                screenshot,
            },
        ) => match screenshot {
            Some(screenshot) if is_valid_utr(&utr_number) => (
                QrStage::UtrSubmission {
                    payment_id: payment_id.clone(),
                },
                Some(QrCommand::SubmitProof {
                    payment_id,
                    utr_number,
                    screenshot,
                }),
            ),
            _ => (QrStage::UtrSubmission { payment_id }, None),
        },

        (
            QrStage::UtrSubmission { .. },
            QrEvent::VerificationSucceeded {
                receipt_number,
                utr_number,
            },
        ) => (
            QrStage::Verified {
                receipt_number,
                utr_number,
            },
            None,
        ),

        (stage, _) => (stage, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utr_must_be_exactly_twelve_digits() {
        assert!(is_valid_utr("123456789012"));
        assert!(!is_valid_utr("12345678901"));
        assert!(!is_valid_utr("1234567890123"));
        assert!(!is_valid_utr("12345678901a"));
        assert!(!is_valid_utr(""));
    }

    #[test]
    fn qr_payment_walks_to_verified() {
        let (stage, command) = advance(
            QrStage::QrDisplay,
            QrEvent::PaymentRegistered {
                payment_id: "665f1f77bcf86cd799439021".to_string(),
            },
        );
        assert_eq!(command, None);

        let (stage, command) = advance(
            stage,
            QrEvent::ProofEntered {
                utr_number: "123456789012".to_string(),
                screenshot: Some("payment.jpg".to_string()),
            },
        );
        assert_eq!(
            command,
            Some(QrCommand::SubmitProof {
                payment_id: "665f1f77bcf86cd799439021".to_string(),
                utr_number: "123456789012".to_string(),
                screenshot: "payment.jpg".to_string(),
            })
        );

        let (stage, _) = advance(
            stage,
            QrEvent::VerificationSucceeded {
                receipt_number: "AKRX-20250108-0002".to_string(),
                utr_number: "123456789012".to_string(),
            },
        );
        assert_eq!(
            stage,
            QrStage::Verified {
                receipt_number: "AKRX-20250108-0002".to_string(),
                utr_number: "123456789012".to_string(),
            }
        );
    }

    #[test]
    fn short_utr_does_not_submit() {
        let stage = QrStage::UtrSubmission {
            payment_id: "665f1f77bcf86cd799439021".to_string(),
        };
        let (next, command) = advance(
            stage.clone(),
            QrEvent::ProofEntered {
                utr_number: "12345".to_string(),
                screenshot: Some("payment.jpg".to_string()),
            },
        );
        assert_eq!(next, stage);
        assert_eq!(command, None);
    }

    #[test]
    fn missing_screenshot_does_not_submit() {
        let stage = QrStage::UtrSubmission {
            payment_id: "665f1f77bcf86cd799439021".to_string(),
        };
        let (next, command) = advance(
            stage.clone(),
            QrEvent::ProofEntered {
                utr_number: "123456789012".to_string(),
                screenshot: None,
            },
        );
        assert_eq!(next, stage);
        assert_eq!(command, None);
    }
}
