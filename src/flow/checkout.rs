//! Gateway checkout lifecycle, modelled as explicit stages and events.
//!
//! The browser walks a payment through form submission, order creation,
//! the hosted gateway popup and server-side verification. Encoding that
//! walk as data keeps every transition visible: dismissing the popup can
//! only ever land in `Failed` and never emits a verify command, and the
//! verify command is emitted exactly once per gateway handback.

/// Where a checkout currently sits.
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum Stage {
    /// Customer is still typing into the payment form.
    FillingForm,
    /// Form accepted, waiting on the backend to open a gateway order.
    CreatingOrder,
    /// Gateway popup is up; we hold our payment record and the order id.
    AwaitingGateway { payment_id: String, order_id: String },
    /// Gateway handed back its ids; server-side verification in flight.
    Verifying {
        payment_id: String,
        order_id: String,
        gateway_payment_id: String,
        signature: String,
    },
    /// Verified and receipted.
    Succeeded { receipt_number: String },
    /// Terminal failure. `cancelled` distinguishes a dismissed popup from
    /// a declined or unverifiable payment.
    Failed { cancelled: bool, message: String },
}

/// Everything that can happen to a checkout.
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum Event {
    FormSubmitted,
    OrderCreated { payment_id: String, order_id: String },
    OrderFailed { message: String },
    GatewayCompleted {
        gateway_payment_id: String,
        order_id: String,
        signature: String,
    },
    GatewayDismissed,
    VerificationSucceeded { receipt_number: String },
    VerificationFailed { message: String },
    RetryRequested,
}

/// Side effect the caller should run after a transition.
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum Command {
    CreateOrder,
    OpenGateway { order_id: String },
    VerifyPayment {
        payment_id: String,
        order_id: String,
        gateway_payment_id: String,
        signature: String,
    },
    ShowReceipt { receipt_number: String },
}

/// Applies one event to a stage. Pairs that make no sense for the current
/// stage leave it unchanged and command nothing, so a stray gateway
/// callback after settlement cannot restart verification.
#[allow(dead_code)]
pub fn advance(stage: Stage, event: Event) -> (Stage, Option<Command>) {
    match (stage, event) {
        (Stage::FillingForm, Event::FormSubmitted) => {
            (Stage::CreatingOrder, Some(Command::CreateOrder))
        }

        (Stage::CreatingOrder, Event::OrderCreated { payment_id, order_id }) => (
            Stage::AwaitingGateway {
                payment_id,
                order_id: order_id.clone(),
            },
            Some(Command::OpenGateway { order_id }),
        ),
        (Stage::CreatingOrder, Event::OrderFailed { message }) => (
            Stage::Failed {
                cancelled: false,
                message,
            },
            None,
        ),

        (
            Stage::AwaitingGateway { payment_id, .. },
            Event::GatewayCompleted {
                gateway_payment_id,
                order_id,
                signature,
            },
        ) => (
            Stage::Verifying {
                payment_id: payment_id.clone(),
                order_id: order_id.clone(),
                gateway_payment_id: gateway_payment_id.clone(),
                signature: signature.clone(),
            },
            Some(Command::VerifyPayment {
                payment_id,
                order_id,
                gateway_payment_id,
                signature,
            }),
        ),
        (Stage::AwaitingGateway { .. }, Event::GatewayDismissed) => (
            Stage::Failed {
                cancelled: true,
                message: "Payment was cancelled".to_string(),
            },
            None,
        ),

        (Stage::Verifying { .. }, Event::VerificationSucceeded { receipt_number }) => (
            Stage::Succeeded {
                receipt_number: receipt_number.clone(),
            },
            Some(Command::ShowReceipt { receipt_number }),
        ),
        (Stage::Verifying { .. }, Event::VerificationFailed { message }) => (
            Stage::Failed {
                cancelled: false,
                message,
            },
            None,
        ),

        (Stage::Failed { .. }, Event::RetryRequested) => (Stage::FillingForm, None),

        (stage, _) => (stage, None),
    }
}

/// Picks the download URL for a finished checkout. An explicit receipt id
/// wins, then the receipt id echoed by verification, and only without
/// either do we fall back to the payment-keyed PDF route.
pub fn preferred_download(
    receipt_id: Option<&str>,
    verify_receipt_id: Option<&str>,
    payment_id: &str,
) -> String {
    if let Some(id) = receipt_id {
        return format!("/api/receipt/download/{}", id);
    }
    if let Some(id) = verify_receipt_id {
        return format!("/api/receipt/download/{}", id);
    }
    format!("/api/receipt/payment/{}/pdf", payment_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form_to_gateway() -> Stage {
        let (stage, command) = advance(Stage::FillingForm, Event::FormSubmitted);
        assert_eq!(command, Some(Command::CreateOrder));

        let (stage, command) = advance(
            stage,
            Event::OrderCreated {
                payment_id: "665f1f77bcf86cd799439011".to_string(),
                order_id: "order_xyz".to_string(),
            },
        );
        assert_eq!(
            command,
            Some(Command::OpenGateway {
                order_id: "order_xyz".to_string()
            })
        );
        stage
    }

    #[test]
    fn happy_path_emits_exactly_one_verify_command() {
        let stage = filled_form_to_gateway();

        let (stage, command) = advance(
            stage,
            Event::GatewayCompleted {
                gateway_payment_id: "pay_abc".to_string(),
                order_id: "order_xyz".to_string(),
                signature: "deadbeef".to_string(),
            },
        );
        assert_eq!(
            command,
            Some(Command::VerifyPayment {
                payment_id: "665f1f77bcf86cd799439011".to_string(),
                order_id: "order_xyz".to_string(),
                gateway_payment_id: "pay_abc".to_string(),
                signature: "deadbeef".to_string(),
            })
        );

        let (stage, command) = advance(
            stage,
            Event::VerificationSucceeded {
                receipt_number: "AKRX-20250108-0001".to_string(),
            },
        );
        assert_eq!(
            stage,
            Stage::Succeeded {
                receipt_number: "AKRX-20250108-0001".to_string()
            }
        );
        assert_eq!(
            command,
            Some(Command::ShowReceipt {
                receipt_number: "AKRX-20250108-0001".to_string()
            })
        );
    }

    #[test]
    fn dismissing_the_popup_cancels_without_verification() {
        let stage = filled_form_to_gateway();

        let (stage, command) = advance(stage, Event::GatewayDismissed);
        assert_eq!(command, None);
        assert_eq!(
            stage,
            Stage::Failed {
                cancelled: true,
                message: "Payment was cancelled".to_string(),
            }
        );
    }

    #[test]
    fn order_failure_is_not_a_cancellation() {
        let (stage, _) = advance(Stage::FillingForm, Event::FormSubmitted);
        let (stage, command) = advance(
            stage,
            Event::OrderFailed {
                message: "Gateway unavailable".to_string(),
            },
        );
        assert_eq!(command, None);
        assert_eq!(
            stage,
            Stage::Failed {
                cancelled: false,
                message: "Gateway unavailable".to_string(),
            }
        );
    }

    #[test]
    fn failed_verification_reports_the_message() {
        let stage = filled_form_to_gateway();
        let (stage, _) = advance(
            stage,
            Event::GatewayCompleted {
                gateway_payment_id: "pay_abc".to_string(),
                order_id: "order_xyz".to_string(),
                signature: "ffff".to_string(),
            },
        );

        let (stage, command) = advance(
            stage,
            Event::VerificationFailed {
                message: "Payment verification failed".to_string(),
            },
        );
        assert_eq!(command, None);
        assert_eq!(
            stage,
            Stage::Failed {
                cancelled: false,
                message: "Payment verification failed".to_string(),
            }
        );
    }

    #[test]
    fn retry_returns_to_the_form() {
        let failed = Stage::Failed {
            cancelled: true,
            message: "Payment was cancelled".to_string(),
        };
        let (stage, command) = advance(failed, Event::RetryRequested);
        assert_eq!(stage, Stage::FillingForm);
        assert_eq!(command, None);
    }

    #[test]
    fn out_of_order_events_leave_the_stage_alone() {
        let succeeded = Stage::Succeeded {
            receipt_number: "AKRX-20250108-0001".to_string(),
        };
        let (stage, command) = advance(
            succeeded.clone(),
            Event::GatewayCompleted {
                gateway_payment_id: "pay_late".to_string(),
                order_id: "order_xyz".to_string(),
                signature: "aaaa".to_string(),
            },
        );
        assert_eq!(stage, succeeded);
        assert_eq!(command, None);

        let (stage, command) = advance(Stage::FillingForm, Event::GatewayDismissed);
        assert_eq!(stage, Stage::FillingForm);
        assert_eq!(command, None);
    }

    #[test]
    fn download_url_prefers_explicit_receipt_ids() {
        assert_eq!(
            preferred_download(Some("r1"), Some("r2"), "p1"),
            "/api/receipt/download/r1"
        );
        assert_eq!(
            preferred_download(None, Some("r2"), "p1"),
            "/api/receipt/download/r2"
        );
        assert_eq!(
            preferred_download(None, None, "p1"),
            "/api/receipt/payment/p1/pdf"
        );
    }
}
