use neon_store::lifecycle::{
    can_download, countdown_secs, derive_purchase_state, validate_submission, PurchaseState,
    Submission, SubmissionError,
};
use neon_store::models::{ContactMethod, PaymentMethod, RequestStatus, Role};

fn nayapay_submission() -> Submission {
    Submission {
        payment_method: PaymentMethod::Nayapay,
        contact_method: ContactMethod::Whatsapp,
        contact_value: "+923001234567".to_string(),
        transaction_id: Some("TX-1001".to_string()),
        screenshot_url: None,
        alternative_payment_details: None,
    }
}

#[test]
fn nayapay_with_transaction_id_passes() {
    assert_eq!(validate_submission(&nayapay_submission()), Ok(()));
}

#[test]
fn nayapay_with_screenshot_only_passes() {
    let submission = Submission {
        transaction_id: None,
        screenshot_url: Some("receipt.png".to_string()),
        ..nayapay_submission()
    };
    assert_eq!(validate_submission(&submission), Ok(()));
}

#[test]
fn nayapay_without_proof_is_rejected() {
    let submission = Submission {
        transaction_id: None,
        ..nayapay_submission()
    };
    assert_eq!(
        validate_submission(&submission),
        Err(SubmissionError::MissingProof)
    );
}

#[test]
fn whitespace_transaction_id_does_not_count_as_proof() {
    let submission = Submission {
        transaction_id: Some("   ".to_string()),
        ..nayapay_submission()
    };
    assert_eq!(
        validate_submission(&submission),
        Err(SubmissionError::MissingProof)
    );
}

#[test]
fn custom_method_requires_explanation() {
    let submission = Submission {
        payment_method: PaymentMethod::Custom,
        transaction_id: None,
        alternative_payment_details: None,
        ..nayapay_submission()
    };
    assert_eq!(
        validate_submission(&submission),
        Err(SubmissionError::MissingPaymentDetails)
    );

    let submission = Submission {
        payment_method: PaymentMethod::Custom,
        transaction_id: None,
        alternative_payment_details: Some("Sent via bank transfer ref 889".to_string()),
        ..nayapay_submission()
    };
    assert_eq!(validate_submission(&submission), Ok(()));
}

#[test]
fn blank_contact_value_is_rejected_for_any_method() {
    let submission = Submission {
        contact_value: "  ".to_string(),
        ..nayapay_submission()
    };
    assert_eq!(
        validate_submission(&submission),
        Err(SubmissionError::MissingContact)
    );
}

#[test]
fn validation_messages_match_the_storefront_copy() {
    assert_eq!(
        SubmissionError::MissingProof.to_string(),
        "Please provide either transaction ID or payment screenshot"
    );
    assert_eq!(
        SubmissionError::MissingPaymentDetails.to_string(),
        "Please explain your payment method"
    );
}

#[test]
fn free_price_wins_over_everything() {
    assert_eq!(
        derive_purchase_state(0.0, true, Some(RequestStatus::Rejected)),
        PurchaseState::Free
    );
}

#[test]
fn grant_wins_over_request_history() {
    assert_eq!(
        derive_purchase_state(9.99, true, Some(RequestStatus::Rejected)),
        PurchaseState::Owned
    );
}

#[test]
fn latest_request_status_drives_the_rest() {
    assert_eq!(
        derive_purchase_state(9.99, false, Some(RequestStatus::Pending)),
        PurchaseState::Pending
    );
    assert_eq!(
        derive_purchase_state(9.99, false, Some(RequestStatus::Approved)),
        PurchaseState::Owned
    );
    assert_eq!(
        derive_purchase_state(9.99, false, Some(RequestStatus::Rejected)),
        PurchaseState::Rejected
    );
    assert_eq!(
        derive_purchase_state(9.99, false, None),
        PurchaseState::NotPurchased
    );
}

#[test]
fn admins_download_without_grants_and_without_waiting() {
    assert!(can_download(Role::Admin, 9.99, false));
    assert!(can_download(Role::SuperAdmin, 9.99, false));
    assert!(!can_download(Role::User, 9.99, false));
    assert!(can_download(Role::User, 9.99, true));
    assert!(can_download(Role::User, 0.0, false));

    assert_eq!(countdown_secs(Role::Admin, 30), 0);
    assert_eq!(countdown_secs(Role::User, 30), 30);
}
