use fitness_portal::mailer::{Mailer, MockMailer};
use uuid::Uuid;

#[tokio::test]
async fn mock_mailer_records_invitation() {
    let mailer = MockMailer::new();
    let token = Uuid::new_v4();

    mailer
        .send_invitation("invitee@example.test", "Robin", token)
        .await
        .expect("mock send should succeed");

    let sent = mailer.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "invitee@example.test");
    assert_eq!(sent[0].subject, "Your fitness portal invitation");
    // The activation token must reach the invitee.
    assert!(sent[0].body.contains(&token.to_string()));
}

#[tokio::test]
async fn mock_mailer_records_plan_assignment() {
    let mailer = MockMailer::new();

    mailer
        .send_plan_assigned("trainee@example.test", "Hypertrophy 101", "Casey Coach")
        .await
        .expect("mock send should succeed");

    let sent = mailer.sent_messages();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("Hypertrophy 101"));
    assert!(sent[0].body.contains("Casey Coach"));
}

#[tokio::test]
async fn mock_mailer_accumulates_messages() {
    let mailer = MockMailer::new();
    mailer
        .send_plan_assigned("a@example.test", "Plan A", "T")
        .await
        .unwrap();
    mailer
        .send_plan_assigned("b@example.test", "Plan B", "T")
        .await
        .unwrap();
    assert_eq!(mailer.sent_messages().len(), 2);
}

#[tokio::test]
async fn failing_mock_mailer_reports_error() {
    let mailer = MockMailer::new_failing();
    let result = mailer
        .send_invitation("invitee@example.test", "Robin", Uuid::new_v4())
        .await;
    assert!(result.is_err());
    assert!(mailer.sent_messages().is_empty());
}
