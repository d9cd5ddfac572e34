use serde_json::json;

use crate::{TestApp, TestError};
use rishta_server::api::v1::profiles::Profile;
use rishta_server::repository::profile::ReviewStatus;

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn new_profile_starts_pending_and_is_hidden_from_others() {
    let app = TestApp::start().await;
    let owner = app
        .register_member("Aisha", "aisha@example.com", "a passphrase", "female")
        .await;

    let created: Profile = owner
        .post(
            "/api/v1/profiles",
            json!({
                "gender": "female",
                "name": "Aisha",
                "city": "Pune",
                "date_of_birth": "2000-01-01",
            }),
        )
        .await
        .expect("failed to create profile");

    assert_eq!(ReviewStatus::Pending, created.review_status);
    assert_eq!("India", created.country);

    // the owner sees their own pending profile
    let mine: Profile = owner
        .get("/api/v1/profiles/me")
        .await
        .expect("owner should see their own profile");
    assert_eq!(created.id, mine.id);
    assert_eq!(Some("aisha@example.com".to_string()), mine.owner_email);

    // anonymous listings only contain approved profiles
    let anonymous = app.connect_anonymous().await;
    let listed: Vec<Profile> = anonymous
        .get("/api/v1/profiles")
        .await
        .expect("failed to list profiles");
    assert!(listed.is_empty());

    // direct reads of a pending profile are refused
    let result = anonymous
        .get::<Profile>(&format!("/api/v1/profiles/{}", created.id.to_string()))
        .await;
    if let Err(TestError::RequestError(e)) = result {
        assert_eq!(403, e.status().unwrap().as_u16());
    } else {
        panic!("expected pending profile to be hidden from anonymous readers");
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn approved_profile_is_public_with_email_redacted() {
    let app = TestApp::start().await;
    let owner = app
        .register_member("Omar", "omar@example.com", "a passphrase", "male")
        .await;

    let created: Profile = owner
        .post(
            "/api/v1/profiles",
            json!({
                "gender": "male",
                "name": "Omar",
                "city": "Pune",
            }),
        )
        .await
        .expect("failed to create profile");

    let admin = app.connect_administrator().await;
    let approved: Profile = admin
        .post_empty(&format!(
            "/api/v1/admin/profiles/{}/approve",
            created.id.to_string()
        ))
        .await
        .expect("failed to approve profile");
    assert_eq!(ReviewStatus::Approved, approved.review_status);

    let anonymous = app.connect_anonymous().await;
    let listed: Vec<Profile> = anonymous
        .get("/api/v1/profiles")
        .await
        .expect("failed to list profiles");

    assert_eq!(1, listed.len());
    assert_eq!(created.id, listed[0].id);
    assert_eq!(None, listed[0].owner_email);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn age_is_derived_from_date_of_birth() {
    let app = TestApp::start().await;
    let owner = app
        .register_member("Fatima", "fatima@example.com", "a passphrase", "female")
        .await;

    let years = 30u32;
    let date_of_birth = chrono::Utc::now()
        .date_naive()
        .checked_sub_months(chrono::Months::new(years * 12 + 6))
        .unwrap();

    let created: Profile = owner
        .post(
            "/api/v1/profiles",
            json!({
                "gender": "female",
                "date_of_birth": date_of_birth.to_string(),
            }),
        )
        .await
        .expect("failed to create profile");

    assert_eq!(Some(years), created.age);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn second_profile_for_the_same_account_conflicts() {
    let app = TestApp::start().await;
    let owner = app
        .register_member("Zainab", "zainab@example.com", "a passphrase", "female")
        .await;

    let body = json!({ "gender": "female", "name": "Zainab" });

    let _: Profile = owner
        .post("/api/v1/profiles", body.clone())
        .await
        .expect("first profile should be accepted");

    let result = owner.post::<_, Profile>("/api/v1/profiles", body).await;
    if let Err(TestError::RequestError(e)) = result {
        assert_eq!(409, e.status().unwrap().as_u16());
    } else {
        panic!("expected second profile to conflict");
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn creating_a_profile_requires_authentication() {
    let app = TestApp::start().await;
    let anonymous = app.connect_anonymous().await;

    let result = anonymous
        .post::<_, Profile>("/api/v1/profiles", json!({ "gender": "male" }))
        .await;
    if let Err(TestError::RequestError(e)) = result {
        assert_eq!(401, e.status().unwrap().as_u16());
    } else {
        panic!("expected anonymous profile creation to be rejected");
    }
}
