use chrono::{Months, NaiveDate, Utc};
use serde_json::json;

use crate::{TestApp, TestClient, TestError};
use rishta_server::api::v1::admin::Stats;
use rishta_server::api::v1::profiles::Profile;
use rishta_server::repository::profile::ReviewStatus;

fn years_ago(years: u32) -> NaiveDate {
    Utc::now()
        .date_naive()
        .checked_sub_months(Months::new(years * 12 + 6))
        .unwrap()
}

async fn seed_profile(
    app: &TestApp,
    name: &str,
    email: &str,
    gender: &str,
    city: &str,
    date_of_birth: Option<NaiveDate>,
) -> Profile {
    let owner = app.register_member(name, email, "a passphrase", gender).await;

    let mut body = json!({
        "gender": gender,
        "name": name,
        "city": city,
    });
    if let Some(date_of_birth) = date_of_birth {
        body["date_of_birth"] = json!(date_of_birth.to_string());
    }

    owner
        .post("/api/v1/profiles", body)
        .await
        .expect("failed to seed profile")
}

async fn filter_names(admin: &TestClient, query: &str) -> Vec<String> {
    let profiles: Vec<Profile> = admin
        .get(&format!("/api/v1/admin/profiles{}", query))
        .await
        .expect("failed to filter profiles");
    profiles
        .into_iter()
        .map(|p| p.name.unwrap_or_default())
        .collect()
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn unfiltered_listing_returns_every_profile() {
    let app = TestApp::start().await;
    seed_profile(&app, "Aisha", "aisha@example.com", "female", "Pune", None).await;
    seed_profile(&app, "Omar", "omar@example.com", "male", "Mumbai", None).await;
    seed_profile(&app, "Zainab", "zainab@example.com", "female", "Delhi", None).await;

    let admin = app.connect_administrator().await;
    let names = filter_names(&admin, "").await;

    assert_eq!(
        vec!["Aisha", "Omar", "Zainab"],
        names.iter().map(String::as_str).collect::<Vec<_>>()
    );
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn city_filter_constrains_only_city() {
    let app = TestApp::start().await;
    seed_profile(&app, "Aisha", "aisha@example.com", "female", "Pune", None).await;
    seed_profile(&app, "Omar", "omar@example.com", "male", "Pune", None).await;
    seed_profile(&app, "Zainab", "zainab@example.com", "female", "Delhi", None).await;

    let admin = app.connect_administrator().await;
    let names = filter_names(&admin, "?city=Pune").await;

    assert_eq!(
        vec!["Aisha", "Omar"],
        names.iter().map(String::as_str).collect::<Vec<_>>()
    );
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn age_filter_selects_on_derived_birthdate_range() {
    let app = TestApp::start().await;
    // Aisha is 24, Omar is 29; both live in Pune.
    seed_profile(
        &app,
        "Aisha",
        "aisha@example.com",
        "female",
        "Pune",
        Some(years_ago(24)),
    )
    .await;
    seed_profile(
        &app,
        "Omar",
        "omar@example.com",
        "male",
        "Pune",
        Some(years_ago(29)),
    )
    .await;

    let admin = app.connect_administrator().await;
    let names = filter_names(&admin, "?city=Pune&min_age=28&max_age=40").await;

    assert_eq!(
        vec!["Omar"],
        names.iter().map(String::as_str).collect::<Vec<_>>()
    );
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn swapped_age_bounds_return_identical_results() {
    let app = TestApp::start().await;
    seed_profile(
        &app,
        "Aisha",
        "aisha@example.com",
        "female",
        "Pune",
        Some(years_ago(24)),
    )
    .await;
    seed_profile(
        &app,
        "Omar",
        "omar@example.com",
        "male",
        "Pune",
        Some(years_ago(29)),
    )
    .await;

    let admin = app.connect_administrator().await;
    let ordered = filter_names(&admin, "?min_age=28&max_age=40").await;
    let reversed = filter_names(&admin, "?min_age=40&max_age=28").await;

    assert_eq!(ordered, reversed);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn unmatched_income_filter_returns_empty_not_error() {
    let app = TestApp::start().await;
    seed_profile(&app, "Aisha", "aisha@example.com", "female", "Pune", None).await;

    let admin = app.connect_administrator().await;
    let names = filter_names(&admin, "?income=50000").await;

    assert!(names.is_empty());
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn malformed_filters_are_rejected() {
    let app = TestApp::start().await;
    let admin = app.connect_administrator().await;

    let response = admin
        .get_raw("/api/v1/admin/profiles?min_age=abc")
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());

    let response = admin
        .get_raw("/api/v1/admin/profiles?gender=unknown")
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());

    let response = admin
        .get_raw("/api/v1/admin/profiles?unexpected=1")
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn members_cannot_use_admin_endpoints() {
    let app = TestApp::start().await;
    let member = app
        .register_member("Omar", "omar@example.com", "a passphrase", "male")
        .await;

    let result = member.get::<Vec<Profile>>("/api/v1/admin/profiles").await;
    if let Err(TestError::RequestError(e)) = result {
        assert_eq!(403, e.status().unwrap().as_u16());
    } else {
        panic!("expected member access to admin endpoints to be denied");
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn review_transitions_between_approved_and_rejected() {
    let app = TestApp::start().await;
    let profile = seed_profile(&app, "Aisha", "aisha@example.com", "female", "Pune", None).await;
    let admin = app.connect_administrator().await;

    let approved: Profile = admin
        .post_empty(&format!(
            "/api/v1/admin/profiles/{}/approve",
            profile.id.to_string()
        ))
        .await
        .unwrap();
    assert_eq!(ReviewStatus::Approved, approved.review_status);

    let rejected: Profile = admin
        .post_empty(&format!(
            "/api/v1/admin/profiles/{}/reject",
            profile.id.to_string()
        ))
        .await
        .unwrap();
    assert_eq!(ReviewStatus::Rejected, rejected.review_status);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn partial_update_leaves_other_fields_untouched() {
    let app = TestApp::start().await;
    let profile = seed_profile(&app, "Aisha", "aisha@example.com", "female", "Pune", None).await;
    let admin = app.connect_administrator().await;

    let updated: Profile = admin
        .patch(
            &format!("/api/v1/admin/profiles/{}", profile.id.to_string()),
            json!({ "city": "Hyderabad", "occupation": "Engineer" }),
        )
        .await
        .unwrap();

    assert_eq!(Some("Hyderabad".to_string()), updated.city);
    assert_eq!(Some("Engineer".to_string()), updated.occupation);
    assert_eq!(Some("Aisha".to_string()), updated.name);
    assert!(updated.updated_at.is_some());
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn deleted_profiles_disappear_from_listings() {
    let app = TestApp::start().await;
    let profile = seed_profile(&app, "Aisha", "aisha@example.com", "female", "Pune", None).await;
    let admin = app.connect_administrator().await;

    admin
        .delete(&format!("/api/v1/admin/profiles/{}", profile.id.to_string()))
        .await
        .unwrap();

    let names = filter_names(&admin, "").await;
    assert!(names.is_empty());
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn deleting_an_account_removes_its_profile() {
    let app = TestApp::start().await;
    let profile = seed_profile(&app, "Omar", "omar@example.com", "male", "Pune", None).await;
    let admin = app.connect_administrator().await;

    admin
        .delete(&format!(
            "/api/v1/admin/accounts/{}",
            profile.owner_id.to_string()
        ))
        .await
        .unwrap();

    let names = filter_names(&admin, "").await;
    assert!(names.is_empty());
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn stats_count_member_accounts_by_gender() {
    let app = TestApp::start().await;
    app.register_member("Aisha", "aisha@example.com", "a passphrase", "female")
        .await;
    app.register_member("Fatima", "fatima@example.com", "a passphrase", "female")
        .await;
    app.register_member("Omar", "omar@example.com", "a passphrase", "male")
        .await;

    let admin = app.connect_administrator().await;
    let stats: Stats = admin.get("/api/v1/admin/stats").await.unwrap();

    // the bootstrap administrator is not a member
    assert_eq!(3, stats.total_members);
    assert_eq!(1, stats.male);
    assert_eq!(2, stats.female);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn csv_report_roundtrips_with_one_row_per_profile() {
    let app = TestApp::start().await;
    seed_profile(&app, "Aisha, M.Sc.", "aisha@example.com", "female", "Pune", None).await;
    seed_profile(&app, "Omar", "omar@example.com", "male", "Pune", None).await;

    let admin = app.connect_administrator().await;
    let response = admin
        .get_raw("/api/v1/admin/reports/profiles.csv")
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/csv"));

    let body = response.text().await.unwrap();
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

    assert_eq!(2, rows.len());
    assert_eq!("Aisha, M.Sc.", &rows[0][0]);
    assert_eq!("aisha@example.com", &rows[0][1]);
    assert_eq!("Pending", &rows[0][6]);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn pdf_report_is_generated_for_the_filtered_set() {
    let app = TestApp::start().await;
    seed_profile(&app, "Aisha", "aisha@example.com", "female", "Pune", None).await;
    seed_profile(&app, "Omar", "omar@example.com", "male", "Delhi", None).await;

    let admin = app.connect_administrator().await;
    let response = admin
        .get_raw("/api/v1/admin/reports/profiles.pdf?city=Pune")
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    assert_eq!(
        "application/pdf",
        response.headers().get("content-type").unwrap()
    );

    let body = response.bytes().await.unwrap();
    assert!(body.starts_with(b"%PDF"));
}
