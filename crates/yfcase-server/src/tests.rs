//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use yfcase_core::db::Database;
use yfcase_core::models::{NewCredential, TownshipFields, UserFields};

const BOUNDARY: &str = "yfcase-test-boundary";

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn setup_test_app_with_db(db: Database) -> Router {
    let config = ServerConfig {
        require_auth: false,
        allowed_origins: vec![],
        ..Default::default()
    };
    create_router(db, None, config)
}

fn setup_test_app() -> Router {
    setup_test_app_with_db(setup_test_db())
}

fn seed_user(db: &Database, name: &str, email: &str) -> i64 {
    db.create_user(
        &UserFields {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        },
        &NewCredential {
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            must_reset_password: false,
            force_unverified: false,
        },
    )
    .unwrap()
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

fn multipart_body(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(uri: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body("file", file_name, content_type, bytes)))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ========== Import API Tests ==========

#[tokio::test]
async fn test_import_cities_csv() {
    let db = setup_test_db();
    let app = setup_test_app_with_db(db.clone());

    let csv = "城市名稱\n台北市\n新北市\n";
    let response = app
        .oneshot(upload_request(
            "/api/import/cities",
            "cities.csv",
            "text/csv",
            csv.as_bytes(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["message"], "匯入完成：成功 2 筆，失敗 0 筆");
    assert_eq!(json["success"], 2);
    assert_eq!(json["failed"], 0);
    assert_eq!(json["created"], 2);
    assert_eq!(db.list_cities().unwrap().len(), 2);
}

#[tokio::test]
async fn test_import_reports_row_failures_with_200() {
    let db = setup_test_db();
    db.create_city("台北市").unwrap();
    let app = setup_test_app_with_db(db);

    let csv = "城市名稱\n台北市\n高雄市\n";
    let response = app
        .oneshot(upload_request(
            "/api/import/city",
            "cities.csv",
            "text/csv",
            csv.as_bytes(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["success"], 1);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["errors"][0], "第 2 行: 城市名稱 \"台北市\" 已存在");
}

#[tokio::test]
async fn test_import_csv_labelled_as_excel() {
    let app = setup_test_app();

    let response = app
        .oneshot(upload_request(
            "/api/import/cities",
            "cities.csv",
            "application/vnd.ms-excel",
            "城市名稱\n台中市\n".as_bytes(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["created"], 1);
}

#[tokio::test]
async fn test_import_missing_file() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import/cities")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(
                    "attachment",
                    "cities.csv",
                    "text/csv",
                    b"x",
                )))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "請選擇要匯入的檔案");
}

#[tokio::test]
async fn test_import_unsupported_type() {
    let app = setup_test_app();

    let response = app
        .oneshot(upload_request(
            "/api/import/users",
            "notes.txt",
            "text/plain",
            b"hello",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("不支援的檔案類型"));
}

#[tokio::test]
async fn test_import_empty_sheet() {
    let app = setup_test_app();

    let response = app
        .oneshot(upload_request(
            "/api/import/cities",
            "cities.csv",
            "text/csv",
            "城市名稱\n".as_bytes(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Excel 檔案中沒有數據");
}

#[tokio::test]
async fn test_import_unreadable_workbook() {
    let app = setup_test_app();

    let response = app
        .oneshot(upload_request(
            "/api/import/cities",
            "cities.xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            b"not a zip archive",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_unknown_kind() {
    let app = setup_test_app();

    let response = app
        .oneshot(upload_request(
            "/api/import/widgets",
            "w.csv",
            "text/csv",
            b"name\nx\n",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_rejects_oversized_file() {
    let app = setup_test_app();
    let bytes = vec![b'a'; MAX_UPLOAD_SIZE + 1];

    let response = app
        .oneshot(upload_request("/api/import/cities", "cities.csv", "text/csv", &bytes))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("檔案過大"));
}

#[tokio::test]
async fn test_import_case_uses_caller_as_responsible_person() {
    let db = setup_test_db();
    let user_id = seed_user(&db, "王小明", "ming@example.com");
    let app = setup_test_app_with_db(db.clone());

    let csv = "案號,狀態\nA1,進行中\n";
    let mut request = upload_request("/api/import/cases", "cases.csv", "text/csv", csv.as_bytes());
    request.headers_mut().insert(
        "x-authenticated-user-email",
        "Ming@Example.com".parse().unwrap(),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["created"], 1, "{json}");

    let case = db.find_case_by_number("A1").unwrap().unwrap();
    assert_eq!(case.user_id, user_id);

    let audit = db.list_audit_log(10).unwrap();
    assert_eq!(audit[0].action, "import");
    assert_eq!(audit[0].user_email, "ming@example.com");
}

// ========== Export API Tests ==========

#[tokio::test]
async fn test_export_empty_collection_is_404() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/export/cities")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "沒有找到城市數據");
}

#[tokio::test]
async fn test_export_csv_attachment() {
    let db = setup_test_db();
    db.create_city("台北市").unwrap();
    let app = setup_test_app_with_db(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/export/cities?format=csv")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/csv; charset=utf-8"
    );
    let disposition = response.headers()["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("filename*=UTF-8''%E7%B8%A3%E5%B8%82%E8%B3%87%E6%96%99_"));
    assert!(disposition.ends_with(".csv"));

    let bytes = get_body_bytes(response).await;
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("城市名稱"));
    assert!(text.contains("台北市"));
}

#[tokio::test]
async fn test_export_invalid_format() {
    let db = setup_test_db();
    db.create_city("台北市").unwrap();
    let app = setup_test_app_with_db(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/export/cities?format=pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_then_reimport_updates_in_place() {
    let db = setup_test_db();
    db.create_city("台北市").unwrap();
    db.create_city("高雄市").unwrap();
    let app = setup_test_app_with_db(db.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/export/cities")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let workbook = get_body_bytes(response).await;

    let response = app
        .oneshot(upload_request(
            "/api/import/cities",
            "cities.xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            &workbook,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["updated"], 2, "{json}");
    assert_eq!(json["created"], 0);
    assert_eq!(db.list_cities().unwrap().len(), 2);
}

// ========== Case API Tests ==========

#[tokio::test]
async fn test_create_case_defaults_to_caller() {
    let db = setup_test_db();
    let user_id = seed_user(&db, "王小明", "ming@example.com");
    let city = db.create_city("台北市").unwrap();
    let township = db
        .create_township(&TownshipFields {
            city_id: Some(city),
            name: Some("中正區".to_string()),
            ..Default::default()
        })
        .unwrap();
    let app = setup_test_app_with_db(db);

    let mut request = json_request(
        "POST",
        "/api/cases",
        serde_json::json!({ "caseNumber": "A1", "townshipId": township, "street": "重慶南路" }),
    );
    request.headers_mut().insert(
        "x-authenticated-user-email",
        "ming@example.com".parse().unwrap(),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = get_body_json(response).await;
    assert_eq!(json["caseNumber"], "A1");
    assert_eq!(json["userId"], user_id);
    assert_eq!(json["cityId"], city);
    assert_eq!(json["cityName"], "台北市");
    assert_eq!(json["townshipName"], "中正區");
    assert_eq!(json["street"], "重慶南路");
}

#[tokio::test]
async fn test_create_case_unknown_caller() {
    let app = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/cases",
            serde_json::json!({ "caseNumber": "A1" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "找不到指定的負責人");
}

#[tokio::test]
async fn test_create_case_validation() {
    let db = setup_test_db();
    let user_id = seed_user(&db, "A", "a@example.com");
    let app = setup_test_app_with_db(db);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/cases",
            serde_json::json!({ "company": "X", "userId": user_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_body_json(response).await["error"], "請輸入案號");

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/cases",
            serde_json::json!({ "caseNumber": "A1", "userId": user_id, "cityId": 9999 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_body_json(response).await["error"], "找不到指定的城市");
}

#[tokio::test]
async fn test_create_case_rejects_overlong_fields() {
    let db = setup_test_db();
    let user_id = seed_user(&db, "A", "a@example.com");
    let app = setup_test_app_with_db(db.clone());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/cases",
            serde_json::json!({
                "caseNumber": "A1",
                "userId": user_id,
                "company": "c".repeat(51),
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_body_json(response).await["error"], "公司超過50個字符");
    assert!(db.find_case_by_number("A1").unwrap().is_none());
}

#[tokio::test]
async fn test_create_case_trims_case_number() {
    let db = setup_test_db();
    let user_id = seed_user(&db, "A", "a@example.com");
    let app = setup_test_app_with_db(db.clone());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/cases",
            serde_json::json!({ "caseNumber": "   ", "userId": user_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_body_json(response).await["error"], "請輸入案號");

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/cases",
            serde_json::json!({ "caseNumber": "  A9  ", "userId": user_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(get_body_json(response).await["caseNumber"], "A9");
    assert!(db.find_case_by_number("A9").unwrap().is_some());
}

#[tokio::test]
async fn test_update_case_is_sparse() {
    let db = setup_test_db();
    let owner = seed_user(&db, "A", "a@example.com");
    let id = db
        .create_case(&yfcase_core::models::CaseFields {
            case_number: Some("A1".to_string()),
            company: Some("遠東建設".to_string()),
            user_id: Some(owner),
            ..Default::default()
        })
        .unwrap();
    let app = setup_test_app_with_db(db);

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/cases/{}", id),
            serde_json::json!({ "status": "結案" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "結案");
    assert_eq!(json["company"], "遠東建設");
    assert_eq!(json["userId"], owner);
}

#[tokio::test]
async fn test_get_and_delete_case() {
    let db = setup_test_db();
    let owner = seed_user(&db, "A", "a@example.com");
    let id = db
        .create_case(&yfcase_core::models::CaseFields {
            case_number: Some("A1".to_string()),
            user_id: Some(owner),
            ..Default::default()
        })
        .unwrap();
    let app = setup_test_app_with_db(db);
    let uri = format!("/api/cases/{}", id);

    let response = app
        .clone()
        .oneshot(Request::builder().uri(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["user"]["email"], "a@example.com");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Reference List Tests ==========

#[tokio::test]
async fn test_list_townships_by_city() {
    let db = setup_test_db();
    let taipei = db.create_city("台北市").unwrap();
    let taichung = db.create_city("台中市").unwrap();
    for (city, name) in [(taipei, "大安區"), (taichung, "西屯區")] {
        db.create_township(&TownshipFields {
            city_id: Some(city),
            name: Some(name.to_string()),
            ..Default::default()
        })
        .unwrap();
    }
    let app = setup_test_app_with_db(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/townships?city_id={}", taichung))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let townships = json.as_array().unwrap();
    assert_eq!(townships.len(), 1);
    assert_eq!(townships[0]["name"], "西屯區");
    assert_eq!(townships[0]["cityName"], "台中市");
}

#[tokio::test]
async fn test_list_users_hides_credentials() {
    let db = setup_test_db();
    seed_user(&db, "A", "a@example.com");
    let app = setup_test_app_with_db(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let user = &json.as_array().unwrap()[0];
    assert_eq!(user["email"], "a@example.com");
    assert!(user.get("passwordHash").is_none());
}

// ========== Auth Tests ==========

fn setup_auth_app(db: Database) -> Router {
    let config = ServerConfig {
        require_auth: true,
        api_keys: vec!["secret-key".to_string()],
        ..Default::default()
    };
    create_router(db, None, config)
}

#[tokio::test]
async fn test_auth_required() {
    let app = setup_auth_app(setup_test_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/cities")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_with_api_key() {
    let app = setup_auth_app(setup_test_db());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/cities")
                .header("authorization", "Bearer secret-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/cities")
                .header("authorization", "Bearer wrong-key!")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_resolves_stored_user() {
    let db = setup_test_db();
    let user_id = seed_user(&db, "王小明", "ming@example.com");
    let app = setup_auth_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("x-authenticated-user-email", "ming@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["user"], "ming@example.com");
    assert_eq!(json["authMethod"], "identity_header");
    assert_eq!(json["userId"], user_id);
    assert_eq!(json["role"], "user");
}

#[test]
fn test_validate_api_key() {
    let keys = vec!["alpha".to_string(), "beta-key".to_string()];
    assert!(validate_api_key("alpha", &keys));
    assert!(validate_api_key("beta-key", &keys));
    assert!(!validate_api_key("alph", &keys));
    assert!(!validate_api_key("", &keys));
    assert!(!validate_api_key("alpha", &[]));
}

#[test]
fn test_parse_api_keys() {
    assert_eq!(parse_api_keys(" a, ,b ,"), vec!["a", "b"]);
    assert!(parse_api_keys("").is_empty());
}
