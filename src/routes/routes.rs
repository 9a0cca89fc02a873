//! Defines routes for customer and file operations.
//!
//! ## Structure
//! - **Customer endpoints**
//!   - `GET    /customers`     : list customers
//!   - `POST   /customers`     : register a customer
//!   - `DELETE /customers`     : delete all customers (409 while files exist)
//!   - `GET    /customers/{id}`: fetch one customer
//!   - `PUT    /customers/{id}`: rename
//!   - `DELETE /customers/{id}`: delete (409 while it owns files)
//!
//! - **File endpoints**
//!   - `POST   /upload`            : multipart upload (`file`, `customerId`)
//!   - `GET    /files`             : list download descriptors
//!   - `DELETE /files`             : delete all files
//!   - `GET    /files/{id}`        : download
//!   - `PUT    /files/{id}`        : rename
//!   - `DELETE /files/{id}`        : delete
//!   - `PUT    /files/{id}/content`: replace content with the raw body

use crate::{
    handlers::{
        customer_handlers::{
            create_customer, delete_all_customers, delete_customer, get_customer,
            list_customers, update_customer,
        },
        file_handlers::{
            delete_all_files, delete_file, download_file, list_files, rename_file,
            replace_file_content, upload_file,
        },
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

/// Build and return the router for all routes.
///
/// Request bodies are not size-limited; uploads of any length are accepted.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Customer routes
        .route(
            "/customers",
            get(list_customers)
                .post(create_customer)
                .delete(delete_all_customers),
        )
        .route(
            "/customers/{id}",
            get(get_customer)
                .put(update_customer)
                .delete(delete_customer),
        )
        // File routes
        .route("/upload", post(upload_file))
        .route("/files", get(list_files).delete(delete_all_files))
        .route(
            "/files/{id}",
            get(download_file).put(rename_file).delete(delete_file),
        )
        .route("/files/{id}/content", put(replace_file_content))
        .layer(DefaultBodyLimit::disable())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestContext;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-TEST-BOUNDARY";

    async fn send(ctx: &TestContext, request: Request<Body>) -> Response {
        routes()
            .with_state(ctx.state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn upload_request(file_name: &str, content: &[u8], customer_id: &str) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"customerId\"\r\n\r\n\
                 {customer_id}\r\n\
                 --{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn register_customer(ctx: &TestContext, name: &str) -> i64 {
        let response = send(ctx, json_request("POST", "/customers", json!({ "name": name }))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn upload_list_download_round_trip() {
        let ctx = TestContext::new().await;
        let customer_id = register_customer(&ctx, "alice").await;

        let response = send(
            &ctx,
            upload_request("cv.pdf", &[0x01, 0x02, 0x03], &customer_id.to_string()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
        let uploaded = body_json(response).await;
        let file_id = uploaded["id"].as_i64().unwrap();
        assert_eq!(uploaded["name"], "cv.pdf");
        assert_eq!(uploaded["customer_id"], customer_id);
        assert_eq!(uploaded["size_bytes"], 3);
        assert!(uploaded.get("storage_key").is_none());
        assert_eq!(location, format!("/files/{}", file_id));

        let response = send(&ctx, empty_request("GET", "/files")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!([{ "name": "cv.pdf", "url": format!("/files/{}", file_id), "size": 3 }])
        );

        let response = send(&ctx, empty_request("GET", &location)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"cv.pdf\""
        );
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(headers[header::CONTENT_LENGTH], "3");
        assert!(headers.contains_key(header::ETAG));
        assert!(headers.contains_key(header::LAST_MODIFIED));
        assert_eq!(body_bytes(response).await, vec![0x01, 0x02, 0x03]);
    }

    #[tokio::test]
    async fn upload_errors_map_to_client_statuses() {
        let ctx = TestContext::new().await;
        let customer_id = register_customer(&ctx, "alice").await;

        let response = send(&ctx, upload_request("cv.pdf", b"x", "999")).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["status"], 422);

        let response = send(
            &ctx,
            upload_request("../../etc/passwd", &[0x01, 0x02], &customer_id.to_string()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&ctx, upload_request("cv.pdf", b"x", "alice")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&ctx, empty_request("GET", "/files")).await;
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn missing_files_are_404() {
        let ctx = TestContext::new().await;

        for request in [
            empty_request("GET", "/files/999"),
            empty_request("DELETE", "/files/999"),
            json_request("PUT", "/files/999", json!({ "name": "x.txt" })),
        ] {
            let response = send(&ctx, request).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn rename_and_replace_content() {
        let ctx = TestContext::new().await;
        let customer_id = register_customer(&ctx, "alice").await;
        let stored = ctx
            .files
            .store("draft.txt", "v1".into(), None, customer_id)
            .await
            .unwrap();
        let uri = format!("/files/{}", stored.record.id);

        let response = send(&ctx, json_request("PUT", &uri, json!({ "name": "final.txt" }))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["name"], "final.txt");

        let request = Request::builder()
            .method("PUT")
            .uri(format!("{}/content", uri))
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("second version"))
            .unwrap();
        let response = send(&ctx, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["size_bytes"], 14);
        assert_eq!(updated["content_type"], "text/plain");

        let response = send(&ctx, empty_request("GET", &uri)).await;
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"final.txt\""
        );
        assert_eq!(body_bytes(response).await, b"second version".to_vec());
    }

    #[tokio::test]
    async fn deleting_files_and_customers() {
        let ctx = TestContext::new().await;
        let customer_id = register_customer(&ctx, "alice").await;
        let stored = ctx
            .files
            .store("a.txt", "a".into(), None, customer_id)
            .await
            .unwrap();

        let customer_uri = format!("/customers/{}", customer_id);
        let response = send(&ctx, empty_request("DELETE", &customer_uri)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let response = send(&ctx, empty_request("DELETE", "/customers")).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let file_uri = format!("/files/{}", stored.record.id);
        let response = send(&ctx, empty_request("DELETE", &file_uri)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        for _ in 0..2 {
            let response = send(&ctx, empty_request("DELETE", "/files")).await;
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }

        let response = send(&ctx, empty_request("DELETE", &customer_uri)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = send(&ctx, empty_request("GET", &customer_uri)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn customer_crud() {
        let ctx = TestContext::new().await;
        let id = register_customer(&ctx, "alice").await;
        let uri = format!("/customers/{}", id);

        let response = send(&ctx, json_request("PUT", &uri, json!({ "name": "bob" }))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&ctx, empty_request("GET", "/customers")).await;
        let customers = body_json(response).await;
        assert_eq!(customers.as_array().unwrap().len(), 1);
        assert_eq!(customers[0]["name"], "bob");

        let response = send(&ctx, json_request("POST", "/customers", json!({ "name": " " }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&ctx, json_request("PUT", "/customers/999", json!({ "name": "x" }))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_endpoints() {
        let ctx = TestContext::new().await;
        std::fs::create_dir_all(&ctx.state.storage_dir).unwrap();

        let response = send(&ctx, empty_request("GET", "/healthz")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&ctx, empty_request("GET", "/readyz")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["checks"]["sqlite"]["ok"], true);
        assert_eq!(body["checks"]["disk"]["ok"], true);
    }
}
