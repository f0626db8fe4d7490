use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use serde_json::json;
use tempfile::{Builder, TempDir};
use tracing::info;
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::error::ApiError;

/// Shared application state: the classifier loaded once at startup.
pub struct AppState {
    pub classifier: Arc<Classifier>,
}

/// Spool the multipart `file` field into a fresh temp directory.
///
/// Returns the directory guard alongside the written path; dropping the
/// guard removes the upload. Fields other than `file` are skipped. A body
/// with no `file` field is a client error.
async fn spool_upload(mut payload: Multipart) -> Result<(TempDir, PathBuf), ApiError> {
    let upload_dir = Builder::new().prefix("lesion-upload").tempdir()?;

    let mut filepath: Option<PathBuf> = None;
    while let Some(item) = payload.next().await {
        let mut field = item?;
        if field.name() != "file" {
            continue;
        }

        let path = upload_dir.path().join(format!("{}.jpg", Uuid::new_v4()));
        let path_for_create = path.clone();
        let mut f = web::block(move || File::create(&path_for_create)).await??;

        while let Some(chunk) = field.next().await {
            let data = chunk?;
            f = web::block(move || f.write_all(&data).map(|_| f)).await??;
        }

        filepath = Some(path);
    }

    let path = filepath.ok_or(ApiError::NoFile)?;
    Ok((upload_dir, path))
}

/// POST /predict
///
/// Spools the uploaded `file` field to disk, then runs the classifier on the
/// blocking pool. The temp directory (and the upload with it) is removed when
/// the request ends.
pub async fn predict(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let (_upload_dir, path) = spool_upload(payload).await?;

    let classifier = state.classifier.clone();
    let response = web::block(move || classifier.classify_path(&path)).await??;

    info!(
        class = %response.predicted_class_name,
        confidence = response.confidence,
        "prediction served"
    );
    Ok(HttpResponse::Ok().json(response))
}

/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};

    const BOUNDARY: &str = "------------------------boundary";

    /// Test route exposing only the spooling stage, so the upload contract
    /// can be exercised without a model artifact on disk.
    async fn spooled(payload: Multipart) -> Result<HttpResponse, ApiError> {
        let (_upload_dir, path) = spool_upload(payload).await?;
        Ok(HttpResponse::Ok().json(json!({ "spooled": path.extension().is_some() })))
    }

    fn form_body(field_name: &str) -> String {
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"upload.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\nhello\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = field_name
        )
    }

    fn multipart_request(uri: &str, body: String) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
    }

    #[actix_rt::test]
    async fn upload_without_file_field_is_rejected() {
        let app =
            test::init_service(App::new().route("/upload", web::post().to(spooled))).await;
        let req = multipart_request("/upload", form_body("avatar")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No file uploaded");
    }

    #[actix_rt::test]
    async fn upload_with_file_field_is_spooled() {
        let app =
            test::init_service(App::new().route("/upload", web::post().to(spooled))).await;
        let req = multipart_request("/upload", form_body("file")).to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_rt::test]
    async fn health_reports_ok() {
        let app =
            test::init_service(App::new().route("/health", web::get().to(health))).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
    }
}
