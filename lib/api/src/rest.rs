use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use futures_util::TryStreamExt;
use pymescore_core::{Error, ErrorKind};
use pymescore_engine::{ScoreRequest, ScoringPipeline};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const HEALTH_MESSAGE: &str = "API de Scoring para PYMEs activa";

const FIELD_RUC: &str = "ruc_objetivo";
const FIELD_BALANCES: &str = "balances_file";
const FIELD_REFERENCES: &str = "referencias_file";
const FIELD_DIGITAL: &str = "datos_digitales_file";

/// Default cap on one uploaded file
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;
const MAX_RUC_BYTES: usize = 64;

/// Per-field size cap for `/predict` uploads
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

impl Default for UploadLimit {
    fn default() -> Self {
        UploadLimit(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

enum FormError {
    Invalid(String),
    TooLarge(String),
}

#[derive(Serialize)]
struct HealthResponse {
    message: &'static str,
    model_loaded: bool,
    schema_mode: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

#[derive(Default)]
struct PredictForm {
    ruc: Option<String>,
    balances: Option<Vec<u8>>,
    references: Option<Vec<u8>>,
    digital_data: Option<Vec<u8>>,
}

impl PredictForm {
    fn into_request(self) -> Result<ScoreRequest, String> {
        let missing = |field: &str| format!("missing form field '{}'", field);
        let ruc = self.ruc.ok_or_else(|| missing(FIELD_RUC))?;
        if ruc.trim().is_empty() {
            return Err(format!("form field '{}' is empty", FIELD_RUC));
        }
        Ok(ScoreRequest {
            ruc,
            balances: self.balances.ok_or_else(|| missing(FIELD_BALANCES))?,
            references: self.references.ok_or_else(|| missing(FIELD_REFERENCES))?,
            digital_data: self.digital_data.ok_or_else(|| missing(FIELD_DIGITAL))?,
        })
    }
}

pub struct RestApi;

impl RestApi {
    pub async fn start(
        pipeline: Arc<ScoringPipeline>,
        port: u16,
        limit: UploadLimit,
    ) -> std::io::Result<()> {
        info!(port, max_upload_bytes = limit.0, "starting REST API");
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(pipeline.clone()))
                .app_data(web::Data::new(limit))
                .configure(configure)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }
}

/// Register the scoring routes. Expects `web::Data<Arc<ScoringPipeline>>` in
/// app data; `web::Data<UploadLimit>` is optional.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(health))
        .route("/predict", web::post().to(predict));
}

async fn health(pipeline: web::Data<Arc<ScoringPipeline>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(HealthResponse {
        message: HEALTH_MESSAGE,
        model_loaded: pipeline.is_ready(),
        schema_mode: pipeline.schema_mode().as_str(),
    }))
}

async fn predict(
    pipeline: web::Data<Arc<ScoringPipeline>>,
    limit: Option<web::Data<UploadLimit>>,
    payload: Multipart,
) -> ActixResult<HttpResponse> {
    if let Err(e) = pipeline.ensure_ready() {
        return Ok(error_response(&e));
    }

    let limit = limit.map(|l| **l).unwrap_or_default();
    let form = match read_form(payload, limit).await {
        Ok(form) => form,
        Err(FormError::Invalid(detail)) => return Ok(bad_request(detail)),
        Err(FormError::TooLarge(detail)) => {
            warn!(%detail, "rejected oversized upload");
            return Ok(HttpResponse::PayloadTooLarge().json(ErrorResponse { detail }));
        }
    };
    let request = match form.into_request() {
        Ok(request) => request,
        Err(detail) => return Ok(bad_request(detail)),
    };

    let pipeline = pipeline.get_ref().clone();
    match web::block(move || pipeline.run(&request)).await {
        Ok(Ok(result)) => Ok(HttpResponse::Ok().json(result)),
        Ok(Err(e)) => Ok(error_response(&e)),
        Err(e) => {
            error!(error = %e, "scoring task failed");
            Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                detail: e.to_string(),
            }))
        }
    }
}

async fn read_form(mut payload: Multipart, limit: UploadLimit) -> Result<PredictForm, FormError> {
    let mut form = PredictForm::default();

    while let Some(field) = payload
        .try_next()
        .await
        .map_err(|e| FormError::Invalid(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let max_bytes = match name.as_str() {
            FIELD_RUC => MAX_RUC_BYTES,
            FIELD_BALANCES | FIELD_REFERENCES | FIELD_DIGITAL => limit.0,
            other => {
                // dropping the field lets the multipart stream skip its body
                debug!(field = other, "ignoring unknown form field");
                continue;
            }
        };
        let data = read_field(field, &name, max_bytes).await?;

        match name.as_str() {
            FIELD_RUC => {
                let ruc = String::from_utf8(data).map_err(|_| {
                    FormError::Invalid(format!("form field '{}' is not valid UTF-8", FIELD_RUC))
                })?;
                form.ruc = Some(ruc);
            }
            FIELD_BALANCES => form.balances = Some(data),
            FIELD_REFERENCES => form.references = Some(data),
            _ => form.digital_data = Some(data),
        }
    }

    Ok(form)
}

async fn read_field(
    mut field: actix_multipart::Field,
    name: &str,
    max_bytes: usize,
) -> Result<Vec<u8>, FormError> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| FormError::Invalid(format!("failed reading field '{}': {}", name, e)))?
    {
        if data.len() + chunk.len() > max_bytes {
            return Err(FormError::TooLarge(format!(
                "form field '{}' exceeds {} bytes",
                name, max_bytes
            )));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

fn bad_request(detail: String) -> HttpResponse {
    warn!(%detail, "rejected request");
    HttpResponse::BadRequest().json(ErrorResponse { detail })
}

fn error_response(err: &Error) -> HttpResponse {
    let detail = err.to_string();
    match err.kind() {
        ErrorKind::Unavailable => {
            warn!(%detail, "scoring unavailable");
            HttpResponse::ServiceUnavailable().json(ErrorResponse { detail })
        }
        ErrorKind::ClientInput => bad_request(detail),
        ErrorKind::Internal => {
            error!(%detail, "scoring failed");
            HttpResponse::InternalServerError().json(ErrorResponse { detail })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::{header, StatusCode};
    use actix_web::test;
    use pymescore_core::{FeatureMatrix, Result};
    use pymescore_engine::{
        HashingTokenEncoder, ModelSlot, PipelineConfig, ScoringModel,
    };

    const BOUNDARY: &str = "pymescoreboundary";

    struct HalfModel;

    impl ScoringModel for HalfModel {
        fn name(&self) -> &'static str {
            "half"
        }

        fn n_features(&self) -> Option<usize> {
            None
        }

        fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
            Ok(vec![0.5; matrix.n_rows()])
        }
    }

    fn pipeline(model: ModelSlot) -> Arc<ScoringPipeline> {
        Arc::new(ScoringPipeline::new(
            model,
            Arc::new(HashingTokenEncoder::new(8)),
            None,
            PipelineConfig::default(),
        ))
    }

    fn multipart_body(fields: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, data) in fields {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{0}\"; filename=\"{0}.csv\"\r\n\r\n",
                    name
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn predict_request(fields: &[(&str, &[u8])]) -> actix_web::test::TestRequest {
        test::TestRequest::post()
            .uri("/predict")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(multipart_body(fields))
    }

    fn full_form(ruc: &'static str) -> Vec<(&'static str, &'static [u8])> {
        vec![
            (FIELD_RUC, ruc.as_bytes()),
            (FIELD_BALANCES, &b"ruc\tventas\n0912345678\t100\n0912345678\t200\n"[..]),
            (FIELD_REFERENCES, &b"ruc,referencia\n0912345678,3\n"[..]),
            (FIELD_DIGITAL, &b"ruc,seguidores\n"[..]),
        ]
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline(ModelSlot::Unavailable("none".into()))))
                .configure(configure),
        )
        .await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], HEALTH_MESSAGE);
        assert_eq!(body["model_loaded"], false);
        assert_eq!(body["schema_mode"], "degraded");
    }

    #[actix_web::test]
    async fn test_predict_ok() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline(ModelSlot::Loaded(Arc::new(HalfModel)))))
                .configure(configure),
        )
        .await;
        let resp = test::call_service(&app, predict_request(&full_form("0912345678")).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["ruc"], "0912345678");
        assert_eq!(body["score"], 50);
        assert_eq!(body["n_registros"], 2);
        assert_eq!(body["probabilidades"].as_array().map(|a| a.len()), Some(2));
    }

    #[actix_web::test]
    async fn test_predict_unknown_ruc_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline(ModelSlot::Loaded(Arc::new(HalfModel)))))
                .configure(configure),
        )
        .await;
        let resp = test::call_service(&app, predict_request(&full_form("1790000000")).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["detail"].as_str().unwrap_or_default().contains("1790000000"));
    }

    #[actix_web::test]
    async fn test_predict_missing_field_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline(ModelSlot::Loaded(Arc::new(HalfModel)))))
                .configure(configure),
        )
        .await;
        let mut form = full_form("0912345678");
        form.retain(|(name, _)| *name != FIELD_DIGITAL);
        let resp = test::call_service(&app, predict_request(&form).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["detail"].as_str().unwrap_or_default().contains(FIELD_DIGITAL));
    }

    #[actix_web::test]
    async fn test_predict_skips_unknown_fields() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline(ModelSlot::Loaded(Arc::new(HalfModel)))))
                .configure(configure),
        )
        .await;
        let mut form = full_form("0912345678");
        form.insert(1, ("comentarios_file", &b"empresa,texto\nAcme,hola\n"[..]));
        let resp = test::call_service(&app, predict_request(&form).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["n_registros"], 2);
    }

    #[actix_web::test]
    async fn test_predict_rejects_oversized_upload() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline(ModelSlot::Loaded(Arc::new(HalfModel)))))
                .app_data(web::Data::new(UploadLimit(16)))
                .configure(configure),
        )
        .await;
        let resp = test::call_service(&app, predict_request(&full_form("0912345678")).to_request()).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["detail"].as_str().unwrap_or_default().contains(FIELD_BALANCES));
    }

    #[actix_web::test]
    async fn test_predict_rejects_oversized_ruc() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline(ModelSlot::Loaded(Arc::new(HalfModel)))))
                .configure(configure),
        )
        .await;
        let long_ruc: &'static str = Box::leak("9".repeat(MAX_RUC_BYTES + 1).into_boxed_str());
        let resp = test::call_service(&app, predict_request(&full_form(long_ruc)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[actix_web::test]
    async fn test_predict_without_model_is_unavailable() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline(ModelSlot::Unavailable("no artifact".into()))))
                .configure(configure),
        )
        .await;
        let resp = test::call_service(&app, predict_request(&full_form("0912345678")).to_request()).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
