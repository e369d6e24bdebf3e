use crate::application::DataLoader;
use crate::domain::error::{AppError, Result};
use crate::domain::upload::{UploadArtifact, UploadResponse};
use crate::infrastructure::config::LoaderConfig;
use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_multipart::Multipart;
use actix_web::http::{Method, StatusCode};
use actix_web::{
    dev::Server, get, post, web, App, HttpRequest, HttpResponse, HttpServer, ResponseError,
};
use futures::TryStreamExt;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

pub struct HttpState {
    pub loader: Arc<dyn DataLoader>,
    pub index_file: PathBuf,
    pub assets_dir: PathBuf,
}

impl HttpState {
    pub fn new(loader: Arc<dyn DataLoader>, config: &LoaderConfig) -> Self {
        Self {
            loader,
            index_file: config.index_file(),
            assets_dir: config.assets_dir().to_path_buf(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            detail: self.message(),
        })
    }
}

async fn read_field(field: &mut actix_multipart::Field) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| AppError::ValidationError(format!("Malformed multipart body: {}", e)))?
    {
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Pulls the `file` and `source` fields out of the upload form. Unknown
/// fields are drained and ignored.
async fn read_upload_form(mut payload: Multipart) -> Result<UploadArtifact> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut source: Option<String> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::ValidationError(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().to_string();
        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_string);
        let data = read_field(&mut field).await?;

        match name.as_str() {
            "file" => {
                let filename = filename.ok_or_else(|| {
                    AppError::ValidationError("Field 'file' must be a file upload".to_string())
                })?;
                file = Some((filename, data));
            }
            "source" => {
                let value = String::from_utf8(data).map_err(|_| {
                    AppError::ValidationError("Field 'source' must be UTF-8 text".to_string())
                })?;
                source = Some(value);
            }
            _ => {}
        }
    }

    let (filename, content) =
        file.ok_or_else(|| AppError::ValidationError("Field required: file".to_string()))?;
    let source =
        source.ok_or_else(|| AppError::ValidationError("Field required: source".to_string()))?;
    Ok(UploadArtifact::new(filename, source, content))
}

#[post("/upload")]
async fn upload_file(data: web::Data<HttpState>, payload: Multipart) -> Result<HttpResponse> {
    let artifact = read_upload_form(payload).await.map_err(|e| {
        tracing::warn!("Rejected upload form: {}", e);
        e
    })?;
    let filename = artifact.filename.clone();

    match data.loader.upload(artifact).await {
        Ok(receipt) => {
            tracing::info!(
                "Upload of {} stored in {}",
                receipt.filename,
                receipt.container
            );
            Ok(HttpResponse::Ok().json(UploadResponse::from(&receipt)))
        }
        Err(e) => {
            tracing::error!("Upload of {} failed: {}", filename, e);
            Err(e)
        }
    }
}

#[get("/logicapp-status/{workflow_name}")]
async fn logic_app_status(
    data: web::Data<HttpState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let workflow_name = path.into_inner();
    match data.loader.workflow_status(&workflow_name).await {
        Ok(status) => Ok(HttpResponse::Ok().json(status)),
        Err(e) => {
            tracing::error!("Status query for {} failed: {}", workflow_name, e);
            Err(e)
        }
    }
}

/// Every path outside `/api` and `/static` gets the client's entry document.
async fn spa_fallback(req: HttpRequest, data: web::Data<HttpState>) -> Result<HttpResponse> {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return Ok(HttpResponse::MethodNotAllowed().json(ErrorBody {
            detail: "Method Not Allowed",
        }));
    }
    let index = NamedFile::open_async(&data.index_file).await.map_err(|e| {
        tracing::error!("Cannot open {}: {}", data.index_file.display(), e);
        AppError::IoError(format!("{}: {}", data.index_file.display(), e))
    })?;
    Ok(index.into_response(&req))
}

pub fn configure(state: web::Data<HttpState>) -> impl Fn(&mut web::ServiceConfig) + Clone {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(state.clone())
            .service(
                web::scope("/api")
                    .service(upload_file)
                    .service(logic_app_status),
            )
            .service(Files::new("/static", &state.assets_dir))
            .default_service(web::to(spa_fallback));
    }
}

pub fn start_server(loader: Arc<dyn DataLoader>, config: &LoaderConfig) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState::new(loader, config));
    let routes = configure(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new().wrap(cors).configure(routes.clone())
    })
    .bind(config.loader_bind_address.as_str())?
    .run();

    tracing::info!("Data loader listening on {}", config.loader_bind_address);
    Ok(server)
}
