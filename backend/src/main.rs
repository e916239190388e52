pub mod analysis;
pub mod config;
pub mod dashboard;
pub mod inference;
pub mod models;

use std::sync::Arc;
use std::time::Instant;

use actix_files::Files;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::error::InternalError;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use log::{error, info, warn};
use maud::Markup;
use serde::Serialize;
use usage_inference::{InferenceModel, ModelInfo};

use config::Config;
use dashboard::{render_error, render_page, PageState};
use inference::{get_model, get_stats, AnalysisStats};
use models::{ApiResponse, HouseholdInput};

fn html(status: StatusCode, markup: Markup) -> HttpResponse {
    HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(markup.into_string())
}

async fn index() -> impl Responder {
    html(
        StatusCode::OK,
        render_page(&HouseholdInput::default(), PageState::Form),
    )
}

async fn analyze(
    model: web::Data<Arc<InferenceModel>>,
    form: web::Form<HouseholdInput>,
) -> impl Responder {
    let start_time = Instant::now();
    let input = form.into_inner();

    if let Err(e) = input.validate() {
        warn!("Rejected household input: {}", e);
        return html(StatusCode::BAD_REQUEST, render_page(&input, PageState::Error(&e)));
    }

    let model_clone = model.get_ref().clone();
    let submitted = input.clone();

    match web::block(move || analysis::analyze(&model_clone, &submitted)).await {
        Ok(Ok(report)) => {
            inference::record(&report);
            info!(
                "Analysis rendered in {} ms",
                start_time.elapsed().as_millis()
            );
            html(StatusCode::OK, render_page(&input, PageState::Report(&report)))
        }
        Ok(Err(e)) => {
            error!("Inference failed: {}", e);
            let message = format!("Analysis failed: {}", e);
            html(
                StatusCode::INTERNAL_SERVER_ERROR,
                render_page(&input, PageState::Error(&message)),
            )
        }
        Err(e) => {
            error!("Blocking analysis task failed: {}", e);
            html(
                StatusCode::INTERNAL_SERVER_ERROR,
                render_page(&input, PageState::Error("Analysis could not be executed")),
            )
        }
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    model: ModelInfo,
    stats: AnalysisStats,
}

async fn health(model: web::Data<Arc<InferenceModel>>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(Health {
        status: "ok",
        model: model.info().clone(),
        stats: get_stats(),
    }))
}

async fn not_found() -> impl Responder {
    html(
        StatusCode::NOT_FOUND,
        render_error("404 Not Found", "This page does not exist."),
    )
}

/// Undecodable form submissions re-render the dashboard with the parse error.
fn form_config() -> web::FormConfig {
    web::FormConfig::default().error_handler(|err, _req| {
        warn!("Malformed form submission: {}", err);
        let message = format!("Invalid form submission: {}", err);
        let response = html(
            StatusCode::BAD_REQUEST,
            render_page(&HouseholdInput::default(), PageState::Error(&message)),
        );
        InternalError::from_response(err, response).into()
    })
}

/// Dashboard routes, shared by the server and the handler tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(form_config())
        .route("/", web::get().to(index))
        .route("/analyze", web::post().to(analyze))
        .route("/health", web::get().to(health));
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    info!("⚡ Starting the abnormal electricity usage dashboard");

    let config = Config::from_env()?;

    let model = match get_model(&config) {
        Ok(model) => {
            info!("✅ Artifacts loaded ({} features)", model.info().n_features);
            model
        }
        Err(e) => {
            error!("❌ {:#}", e);
            return Err(e);
        }
    };

    let model_data = web::Data::new(model);
    let static_dir = config.static_dir.clone();
    let bind_address = config.bind_address();

    info!("🌐 Dashboard available on: http://{}/", bind_address);
    info!("👷 Workers: {}", config.workers);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .app_data(model_data.clone())
            .configure(routes)
            .service(Files::new("/static", &static_dir).prefer_utf8(true))
            .default_service(web::route().to(not_found))
    })
    .workers(config.workers)
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
