//! HTTP route handlers
//!
//! Thin adapters: parse path/query/body, call the service, map the result
//! to JSON. All lifecycle rules live in the service and below.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::entity::{EntityCollection, EntityType};
use crate::reconcile::TransferStrategy;
use crate::schema::SchemaKind;
use crate::service::LifecycleService;

use super::response::{unprocessable, ApiError};

type AppState = Arc<LifecycleService>;

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/tenants", post(create_tenant).get(list_tenants))
        .route("/tenants/:tenant", get(tenant_status).delete(delete_tenant))
        .route(
            "/tenants/:tenant/backups",
            post(create_backup).get(list_backups),
        )
        .route(
            "/tenants/:tenant/backups/:id",
            get(get_backup).delete(delete_backup),
        )
        .route(
            "/tenants/:tenant/backups/:id/meta",
            get(get_backup_meta).patch(patch_backup_meta),
        )
        .route("/tenants/:tenant/backups/:id/upload", post(upload_backup))
        .route("/tenants/:tenant/restore", post(restore))
        .route("/tenants/:tenant/promote", post(promote))
        .route("/tenants/:tenant/discard-temp", post(discard_temp))
        .route("/tenants/:tenant/reconcile", post(reconcile))
        .route("/tenants/:tenant/entities/counts", get(entity_counts))
        .route(
            "/tenants/:tenant/entities/:entity/export",
            get(export_entities),
        )
        .route(
            "/tenants/:tenant/entities/:entity/import",
            post(import_entities),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct CreateTenantRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PatchMetaRequest {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestoreRequest {
    archive_id: String,
    #[serde(default)]
    to_temp: bool,
}

#[derive(Debug, Deserialize)]
struct ReconcileRequest {
    strategy: TransferStrategy,
    /// Direction: temp into prod (default) or prod into temp
    #[serde(default = "default_from_temp")]
    from_temp: bool,
    /// Limit the run to one entity collection
    #[serde(default)]
    entity: Option<EntityType>,
}

fn default_from_temp() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ImportRequest {
    strategy: TransferStrategy,
    #[serde(default)]
    to_temp: bool,
    #[serde(flatten)]
    collection: EntityCollection,
}

#[derive(Debug, Deserialize)]
struct DeleteBackupQuery {
    #[serde(default)]
    remote: bool,
}

#[derive(Debug, Deserialize)]
struct SchemaQuery {
    #[serde(default)]
    from_temp: bool,
}

async fn create_tenant(
    State(service): State<AppState>,
    Json(body): Json<CreateTenantRequest>,
) -> Result<Response, ApiError> {
    let tenant = service.create_tenant(&body.name)?;
    Ok((StatusCode::CREATED, Json(tenant)).into_response())
}

async fn list_tenants(State(service): State<AppState>) -> Response {
    Json(service.list_tenants()).into_response()
}

async fn tenant_status(
    State(service): State<AppState>,
    Path(tenant): Path<Uuid>,
) -> Result<Response, ApiError> {
    Ok(Json(service.tenant_status(tenant)?).into_response())
}

async fn delete_tenant(
    State(service): State<AppState>,
    Path(tenant): Path<Uuid>,
) -> Result<Response, ApiError> {
    service.delete_tenant(tenant)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn create_backup(
    State(service): State<AppState>,
    Path(tenant): Path<Uuid>,
    Query(query): Query<SchemaQuery>,
) -> Result<Response, ApiError> {
    let kind = SchemaKind::from_temp_flag(query.from_temp);
    let meta = service.create_backup(tenant, kind)?;
    Ok((StatusCode::CREATED, Json(meta)).into_response())
}

async fn list_backups(
    State(service): State<AppState>,
    Path(tenant): Path<Uuid>,
) -> Result<Response, ApiError> {
    Ok(Json(service.list_backups(tenant)?).into_response())
}

async fn get_backup(
    State(service): State<AppState>,
    Path((tenant, id)): Path<(Uuid, String)>,
) -> Result<Response, ApiError> {
    Ok(Json(service.get_backup(tenant, &id)?).into_response())
}

async fn get_backup_meta(
    State(service): State<AppState>,
    Path((tenant, id)): Path<(Uuid, String)>,
) -> Result<Response, ApiError> {
    Ok(Json(service.get_backup(tenant, &id)?).into_response())
}

async fn patch_backup_meta(
    State(service): State<AppState>,
    Path((tenant, id)): Path<(Uuid, String)>,
    Json(body): Json<PatchMetaRequest>,
) -> Result<Response, ApiError> {
    let meta = service.set_backup_meta(tenant, &id, body.title, body.description)?;
    Ok(Json(meta).into_response())
}

async fn upload_backup(
    State(service): State<AppState>,
    Path((tenant, id)): Path<(Uuid, String)>,
) -> Result<Response, ApiError> {
    Ok(Json(service.upload_backup(tenant, &id)?).into_response())
}

async fn delete_backup(
    State(service): State<AppState>,
    Path((tenant, id)): Path<(Uuid, String)>,
    Query(query): Query<DeleteBackupQuery>,
) -> Result<Response, ApiError> {
    service.delete_backup(tenant, &id, query.remote)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn restore(
    State(service): State<AppState>,
    Path(tenant): Path<Uuid>,
    Json(body): Json<RestoreRequest>,
) -> Result<Response, ApiError> {
    let outcome = service.restore(tenant, &body.archive_id, body.to_temp)?;
    Ok(Json(outcome).into_response())
}

async fn promote(
    State(service): State<AppState>,
    Path(tenant): Path<Uuid>,
) -> Result<Response, ApiError> {
    Ok(Json(service.promote(tenant)?).into_response())
}

async fn discard_temp(
    State(service): State<AppState>,
    Path(tenant): Path<Uuid>,
) -> Result<Response, ApiError> {
    service.discard_temp(tenant)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn reconcile(
    State(service): State<AppState>,
    Path(tenant): Path<Uuid>,
    Json(body): Json<ReconcileRequest>,
) -> Result<Response, ApiError> {
    let report = service.reconcile(tenant, body.from_temp, body.entity, body.strategy)?;
    Ok(Json(report).into_response())
}

async fn entity_counts(
    State(service): State<AppState>,
    Path(tenant): Path<Uuid>,
    Query(query): Query<SchemaQuery>,
) -> Result<Response, ApiError> {
    let kind = SchemaKind::from_temp_flag(query.from_temp);
    Ok(Json(service.entity_counts(tenant, kind)?).into_response())
}

async fn export_entities(
    State(service): State<AppState>,
    Path((tenant, entity)): Path<(Uuid, String)>,
    Query(query): Query<SchemaQuery>,
) -> Result<Response, ApiError> {
    let entity: EntityType = match entity.parse() {
        Ok(entity) => entity,
        Err(e) => return Ok(unprocessable(format!("{}", e))),
    };
    let kind = SchemaKind::from_temp_flag(query.from_temp);
    Ok(Json(service.export_entities(tenant, kind, entity)?).into_response())
}

async fn import_entities(
    State(service): State<AppState>,
    Path((tenant, entity)): Path<(Uuid, String)>,
    Json(body): Json<ImportRequest>,
) -> Result<Response, ApiError> {
    let entity: EntityType = match entity.parse() {
        Ok(entity) => entity,
        Err(e) => return Ok(unprocessable(format!("{}", e))),
    };
    if body.collection.entity_type() != entity {
        return Ok(unprocessable(format!(
            "payload is tagged {} but the path names {}",
            body.collection.entity_type(),
            entity
        )));
    }

    let kind = SchemaKind::from_temp_flag(body.to_temp);
    let report = service.import_entities(tenant, kind, body.collection, body.strategy)?;
    Ok(Json(report).into_response())
}
