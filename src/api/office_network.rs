use crate::attendance::registry;
use crate::auth::auth::AuthUser;
use crate::model::attendance::Geolocation;
use crate::model::office_network::OfficeNetwork;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use std::net::IpAddr;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateOfficeNetwork {
    #[schema(example = "HQ 4th floor")]
    pub name: String,
    #[schema(example = "203.0.113.17")]
    pub ip_address: String,
    pub anchor: Option<Geolocation>,
}

/// Register a trusted office network (Admin)
#[utoipa::path(
    post,
    path = "/api/v1/office-network",
    request_body(
        content = CreateOfficeNetwork,
        description = "Office network to trust",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Office network registered", body = Object, example = json!({
            "message": "Office network registered",
            "id": 1
        })),
        (status = 400, description = "Invalid name, IP, or anchor"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "IP already registered"),
        (status = 503, description = "Transient failure, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "OfficeNetwork"
)]
pub async fn register_office_network(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateOfficeNetwork>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if payload.name.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "code": "invalid-name",
            "message": "name must not be empty"
        })));
    }
    // Stored normalized so allowlist matching stays an exact comparison.
    let ip: IpAddr = match payload.ip_address.parse() {
        Ok(ip) => ip,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "code": "invalid-ip",
                "message": "ip_address must be a valid IP"
            })));
        }
    };
    if let Some(anchor) = payload.anchor {
        if !anchor.is_valid() {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "code": "invalid-anchor",
                "message": "anchor must be a valid longitude/latitude pair"
            })));
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO office_networks (name, ip_address, anchor_lon, anchor_lat)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(ip.to_string())
    .bind(payload.anchor.map(|a| a.lon))
    .bind(payload.anchor.map(|a| a.lat))
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(done) => {
            registry::invalidate().await;
            info!(
                target: "audit",
                actor = auth.user_id,
                ip = %ip,
                name = %payload.name.trim(),
                "Office network registered"
            );
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "Office network registered",
                "id": done.last_insert_id()
            })))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(serde_json::json!({
                        "code": "duplicate-office-network",
                        "message": "This IP is already registered"
                    })));
                }
            }
            error!(error = %e, "Failed to register office network");
            Ok(HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "code": "store-unavailable",
                "message": "Please try again"
            })))
        }
    }
}

/// List registered office networks (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/v1/office-network",
    responses(
        (status = 200, description = "Registered office networks", body = [OfficeNetwork]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 503, description = "Transient failure, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "OfficeNetwork"
)]
pub async fn list_office_networks(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let networks = sqlx::query_as::<_, OfficeNetwork>(
        r#"
        SELECT id, name, ip_address, anchor_lon, anchor_lat, created_at
        FROM office_networks
        ORDER BY name ASC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list office networks");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(networks))
}

/// Remove a trusted office network (Admin)
#[utoipa::path(
    delete,
    path = "/api/v1/office-network/{id}",
    params(
        ("id" = u64, Path, description = "Office network to remove")
    ),
    responses(
        (status = 200, description = "Office network removed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Office network not found"),
        (status = 503, description = "Transient failure, retry")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "OfficeNetwork"
)]
pub async fn delete_office_network(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let id = path.into_inner();
    let result = sqlx::query("DELETE FROM office_networks WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, id, "Failed to delete office network");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Office network not found"
        })));
    }

    registry::invalidate().await;
    info!(target: "audit", actor = auth.user_id, id, "Office network removed");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Office network removed"
    })))
}
