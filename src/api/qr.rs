use crate::attendance::qr::{self, QrIssuance};
use crate::auth::auth::AuthUser;
use crate::config::Config;
use actix_web::{HttpResponse, Responder, web};

/// Issue a fresh check-in QR payload
///
/// The payload is employee-agnostic: scanning only navigates the
/// authenticated client to the check-in screen.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/qr",
    responses(
        (status = 200, description = "Fresh QR issuance", body = QrIssuance),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn get_qr(
    _auth: AuthUser,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(qr::issue(&config.public_base_url, config.qr_ttl_secs)))
}
