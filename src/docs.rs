use crate::api::attendance::PunchPayload;
use crate::api::correction::SubmitCorrection;
use crate::api::office_network::CreateOfficeNetwork;
use crate::api::report::{LogResponse, RateResponse, RecordView, RosterResponse};
use crate::attendance::qr::QrIssuance;
use crate::model::attendance::{AttendanceRecord, Geolocation, TrustLevel, TrustReason, TrustResult};
use crate::model::correction::CorrectionRequest;
use crate::model::office_network::OfficeNetwork;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Time & Attendance Verification API",
        version = "1.0.0",
        description = r#"
## Time & Attendance Verification Engine

Verifies employee check-in/check-out events, records them with their
network/geolocation/device evidence, and derives attendance statistics.

### 🔹 Key Features
- **Punch Verification**
  - One check-in and one check-out per employee per day, idempotent under retries
  - Every punch carries a Trusted/Untrusted verdict against the registered office networks
- **QR-Mediated Check-In**
  - Time-scoped, employee-agnostic QR payloads for kiosk displays
- **Reporting**
  - Daily roster, per-employee history, daily and monthly attendance rates
- **Corrections**
  - Employee disputes resolved by HR with a full audit trail of amendments

### 🔐 Security
All endpoints are protected using **JWT Bearer authentication** issued by the
surrounding application. Reporting and administration require **HR** or
**Admin** roles.

### 📦 Response Format
- JSON-based RESTful responses
- Conflicts (double punches, double resolutions) return 409 with a stable `code`
- Transient failures return 503 and are always safe to retry

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,

        crate::api::qr::get_qr,

        crate::api::report::roster,
        crate::api::report::employee_log,
        crate::api::report::attendance_rate,

        crate::api::office_network::register_office_network,
        crate::api::office_network::list_office_networks,
        crate::api::office_network::delete_office_network,

        crate::api::correction::submit_correction,
        crate::api::correction::list_corrections,
        crate::api::correction::accept_correction,
        crate::api::correction::reject_correction
    ),
    components(
        schemas(
            PunchPayload,
            Geolocation,
            TrustLevel,
            TrustReason,
            TrustResult,
            AttendanceRecord,
            QrIssuance,
            RecordView,
            RosterResponse,
            LogResponse,
            RateResponse,
            OfficeNetwork,
            CreateOfficeNetwork,
            CorrectionRequest,
            SubmitCorrection
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Punch verification APIs"),
        (name = "Reports", description = "Roster, history, and rate APIs"),
        (name = "OfficeNetwork", description = "Trusted office network administration"),
        (name = "Correction", description = "Punch correction workflow"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
