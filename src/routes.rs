use crate::{
    api::{attendance, correction, office_network, qr, report},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter config
    fn build_limiter(requests_per_min: u32) -> GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap()
    }

    let punch_limiter = build_limiter(config.rate_punch_per_min);
    let report_limiter = build_limiter(config.rate_report_per_min);
    let admin_limiter = build_limiter(config.rate_admin_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/attendance")
                    // /attendance — the punch endpoints
                    .service(
                        web::resource("")
                            .wrap(Governor::new(&punch_limiter))
                            .route(web::post().to(attendance::check_in))
                            .route(web::put().to(attendance::check_out)),
                    )
                    // /attendance/qr
                    .service(
                        web::resource("/qr")
                            .wrap(Governor::new(&report_limiter))
                            .route(web::get().to(qr::get_qr)),
                    )
                    // /attendance/roster
                    .service(
                        web::resource("/roster")
                            .wrap(Governor::new(&report_limiter))
                            .route(web::get().to(report::roster)),
                    )
                    // /attendance/log
                    .service(
                        web::resource("/log")
                            .wrap(Governor::new(&report_limiter))
                            .route(web::get().to(report::employee_log)),
                    )
                    // /attendance/rate
                    .service(
                        web::resource("/rate")
                            .wrap(Governor::new(&report_limiter))
                            .route(web::get().to(report::attendance_rate)),
                    )
                    .service(
                        web::scope("/correction")
                            .wrap(Governor::new(&report_limiter))
                            // /attendance/correction
                            .service(
                                web::resource("")
                                    .route(web::post().to(correction::submit_correction))
                                    .route(web::get().to(correction::list_corrections)),
                            )
                            // /attendance/correction/{id}/accept
                            .service(
                                web::resource("/{id}/accept")
                                    .route(web::put().to(correction::accept_correction)),
                            )
                            // /attendance/correction/{id}/reject
                            .service(
                                web::resource("/{id}/reject")
                                    .route(web::put().to(correction::reject_correction)),
                            ),
                    ),
            )
            .service(
                web::scope("/office-network")
                    .wrap(Governor::new(&admin_limiter))
                    // /office-network
                    .service(
                        web::resource("")
                            .route(web::post().to(office_network::register_office_network))
                            .route(web::get().to(office_network::list_office_networks)),
                    )
                    // /office-network/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::delete().to(office_network::delete_office_network)),
                    ),
            ),
    );
}
