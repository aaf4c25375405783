use crate::attendance::registry::RegistrySnapshot;
use crate::model::attendance::{Geolocation, TrustLevel, TrustReason, TrustResult};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// Deployment-wide enforcement mode. AuditOnly records the verdict on the
/// punch and lets it through; Strict rejects Untrusted punches outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum TrustPolicy {
    AuditOnly,
    Strict,
}

#[derive(Debug, Clone, Copy)]
pub struct TrustConfig {
    pub policy: TrustPolicy,
    pub geo_radius_m: f64,
    pub dev_trust_loopback: bool,
}

impl TrustConfig {
    /// Whether the configured policy refuses this verdict. Evaluation
    /// itself is policy-blind; only enforcement consults it.
    pub fn rejects(&self, verdict: &TrustResult) -> bool {
        self.policy == TrustPolicy::Strict && !verdict.is_trusted()
    }
}

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters.
pub fn haversine_m(a: Geolocation, b: Geolocation) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.sqrt().asin() * EARTH_RADIUS_M
}

/// Client address as reported by the transport, either bare or host:port.
pub fn parse_client_ip(raw: &str) -> Option<IpAddr> {
    IpAddr::from_str(raw)
        .ok()
        .or_else(|| SocketAddr::from_str(raw).ok().map(|s| s.ip()))
}

/// Pure trust decision. The same inputs against the same snapshot always
/// yield the same verdict; malformed evidence counts as absent, never as
/// an error.
pub fn evaluate(
    snapshot: &RegistrySnapshot,
    cfg: &TrustConfig,
    ip: Option<IpAddr>,
    geo: Option<Geolocation>,
) -> TrustResult {
    if let Some(addr) = ip {
        if cfg.dev_trust_loopback && addr.is_loopback() {
            return TrustResult {
                level: TrustLevel::Trusted,
                reason: TrustReason::DevLoopback,
            };
        }
        if snapshot.contains_ip(&addr) {
            return TrustResult {
                level: TrustLevel::Trusted,
                reason: TrustReason::NetworkAllowlist,
            };
        }
    }

    if let Some(geo) = geo.filter(|g| g.is_valid()) {
        for office in snapshot.anchors() {
            if let Some(anchor) = office.anchor {
                if haversine_m(geo, anchor) <= cfg.geo_radius_m {
                    return TrustResult {
                        level: TrustLevel::Trusted,
                        reason: TrustReason::GeoProximity,
                    };
                }
            }
        }
    }

    TrustResult {
        level: TrustLevel::Untrusted,
        reason: TrustReason::NoMatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::registry::OfficeAnchor;

    const HQ: Geolocation = Geolocation {
        lon: 90.4125,
        lat: 23.8103,
    };

    fn snapshot() -> RegistrySnapshot {
        RegistrySnapshot::new(vec![
            OfficeAnchor {
                ip: "203.0.113.17".parse().unwrap(),
                anchor: Some(HQ),
            },
            OfficeAnchor {
                ip: "198.51.100.4".parse().unwrap(),
                anchor: None,
            },
        ])
    }

    fn cfg() -> TrustConfig {
        TrustConfig {
            policy: TrustPolicy::AuditOnly,
            geo_radius_m: 300.0,
            dev_trust_loopback: false,
        }
    }

    #[test]
    fn registered_ip_is_trusted_by_allowlist() {
        let verdict = evaluate(&snapshot(), &cfg(), "203.0.113.17".parse().ok(), None);
        assert_eq!(verdict.level, TrustLevel::Trusted);
        assert_eq!(verdict.reason, TrustReason::NetworkAllowlist);
    }

    #[test]
    fn nearby_geolocation_is_trusted_by_proximity() {
        // ~100 m north of the HQ anchor.
        let near = Geolocation {
            lon: HQ.lon,
            lat: HQ.lat + 0.0009,
        };
        let verdict = evaluate(&snapshot(), &cfg(), "192.0.2.9".parse().ok(), Some(near));
        assert_eq!(verdict.level, TrustLevel::Trusted);
        assert_eq!(verdict.reason, TrustReason::GeoProximity);
    }

    #[test]
    fn far_geolocation_and_unknown_ip_is_untrusted() {
        let far = Geolocation {
            lon: HQ.lon + 1.0,
            lat: HQ.lat,
        };
        let verdict = evaluate(&snapshot(), &cfg(), "192.0.2.9".parse().ok(), Some(far));
        assert_eq!(verdict.level, TrustLevel::Untrusted);
        assert_eq!(verdict.reason, TrustReason::NoMatch);
    }

    #[test]
    fn missing_evidence_is_untrusted_not_an_error() {
        let verdict = evaluate(&snapshot(), &cfg(), None, None);
        assert_eq!(verdict.level, TrustLevel::Untrusted);
        assert_eq!(verdict.reason, TrustReason::NoMatch);
    }

    #[test]
    fn out_of_range_geolocation_counts_as_absent() {
        let bogus = Geolocation {
            lon: 500.0,
            lat: 23.8,
        };
        let verdict = evaluate(&snapshot(), &cfg(), None, Some(bogus));
        assert_eq!(verdict.reason, TrustReason::NoMatch);

        let nan = Geolocation {
            lon: f64::NAN,
            lat: f64::NAN,
        };
        let verdict = evaluate(&snapshot(), &cfg(), None, Some(nan));
        assert_eq!(verdict.reason, TrustReason::NoMatch);
    }

    #[test]
    fn loopback_short_circuit_requires_dev_flag() {
        let loopback = "127.0.0.1".parse().ok();

        let verdict = evaluate(&snapshot(), &cfg(), loopback, None);
        assert_eq!(verdict.level, TrustLevel::Untrusted);

        let dev = TrustConfig {
            dev_trust_loopback: true,
            ..cfg()
        };
        let verdict = evaluate(&snapshot(), &dev, loopback, None);
        assert_eq!(verdict.level, TrustLevel::Trusted);
        assert_eq!(verdict.reason, TrustReason::DevLoopback);
    }

    #[test]
    fn only_strict_policy_rejects_untrusted_verdicts() {
        let untrusted = evaluate(&snapshot(), &cfg(), None, None);
        assert!(!cfg().rejects(&untrusted));

        let strict = TrustConfig {
            policy: TrustPolicy::Strict,
            ..cfg()
        };
        assert!(strict.rejects(&untrusted));

        let trusted = evaluate(&snapshot(), &strict, "203.0.113.17".parse().ok(), None);
        assert!(!strict.rejects(&trusted));
    }

    #[test]
    fn evaluation_is_deterministic_for_a_fixed_snapshot() {
        let snap = snapshot();
        let ip = "203.0.113.17".parse().ok();
        let first = evaluate(&snap, &cfg(), ip, Some(HQ));
        let second = evaluate(&snap, &cfg(), ip, Some(HQ));
        assert_eq!(first, second);
    }

    #[test]
    fn haversine_of_identical_points_is_zero() {
        assert!(haversine_m(HQ, HQ) < 1e-6);
    }

    #[test]
    fn client_ip_parses_bare_and_socket_forms() {
        assert!(parse_client_ip("203.0.113.17").is_some());
        assert!(parse_client_ip("203.0.113.17:44312").is_some());
        assert!(parse_client_ip("::1").is_some());
        assert!(parse_client_ip("not-an-ip").is_none());
    }
}
