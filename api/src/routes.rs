// Ingestion facade routes (spec §6, SPEC_FULL §2 "Ingestion adapter").
// Each handler deserializes its request, calls into `reward_core`, and
// serializes either the success body or the mapped `EngineError`.

use crate::app_state::AppState;
use crate::dto::{
    ActivityRequest, ActivityResponse, HealthResponse, ReferralLinkRequest, ReferralLinkResponse,
    UserStateResponse,
};
use crate::error_response::engine_error_response;
use actix_web::{get, post, web, HttpResponse, Responder};
use reward_core::collaborators::{EventFeatures, UserFeatures};
use reward_core::event::{ActivityEvent, Engagement};
use reward_core::ingestion::should_shed;
use reward_core::state::store::{ReferralStore, UserStore};
use reward_core::state::types::{EdgeDepth, ReferralEdge};
use reward_common::id::{EventId, UserId};
use reward_common::time::Clock;
use std::str::FromStr;
use std::sync::atomic::Ordering;

fn parse_user_id(raw: &str) -> Result<UserId, HttpResponse> {
    UserId::from_str(raw).map_err(|_| {
        HttpResponse::BadRequest().json(crate::dto::ErrorBody {
            error: "validation".to_string(),
            reason: Some("user_id must be 64 hex characters".to_string()),
            reset_at: None,
        })
    })
}

/// Referral code format (spec §6: `^[A-Z0-9]{6,12}$`).
fn is_valid_code(code: &str) -> bool {
    (6..=12).contains(&code.len()) && code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[post("/activity")]
pub async fn post_activity(state: web::Data<AppState>, body: web::Json<ActivityRequest>) -> impl Responder {
    let body = body.into_inner();
    let user_id = match parse_user_id(&body.user_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let cfg = state.config.current();
    let depth = state.in_flight.load(Ordering::Relaxed);
    if should_shed(body.kind, depth, cfg.queue_high_water) {
        return engine_error_response(&reward_common::error::EngineError::RateLimited {
            reset_at: state.clock.now() + 1,
        });
    }

    state.in_flight.fetch_add(1, Ordering::Relaxed);
    let result = handle_activity(&state, user_id, body).await;
    state.in_flight.fetch_sub(1, Ordering::Relaxed);
    result
}

async fn handle_activity(state: &AppState, user_id: UserId, body: ActivityRequest) -> HttpResponse {
    let now = state.clock.now();
    let content_ref = body.content_ref.clone().unwrap_or_default();
    let quality = state
        .quality_scorer
        .analyze(&content_ref, body.platform, body.kind)
        .await;

    let existing_user = state.stores.users.get(&user_id);
    let user_features = UserFeatures {
        account_age_days: existing_user
            .as_ref()
            .map(|u| (now.saturating_sub(u.last_active_at) / 86_400) as u32)
            .unwrap_or(0),
        kyc_verified: existing_user.as_ref().map(|u| u.kyc_verified).unwrap_or(false),
        historical_human_probability: existing_user.as_ref().map(|u| u.human_probability).unwrap_or(1.0),
    };
    let event_features = EventFeatures {
        kind: Some(body.kind),
        platform: Some(body.platform),
        content_fingerprint: content_ref.clone(),
        device_fingerprint: body.client_fingerprint.clone(),
        events_last_10_min: 0,
    };

    // Deterministic event id from the request's own identifying fields
    // so a client retry (same user/kind/content/device) lands on the
    // same id and is serviced idempotently by the coordinator (spec §8
    // "Idempotent retry").
    let id_key = format!(
        "{}:{}:{}:{}:{}",
        user_id, body.kind, body.platform, content_ref, body.client_fingerprint
    );
    let event = ActivityEvent {
        id: EventId::from_bytes_lossy(id_key.as_bytes()),
        user_id,
        kind: body.kind,
        platform: body.platform,
        quality_score: quality.quality,
        timestamp: now,
        external_ref: body.content_ref,
        engagement: Engagement {
            views: body.engagement.views,
            likes: body.engagement.likes,
            comments: body.engagement.comments,
            shares: body.engagement.shares,
        },
    };
    let event_id_hex = event.id.to_hex();

    match state.coordinator.credit(event, user_features, event_features).await {
        Ok(reward_core::coordinator::CreditOutcome::Credited {
            fin_delta,
            xp_delta,
            rp_delta,
            new_level,
            new_rp_tier,
            human_probability,
        }) => HttpResponse::Ok().json(ActivityResponse {
            event_id: event_id_hex,
            accepted: true,
            delta_fin: fin_delta,
            delta_xp: xp_delta,
            delta_rp: rp_delta,
            new_level: Some(new_level),
            new_rp_tier: Some(new_rp_tier),
            human_probability: Some(human_probability),
            reason: None,
        }),
        Ok(reward_core::coordinator::CreditOutcome::CapExceeded { reason }) => {
            HttpResponse::Ok().json(ActivityResponse {
                event_id: event_id_hex,
                accepted: true,
                delta_fin: 0.0,
                delta_xp: 0,
                delta_rp: 0,
                new_level: None,
                new_rp_tier: None,
                human_probability: None,
                reason: Some(reason),
            })
        }
        Ok(reward_core::coordinator::CreditOutcome::Replayed {
            fin_delta,
            xp_delta,
            rp_delta,
        }) => HttpResponse::Ok().json(ActivityResponse {
            event_id: event_id_hex,
            accepted: true,
            delta_fin: fin_delta,
            delta_xp: xp_delta,
            delta_rp: rp_delta,
            new_level: None,
            new_rp_tier: None,
            human_probability: None,
            reason: Some("idempotent_replay".to_string()),
        }),
        Err(err) => engine_error_response(&err),
    }
}

#[get("/user/{id}/state")]
pub async fn get_user_state(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let user_id = match parse_user_id(&path.into_inner()) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(user) = state.stores.users.get(&user_id) else {
        return HttpResponse::NotFound().json(crate::dto::ErrorBody {
            error: "not_found".to_string(),
            reason: Some("user has no recorded state yet".to_string()),
            reset_at: None,
        });
    };

    HttpResponse::Ok().json(UserStateResponse {
        user_id: user.id.to_hex(),
        fin_balance: user.fin_balance,
        total_xp: user.total_xp,
        total_rp: user.total_rp,
        level: user.level(),
        rp_tier: user.rp_tier(),
        xp_multiplier: reward_core::calculator::xp_level_multiplier(user.level()),
        rp_tier_multiplier: reward_core::calculator::rp_tier_multiplier(user.rp_tier()),
        pending_settlement_fin: user.pending_settlement_fin,
        eligibility: format!("{:?}", user.eligibility),
    })
}

#[post("/referral/link")]
pub async fn post_referral_link(state: web::Data<AppState>, body: web::Json<ReferralLinkRequest>) -> impl Responder {
    let body = body.into_inner();
    if !is_valid_code(&body.code) {
        return HttpResponse::BadRequest().json(ReferralLinkResponse {
            linked: false,
            reason: Some("code must match ^[A-Z0-9]{6,12}$".to_string()),
        });
    }
    let new_user_id = match parse_user_id(&body.new_user_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    // The referral code is the referrer's short public handle, mapped
    // into the 32-byte id space the same way test fixtures derive ids
    // from literal byte strings (reward_common::id::UserId::from_bytes_lossy).
    let referrer_id = UserId::from_bytes_lossy(body.code.as_bytes());
    if referrer_id == new_user_id {
        return HttpResponse::BadRequest().json(ReferralLinkResponse {
            linked: false,
            reason: Some("cannot refer yourself".to_string()),
        });
    }

    let now = state.clock.now();
    let linked = state.stores.referrals.insert(ReferralEdge {
        referrer_id,
        referred_id: new_user_id,
        depth: EdgeDepth::L1,
        created_at: now,
        active: true,
    });

    if linked {
        let mut user = state.stores.users.get_or_create(&new_user_id, now);
        user.referrer_id = Some(referrer_id);
        state.stores.users.put(user);
        HttpResponse::Ok().json(ReferralLinkResponse {
            linked: true,
            reason: None,
        })
    } else {
        HttpResponse::Ok().json(ReferralLinkResponse {
            linked: false,
            reason: Some("referral edge already exists or would create a cycle".to_string()),
        })
    }
}

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    let cfg = state.config.current();
    let depth = state.in_flight.load(Ordering::Relaxed);
    let body = HealthResponse {
        status: if depth < cfg.queue_high_water { "ok" } else { "saturated" },
        queue_depth: depth,
        queue_high_water: cfg.queue_high_water,
    };
    if depth < cfg.queue_high_water {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
