// EngineError -> HTTP status mapping (spec §7 "Propagation policy",
// SPEC_FULL §7 "the HTTP facade maps each variant to a status code").

use crate::dto::ErrorBody;
use actix_web::{http::header, HttpResponse};
use reward_common::error::EngineError;

pub fn engine_error_response(err: &EngineError) -> HttpResponse {
    match err {
        EngineError::Validation { reason } => HttpResponse::BadRequest().json(ErrorBody {
            error: "validation".to_string(),
            reason: Some(reason.clone()),
            reset_at: None,
        }),
        EngineError::RateLimited { reset_at } => HttpResponse::TooManyRequests()
            .insert_header((header::RETRY_AFTER, reset_at.to_string()))
            .json(ErrorBody {
                error: "rate_limited".to_string(),
                reason: None,
                reset_at: Some(*reset_at),
            }),
        EngineError::AntiBotRejected { reason_code } => HttpResponse::Forbidden().json(ErrorBody {
            error: "anti_bot_rejected".to_string(),
            reason: Some(reason_code.clone()),
            reset_at: None,
        }),
        EngineError::CapExceeded { reason } => HttpResponse::Ok().json(ErrorBody {
            error: "cap_exceeded".to_string(),
            reason: Some(reason.clone()),
            reset_at: None,
        }),
        EngineError::Conflict => HttpResponse::Ok().json(ErrorBody {
            error: "conflict_replayed".to_string(),
            reason: None,
            reset_at: None,
        }),
        EngineError::TransientFailure { reason } => {
            log::warn!("transient failure surfaced to caller: {reason}");
            HttpResponse::ServiceUnavailable().json(ErrorBody {
                error: "transient_failure".to_string(),
                reason: Some(reason.clone()),
                reset_at: None,
            })
        }
        EngineError::Internal { reason } => {
            log::error!("internal invariant violated: {reason}");
            HttpResponse::InternalServerError().json(ErrorBody {
                error: "internal".to_string(),
                reason: Some(reason.clone()),
                reset_at: None,
            })
        }
    }
}
