use std::sync::Arc;
use rocket::{State, get, post, http::Status, serde::json::Json};
use rocket::request::{FromRequest, Outcome, Request};
use tracing::{debug, instrument, warn};
use shared::{models::*, election::ElectionConfig, user_info::UserInfo, validation::normalize_email};
use crate::{
    config::AppConfig,
    error::ApiError,
    mailer::Mailer,
    notifier::CredentialNotifier,
    processor::{BallotProcessor, ResultsAggregator},
    rate_limiter::RateLimiter,
    registry::Registry,
    store::Stores,
    utils::{codes_match, Clock},
    verifier::OtpVerifier,
};

const OTP_REQUESTS_PER_WINDOW: u32 = 3;
const OTP_REQUEST_WINDOW_MINUTES: i64 = 10;
const OTP_VERIFY_ATTEMPTS: u32 = 5;
const OTP_VERIFY_WINDOW_MINUTES: i64 = 10;
const BALLOT_ATTEMPTS: u32 = 5;
const BALLOT_WINDOW_MINUTES: i64 = 15;
const REGISTRATIONS_PER_WINDOW: u32 = 20;
const REGISTRATION_WINDOW_MINUTES: i64 = 60;

pub struct AppState {
    pub verifier: OtpVerifier,
    pub registry: Registry,
    pub ballots: BallotProcessor,
    pub results: ResultsAggregator,
    pub notifier: CredentialNotifier,
    pub otp_limiter: RateLimiter,
    pub verify_limiter: RateLimiter,
    pub ballot_limiter: RateLimiter,
    pub register_limiter: RateLimiter,
    pub election: Arc<ElectionConfig>,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(config: &AppConfig, stores: Stores, mailer: Arc<dyn Mailer>, clock: Arc<dyn Clock>) -> Self {
        let election = Arc::new(config.election.clone());

        Self {
            verifier: OtpVerifier::new(
                stores.voters.clone(),
                stores.challenges.clone(),
                mailer.clone(),
                clock.clone(),
                config.otp_ttl,
            ),
            registry: Registry::new(stores.voters.clone(), clock.clone()),
            ballots: BallotProcessor::new(
                stores.voters.clone(),
                stores.tallies.clone(),
                election.clone(),
                clock,
            ),
            results: ResultsAggregator::new(stores.tallies.clone(), election.clone()),
            notifier: CredentialNotifier::new(
                stores.voters,
                mailer,
                config.vote_url.clone(),
                config.batch_max_consecutive_failures,
                config.batch_send_delay,
            ),
            otp_limiter: RateLimiter::new(OTP_REQUESTS_PER_WINDOW, OTP_REQUEST_WINDOW_MINUTES),
            verify_limiter: RateLimiter::new(OTP_VERIFY_ATTEMPTS, OTP_VERIFY_WINDOW_MINUTES),
            ballot_limiter: RateLimiter::new(BALLOT_ATTEMPTS, BALLOT_WINDOW_MINUTES),
            register_limiter: RateLimiter::new(REGISTRATIONS_PER_WINDOW, REGISTRATION_WINDOW_MINUTES),
            election,
            admin_token: config.admin_token.clone(),
        }
    }
}

/// Bearer-token guard for the operator routes.
pub struct AdminAuth;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminAuth {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(state) = req.rocket().state::<AppState>() else {
            return Outcome::Error((Status::InternalServerError, ()));
        };

        let Some(expected) = state.admin_token.as_deref() else {
            warn!("Admin request rejected - ADMIN_TOKEN not configured");
            return Outcome::Error((Status::Forbidden, ()));
        };

        let provided = req.headers()
            .get_one("Authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim);

        match provided {
            Some(token) if codes_match(expected, token) => Outcome::Success(AdminAuth),
            _ => {
                debug!("Admin token mismatch");
                Outcome::Error((Status::Forbidden, ()))
            }
        }
    }
}

#[get("/health")]
pub fn health() -> &'static str {
    "ok"
}

#[get("/election")]
pub fn election(state: &State<AppState>) -> Json<ElectionConfig> {
    Json(state.election.as_ref().clone())
}

#[rocket::options("/<_..>")]
pub async fn all_options() -> Status {
    Status::Ok
}

#[instrument(skip_all)]
#[post("/otp", format = "json", data = "<request>")]
pub async fn request_otp(
    state: &State<AppState>,
    request: Json<OtpRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let email = normalize_email(&request.email);
    state.otp_limiter.check_rate_limit(&format!("otp:{}", email))?;

    state.verifier.issue(&email).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip_all)]
#[post("/otp/verify", format = "json", data = "<request>")]
pub async fn verify_otp(
    state: &State<AppState>,
    request: Json<VerifyOtpRequest>,
    user_info: UserInfo,
) -> Result<Json<VerifyOtpResponse>, ApiError> {
    let email = normalize_email(&request.email);
    state.verify_limiter.check_rate_limit(&format!("verify:{}:{}", user_info.user_fingerprint, email))?;

    let voting_code = state.verifier.verify(&email, &request.otp).await?;
    Ok(Json(VerifyOtpResponse {
        success: true,
        voting_code,
    }))
}

#[instrument(skip_all)]
#[post("/voters", format = "json", data = "<request>")]
pub async fn register_voter(
    state: &State<AppState>,
    request: Json<RegisterVoterRequest>,
    user_info: UserInfo,
) -> Result<(Status, Json<SuccessResponse>), ApiError> {
    state.register_limiter.check_rate_limit(&format!("register:{}", user_info.user_fingerprint))?;

    state.registry.register(&request).await?;
    Ok((Status::Created, Json(SuccessResponse::ok())))
}

#[instrument(skip_all)]
#[post("/ballot", format = "json", data = "<ballot>")]
pub async fn cast_ballot(
    state: &State<AppState>,
    ballot: Json<BallotRequest>,
    user_info: UserInfo,
) -> Result<Json<BallotResponse>, ApiError> {
    let ballot = ballot.into_inner();
    let rate_limit_key = format!(
        "ballot:{}:{}",
        user_info.user_fingerprint,
        normalize_email(&ballot.email)
    );
    state.ballot_limiter.check_rate_limit(&rate_limit_key)?;

    let voted_at = state.ballots.submit(&ballot.email, &ballot.code, &ballot.votes).await?;
    Ok(Json(BallotResponse {
        success: true,
        voted_at,
    }))
}

#[get("/results")]
pub async fn get_results(state: &State<AppState>) -> Result<Json<ElectionResults>, ApiError> {
    Ok(Json(state.results.results().await?))
}

#[get("/results/<position>")]
pub async fn get_position_results(
    state: &State<AppState>,
    position: &str,
) -> Result<Json<PositionResults>, ApiError> {
    Ok(Json(state.results.position(position).await?))
}

#[instrument(skip_all)]
#[post("/admin/send-voter-emails")]
pub async fn send_voter_emails(
    state: &State<AppState>,
    _admin: AdminAuth,
) -> Result<(Status, Json<BatchSummary>), ApiError> {
    let summary = state.notifier.send_pending().await?;
    let status = if summary.is_partial() {
        Status::MultiStatus
    } else {
        Status::Ok
    };
    Ok((status, Json(summary)))
}

#[get("/admin/stats")]
pub async fn admin_stats(
    state: &State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<VoterStats>, ApiError> {
    Ok(Json(state.notifier.stats().await?))
}
