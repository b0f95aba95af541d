//! Single binary web server: JSON API over the tournament core.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. Override with env: HOST, PORT (see `Config`).
//! Set DATA_FILE to keep tournaments across restarts.

use actix_session::{storage::CookieSessionStore, Session, SessionMiddleware};
use actix_web::{
    cookie::Key,
    delete, get,
    http::StatusCode,
    post, put,
    web::{self, Data, Json, Path, Query},
    App, HttpResponse, HttpServer, Responder,
};
use serde::{Deserialize, Serialize};
use sports_tournament_web::{
    fixtures_to_csv, Actor, ApprovalStatus, Config, ErrorKind, FixtureId, GenerationRequest,
    LocalStore, NewTeam, NewTournament, ParameterCollector, TeamId, TournamentError,
    TournamentId, TournamentService, UserId,
};
use std::time::Duration;

type Service = TournamentService<LocalStore>;

struct AppState {
    service: Service,
    store_timeout: Duration,
}

type State = Data<AppState>;

/// Session key holding the signed-in user id.
const USER_KEY: &str = "user_id";
/// Conversation history kept in the session cookie (cookie size is limited).
const SESSION_TRANSCRIPT_LEN: usize = 6;
const MAX_MESSAGE_LEN: usize = 280;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize, Serialize)]
struct SessionBody {
    user_id: UserId,
}

#[derive(Deserialize)]
struct ReasonBody {
    reason: String,
}

#[derive(Deserialize)]
struct ResultBody {
    team_1_score: u32,
    team_2_score: u32,
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Deserialize)]
struct TeamFilter {
    approval_status: Option<ApprovalStatus>,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

#[derive(Deserialize)]
struct TeamPath {
    team_id: TeamId,
}

#[derive(Deserialize)]
struct FixturePath {
    fixture_id: FixtureId,
}

fn error_response(e: &TournamentError) -> HttpResponse {
    let status = match e.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::State => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Persistence => StatusCode::SERVICE_UNAVAILABLE,
    };
    HttpResponse::build(status).json(serde_json::json!({ "error": e.to_string(), "kind": e.kind() }))
}

fn actor(session: &Session) -> Result<Actor, HttpResponse> {
    match session.get::<UserId>(USER_KEY) {
        Ok(Some(user_id)) => Ok(Actor::new(user_id)),
        _ => Err(HttpResponse::Unauthorized().json(serde_json::json!({ "error": "Sign in first" }))),
    }
}

/// Run a core call on the blocking pool, bounded by the store timeout.
async fn run<T, F>(state: &State, op: F) -> Result<T, HttpResponse>
where
    F: FnOnce(&Service) -> Result<T, TournamentError> + Send + 'static,
    T: Send + 'static,
{
    let shared = state.clone();
    let task = web::block(move || op(&shared.service));
    match tokio::time::timeout(state.store_timeout, task).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => Err(error_response(&e)),
        Ok(Err(_)) => Err(HttpResponse::InternalServerError().json(serde_json::json!({ "error": "worker error" }))),
        Err(_) => {
            log::warn!("store call exceeded {:?}", state.store_timeout);
            Err(HttpResponse::GatewayTimeout()
                .json(serde_json::json!({ "error": "Storage timed out", "kind": ErrorKind::Persistence })))
        }
    }
}

fn respond<T: Serialize>(result: Result<T, HttpResponse>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(resp) => resp,
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "sports-tournament-web",
    })
}

/// Sign in as a user id (identity itself is handled elsewhere; this only sets the session).
#[post("/api/session")]
async fn api_sign_in(session: Session, body: Json<SessionBody>) -> HttpResponse {
    session.renew();
    match session.insert(USER_KEY, body.user_id) {
        Ok(()) => HttpResponse::Ok().json(SessionBody { user_id: body.user_id }),
        Err(_) => HttpResponse::InternalServerError().json(serde_json::json!({ "error": "session error" })),
    }
}

#[delete("/api/session")]
async fn api_sign_out(session: Session) -> HttpResponse {
    session.purge();
    HttpResponse::NoContent().finish()
}

/// Create a tournament organized by the signed-in user.
#[post("/api/tournaments")]
async fn api_create_tournament(state: State, session: Session, body: Json<NewTournament>) -> HttpResponse {
    let actor = match actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let input = body.into_inner();
    respond(run(&state, move |svc| svc.create_tournament(actor, input)).await)
}

#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: State, path: Path<TournamentPath>) -> HttpResponse {
    let id = path.id;
    respond(run(&state, move |svc| svc.tournament(id)).await)
}

/// Cancel a tournament (organizer only, reason required).
#[post("/api/tournaments/{id}/cancel")]
async fn api_cancel_tournament(
    state: State,
    session: Session,
    path: Path<TournamentPath>,
    body: Json<ReasonBody>,
) -> HttpResponse {
    let actor = match actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let id = path.id;
    let reason = body.into_inner().reason;
    respond(run(&state, move |svc| svc.cancel_tournament(actor, id, &reason)).await)
}

/// Register a team (no sign-in needed; the organizer approves it later).
#[post("/api/tournaments/{id}/teams")]
async fn api_register_team(state: State, path: Path<TournamentPath>, body: Json<NewTeam>) -> HttpResponse {
    let id = path.id;
    let input = body.into_inner();
    respond(run(&state, move |svc| svc.register_team(id, input)).await)
}

/// List teams, optionally `?approval_status=pending|approved|rejected`.
#[get("/api/tournaments/{id}/teams")]
async fn api_list_teams(state: State, path: Path<TournamentPath>, query: Query<TeamFilter>) -> HttpResponse {
    let id = path.id;
    let filter = query.approval_status;
    respond(run(&state, move |svc| svc.list_teams(id, filter)).await)
}

/// Approved teams in pairing order.
#[get("/api/tournaments/{id}/teams/approved")]
async fn api_list_approved_teams(state: State, path: Path<TournamentPath>) -> HttpResponse {
    let id = path.id;
    respond(run(&state, move |svc| svc.list_approved_teams(id)).await)
}

#[post("/api/teams/{team_id}/approve")]
async fn api_approve_team(state: State, session: Session, path: Path<TeamPath>) -> HttpResponse {
    let actor = match actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let team_id = path.team_id;
    respond(run(&state, move |svc| svc.approve_team(actor, team_id)).await)
}

#[post("/api/teams/{team_id}/reject")]
async fn api_reject_team(
    state: State,
    session: Session,
    path: Path<TeamPath>,
    body: Json<ReasonBody>,
) -> HttpResponse {
    let actor = match actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let team_id = path.team_id;
    let reason = body.into_inner().reason;
    respond(run(&state, move |svc| svc.reject_team(actor, team_id, &reason)).await)
}

#[post("/api/teams/{team_id}/withdraw")]
async fn api_withdraw_team(state: State, session: Session, path: Path<TeamPath>) -> HttpResponse {
    let actor = match actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let team_id = path.team_id;
    respond(run(&state, move |svc| svc.withdraw_team(actor, team_id)).await)
}

/// Generate fixtures. Body is optional; send the same `key` when retrying a request.
#[post("/api/tournaments/{id}/fixtures/generate")]
async fn api_generate_fixtures(
    state: State,
    session: Session,
    path: Path<TournamentPath>,
    body: web::Bytes,
) -> HttpResponse {
    let actor = match actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let id = path.id;
    let request = match GenerationRequest::from_body(&body) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };
    respond(run(&state, move |svc| svc.request_fixture_generation(actor, id, &request)).await)
}

/// Administrative reset: clear the fixture set so it can be generated again.
#[post("/api/tournaments/{id}/fixtures/reset")]
async fn api_reset_fixtures(state: State, session: Session, path: Path<TournamentPath>) -> HttpResponse {
    let actor = match actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let id = path.id;
    respond(
        run(&state, move |svc| svc.reset_fixtures(actor, id))
            .await
            .map(|removed| serde_json::json!({ "removed": removed })),
    )
}

#[get("/api/tournaments/{id}/fixtures")]
async fn api_list_fixtures(state: State, path: Path<TournamentPath>) -> HttpResponse {
    let id = path.id;
    respond(run(&state, move |svc| svc.fixtures(id)).await)
}

#[get("/api/tournaments/{id}/fixtures.csv")]
async fn api_export_fixtures(state: State, path: Path<TournamentPath>) -> HttpResponse {
    let id = path.id;
    let csv = run(&state, move |svc| {
        let fixtures = svc.fixtures(id)?;
        let teams = svc.list_teams(id, None)?;
        fixtures_to_csv(&fixtures, &teams)
    })
    .await;
    match csv {
        Ok(body) => HttpResponse::Ok().content_type("text/csv; charset=utf-8").body(body),
        Err(resp) => resp,
    }
}

#[post("/api/tournaments/{id}/start")]
async fn api_start_tournament(state: State, session: Session, path: Path<TournamentPath>) -> HttpResponse {
    let actor = match actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let id = path.id;
    respond(run(&state, move |svc| svc.start_tournament(actor, id)).await)
}

#[post("/api/tournaments/{id}/complete")]
async fn api_complete_tournament(state: State, session: Session, path: Path<TournamentPath>) -> HttpResponse {
    let actor = match actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let id = path.id;
    respond(run(&state, move |svc| svc.complete_tournament(actor, id)).await)
}

#[put("/api/fixtures/{fixture_id}/result")]
async fn api_record_result(
    state: State,
    session: Session,
    path: Path<FixturePath>,
    body: Json<ResultBody>,
) -> HttpResponse {
    let actor = match actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let fixture_id = path.fixture_id;
    let ResultBody { team_1_score, team_2_score } = body.into_inner();
    respond(
        run(&state, move |svc| {
            svc.record_fixture_result(actor, fixture_id, team_1_score, team_2_score)
        })
        .await,
    )
}

/// Conversational fixture setup. The collector state lives in the session, per tournament.
#[post("/api/tournaments/{id}/assistant")]
async fn api_assistant(
    state: State,
    session: Session,
    path: Path<TournamentPath>,
    body: Json<MessageBody>,
) -> HttpResponse {
    let actor = match actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let message = body.into_inner().message;
    if message.trim().is_empty() || message.chars().count() > MAX_MESSAGE_LEN {
        return error_response(&TournamentError::Validation(format!(
            "message must be 1 to {} characters",
            MAX_MESSAGE_LEN
        )));
    }
    let id = path.id;
    let key = format!("assistant:{}", id);
    let mut collector = session
        .get::<ParameterCollector>(&key)
        .ok()
        .flatten()
        .unwrap_or_default();

    let result = run(&state, move |svc| {
        svc.tournament(id)?;
        let reply = collector.handle(&message, |request| {
            svc.request_fixture_generation(actor, id, request)
                .map(|outcome| outcome.fixtures.len())
        });
        Ok((collector, reply))
    })
    .await;

    match result {
        Ok((mut collector, reply)) => {
            collector.keep_recent(SESSION_TRANSCRIPT_LEN);
            if session.insert(&key, &collector).is_err() {
                log::warn!("could not store assistant state for tournament {}", id);
            }
            HttpResponse::Ok().json(reply)
        }
        Err(resp) => resp,
    }
}

/// Forget the conversation for a tournament.
#[delete("/api/tournaments/{id}/assistant")]
async fn api_reset_assistant(session: Session, path: Path<TournamentPath>) -> HttpResponse {
    session.remove(&format!("assistant:{}", path.id));
    HttpResponse::NoContent().finish()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    let store = match &config.data_file {
        Some(path) => LocalStore::open(path).map_err(std::io::Error::other)?,
        None => LocalStore::in_memory(),
    };
    let service = TournamentService::new(store)
        .with_retry(config.retry.clone())
        .with_bye_policy(config.bye_policy);
    let state = Data::new(AppState {
        service,
        store_timeout: config.store_timeout,
    });
    let session_key = Key::generate();

    log::info!("Starting server at http://{}:{}", config.host, config.port);
    if config.data_file.is_none() {
        log::warn!("DATA_FILE not set; tournaments are kept in memory only");
    }

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                    .cookie_secure(false)
                    .build(),
            )
            .service(api_health)
            .service(api_sign_in)
            .service(api_sign_out)
            .service(api_create_tournament)
            .service(api_get_tournament)
            .service(api_cancel_tournament)
            .service(api_register_team)
            .service(api_list_teams)
            .service(api_list_approved_teams)
            .service(api_approve_team)
            .service(api_reject_team)
            .service(api_withdraw_team)
            .service(api_generate_fixtures)
            .service(api_reset_fixtures)
            .service(api_export_fixtures)
            .service(api_list_fixtures)
            .service(api_start_tournament)
            .service(api_complete_tournament)
            .service(api_record_result)
            .service(api_assistant)
            .service(api_reset_assistant)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
