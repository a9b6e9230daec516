use crate::{
    api::{
        self, ApiError, CreatePollRequest, Identity, PollResponse, PollsResponse,
        StatsResponse, VoteRequest, VoteResponse, VoteStatusResponse,
    },
    db::{poll::PollId, poll_option::OptionId, PollStore},
    error::PollError,
    services::{self, NewPoll},
};
use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracing::info_span;
use tracing_futures::Instrument;

type Store = web::Data<dyn PollStore>;

/// Wraps a store so handlers can extract it as `web::Data<dyn PollStore>`.
pub fn store_data(store: Arc<dyn PollStore>) -> Store {
    web::Data::from(store)
}

async fn list_polls(store: Store) -> Result<HttpResponse, ApiError> {
    let polls = services::list_polls(store.get_ref())
        .instrument(info_span!("list_polls_request"))
        .await?;
    Ok(HttpResponse::Ok().json(PollsResponse { polls }))
}

async fn create_poll(
    store: Store,
    identity: Identity,
    body: web::Json<CreatePollRequest>,
) -> Result<HttpResponse, ApiError> {
    let CreatePollRequest {
        title,
        description,
        options,
    } = body.into_inner();
    let new_poll = NewPoll {
        title,
        description,
        options,
    };
    let Identity(user_id) = identity;
    let span = info_span!("create_poll_request", user_id = %user_id);
    let poll = services::create_poll(store.get_ref(), new_poll, user_id)
        .instrument(span)
        .await?;
    Ok(HttpResponse::Created().json(PollResponse { poll }))
}

async fn poll_stats(store: Store) -> Result<HttpResponse, ApiError> {
    let stats = services::poll_stats(store.get_ref())
        .instrument(info_span!("poll_stats_request"))
        .await?;
    Ok(HttpResponse::Ok().json(StatsResponse { stats }))
}

async fn get_poll(store: Store, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let poll_id: PollId = api::parse_id("pollId", &path, "Invalid poll ID")?;
    let poll = services::get_poll(store.get_ref(), &poll_id)
        .instrument(info_span!("get_poll_request", poll_id = %poll_id))
        .await?
        .ok_or(PollError::NotFound)?;
    Ok(HttpResponse::Ok().json(PollResponse { poll }))
}

async fn cast_vote(
    store: Store,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<VoteRequest>,
) -> Result<HttpResponse, ApiError> {
    let poll_id: PollId = api::parse_id("pollId", &path, "Invalid poll ID")?;
    let option_id: OptionId = api::parse_id("optionId", &body.option_id, "Invalid option ID")?;
    let Identity(user_id) = identity;
    let span = info_span!("cast_vote_request", poll_id = %poll_id, user_id = %user_id);
    services::cast_vote(store.get_ref(), &poll_id, &option_id, &user_id)
        .instrument(span)
        .await?;
    Ok(HttpResponse::Ok().json(VoteResponse { success: true }))
}

async fn vote_status(
    store: Store,
    identity: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let poll_id: PollId = api::parse_id("pollId", &path, "Invalid poll ID")?;
    let Identity(user_id) = identity;
    let has_voted = services::has_voted(store.get_ref(), &poll_id, &user_id)
        .instrument(info_span!("vote_status_request", poll_id = %poll_id))
        .await?;
    Ok(HttpResponse::Ok().json(VoteStatusResponse { has_voted }))
}

/// Registers the poll API. The store itself is supplied by the caller through
/// [`store_data`] so each app instance is explicit about which store it uses.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(api::json_error))
        .service(
            web::scope("/api/polls")
                .service(
                    web::resource("")
                        .route(web::get().to(list_polls))
                        .route(web::post().to(create_poll)),
                )
                .service(web::resource("/stats").route(web::get().to(poll_stats)))
                .service(web::resource("/{id}").route(web::get().to(get_poll)))
                .service(
                    web::resource("/{id}/vote")
                        .route(web::post().to(cast_vote))
                        .route(web::get().to(vote_status)),
                ),
        );
}
