//! Player handlers.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, header};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use treasure_hunt::ClueId;

use crate::http::{AppState, blocking, clear_flash_cookie, flash_cookie, take_flashes};
use crate::service::normalize_team_name;
use crate::views::{Flash, LeaderboardRow, PlayerOutcome, RedirectTarget};
use crate::HuntError;

/// Team-name form.
#[derive(Debug, Deserialize)]
pub struct StartForm {
    #[serde(default)]
    team_name: String,
}

/// Answer form.
#[derive(Debug, Deserialize)]
pub struct AnswerForm {
    #[serde(default)]
    answer: String,
}

/// Hint form. `seen` is the hint count the page showed and must be sent,
/// so a repeated post is caught as a duplicate.
#[derive(Debug, Deserialize)]
pub struct HintForm {
    seen: i32,
}

/// Identity page state.
#[derive(Debug, Serialize)]
pub struct IdentityPage {
    team: Option<String>,
    messages: Vec<Flash>,
}

pub async fn health() -> &'static str {
    "ok"
}

#[instrument(skip(state, headers))]
pub async fn identity(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let page = IdentityPage {
        team: state.signer().team_from(&headers),
        messages: take_flashes(&headers),
    };
    let shown = page.messages.clone();
    consume_flashes(&shown, Json(page).into_response())
}

#[instrument(skip(state, form))]
pub async fn start(
    State(state): State<AppState>,
    Form(form): Form<StartForm>,
) -> Result<Response, HuntError> {
    let raw = form.team_name.clone();
    let outcome = blocking(state.service(), move |service| service.start(&raw)).await?;

    let team_cookie = match (normalize_team_name(&form.team_name), outcome.target()) {
        (Some(name), Some(target)) if target != RedirectTarget::Identity => {
            Some(state.signer().team_cookie(&name))
        }
        _ => None,
    };
    Ok(respond(outcome, team_cookie, &[]))
}

#[instrument(skip(state, headers))]
pub async fn view_clue(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, HuntError> {
    let Some(clue_id) = clue_id_from(&raw_id) else {
        return Ok(out_of_range());
    };
    let team = state.signer().team_from(&headers);
    let outcome = blocking(state.service(), move |service| {
        service.view_clue(team.as_deref(), clue_id)
    })
    .await?;
    Ok(respond(outcome, None, &take_flashes(&headers)))
}

#[instrument(skip(state, headers, form))]
pub async fn submit(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    Form(form): Form<AnswerForm>,
) -> Result<Response, HuntError> {
    let Some(clue_id) = clue_id_from(&raw_id) else {
        return Ok(out_of_range());
    };
    let team = state.signer().team_from(&headers);
    let outcome = blocking(state.service(), move |service| {
        service.submit(team.as_deref(), clue_id, &form.answer)
    })
    .await?;
    Ok(respond(outcome, None, &[]))
}

#[instrument(skip(state, headers))]
pub async fn hint(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    Form(form): Form<HintForm>,
) -> Result<Response, HuntError> {
    let Some(clue_id) = clue_id_from(&raw_id) else {
        return Ok(out_of_range());
    };
    let team = state.signer().team_from(&headers);
    let outcome = blocking(state.service(), move |service| {
        service.hint(team.as_deref(), clue_id, Some(form.seen))
    })
    .await?;
    Ok(respond(outcome, None, &[]))
}

#[instrument(skip(state, headers))]
pub async fn skip(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, HuntError> {
    let Some(clue_id) = clue_id_from(&raw_id) else {
        return Ok(out_of_range());
    };
    let team = state.signer().team_from(&headers);
    let outcome = blocking(state.service(), move |service| {
        service.skip(team.as_deref(), clue_id)
    })
    .await?;
    Ok(respond(outcome, None, &[]))
}

#[instrument(skip(state))]
pub async fn leaderboard(
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardRow>>, HuntError> {
    let rows = blocking(state.service(), |service| service.leaderboard()).await?;
    Ok(Json(rows))
}

#[instrument(skip(state, headers))]
pub async fn finish(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, HuntError> {
    let team = state.signer().team_from(&headers);
    let mut summary = blocking(state.service(), move |service| {
        service.finish_summary(team.as_deref())
    })
    .await?;
    summary.messages = take_flashes(&headers);
    let messages = summary.messages.clone();
    Ok(consume_flashes(&messages, Json(summary).into_response()))
}

/// Parses a clue id from the path. Anything unparsable is out of range.
fn clue_id_from(raw: &str) -> Option<ClueId> {
    raw.trim().parse().ok()
}

fn out_of_range() -> Response {
    debug!("Clue id outside the valid range");
    respond(PlayerOutcome::redirect_silently(RedirectTarget::Finished), None, &[])
}

/// Turns a player outcome into a response.
///
/// Rendered clues pick up `pending` messages; redirects carry their own.
fn respond(outcome: PlayerOutcome, team_cookie: Option<String>, pending: &[Flash]) -> Response {
    match outcome {
        PlayerOutcome::Show(mut view) => {
            view.messages = pending.to_vec();
            consume_flashes(pending, Json(view).into_response())
        }
        PlayerOutcome::Redirect { target, flashes } => {
            let path = target.path();
            debug!(path = %path, flashes = flashes.len(), "Redirecting");
            let cookies: Vec<(HeaderName, String)> = team_cookie
                .into_iter()
                .chain(flash_cookie(&flashes))
                .map(|value| (header::SET_COOKIE, value))
                .collect();
            (AppendHeaders(cookies), Redirect::to(&path)).into_response()
        }
    }
}

/// Clears the flash cookie once its messages have been shown.
fn consume_flashes(shown: &[Flash], response: Response) -> Response {
    if shown.is_empty() {
        return response;
    }
    (
        AppendHeaders([(header::SET_COOKIE, clear_flash_cookie())]),
        response,
    )
        .into_response()
}
