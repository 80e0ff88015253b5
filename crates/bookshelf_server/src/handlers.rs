//! Request handlers: one function per method + path.
//!
//! # Responsibility
//! - Translate form/query input into catalogue calls.
//! - Keep cover files in step with the records that reference them.
//! - Pick the page or redirect to send back.
//!
//! # Invariants
//! - Catalogue and file work runs on the blocking pool, never on a runtime worker.
//! - Successful writes answer `303 See Other` to `/collection`.
//! - A failed write leaves no new cover file behind.

use crate::covers::CoverStore;
use crate::error::AppError;
use crate::views::{self, FormMode};
use axum::async_trait;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use bookshelf_core::{BookDraft, BookId, BookSort, Catalogue, CatalogueResult};
use log::{error, info, warn};
use maud::Markup;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub catalogue: Arc<Catalogue>,
    pub covers: Arc<CoverStore>,
}

impl AppState {
    pub fn new(catalogue: Catalogue, covers: CoverStore) -> Self {
        Self {
            catalogue: Arc::new(catalogue),
            covers: Arc::new(covers),
        }
    }
}

/// Submitted add/edit text fields. Missing fields arrive as empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub edition: String,
    pub genre: String,
    pub hover_note: String,
}

impl From<BookForm> for BookDraft {
    fn from(form: BookForm) -> Self {
        Self {
            title: form.title,
            author: form.author,
            edition: form.edition,
            genre: form.genre,
            hover_note: form.hover_note,
            cover_filename: None,
        }
    }
}

/// Uploaded cover as received, before it is stored.
#[derive(Debug)]
pub struct CoverUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Add/edit request body.
///
/// The pages post `multipart/form-data`; urlencoded bodies are accepted too
/// and never carry a cover. An empty file input counts as no cover.
#[derive(Debug, Default)]
pub struct BookSubmission {
    pub form: BookForm,
    pub cover: Option<CoverUpload>,
}

#[async_trait]
impl<S> FromRequest<S> for BookSubmission
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(form) = Form::<BookForm>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self { form, cover: None });
        }

        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(IntoResponse::into_response)?;
        read_multipart(multipart)
            .await
            .map_err(IntoResponse::into_response)
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<BookSubmission, MultipartError> {
    let mut submission = BookSubmission::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "cover" {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let bytes = field.bytes().await?;
            if !file_name.is_empty() && !bytes.is_empty() {
                submission.cover = Some(CoverUpload { file_name, bytes });
            }
            continue;
        }

        let value = field.text().await?;
        let form = &mut submission.form;
        match name.as_str() {
            "title" => form.title = value,
            "author" => form.author = value,
            "edition" => form.edition = value,
            "genre" => form.genre = value,
            "hover_note" => form.hover_note = value,
            _ => {}
        }
    }
    Ok(submission)
}

/// `/collection` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionParams {
    pub sort: Option<String>,
}

pub async fn intro() -> Markup {
    views::intro()
}

pub async fn home(State(state): State<AppState>) -> Result<Markup, AppError> {
    let covers = Arc::clone(&state.covers);
    let (total, has_collage) = with_catalogue(&state, move |catalogue| {
        Ok((catalogue.count()?, covers.has_collage()))
    })
    .await?;
    Ok(views::home(total, has_collage))
}

pub async fn add_form() -> Markup {
    views::book_form(FormMode::Add, &BookDraft::default(), None)
}

pub async fn add_submit(State(state): State<AppState>, submission: BookSubmission) -> Response {
    let BookSubmission { form, cover } = submission;
    let submitted = BookDraft::from(form);
    let uploaded = match save_cover(&state, cover).await {
        Ok(uploaded) => uploaded,
        Err(err) => return finish_write(Err::<(), _>(err), FormMode::Add, &submitted),
    };

    let draft = BookDraft {
        cover_filename: uploaded.clone(),
        ..submitted.clone()
    };
    let result = with_catalogue(&state, move |catalogue| catalogue.add(&draft)).await;

    let stale = if result.is_ok() { None } else { uploaded };
    settle_covers(&state, stale, result.is_ok()).await;
    finish_write(result, FormMode::Add, &submitted)
}

pub async fn collection(
    State(state): State<AppState>,
    Query(params): Query<CollectionParams>,
) -> Result<Markup, AppError> {
    let sort = BookSort::from_key(params.sort.as_deref().unwrap_or_default());
    let books = with_catalogue(&state, move |catalogue| catalogue.list_sorted(sort)).await?;
    Ok(views::collection(&books, sort))
}

pub async fn edit_form(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Markup, AppError> {
    let id = parse_book_id(raw_id)?;
    let book = with_catalogue(&state, move |catalogue| catalogue.get(id)).await?;
    Ok(views::book_form(FormMode::Edit(id), &book.to_draft(), None))
}

pub async fn edit_submit(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    submission: BookSubmission,
) -> Response {
    let id = match parse_book_id(raw_id) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };
    let BookSubmission { form, cover } = submission;
    let submitted = BookDraft::from(form);
    let uploaded = match save_cover(&state, cover).await {
        Ok(uploaded) => uploaded,
        Err(err) => return finish_write(Err::<(), _>(err), FormMode::Edit(id), &submitted),
    };

    let draft = BookDraft {
        cover_filename: uploaded.clone(),
        ..submitted.clone()
    };
    let result = with_catalogue(&state, move |catalogue| {
        let previous = catalogue.get(id)?.cover_filename;
        catalogue.update(id, &draft)?;
        Ok(previous)
    })
    .await;

    // A new upload retires the previous file; a failed write retires the upload.
    let succeeded = result.is_ok();
    let stale = match &result {
        Ok(previous) if uploaded.is_some() => previous.clone(),
        Ok(_) => None,
        Err(_) => uploaded,
    };
    settle_covers(&state, stale, succeeded).await;
    finish_write(result, FormMode::Edit(id), &submitted)
}

pub async fn delete(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Redirect, AppError> {
    let id = parse_book_id(raw_id)?;
    let removed = with_catalogue(&state, move |catalogue| catalogue.delete(id)).await?;
    settle_covers(&state, removed.cover_filename, true).await;
    Ok(Redirect::to("/collection"))
}

pub async fn not_found() -> (StatusCode, Markup) {
    (StatusCode::NOT_FOUND, views::not_found())
}

/// Redirects on success; re-renders the form with the submitted values when
/// the input was rejected.
fn finish_write<T>(result: Result<T, AppError>, mode: FormMode, submitted: &BookDraft) -> Response {
    match result {
        Ok(_) => Redirect::to("/collection").into_response(),
        Err(err) if err.status() == StatusCode::UNPROCESSABLE_ENTITY => (
            StatusCode::UNPROCESSABLE_ENTITY,
            views::book_form(mode, submitted, Some(&err.to_string())),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

fn parse_book_id(raw: String) -> Result<BookId, AppError> {
    Uuid::parse_str(&raw).map_err(|_| AppError::InvalidId(raw))
}

async fn with_catalogue<T, F>(state: &AppState, op: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&Catalogue) -> CatalogueResult<T> + Send + 'static,
{
    let catalogue = Arc::clone(&state.catalogue);
    let result = tokio::task::spawn_blocking(move || op(&catalogue)).await?;
    Ok(result?)
}

async fn save_cover(
    state: &AppState,
    upload: Option<CoverUpload>,
) -> Result<Option<String>, AppError> {
    let Some(upload) = upload else {
        return Ok(None);
    };
    let covers = Arc::clone(&state.covers);
    let saved =
        tokio::task::spawn_blocking(move || covers.save(&upload.file_name, &upload.bytes))
            .await??;
    Ok(Some(saved))
}

/// Removes a cover no record points at any more and, after a successful
/// write, rebuilds the collage. Failures here are logged, not returned.
async fn settle_covers(state: &AppState, stale: Option<String>, rebuild: bool) {
    let catalogue = Arc::clone(&state.catalogue);
    let covers = Arc::clone(&state.covers);
    let task = tokio::task::spawn_blocking(move || {
        if let Some(filename) = stale {
            covers.remove(&filename);
        }
        if rebuild {
            refresh_collage(&catalogue, &covers);
        }
    });
    if let Err(err) = task.await {
        error!("event=cover_settle module=covers status=error error={err}");
    }
}

fn refresh_collage(catalogue: &Catalogue, covers: &CoverStore) {
    let books = match catalogue.list_all() {
        Ok(books) => books,
        Err(err) => {
            warn!(
                "event=collage_rebuild module=covers status=error error_code={}",
                err.code()
            );
            return;
        }
    };
    match covers.rebuild_collage(&books) {
        Ok(tiles) => info!("event=collage_rebuild module=covers status=ok tiles={tiles}"),
        Err(err) => warn!("event=collage_rebuild module=covers status=error error={err}"),
    }
}
