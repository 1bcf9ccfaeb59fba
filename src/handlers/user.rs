// src/handlers/user.rs

use std::path::{Path, PathBuf};

use axum::{
    Extension, Json,
    extract::{
        Multipart, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use validator::{Validate, ValidationErrors};

use crate::{
    error::ApiError,
    models::user::{
        LoginRequest, LoginResponse, NewUser, PublicUser, RegisterUserRequest, User, UserChanges,
    },
    state::AppState,
    store::USER_EXISTS,
    utils::{
        api_response::ApiResponse,
        async_handler::async_handler,
        jwt::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
        media::{discard_temp_file, unique_file_name},
    },
};

/// Files attached to a registration form, already written to the temp dir.
#[derive(Debug, Default)]
pub struct RegistrationFiles {
    pub avatar: Option<PathBuf>,
    pub cover_image: Option<PathBuf>,
}

impl RegistrationFiles {
    /// Deletes whatever the media service did not consume.
    pub async fn discard(&self) {
        for path in [&self.avatar, &self.cover_image].into_iter().flatten() {
            discard_temp_file(path).await;
        }
    }
}

/// Registers a new user from a multipart form.
///
/// Text fields: `username`, `email`, `password`, `fullName`.
/// Files: `avatar` (required), `coverImage` (optional).
/// Returns 201 Created and the user object (excluding password and refresh token).
pub async fn register(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    async_handler(async move {
        let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;

        let mut form = RegisterUserRequest::default();
        let mut files = RegistrationFiles::default();
        let read = read_registration_form(
            &mut multipart,
            &state.config.temp_dir,
            &mut form,
            &mut files,
        )
        .await;

        let result = match read {
            Ok(()) => register_user(&state, form, &files).await,
            Err(e) => Err(e),
        };
        files.discard().await;
        result
    })
    .await
}

async fn read_registration_form(
    multipart: &mut Multipart,
    temp_dir: &Path,
    form: &mut RegisterUserRequest,
    files: &mut RegistrationFiles,
) -> Result<(), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "avatar" | "coverImage" => {
                let original = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await?;
                // An empty file input is the same as no file.
                if bytes.is_empty() {
                    continue;
                }

                tokio::fs::create_dir_all(temp_dir).await?;
                let path = temp_dir.join(unique_file_name(original.as_deref()));
                tokio::fs::write(&path, &bytes).await?;

                let slot = if name == "avatar" {
                    &mut files.avatar
                } else {
                    &mut files.cover_image
                };
                if let Some(previous) = slot.replace(path) {
                    discard_temp_file(&previous).await;
                }
            }
            "username" => form.username = field.text().await?,
            "email" => form.email = field.text().await?,
            "password" => form.password = field.text().await?,
            "fullName" => form.full_name = field.text().await?,
            _ => {} // Ignore unknown fields.
        }
    }
    Ok(())
}

/// Sorted messages of every failed field rule.
fn validation_details(errors: &ValidationErrors) -> Vec<String> {
    let mut details: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();
    details.sort();
    details
}

/// Registration use case: validate, reject duplicates, upload media,
/// persist, then re-read the record without its secrets.
pub async fn register_user(
    state: &AppState,
    form: RegisterUserRequest,
    files: &RegistrationFiles,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    if let Err(validation_errors) = form.validate() {
        return Err(ApiError::bad_request("All Fields are Required")
            .with_errors(validation_details(&validation_errors)));
    }

    let username = form.username.trim().to_lowercase();
    let email = form.email.trim().to_lowercase();

    // Advisory fast path; the store's unique constraint is the real guard.
    if state
        .users
        .find_by_username_or_email(&username, &email)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict(USER_EXISTS));
    }

    let avatar_path = files
        .avatar
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Avatar file is required"))?;

    let avatar = state
        .media
        .upload(avatar_path)
        .await
        .ok_or_else(|| ApiError::bad_request("Avatar file is required"))?;

    let cover_image = match files.cover_image.as_deref() {
        Some(path) => state.media.upload(path).await.map(|media| media.url),
        None => None,
    }
    .unwrap_or_default();

    let user = User::create(
        state.users.as_ref(),
        NewUser {
            username,
            email,
            full_name: form.full_name,
            avatar: avatar.url,
            cover_image,
            password: form.password,
        },
    )
    .await?;

    let created = state
        .users
        .find_by_id(user.id)
        .await?
        .map(PublicUser::from)
        .ok_or_else(|| ApiError::internal("Something Went Wrong in Registering User"))?;

    tracing::info!(user_id = created.id, "Registered user {}", created.username);

    Ok(ApiResponse::with_message(
        StatusCode::CREATED,
        created,
        "User Registered Successfully",
    ))
}

/// Authenticates a user by username or email and issues both tokens.
///
/// The tokens are returned in the body and also set as `HttpOnly` cookies.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    async_handler(async move {
        let Json(payload) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
        let response = login_user(&state, payload).await?;

        let jar = jar
            .add(session_cookie(ACCESS_TOKEN_COOKIE, &response.data().access_token))
            .add(session_cookie(REFRESH_TOKEN_COOKIE, &response.data().refresh_token));
        Ok::<_, ApiError>((jar, response))
    })
    .await
}

fn session_cookie(name: &'static str, value: &str) -> Cookie<'static> {
    Cookie::build((name, value.to_owned()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

fn non_blank_lowercase(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> Result<ApiResponse<LoginResponse>, ApiError> {
    let username = non_blank_lowercase(payload.username.as_deref());
    let email = non_blank_lowercase(payload.email.as_deref());
    if username.is_none() && email.is_none() {
        return Err(ApiError::bad_request("username or email is required"));
    }

    let user = state
        .users
        .find_by_username_or_email(
            username.as_deref().unwrap_or_default(),
            email.as_deref().unwrap_or_default(),
        )
        .await?
        .ok_or_else(|| ApiError::not_found("User does not exist"))?;

    if !user.is_password_correct(&payload.password)? {
        return Err(ApiError::unauthorized("Invalid user credentials"));
    }

    let access_token = user.generate_access_token(&state.config.access_token)?;
    let refresh_token = user.generate_refresh_token(&state.config.refresh_token)?;

    let changes = UserChanges {
        refresh_token: Some(Some(refresh_token.clone())),
        ..Default::default()
    };
    let user = User::update(state.users.as_ref(), user.id, changes)
        .await?
        .ok_or_else(|| ApiError::internal("Something went wrong while generating tokens"))?;

    Ok(ApiResponse::with_message(
        StatusCode::OK,
        LoginResponse {
            user: user.into(),
            access_token,
            refresh_token,
        },
        "User logged In Successfully",
    ))
}

/// Returns the user resolved by the authentication middleware.
pub async fn current_user(Extension(user): Extension<PublicUser>) -> Response {
    async_handler(async move {
        Ok::<_, ApiError>(ApiResponse::with_message(
            StatusCode::OK,
            user,
            "User fetched successfully",
        ))
    })
    .await
}
