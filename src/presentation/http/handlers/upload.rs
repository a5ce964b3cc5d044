use crate::{
    application::tour_photos::dto::TourPhotoUpload,
    presentation::http::{errors::AppError, state::AppState},
};
use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::Field},
};
use serde_json::{Value, json};

pub const NOT_AN_IMAGE_MESSAGE: &str = "File type should be image";
pub const UNEXPECTED_FIELD_MESSAGE: &str = "Unexpected field";

/// A multipart file field the gate accepts, and how many files it may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadField {
    pub name: &'static str,
    pub max_count: usize,
}

/// Which files an upload may contain. Built once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    fields: Vec<UploadField>,
    max_file_bytes: usize,
}

impl UploadPolicy {
    pub fn new(fields: Vec<UploadField>, max_file_bytes: usize) -> Self {
        Self {
            fields,
            max_file_bytes,
        }
    }

    /// `imageCover` (one file) and `images` (up to three).
    pub fn tour_photos(max_file_bytes: usize) -> Self {
        Self::new(
            vec![
                UploadField {
                    name: "imageCover",
                    max_count: 1,
                },
                UploadField {
                    name: "images",
                    max_count: 3,
                },
            ],
            max_file_bytes,
        )
    }

    pub fn max_file_bytes(&self) -> usize {
        self.max_file_bytes
    }

    /// Upper bound for a whole request that uses every slot, plus room for text fields.
    pub fn max_request_bytes(&self) -> usize {
        let files: usize = self.fields.iter().map(|f| f.max_count).sum();
        files.saturating_mul(self.max_file_bytes).saturating_add(64 * 1024)
    }

    /// Admits file number `count + 1` for `field` with the declared media type.
    pub fn admit(
        &self,
        field: &str,
        content_type: Option<&str>,
        count: usize,
    ) -> Result<(), AppError> {
        let Some(slot) = self.fields.iter().find(|f| f.name == field) else {
            return Err(AppError::BadRequest(UNEXPECTED_FIELD_MESSAGE.into()));
        };
        if count >= slot.max_count {
            return Err(AppError::BadRequest(format!(
                "{UNEXPECTED_FIELD_MESSAGE}: at most {} file(s) allowed for '{}'",
                slot.max_count, slot.name
            )));
        }
        match content_type {
            Some(mime) if mime.starts_with("image/") => Ok(()),
            _ => Err(AppError::BadRequest(NOT_AN_IMAGE_MESSAGE.into())),
        }
    }

    /// Drains a multipart body, enforcing the policy on every file.
    pub async fn read(&self, mut multipart: Multipart) -> Result<TourPhotoUpload, AppError> {
        let mut upload = TourPhotoUpload::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            if field.file_name().is_none() {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Unreadable field '{}': {}", name, e)))?;
                upload.fields.insert(name, parse_text_value(&text));
                continue;
            }

            let count = match name.as_str() {
                "imageCover" => usize::from(upload.image_cover.is_some()),
                "images" => upload.images.len(),
                _ => 0,
            };
            self.admit(&name, field.content_type(), count)?;

            let data = self.read_file(field).await?;
            match name.as_str() {
                "imageCover" => upload.image_cover = Some(data),
                _ => upload.images.push(data),
            }
        }

        tracing::debug!(
            cover = upload.image_cover.is_some(),
            images = upload.images.len(),
            text_fields = upload.fields.len(),
            "Upload admitted"
        );
        Ok(upload)
    }

    async fn read_file(&self, mut field: Field<'_>) -> Result<bytes::Bytes, AppError> {
        let mut buf = bytes::BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(format!("Upload interrupted: {}", e)))?
        {
            if buf.len() + chunk.len() > self.max_file_bytes {
                return Err(AppError::BadRequest(format!(
                    "File too large: the limit is {} bytes",
                    self.max_file_bytes
                )));
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }
}

/// Multipart text arrives untyped; numbers and booleans are read as JSON, the rest stays text.
fn parse_text_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(v @ (Value::Number(_) | Value::Bool(_) | Value::Array(_) | Value::Object(_))) => v,
        _ => Value::String(raw.to_string()),
    }
}

pub async fn upload_tour_images(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let upload = state.upload_policy.read(multipart).await?;
    let doc = state.tour_photos.execute(&id, upload).await?;
    Ok(Json(json!({ "status": "success", "data": { "data": doc } })))
}
