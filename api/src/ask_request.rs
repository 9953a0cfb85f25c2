use axum::extract::multipart::{Multipart, MultipartError};

pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Fields of the ask form. Every field is optional on the wire.
#[derive(Default)]
pub struct AskRequest {
    pub api_key: Option<String>,
    pub question: Option<String>,
    pub document: Option<UploadedFile>,
}

impl AskRequest {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut request = AskRequest::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("api_key") => request.api_key = Some(field.text().await?),
                Some("question") => request.question = Some(field.text().await?),
                Some("document") => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?.to_vec();
                    // Browsers send an empty, nameless part when no file is chosen.
                    if !filename.is_empty() {
                        request.document = Some(UploadedFile { filename, bytes });
                    }
                }
                _ => {}
            }
        }

        Ok(request)
    }
}
