//! Multipart forms for signup and post create/update

use wblog_core::{CategoryId, Error, Result};
use wblog_session::Part;

/// File attached to a form
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Guess the MIME type from the file extension
    pub fn from_path_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let ext = file_name
            .rsplit('.')
            .next()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let mime = match ext.as_str() {
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "jpg" | "jpeg" => "image/jpeg",
            _ => "application/octet-stream",
        };
        Self::new(file_name, mime, bytes)
    }

    fn part(&self, name: &str) -> Part {
        Part::File {
            name: name.to_string(),
            file_name: self.file_name.clone(),
            mime: self.mime.clone(),
            bytes: self.bytes.clone(),
        }
    }
}

fn text(name: &str, value: &str) -> Part {
    Part::Text {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Signup form
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub username: String,
    pub gender: Option<String>,
    pub avatar: Option<Upload>,
}

impl SignupForm {
    pub(crate) fn parts(&self) -> Result<Vec<Part>> {
        if self.email.trim().is_empty()
            || self.password.is_empty()
            || self.username.trim().is_empty()
        {
            return Err(Error::InvalidInput(
                "email, password and username are required".to_string(),
            ));
        }

        let mut parts = vec![
            text("email", self.email.trim()),
            text("password", &self.password),
            text("username", self.username.trim()),
        ];
        if let Some(gender) = self.gender.as_deref().filter(|g| !g.is_empty()) {
            parts.push(text("gender", gender));
        }
        if let Some(avatar) = &self.avatar {
            parts.push(avatar.part("file"));
        }
        Ok(parts)
    }
}

/// Post form; on update only the fields that are set are sent
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<CategoryId>,
    pub image: Option<Upload>,
}

impl PostForm {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn category(mut self, category: impl Into<CategoryId>) -> Self {
        self.category_id = Some(category.into());
        self
    }

    pub fn image(mut self, image: Upload) -> Self {
        self.image = Some(image);
        self
    }

    fn filled(field: &Option<String>) -> Option<&str> {
        field.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        Self::filled(&self.title).is_none()
            && Self::filled(&self.content).is_none()
            && self.category_id.is_none()
            && self.image.is_none()
    }

    /// Parts for creation: title and content are mandatory
    pub(crate) fn create_parts(&self) -> Result<Vec<Part>> {
        if Self::filled(&self.title).is_none() || Self::filled(&self.content).is_none() {
            return Err(Error::InvalidInput("Please fill all fields!".to_string()));
        }
        Ok(self.parts())
    }

    /// Parts for update: at least one field
    pub(crate) fn update_parts(&self) -> Result<Vec<Part>> {
        if self.is_empty() {
            return Err(Error::InvalidInput("Nothing to update".to_string()));
        }
        Ok(self.parts())
    }

    fn parts(&self) -> Vec<Part> {
        let mut parts = Vec::new();
        if let Some(title) = Self::filled(&self.title) {
            parts.push(text("title", title));
        }
        if let Some(content) = Self::filled(&self.content) {
            parts.push(text("content", content));
        }
        if let Some(category) = &self.category_id {
            parts.push(text("category_id", category.as_str()));
        }
        if let Some(image) = &self.image {
            parts.push(image.part("file"));
        }
        parts
    }
}
