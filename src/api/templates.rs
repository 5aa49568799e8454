//! Template creation from HTML documents.

use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use super::validation::{validate_file_size, validate_html_content};
use crate::error::Error;
use crate::http::Client;
use crate::runtime::Runtime;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateHtmlTemplateRequest {
    pub name: String,
    pub html: String,
    #[serde(rename = "folder_name", skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

impl CreateHtmlTemplateRequest {
    /// Reads the document at `path`, refusing oversized files before reading them.
    pub fn from_file<R: Runtime>(
        runtime: &R,
        name: impl Into<String>,
        path: &Path,
        folder: Option<String>,
    ) -> anyhow::Result<Self> {
        validate_file_size(runtime, path)?;
        let html = runtime.read_to_string(path)?;
        Ok(Self {
            name: name.into(),
            html,
            folder,
        })
    }
}

impl Client {
    /// Creates a template from HTML. The document is validated locally first.
    #[tracing::instrument(skip(self, req), fields(name = %req.name))]
    pub async fn create_template_from_html(
        &self,
        req: &CreateHtmlTemplateRequest,
    ) -> Result<Option<Value>, Error> {
        validate_html_content(&req.html)?;
        self.post("/templates/html", req).await
    }
}
