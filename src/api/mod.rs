//! Resource operations layered on [`Client`](crate::http::Client).

pub mod templates;
pub mod validation;
pub mod webhooks;

pub use templates::CreateHtmlTemplateRequest;
pub use validation::{MAX_FILE_SIZE, MAX_HTML_SIZE, validate_file_size, validate_html_content};
pub use webhooks::{
    CreateWebhookRequest, UpdateWebhookRequest, VALID_WEBHOOK_EVENTS, Webhook,
    validate_webhook_events, validate_webhook_url,
};
