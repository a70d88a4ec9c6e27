/// Image-generation endpoint the encoded prompt is appended to.
pub const DEFAULT_BASE_URL: &str = "https://image.pollinations.ai/prompt/";

/// One-way request for a page illustration. Nothing reads a response back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllustrationRequest {
    pub prompt: String,
    pub url: String,
}

impl IllustrationRequest {
    pub fn for_page(base_url: &str, page_text: &str) -> Self {
        let prompt = prompt_for(page_text);
        let url = url_for(base_url, &prompt);
        Self { prompt, url }
    }
}

pub fn prompt_for(page_text: &str) -> String {
    format!("illustration for: {page_text}")
}

pub fn url_for(base_url: &str, prompt: &str) -> String {
    format!("{base_url}{}", urlencoding::encode(prompt))
}

/// Hand the illustration to the system browser and forget about it.
pub fn open_in_browser(request: &IllustrationRequest) {
    if !webbrowser::Browser::is_available() {
        tracing::debug!("no browser available for illustration");
        return;
    }
    if let Err(err) = webbrowser::open(&request.url) {
        tracing::debug!(%err, "failed to open illustration");
    }
}
