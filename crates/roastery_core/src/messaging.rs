//! Outbound chat links. Nothing is sent; the client opens the URL.

use url::Url;

use crate::domain::{Course, Language};
use crate::ports::{PortError, PortResult};

const WHATSAPP_BASE: &str = "https://wa.me/";

/// Builds `https://wa.me/<digits>?text=<message>` for `phone`.
pub fn whatsapp_link(phone: &str, text: &str) -> PortResult<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    let malformed = phone
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')')));
    if malformed || digits.len() < 8 {
        return Err(PortError::InvalidInput(format!(
            "{phone:?} is not a usable WhatsApp number"
        )));
    }

    let mut url = Url::parse(WHATSAPP_BASE)
        .and_then(|base| base.join(&digits))
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    let text = text.trim();
    if !text.is_empty() {
        url.query_pairs_mut().append_pair("text", text);
    }
    Ok(url.into())
}

/// Prefilled inquiry about a course, in the visitor's language.
pub fn course_inquiry_text(course: &Course, lang: Language) -> String {
    let title = course.title.get(lang);
    match lang {
        Language::Tr => format!("Merhaba, \"{title}\" eğitimi hakkında bilgi almak istiyorum."),
        Language::En => format!("Hello, I would like to know more about the \"{title}\" course."),
    }
}
