use crate::error::{Error, Result};
use url::Url;
use validator::Validate;

/// Runs the payload's derived rules, logging the rejected fields.
pub fn validate<T: Validate>(val: &T) -> Result<()> {
    val.validate().map_err(|errors| {
        let fields: Vec<String> = errors.field_errors().keys().map(|k| k.to_string()).collect();
        tracing::debug!(?fields, "payload rejected");
        errors.into()
    })
}

/// Links shown to HR or candidates must be plain web links.
pub fn require_web_link(field: &str, value: Option<&str>) -> Result<()> {
    let Some(raw) = value else {
        return Ok(());
    };
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(()),
        _ => Err(Error::ValidationFailed(format!(
            "{} must be an http(s) link",
            field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_http_links_pass() {
        assert!(require_web_link("resume_url", None).is_ok());
        assert!(require_web_link("resume_url", Some("https://cdn.example.com/cv.pdf")).is_ok());
        assert!(require_web_link("resume_url", Some("javascript:alert(1)")).is_err());
        assert!(require_web_link("offer_letter_url", Some("ftp://files.example.com/offer")).is_err());
    }
}
