use thiserror::Error;
use url::Url;

/// Why a link was refused before handing it to the system opener.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),

    #[error("URL carries embedded credentials")]
    EmbeddedCredentials,

    /// Host, port or scheme differ from the configured forum server.
    #[error("URL does not belong to the forum server: {0}")]
    ForeignOrigin(String),
}

/// Validate a link before opening it in the user's browser.
///
/// Only http(s) URLs on the same origin as `server` pass. Everything the
/// terminal client opens (attachment images) is served by the forum itself,
/// so any other origin means the data was tampered with.
///
/// ```
/// use parley::util::validate_url_for_open;
/// use url::Url;
///
/// let server = Url::parse("http://localhost:8080").unwrap();
/// assert!(validate_url_for_open("http://localhost:8080/images/attachments/a.png", &server).is_ok());
/// assert!(validate_url_for_open("https://evil.example/a.png", &server).is_err());
/// assert!(validate_url_for_open("file:///etc/passwd", &server).is_err());
/// ```
pub fn validate_url_for_open(url_str: &str, server: &Url) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(UrlValidationError::EmbeddedCredentials);
    }

    if url.origin() != server.origin() {
        return Err(UrlValidationError::ForeignOrigin(
            url.host_str().unwrap_or_default().to_owned(),
        ));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> Url {
        Url::parse("http://localhost:8080").unwrap()
    }

    #[test]
    fn test_same_origin_accepted() {
        let url = validate_url_for_open("http://localhost:8080/images/attachments/a.png", &server())
            .unwrap();
        assert_eq!(url.path(), "/images/attachments/a.png");
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            validate_url_for_open("file:///etc/passwd", &server()),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            validate_url_for_open("javascript:alert(1)", &server()),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_other_host_or_port_rejected() {
        assert!(matches!(
            validate_url_for_open("http://example.com/a.png", &server()),
            Err(UrlValidationError::ForeignOrigin(_))
        ));
        assert!(matches!(
            validate_url_for_open("http://localhost:9090/a.png", &server()),
            Err(UrlValidationError::ForeignOrigin(_))
        ));
        assert!(matches!(
            validate_url_for_open("https://localhost:8080/a.png", &server()),
            Err(UrlValidationError::ForeignOrigin(_))
        ));
    }

    #[test]
    fn test_embedded_credentials_rejected() {
        assert_eq!(
            validate_url_for_open("http://user:pw@localhost:8080/a.png", &server()),
            Err(UrlValidationError::EmbeddedCredentials)
        );
    }

    #[test]
    fn test_unparsable_rejected() {
        assert!(matches!(
            validate_url_for_open("not a url", &server()),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }
}
