use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::core::error::Error;

/// Read access to the headers of the request being served.
///
/// Handed explicitly to the facade's current-request operations. `None`
/// stands for "called outside of a request" and fails with [`Error::NoContext`].
pub trait RequestHeaders {
    fn header(&self, name: &str) -> Result<Option<String>, Error>;
}

impl RequestHeaders for HeaderMap {
    fn header(&self, name: &str) -> Result<Option<String>, Error> {
        match self.get(name) {
            Some(value) => Ok(Some(value.to_str()?.to_owned())),
            None => Ok(None),
        }
    }
}

impl RequestHeaders for Parts {
    fn header(&self, name: &str) -> Result<Option<String>, Error> {
        self.headers.header(name)
    }
}

impl<T: RequestHeaders> RequestHeaders for Option<T> {
    fn header(&self, name: &str) -> Result<Option<String>, Error> {
        match self {
            Some(inner) => inner.header(name),
            None => Err(Error::NoContext),
        }
    }
}

impl<T: RequestHeaders + ?Sized> RequestHeaders for &T {
    fn header(&self, name: &str) -> Result<Option<String>, Error> {
        (**self).header(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("tinytoken", HeaderValue::from_static("1234"));

        assert_eq!(headers.header("tinytoken").unwrap().as_deref(), Some("1234"));
        assert_eq!(headers.header("other").unwrap(), None);
        assert_eq!(Some(&headers).header("TinyToken").unwrap().as_deref(), Some("1234"));
    }

    #[test]
    fn test_missing_context() {
        let none: Option<HeaderMap> = None;
        assert!(matches!(none.header("tinytoken"), Err(Error::NoContext)));
    }

    #[test]
    fn test_opaque_header_value() {
        let mut headers = HeaderMap::new();
        headers.insert("tinytoken", HeaderValue::from_bytes(&[0xFF, 0x41]).unwrap());
        assert!(matches!(headers.header("tinytoken"), Err(Error::HeaderDecode(_))));
    }
}
