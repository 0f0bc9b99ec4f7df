use axum::{
    body::Bytes,
    extract::{FromRequest, Request, rejection::BytesRejection},
};

/// An `application/x-www-form-urlencoded` body that keeps repeated keys,
/// as sent by a group of checkboxes.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    #[must_use]
    pub fn parse(body: &[u8]) -> Self {
        Self {
            pairs: url::form_urlencoded::parse(body).into_owned().collect(),
        }
    }

    /// First value of `key`, or an empty string.
    #[must_use]
    pub fn get(&self, key: &str) -> &str {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map_or("", |(_, v)| v.as_str())
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        !self.get(key).is_empty()
    }

    #[must_use]
    pub fn all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = BytesRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await?;
        Ok(Self::parse(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_keys() {
        let form = FormData::parse(b"cases=EAC2190012345&cases=LIN2190054321&delete=Delete");
        assert_eq!(form.all("cases"), vec!["EAC2190012345", "LIN2190054321"]);
        assert!(form.has("delete"));
        assert!(!form.has("add"));
        assert_eq!(form.get("missing"), "");
    }

    #[test]
    fn test_decodes_values() {
        let form = FormData::parse(b"name=My+case%21&case=eac2190012345");
        assert_eq!(form.get("name"), "My case!");
        assert_eq!(form.get("case"), "eac2190012345");
    }
}
