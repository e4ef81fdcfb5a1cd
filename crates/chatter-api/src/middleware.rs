use axum::{extract::Request, middleware::Next, response::Response};

/// Header carrying the caller's display name.
pub const USER_HEADER: &str = "user";

/// Who is acting on a request.
///
/// Handlers only consume this type; [`identify_caller`] is the one place that
/// decides how it is produced. Today that is the unauthenticated `user` header,
/// so a real authentication layer replaces that middleware and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerIdentity(Option<String>);

impl CallerIdentity {
    pub fn named(name: impl Into<String>) -> Self {
        Self(Some(name.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// True when the caller is the author of a stored record.
    pub fn owns(&self, author: Option<&str>) -> bool {
        matches!((self.name(), author), (Some(caller), Some(author)) if caller == author)
    }
}

/// Resolve the caller from the `user` header and stash it in the request
/// extensions. Never rejects: each handler decides what an anonymous caller gets.
pub async fn identify_caller(mut req: Request, next: Next) -> Response {
    let caller = req
        .headers()
        .get(USER_HEADER)
        .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
        .map(CallerIdentity::named)
        .unwrap_or_default();

    req.extensions_mut().insert(caller);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_needs_a_name_on_both_sides() {
        let alice = CallerIdentity::named("Alice");
        assert!(alice.owns(Some("Alice")));
        assert!(!alice.owns(Some("Bob")));
        assert!(!alice.owns(None));
        assert!(!CallerIdentity::anonymous().owns(None));
        assert!(!CallerIdentity::anonymous().owns(Some("")));
    }
}
