use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

/// Header the session layer in front of the server uses to name the signed in user
pub const REMOTE_USER: &str = "x-remote-user";

/// The user a request is made on behalf of, if the session layer named one.
///
/// Recorded with every journal entry the request causes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Actor(Option<String>);

impl Actor {
    pub fn into_name(self) -> Option<String> {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(REMOTE_USER) else {
            return Ok(Self(None));
        };

        let user = value
            .to_str()
            .map_err(|_| (StatusCode::BAD_REQUEST, "X-Remote-User must be plain text"))?
            .trim();

        Ok(Self((!user.is_empty()).then(|| user.to_string())))
    }
}

#[cfg(test)]
mod test {
    use axum::{extract::FromRequestParts, http::Request};

    use super::{Actor, REMOTE_USER};

    async fn actor(header: Option<&str>) -> Actor {
        let mut request = Request::builder();

        if let Some(value) = header {
            request = request.header(REMOTE_USER, value);
        }

        let (mut parts, _) = request.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn the_remote_user_is_the_actor() {
        assert_eq!(actor(Some(" frontdesk ")).await.into_name().as_deref(), Some("frontdesk"));
    }

    #[tokio::test]
    async fn requests_without_a_user_are_anonymous() {
        assert_eq!(actor(None).await, Actor::default());
        assert_eq!(actor(Some("")).await, Actor::default());
    }
}
