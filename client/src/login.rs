//! Lobby login.
//!
//! The lobby identifies a connection by a session id. With an account the id
//! comes from the site's login form; guests make one up.
use std::time::{SystemTime, UNIX_EPOCH};

use kibitz_types::Outbound;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::{header::SET_COOKIE, redirect};
use tracing::{debug, info};
use url::Url;

use crate::{Error, Result};

/// Browser identity presented to the lobby.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:66.0) Gecko/20100101 Firefox/66.0";

const PROTOCOL_VERSION: &str = "ver:191";
const SCREEN: &str = "1366x768 1";
const GUEST_SESSION_LEN: usize = 16;
const CONNECTION_NONCE_LEN: usize = 18;

/// Posts the login form and returns the session id from the response cookies.
pub async fn fetch_session_id(login_url: &Url, login: &str, password: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .user_agent(USER_AGENT)
        .build()?;
    let response = client
        .post(login_url.clone())
        .form(&[("cc", "0"), ("username", login), ("pw", password)])
        .send()
        .await?;
    let status = response.status();
    if !(status.is_success() || status.is_redirection()) {
        return Err(Error::Failed(status));
    }
    let cookies: Vec<&str> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    debug!(%status, cookies = cookies.len(), "login response");
    let session = session_from_cookies(&cookies)?;
    info!(login, "logged in");
    Ok(session)
}

/// The session cookie is the second one set, formatted `name=value:...`.
fn session_from_cookies(cookies: &[&str]) -> Result<String> {
    cookies
        .get(1)
        .and_then(|cookie| cookie.split(':').next())
        .and_then(|pair| pair.split('=').nth(1))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(Error::MissingSession)
}

/// A random session id for playing without an account.
pub fn guest_session<R: Rng>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(GUEST_SESSION_LEN)
        .map(char::from)
        .collect()
}

/// Builds the first message sent after connecting.
pub fn login_payload<R: Rng>(rng: &mut R, session: &str, lobby_url: &Url) -> Outbound {
    let nonce: String = (0..CONNECTION_NONCE_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    Outbound::Login(vec![
        format!("{session}+{nonce}||"),
        "en".to_string(),
        "b".to_string(),
        String::new(),
        USER_AGENT.to_string(),
        format!("/{now}/1"),
        "w".to_string(),
        SCREEN.to_string(),
        format!("ref:{lobby_url}"),
        PROTOCOL_VERSION.to_string(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_session_from_second_cookie() {
        let cookies = ["kt=cckn; path=/", "ksession=abc123:4:xyz; path=/"];
        assert_eq!(session_from_cookies(&cookies).unwrap(), "abc123");
    }

    #[test]
    fn test_missing_session_cookie() {
        assert!(matches!(
            session_from_cookies(&["kt=cckn"]),
            Err(Error::MissingSession)
        ));
        assert!(matches!(
            session_from_cookies(&["kt=cckn", "broken"]),
            Err(Error::MissingSession)
        ));
    }

    #[test]
    fn test_guest_session() {
        let mut rng = StdRng::seed_from_u64(7);
        let session = guest_session(&mut rng);
        assert_eq!(session.len(), GUEST_SESSION_LEN);
        assert!(session.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_login_payload_layout() {
        let mut rng = StdRng::seed_from_u64(7);
        let lobby = Url::parse("https://www.kurnik.pl/szachy/").unwrap();
        let Outbound::Login(fields) = login_payload(&mut rng, "abc", &lobby) else {
            panic!("expected login");
        };
        assert_eq!(fields.len(), 10);
        let (session, nonce) = fields[0].split_once('+').unwrap();
        assert_eq!(session, "abc");
        let nonce = nonce.strip_suffix("||").unwrap();
        assert_eq!(nonce.len(), CONNECTION_NONCE_LEN);
        assert!(nonce.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(fields[4], USER_AGENT);
        assert!(fields[5].starts_with('/') && fields[5].ends_with("/1"));
        assert_eq!(fields[8], "ref:https://www.kurnik.pl/szachy/");
        assert_eq!(fields[9], "ver:191");

        let payload = login_payload(&mut rng, "abc", &lobby).to_payload();
        assert_eq!(payload.i, vec![1710]);
    }
}
