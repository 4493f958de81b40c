//! Calendar discovery.
//!
//! Walks the WebDAV property chain to find a user's calendar collections:
//!
//! 1. `PROPFIND` Depth 0 on the configured URL.
//! 2. Home is the `calendar-home-set` href from that response; when absent,
//!    follow `current-user-principal` with another Depth 0 `PROPFIND`; when
//!    that yields nothing either, the principal URL (or the base URL) stands
//!    in as the home.
//! 3. `PROPFIND` Depth 1 on the home lists child collections; those whose
//!    `resourcetype` carries a `calendar` element (or whose prop block
//!    mentions calendar-specific properties) are calendars.
//! 4. Compatibility fallback for Synology/SabreDAV layouts: when the listing
//!    is empty, the base path contains `/caldav` and a username is set, retry
//!    once against `calendars/<username>/`.
//!
//! The two `PROPFIND`s on the base and the home are required; a non-2xx on
//! either aborts with [`CaldavError::Upstream`]. The principal follow-up and
//! the guess retry are best-effort and their HTTP failures are swallowed.

use tracing::debug;
use url::Url;

use crate::client::{CaldavClient, DavResponse};
use crate::error::{CaldavError, CaldavResult};
use crate::xml::{extract_all, extract_first, propfind_body, text_content};

/// A calendar collection found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCalendar {
    /// Absolute URL of the collection.
    pub href: String,
    /// Display name, falling back to the href.
    pub name: String,
}

/// The outcome of calendar discovery.
#[derive(Debug, Clone)]
pub struct Discovery {
    /// Calendars found under the home collection.
    pub calendars: Vec<DiscoveredCalendar>,
    /// The calendar home the listing ran against.
    pub home_url: Url,
    /// The guessed home URL when the compatibility fallback fired.
    pub guessed_home: Option<Url>,
}

/// Discovers calendar collections starting from the client's base URL.
pub async fn discover(client: &CaldavClient) -> CaldavResult<Discovery> {
    let base = client.config().url.clone();
    let body = propfind_body();

    let res0 = client.propfind(base.as_str(), &body, 0).await?;
    if !res0.is_success() {
        return Err(res0.into_error("PROPFIND 0"));
    }

    let home_url = resolve_home(client, &res0, &base, &body).await?;
    debug!(home = %home_url, "resolved calendar home");

    let res1 = client.propfind(home_url.as_str(), &body, 1).await?;
    if !res1.is_success() {
        return Err(res1.into_error("PROPFIND 1"));
    }

    let mut calendars = parse_calendar_listing(&res1.body, &home_url)?;

    let mut guessed_home = None;
    if calendars.is_empty()
        && client.config().has_credentials()
        && base.as_str().to_ascii_lowercase().contains("/caldav")
    {
        let segment = format!(
            "calendars/{}/",
            urlencoding::encode(&client.config().username)
        );
        let guess = base.join(&segment)?;
        debug!(guess = %guess, "empty listing, trying per-user calendars path");

        let res_guess = client.propfind(guess.as_str(), &body, 1).await?;
        if res_guess.is_success() {
            calendars.extend(parse_calendar_listing(&res_guess.body, &guess)?);
        }
        guessed_home = Some(guess);
    }

    Ok(Discovery {
        calendars,
        home_url,
        guessed_home,
    })
}

/// Resolves the calendar home from the Depth 0 response, following the
/// principal when the home set is not advertised directly.
async fn resolve_home(
    client: &CaldavClient,
    res0: &DavResponse,
    base: &Url,
    body: &str,
) -> CaldavResult<Url> {
    if let Some(href) = home_set_href(&res0.body)? {
        return Ok(base.join(&href)?);
    }

    let principal = match principal_href(&res0.body)? {
        Some(href) => base.join(&href)?,
        None => return Ok(base.clone()),
    };

    let res = client.propfind(principal.as_str(), body, 0).await?;
    if res.is_success()
        && let Some(href) = home_set_href(&res.body)?
    {
        return Ok(principal.join(&href)?);
    }

    // Some hosts accept the Depth 1 listing on the principal itself.
    Ok(principal)
}

/// The first `calendar-home-set` href in a multistatus body, if any.
fn home_set_href(xml: &str) -> CaldavResult<Option<String>> {
    let Some(home_block) = extract_first(xml, "calendar-home-set")? else {
        return Ok(None);
    };
    Ok(extract_first(&home_block, "href")?
        .map(|h| text_content(&h))
        .filter(|h| !h.is_empty()))
}

/// The first `current-user-principal` href, if any.
fn principal_href(xml: &str) -> CaldavResult<Option<String>> {
    let Some(block) = extract_first(xml, "current-user-principal")? else {
        return Ok(None);
    };
    Ok(extract_first(&block, "href")?
        .map(|h| text_content(&h))
        .filter(|h| !h.is_empty()))
}

/// Picks the calendar collections out of a Depth 1 multistatus listing.
fn parse_calendar_listing(xml: &str, home: &Url) -> CaldavResult<Vec<DiscoveredCalendar>> {
    let mut calendars = Vec::new();

    for response in extract_all(xml, "response")? {
        let Some(href) = extract_first(&response, "href")?
            .map(|h| text_content(&h))
            .filter(|h| !h.is_empty())
        else {
            continue;
        };

        let resource_type = extract_first(&response, "resourcetype")?.unwrap_or_default();
        let prop_blob = extract_first(&response, "prop")?.unwrap_or_else(|| response.clone());
        if !looks_like_calendar(&resource_type, &prop_blob)? {
            continue;
        }

        let name = extract_first(&response, "displayname")?
            .map(|d| text_content(&d))
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| href.clone());

        let absolute = home.join(&href)?;
        calendars.push(DiscoveredCalendar {
            href: absolute.to_string(),
            name,
        });
    }

    Ok(calendars)
}

/// Heuristic for "this collection is a calendar".
///
/// A `calendar` element in `resourcetype` is authoritative; some servers
/// omit it but still advertise calendar-specific properties.
fn looks_like_calendar(resource_type: &str, prop_blob: &str) -> CaldavResult<bool> {
    if !extract_all(resource_type, "calendar")?.is_empty() {
        return Ok(true);
    }
    let blob = prop_blob.to_ascii_lowercase();
    Ok(blob.contains("supported-calendar-component-set") || blob.contains("calendar-description"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaldavConfig;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn multistatus(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0"?><d:multistatus xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">{inner}</d:multistatus>"#
        )
    }

    fn calendar_response(href: &str, name: &str) -> String {
        format!(
            "<d:response><d:href>{href}</d:href><d:propstat><d:prop>\
             <d:displayname>{name}</d:displayname>\
             <d:resourcetype><d:collection/><c:calendar/></d:resourcetype>\
             </d:prop></d:propstat></d:response>"
        )
    }

    fn plain_collection_response(href: &str) -> String {
        format!(
            "<d:response><d:href>{href}</d:href><d:propstat><d:prop>\
             <d:resourcetype><d:collection/></d:resourcetype>\
             </d:prop></d:propstat></d:response>"
        )
    }

    async fn client_for(server: &MockServer, base_path: &str) -> CaldavClient {
        let config = CaldavConfig::new(format!("{}{base_path}", server.uri()))
            .unwrap()
            .with_credentials("alice", "s3cret");
        CaldavClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn discovers_calendars_under_advertised_home() {
        let server = MockServer::start().await;

        let home_set = multistatus(
            "<d:response><d:propstat><d:prop>\
             <c:calendar-home-set><d:href>/cal/home/</d:href></c:calendar-home-set>\
             </d:prop></d:propstat></d:response>",
        );
        Mock::given(method("PROPFIND"))
            .and(path("/dav/"))
            .and(header("Depth", "0"))
            .respond_with(ResponseTemplate::new(207).set_body_string(home_set))
            .mount(&server)
            .await;

        let listing = multistatus(&format!(
            "{}{}{}",
            plain_collection_response("/cal/home/"),
            calendar_response("/cal/home/personal/", "Personal"),
            calendar_response("/cal/home/work/", "Work"),
        ));
        Mock::given(method("PROPFIND"))
            .and(path("/cal/home/"))
            .and(header("Depth", "1"))
            .respond_with(ResponseTemplate::new(207).set_body_string(listing))
            .mount(&server)
            .await;

        let client = client_for(&server, "/dav/").await;
        let discovery = discover(&client).await.unwrap();

        assert_eq!(discovery.home_url.path(), "/cal/home/");
        assert!(discovery.guessed_home.is_none());
        assert_eq!(discovery.calendars.len(), 2);
        assert_eq!(discovery.calendars[0].name, "Personal");
        assert_eq!(
            discovery.calendars[0].href,
            format!("{}/cal/home/personal/", server.uri())
        );
    }

    #[tokio::test]
    async fn no_principal_followup_when_home_is_advertised() {
        let server = MockServer::start().await;

        let home_and_principal = multistatus(
            "<d:response><d:propstat><d:prop>\
             <d:current-user-principal><d:href>/principals/alice/</d:href></d:current-user-principal>\
             <c:calendar-home-set><d:href>/cal/home/</d:href></c:calendar-home-set>\
             </d:prop></d:propstat></d:response>",
        );
        Mock::given(method("PROPFIND"))
            .and(path("/dav/"))
            .and(header("Depth", "0"))
            .respond_with(ResponseTemplate::new(207).set_body_string(home_and_principal))
            .mount(&server)
            .await;

        Mock::given(method("PROPFIND"))
            .and(path("/principals/alice/"))
            .respond_with(ResponseTemplate::new(207).set_body_string(multistatus("")))
            .expect(0)
            .mount(&server)
            .await;

        Mock::given(method("PROPFIND"))
            .and(path("/cal/home/"))
            .and(header("Depth", "1"))
            .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(
                &calendar_response("/cal/home/personal/", "Personal"),
            )))
            .mount(&server)
            .await;

        let client = client_for(&server, "/dav/").await;
        let discovery = discover(&client).await.unwrap();
        assert_eq!(discovery.calendars.len(), 1);
    }

    #[tokio::test]
    async fn follows_principal_when_home_is_missing() {
        let server = MockServer::start().await;

        let principal_only = multistatus(
            "<d:response><d:propstat><d:prop>\
             <d:current-user-principal><d:href>/principals/alice/</d:href></d:current-user-principal>\
             </d:prop></d:propstat></d:response>",
        );
        Mock::given(method("PROPFIND"))
            .and(path("/dav/"))
            .and(header("Depth", "0"))
            .respond_with(ResponseTemplate::new(207).set_body_string(principal_only))
            .mount(&server)
            .await;

        let principal_home = multistatus(
            "<d:response><d:propstat><d:prop>\
             <c:calendar-home-set><d:href>/cal/alice/</d:href></c:calendar-home-set>\
             </d:prop></d:propstat></d:response>",
        );
        Mock::given(method("PROPFIND"))
            .and(path("/principals/alice/"))
            .and(header("Depth", "0"))
            .respond_with(ResponseTemplate::new(207).set_body_string(principal_home))
            .mount(&server)
            .await;

        Mock::given(method("PROPFIND"))
            .and(path("/cal/alice/"))
            .and(header("Depth", "1"))
            .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(
                &calendar_response("/cal/alice/default/", "Default"),
            )))
            .mount(&server)
            .await;

        let client = client_for(&server, "/dav/").await;
        let discovery = discover(&client).await.unwrap();

        assert_eq!(discovery.home_url.path(), "/cal/alice/");
        assert_eq!(discovery.calendars.len(), 1);
        assert_eq!(discovery.calendars[0].name, "Default");
    }

    #[tokio::test]
    async fn guesses_per_user_path_exactly_once_when_listing_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("PROPFIND"))
            .and(path("/caldav/"))
            .and(header("Depth", "0"))
            .respond_with(ResponseTemplate::new(207).set_body_string(multistatus("")))
            .mount(&server)
            .await;

        Mock::given(method("PROPFIND"))
            .and(path("/caldav/"))
            .and(header("Depth", "1"))
            .respond_with(ResponseTemplate::new(207).set_body_string(multistatus("")))
            .mount(&server)
            .await;

        Mock::given(method("PROPFIND"))
            .and(path("/caldav/calendars/alice/"))
            .and(header("Depth", "1"))
            .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(
                &calendar_response("/caldav/calendars/alice/default/", "Default"),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "/caldav/").await;
        let discovery = discover(&client).await.unwrap();

        assert_eq!(
            discovery.guessed_home.as_ref().map(|u| u.path()),
            Some("/caldav/calendars/alice/")
        );
        assert_eq!(discovery.calendars.len(), 1);
    }

    #[tokio::test]
    async fn guess_username_is_percent_encoded() {
        let server = MockServer::start().await;

        Mock::given(method("PROPFIND"))
            .respond_with(ResponseTemplate::new(207).set_body_string(multistatus("")))
            .mount(&server)
            .await;

        let config = CaldavConfig::new(format!("{}/caldav/", server.uri()))
            .unwrap()
            .with_credentials("alice@example.com", "pw");
        let client = CaldavClient::new(config).unwrap();
        let discovery = discover(&client).await.unwrap();

        assert_eq!(
            discovery.guessed_home.as_ref().map(|u| u.path()),
            Some("/caldav/calendars/alice%40example.com/")
        );
        assert!(discovery.calendars.is_empty());
    }

    #[tokio::test]
    async fn no_guess_outside_caldav_paths() {
        let server = MockServer::start().await;

        Mock::given(method("PROPFIND"))
            .respond_with(ResponseTemplate::new(207).set_body_string(multistatus("")))
            .mount(&server)
            .await;

        let client = client_for(&server, "/dav/").await;
        let discovery = discover(&client).await.unwrap();

        assert!(discovery.guessed_home.is_none());
        assert!(discovery.calendars.is_empty());
    }

    #[tokio::test]
    async fn required_propfind_failure_aborts_with_diagnostics() {
        let server = MockServer::start().await;

        Mock::given(method("PROPFIND"))
            .and(path("/dav/"))
            .respond_with(
                ResponseTemplate::new(401)
                    .insert_header("WWW-Authenticate", "Basic realm=\"dav\"")
                    .set_body_string("auth required"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, "/dav/").await;
        let err = discover(&client).await.unwrap_err();

        assert!(err.to_string().contains("PROPFIND 0"));
        let diag = err.diagnostics().unwrap();
        assert_eq!(diag.status, 401);
        assert_eq!(diag.www_authenticate.as_deref(), Some("Basic realm=\"dav\""));
    }

    #[test]
    fn collection_heuristic_accepts_component_set_without_resourcetype() {
        assert!(looks_like_calendar("", "<c:supported-calendar-component-set/>").unwrap());
        assert!(!looks_like_calendar("<d:collection/>", "").unwrap());
        assert!(looks_like_calendar("<d:collection/><c:calendar/>", "").unwrap());
    }
}
